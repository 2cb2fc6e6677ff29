//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers the locality, registration and health endpoints and
//! the request/response schemas they use. The document backs Swagger UI in
//! debug builds.

use utoipa::OpenApi;

use crate::domain::{CountryCode, Error, ErrorCode, FailureReason, FormField, Sex};
use crate::inbound::http::localities::{LocalityResponse, NeighbourhoodResponse};
use crate::inbound::http::registrations::{
    BirthDateRequest, FieldErrorResponse, PhoneRequest, RegistrationRequest,
    RegistrationResponse, SelectionKind, SelectionRequest, ValidationRequest, ValidationResponse,
};

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Fiscal registration API",
        description = "Form backend for volunteer poll-watcher registration: locality lookup, draft validation and submission."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::localities::list_localities,
        crate::inbound::http::localities::list_neighbourhoods,
        crate::inbound::http::registrations::validate_registration,
        crate::inbound::http::registrations::submit_registration,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        Error,
        ErrorCode,
        CountryCode,
        Sex,
        FormField,
        FailureReason,
        LocalityResponse,
        NeighbourhoodResponse,
        SelectionKind,
        SelectionRequest,
        PhoneRequest,
        BirthDateRequest,
        RegistrationRequest,
        ValidationRequest,
        FieldErrorResponse,
        ValidationResponse,
        RegistrationResponse,
    )),
    tags(
        (name = "localities", description = "Locality and neighbourhood lookup"),
        (name = "registrations", description = "Draft validation and submission"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
