//! Registration form handlers.
//!
//! ```text
//! POST /api/v1/registrations/validate
//! POST /api/v1/registrations
//! ```
//!
//! The browser posts its whole draft; each request runs a fresh form session
//! and, for submissions, a fresh state machine.

use actix_web::{HttpResponse, http::header, post, web};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;
use utoipa::ToSchema;

use crate::domain::locality::OTHER_WIRE_ID;
use crate::domain::{
    BirthDateInput, CountryCode, Error, FailureReason, FieldErrors, FormField, LocalityId,
    NeighbourhoodId, PhoneInput, RegistrationDraft, Selection, Sex, SubmissionFailure,
    SubmitOutcome, validate,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::state::HttpState;

/// Message attached to 400 responses carrying field errors.
pub const INVALID_FIELDS_MESSAGE: &str = "Hay campos con errores";
/// Returned while the same national ID is already being submitted.
pub const IN_FLIGHT_MESSAGE: &str = "Ya hay un registro en curso para este DNI";

/// How a dropdown value was chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum SelectionKind {
    #[default]
    Unset,
    Known,
    Other,
}

/// Dropdown value. `id` is read for `known`, `description` for `other`.
///
/// A `known` entry with the legacy id `999` is read as `other`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct SelectionRequest {
    pub kind: SelectionKind,
    pub id: Option<u32>,
    pub description: Option<String>,
}

impl SelectionRequest {
    fn into_selection<T>(self, field: FormField, wrap: fn(u32) -> T) -> Result<Selection<T>, Error> {
        let Self {
            kind,
            id,
            description,
        } = self;
        match (kind, id) {
            (SelectionKind::Unset, _) => Ok(Selection::Unset),
            (SelectionKind::Other, _) => Ok(Selection::other(description.unwrap_or_default())),
            (SelectionKind::Known, Some(OTHER_WIRE_ID)) => {
                Ok(Selection::other(description.unwrap_or_default()))
            }
            (SelectionKind::Known, Some(id)) => Ok(Selection::known(wrap(id))),
            (SelectionKind::Known, None) => Err(Error::invalid_request(format!(
                "{field} must carry an id when kind is known"
            ))
            .with_details(json!({ "field": field, "code": "missing_id" }))),
        }
    }
}

/// Phone number split the way the form collects it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct PhoneRequest {
    pub country_code: CountryCode,
    #[schema(example = "0351")]
    pub area_code: String,
    #[schema(example = "1234567")]
    pub number: String,
}

impl From<PhoneRequest> for PhoneInput {
    fn from(value: PhoneRequest) -> Self {
        Self {
            country_code: value.country_code,
            area_code: value.area_code,
            number: value.number,
        }
    }
}

/// Birth date as typed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct BirthDateRequest {
    #[schema(example = "15")]
    pub day: String,
    #[schema(example = "5")]
    pub month: String,
    #[schema(example = "1990")]
    pub year: String,
}

impl From<BirthDateRequest> for BirthDateInput {
    fn from(value: BirthDateRequest) -> Self {
        Self {
            day: value.day,
            month: value.month,
            year: value.year,
        }
    }
}

/// Registration draft as posted by the browser. Missing fields are empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistrationRequest {
    #[schema(example = "Juan")]
    pub first_name: String,
    #[schema(example = "Pérez")]
    pub last_name: String,
    #[schema(example = "30123456")]
    pub national_id: String,
    pub national_id_confirmation: String,
    pub phone: PhoneRequest,
    pub phone_confirmation: PhoneRequest,
    #[schema(example = "juan.perez@example.com")]
    pub email: String,
    pub birth_date: BirthDateRequest,
    pub locality: SelectionRequest,
    pub neighbourhood: SelectionRequest,
    pub sex: Option<Sex>,
    pub captcha_token: String,
    pub terms_accepted: bool,
}

impl TryFrom<RegistrationRequest> for RegistrationDraft {
    type Error = Error;

    fn try_from(value: RegistrationRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            first_name: value.first_name,
            last_name: value.last_name,
            national_id: value.national_id,
            national_id_confirmation: value.national_id_confirmation,
            phone: value.phone.into(),
            phone_confirmation: value.phone_confirmation.into(),
            email: value.email,
            birth_date: value.birth_date.into(),
            locality: value
                .locality
                .into_selection(FormField::Locality, LocalityId::new)?,
            neighbourhood: value
                .neighbourhood
                .into_selection(FormField::Neighbourhood, NeighbourhoodId::new)?,
            sex: value.sex,
            captcha_token: value.captcha_token,
            terms_accepted: value.terms_accepted,
        })
    }
}

/// Draft to check, and the fields the user has already left.
///
/// Without `touched` every field is reported, as on submit.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidationRequest {
    pub draft: RegistrationRequest,
    pub touched: Option<Vec<FormField>>,
}

/// One field message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FieldErrorResponse {
    pub field: FormField,
    #[schema(example = "DNI requerido")]
    pub message: String,
}

/// Result of a validation pass.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResponse {
    /// Whether the whole draft would pass submit-time validation.
    pub valid: bool,
    /// Messages for the reported fields, in form order.
    pub field_errors: Vec<FieldErrorResponse>,
}

/// Successful registration.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResponse {
    /// Confirmation page to navigate to.
    #[schema(example = "/registro-exitoso?nombre=Juan")]
    pub location: String,
    pub first_name: String,
    /// The volunteer was already registered.
    pub duplicate: bool,
}

fn field_error_list(errors: &FieldErrors) -> Vec<FieldErrorResponse> {
    errors
        .iter()
        .map(|(field, message)| FieldErrorResponse {
            field,
            message: message.to_owned(),
        })
        .collect()
}

fn fields_value(errors: &FieldErrors) -> Value {
    json!(field_error_list(errors))
}

fn validation_error(errors: &FieldErrors) -> Error {
    Error::invalid_request(INVALID_FIELDS_MESSAGE).with_details(json!({
        "fields": fields_value(errors),
    }))
}

/// CAPTCHA trouble and anything pinned to a field is the user's to fix.
fn failure_error(failure: &SubmissionFailure) -> Error {
    let message = failure.message();
    let error = match failure.reason {
        FailureReason::CaptchaRejected | FailureReason::CaptchaUnavailable => {
            Error::invalid_request(message)
        }
        _ if !failure.field_errors.is_empty() => Error::invalid_request(message),
        FailureReason::Network => Error::service_unavailable(message),
        FailureReason::Rejected | FailureReason::Unexpected => Error::upstream_rejected(message),
    };
    error.with_details(json!({
        "reason": failure.reason,
        "banner": failure.banner,
        "fields": fields_value(&failure.field_errors),
    }))
}

/// Validate a draft without submitting it.
#[utoipa::path(
    post,
    path = "/api/v1/registrations/validate",
    request_body = ValidationRequest,
    responses(
        (status = 200, description = "Validation report", body = ValidationResponse),
        (status = 400, description = "Malformed draft", body = Error)
    ),
    tags = ["registrations"],
    operation_id = "validateRegistration"
)]
#[post("/registrations/validate")]
pub async fn validate_registration(
    state: web::Data<HttpState>,
    payload: web::Json<ValidationRequest>,
) -> ApiResult<HttpResponse> {
    let ValidationRequest { draft, touched } = payload.into_inner();
    let mut form = state.form().with_draft(RegistrationDraft::try_from(draft)?);

    let reported = match touched {
        Some(fields) => {
            for field in fields {
                form.blur(field);
            }
            form.errors().clone()
        }
        None => form.validate_all(),
    };
    let valid = validate(form.draft(), &form.context()).is_empty();
    debug!(valid, reported = reported.len(), "draft validated");

    Ok(HttpResponse::Ok().json(ValidationResponse {
        valid,
        field_errors: field_error_list(&reported),
    }))
}

fn already_in_flight() -> Error {
    Error::conflict(IN_FLIGHT_MESSAGE)
}

/// Verify the CAPTCHA and register the volunteer.
#[utoipa::path(
    post,
    path = "/api/v1/registrations",
    request_body = RegistrationRequest,
    responses(
        (
            status = 201,
            description = "Registered, or already registered",
            headers(("Location" = String, description = "Confirmation page")),
            body = RegistrationResponse
        ),
        (status = 400, description = "Field or CAPTCHA errors", body = Error),
        (status = 409, description = "Same national ID already being submitted", body = Error),
        (status = 502, description = "Registration declined by the API", body = Error),
        (status = 503, description = "Registration API unreachable", body = Error)
    ),
    tags = ["registrations"],
    operation_id = "submitRegistration"
)]
#[post("/registrations")]
pub async fn submit_registration(
    state: web::Data<HttpState>,
    payload: web::Json<RegistrationRequest>,
) -> ApiResult<HttpResponse> {
    let draft = RegistrationDraft::try_from(payload.into_inner())?;
    let Some(_claim) = state.in_flight.claim(&draft.national_id) else {
        debug!("registration for this national ID already in flight");
        return Err(already_in_flight());
    };
    let submission = state.submission(draft);

    match submission.submit().await {
        SubmitOutcome::Registered(confirmation) => {
            let location = confirmation.location();
            Ok(HttpResponse::Created()
                .insert_header((header::LOCATION, location.clone()))
                .json(RegistrationResponse {
                    location,
                    first_name: confirmation.first_name,
                    duplicate: confirmation.duplicate,
                }))
        }
        SubmitOutcome::Invalid(errors) => Err(validation_error(&errors)),
        SubmitOutcome::Failed(failure) => Err(failure_error(&failure)),
        SubmitOutcome::AlreadyInFlight => Err(already_in_flight()),
    }
}

#[cfg(test)]
mod tests;
