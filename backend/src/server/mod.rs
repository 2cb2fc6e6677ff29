//! Server construction and middleware wiring.

mod config;

pub use config::ServerConfig;

use std::sync::Arc;
use std::time::Duration;

use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};
use mockable::DefaultClock;
use tracing::info;

use fiscal_registration::RequestId;
#[cfg(debug_assertions)]
use fiscal_registration::doc::ApiDoc;
use fiscal_registration::domain::ports::{
    CaptchaVerifier, FixtureCaptchaVerifier, FixtureRegistrationApi, RegistrationApi,
};
use fiscal_registration::inbound::http::health::{HealthState, live, ready};
use fiscal_registration::inbound::http::localities::{list_localities, list_neighbourhoods};
use fiscal_registration::inbound::http::registrations::{
    submit_registration, validate_registration,
};
use fiscal_registration::inbound::http::state::{HttpState, HttpStatePorts};
use fiscal_registration::outbound::captcha::RecaptchaHttpVerifier;
use fiscal_registration::outbound::registration::HttpRegistrationApi;
use fiscal_registration::settings::{RegistrationSettings, SettingsError};
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

/// Errors raised while assembling the HTTP state.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

fn build_ports(
    settings: &RegistrationSettings,
    timeout: Duration,
) -> Result<HttpStatePorts, StartupError> {
    if settings.is_fixture_mode() {
        info!("serving with fixture CAPTCHA verifier and registration API");
        return Ok(HttpStatePorts {
            captcha: Arc::new(FixtureCaptchaVerifier::accepting()),
            registration: Arc::new(FixtureRegistrationApi::default()),
        });
    }

    let captcha: Arc<dyn CaptchaVerifier> = Arc::new(RecaptchaHttpVerifier::new(
        settings.captcha_verify_url()?,
        settings.captcha_secret()?,
        timeout,
    )?);
    let registration: Arc<dyn RegistrationApi> = Arc::new(HttpRegistrationApi::new(
        settings.registration_api_url()?,
        timeout,
    )?);
    Ok(HttpStatePorts {
        captcha,
        registration,
    })
}

/// Build the handler state from settings.
///
/// # Errors
/// Fails when a required setting is missing or malformed, the catalogue file
/// cannot be loaded, or an HTTP client cannot be constructed.
pub fn build_http_state(settings: &RegistrationSettings) -> Result<HttpState, StartupError> {
    let timeout = settings.http_timeout()?;
    let ports = build_ports(settings, timeout)?;
    let catalogue = settings.catalogue()?;
    info!(
        localities = catalogue.localities().len(),
        "locality catalogue loaded"
    );
    Ok(
        HttpState::new(ports, Arc::new(catalogue), Arc::new(DefaultClock))
            .with_reference_date(settings.reference_date()?),
    )
}

fn build_app(
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let api = web::scope("/api/v1")
        .service(list_localities)
        .service(list_neighbourhoods)
        .service(validate_registration)
        .service(submit_registration);

    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .wrap(RequestId)
        .service(api)
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    app
}

/// Construct an Actix HTTP server and mark it ready once bound.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let server_health_state = health_state.clone();
    let ServerConfig {
        bind_addr,
        http_state,
    } = config;
    let http_state = web::Data::from(http_state);

    let server = HttpServer::new(move || build_app(server_health_state.clone(), http_state.clone()))
        .bind(bind_addr)?
        .run();

    health_state.mark_ready();
    Ok(server)
}
