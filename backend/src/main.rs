//! Backend entry-point: loads settings, wires adapters and serves the form API.

mod server;

use actix_web::web;
use color_eyre::eyre::{Context, Result};
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use fiscal_registration::inbound::http::health::HealthState;
use fiscal_registration::settings::RegistrationSettings;
use server::{ServerConfig, build_http_state, create_server};

#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = RegistrationSettings::load_from_iter(std::env::args_os())
        .wrap_err("failed to load settings")?;
    let http_state = build_http_state(&settings).wrap_err("failed to assemble services")?;
    let bind_addr = settings.bind_addr();
    info!(host = %bind_addr.0, port = bind_addr.1, "starting fiscal registration backend");

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(
        health_state.clone(),
        ServerConfig::new(bind_addr, http_state),
    )
    .wrap_err("failed to bind HTTP server")?;
    server.await.wrap_err("HTTP server terminated")?;
    health_state.mark_unhealthy();
    Ok(())
}
