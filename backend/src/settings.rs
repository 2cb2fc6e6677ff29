//! Service configuration loaded via OrthoConfig.
//!
//! Values layer CLI flags over `FISCAL_*` environment variables over an
//! optional config file. Everything except the CAPTCHA secret and the
//! registration API URL has a default; those two are only optional in
//! fixture mode, where both collaborators are replaced by in-process
//! fixtures.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;
use url::Url;
use zeroize::Zeroizing;

use crate::domain::validation::default_reference_date;
use crate::domain::{CatalogueError, LocalityCatalogue};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_CAPTCHA_VERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Errors raised while turning settings into runtime values.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("missing required setting {name}")]
    Missing { name: &'static str },
    #[error("invalid URL for {name}='{value}': {source}")]
    InvalidUrl {
        name: &'static str,
        value: String,
        #[source]
        source: url::ParseError,
    },
    #[error("invalid reference date '{value}'; expected YYYY-MM-DD")]
    InvalidDate { value: String },
    #[error("HTTP timeout must be at least one second")]
    ZeroTimeout,
    #[error(transparent)]
    Catalogue(#[from] CatalogueError),
}

/// Runtime settings for the form backend.
#[derive(Clone, Default, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "FISCAL")]
pub struct RegistrationSettings {
    /// Interface to bind.
    pub host: Option<String>,
    /// Port to bind.
    pub port: Option<u16>,
    /// `siteverify` endpoint of the CAPTCHA provider.
    pub captcha_verify_url: Option<String>,
    /// Server-side CAPTCHA secret.
    pub captcha_secret: Option<String>,
    /// Registration API endpoint receiving the payload.
    pub registration_api_url: Option<String>,
    /// Timeout applied to each outbound request.
    pub http_timeout_secs: Option<u64>,
    /// Date on which the minimum age is checked.
    pub reference_date: Option<String>,
    /// JSON locality catalogue replacing the built-in table.
    pub locality_catalogue_path: Option<PathBuf>,
    /// Serve with fixture collaborators instead of the real services.
    #[ortho_config(default = false)]
    pub fixtures: bool,
}

impl fmt::Debug for RegistrationSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("captcha_verify_url", &self.captcha_verify_url)
            .field(
                "captcha_secret",
                &self.captcha_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("registration_api_url", &self.registration_api_url)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("reference_date", &self.reference_date)
            .field("locality_catalogue_path", &self.locality_catalogue_path)
            .field("fixtures", &self.fixtures)
            .finish()
    }
}

fn parse_url(name: &'static str, value: &str) -> Result<Url, SettingsError> {
    Url::parse(value).map_err(|source| SettingsError::InvalidUrl {
        name,
        value: value.to_owned(),
        source,
    })
}

impl RegistrationSettings {
    /// Host and port to bind.
    pub fn bind_addr(&self) -> (String, u16) {
        (
            self.host.clone().unwrap_or_else(|| DEFAULT_HOST.to_owned()),
            self.port.unwrap_or(DEFAULT_PORT),
        )
    }

    /// Whether fixture collaborators are requested.
    pub fn is_fixture_mode(&self) -> bool {
        self.fixtures
    }

    pub fn captcha_verify_url(&self) -> Result<Url, SettingsError> {
        parse_url(
            "captcha_verify_url",
            self.captcha_verify_url
                .as_deref()
                .unwrap_or(DEFAULT_CAPTCHA_VERIFY_URL),
        )
    }

    /// CAPTCHA secret, wiped from memory when dropped.
    pub fn captcha_secret(&self) -> Result<Zeroizing<String>, SettingsError> {
        self.captcha_secret
            .as_deref()
            .map(str::trim)
            .filter(|secret| !secret.is_empty())
            .map(|secret| Zeroizing::new(secret.to_owned()))
            .ok_or(SettingsError::Missing {
                name: "captcha_secret",
            })
    }

    pub fn registration_api_url(&self) -> Result<Url, SettingsError> {
        let value = self
            .registration_api_url
            .as_deref()
            .ok_or(SettingsError::Missing {
                name: "registration_api_url",
            })?;
        parse_url("registration_api_url", value)
    }

    pub fn http_timeout(&self) -> Result<Duration, SettingsError> {
        match self.http_timeout_secs.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS) {
            0 => Err(SettingsError::ZeroTimeout),
            secs => Ok(Duration::from_secs(secs)),
        }
    }

    pub fn reference_date(&self) -> Result<NaiveDate, SettingsError> {
        match self.reference_date.as_deref() {
            None => Ok(default_reference_date()),
            Some(value) => NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
                SettingsError::InvalidDate {
                    value: value.to_owned(),
                }
            }),
        }
    }

    /// Configured catalogue, or the built-in table.
    pub fn catalogue(&self) -> Result<LocalityCatalogue, SettingsError> {
        match &self.locality_catalogue_path {
            Some(path) => Ok(LocalityCatalogue::load(path)?),
            None => Ok(LocalityCatalogue::builtin()),
        }
    }
}
