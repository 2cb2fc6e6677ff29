//! Reqwest-backed registration API adapter.
//!
//! Posts the payload as JSON. A declined registration can arrive either as a
//! 2xx `{"success": false, "message": ...}` body or as an error status whose
//! JSON body carries a `message` (with or without `success`); both become a
//! declined [`RegistrationReceipt`] so the submission state machine sees the
//! API's message.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

use crate::domain::payload::RegistrationPayload;
use crate::domain::ports::{RegistrationApi, RegistrationApiError, RegistrationReceipt};
use crate::outbound::http_support::{is_timeout_status, status_message};

/// Registration API client posting to one endpoint.
pub struct HttpRegistrationApi {
    client: Client,
    endpoint: Url,
}

impl HttpRegistrationApi {
    /// Build a client with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl RegistrationApi for HttpRegistrationApi {
    async fn register(
        &self,
        payload: &RegistrationPayload,
    ) -> Result<RegistrationReceipt, RegistrationApiError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .json(payload)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        interpret_response(status, body.as_ref())
    }
}

/// Error-status body; either field may be missing.
#[derive(Debug, Deserialize)]
struct DeclineDto {
    success: Option<bool>,
    message: Option<String>,
}

fn interpret_response(
    status: StatusCode,
    body: &[u8],
) -> Result<RegistrationReceipt, RegistrationApiError> {
    if status.is_success() {
        return parse_receipt(body);
    }
    match serde_json::from_slice::<DeclineDto>(body) {
        Ok(DeclineDto { success, message }) if success.is_some() || message.is_some() => {
            debug!(status = status.as_u16(), "registration declined with JSON body");
            Ok(RegistrationReceipt {
                success: false,
                message: message.filter(|text| !text.trim().is_empty()),
            })
        }
        _ => Err(map_status_error(status, body)),
    }
}

fn parse_receipt(body: &[u8]) -> Result<RegistrationReceipt, RegistrationApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(RegistrationReceipt::accepted());
    }
    serde_json::from_slice(body).map_err(|error| {
        RegistrationApiError::decode(format!("invalid registration receipt: {error}"))
    })
}

fn map_transport_error(error: reqwest::Error) -> RegistrationApiError {
    if error.is_timeout() {
        RegistrationApiError::timeout(error.to_string())
    } else {
        RegistrationApiError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> RegistrationApiError {
    let message = status_message(status, body);
    if is_timeout_status(status) {
        RegistrationApiError::timeout(message)
    } else {
        RegistrationApiError::status(status.as_u16(), message)
    }
}
