//! Reqwest-backed `siteverify` adapter.
//!
//! The adapter owns transport details only: form encoding of the secret and
//! token, timeout and HTTP error mapping, and decoding of the verdict.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use tracing::debug;
use zeroize::Zeroizing;

use crate::domain::draft::CaptchaToken;
use crate::domain::ports::{CaptchaVerifier, CaptchaVerifierError};
use crate::outbound::http_support::{is_timeout_status, status_message};

/// `siteverify` response body.
#[derive(Debug, Deserialize)]
struct SiteverifyDto {
    success: bool,
    #[serde(rename = "error-codes", default)]
    error_codes: Vec<String>,
}

/// CAPTCHA verifier posting tokens to a reCAPTCHA-compatible endpoint.
pub struct RecaptchaHttpVerifier {
    client: Client,
    endpoint: Url,
    secret: Zeroizing<String>,
}

impl RecaptchaHttpVerifier {
    /// Build a verifier with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(
        endpoint: Url,
        secret: Zeroizing<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            secret,
        })
    }
}

#[async_trait]
impl CaptchaVerifier for RecaptchaHttpVerifier {
    async fn verify(&self, token: &CaptchaToken) -> Result<bool, CaptchaVerifierError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[("secret", self.secret.as_str()), ("response", token.as_ref())])
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        parse_verdict(body.as_ref())
    }
}

fn parse_verdict(body: &[u8]) -> Result<bool, CaptchaVerifierError> {
    let decoded: SiteverifyDto = serde_json::from_slice(body).map_err(|error| {
        CaptchaVerifierError::decode(format!("invalid siteverify payload: {error}"))
    })?;
    if !decoded.success {
        debug!(error_codes = ?decoded.error_codes, "captcha token rejected by siteverify");
    }
    Ok(decoded.success)
}

fn map_transport_error(error: reqwest::Error) -> CaptchaVerifierError {
    if error.is_timeout() {
        CaptchaVerifierError::timeout(error.to_string())
    } else {
        CaptchaVerifierError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> CaptchaVerifierError {
    let message = status_message(status, body);
    if is_timeout_status(status) {
        CaptchaVerifierError::timeout(message)
    } else {
        CaptchaVerifierError::status(status.as_u16(), message)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for non-network siteverify helpers.

    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(r#"{ "success": true, "challenge_ts": "2025-10-01T12:00:00Z" }"#, true)]
    #[case(r#"{ "success": false, "error-codes": ["timeout-or-duplicate"] }"#, false)]
    fn parses_the_verdict(#[case] body: &str, #[case] expected: bool) {
        assert_eq!(parse_verdict(body.as_bytes()), Ok(expected));
    }

    #[rstest]
    fn rejects_bodies_without_a_verdict() {
        let error = parse_verdict(b"<html>oops</html>").expect_err("decode should fail");
        assert!(matches!(error, CaptchaVerifierError::Decode { .. }));
    }

    #[rstest]
    #[case::gateway_timeout(StatusCode::GATEWAY_TIMEOUT, true)]
    #[case::request_timeout(StatusCode::REQUEST_TIMEOUT, true)]
    #[case::server_error(StatusCode::INTERNAL_SERVER_ERROR, false)]
    #[case::forbidden(StatusCode::FORBIDDEN, false)]
    fn maps_statuses_to_timeout_or_status(#[case] status: StatusCode, #[case] timeout: bool) {
        let error = map_status_error(status, b"");
        if timeout {
            assert!(matches!(error, CaptchaVerifierError::Timeout { .. }));
        } else {
            assert_eq!(
                error,
                CaptchaVerifierError::status(status.as_u16(), format!("status {}", status.as_u16()))
            );
        }
    }

    #[rstest]
    fn builds_with_a_timeout() {
        let endpoint = Url::parse("https://captcha.invalid/siteverify").expect("url");
        let verifier = RecaptchaHttpVerifier::new(
            endpoint,
            Zeroizing::new("secret".to_owned()),
            Duration::from_secs(5),
        );
        assert!(verifier.is_ok());
    }
}
