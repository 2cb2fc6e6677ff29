//! Driven port for the remote fiscal registration API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::define_port_error;
use crate::domain::payload::RegistrationPayload;

/// Answer returned by the registration API.
///
/// A `success = false` receipt is not an error: the API understood the
/// request and declined it, usually with a human-readable `message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationReceipt {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RegistrationReceipt {
    pub fn accepted() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn declined(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

define_port_error! {
    /// Errors surfaced while calling the registration API.
    pub enum RegistrationApiError {
        /// The request never produced a response.
        Transport { message: String } =>
            "registration transport failed: {message}",
        /// The call exceeded its deadline.
        Timeout { message: String } =>
            "registration request timed out: {message}",
        /// The API answered with a non-success status and no receipt.
        Status { status: u16, message: String } =>
            "registration API returned status {status}: {message}",
        /// The response body could not be decoded.
        Decode { message: String } =>
            "registration response decode failed: {message}",
    }
}

impl RegistrationApiError {
    /// Whether the failure happened before the API could answer.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Timeout { .. })
    }
}

/// Port for submitting a finalised registration.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RegistrationApi: Send + Sync {
    /// Submit one registration.
    async fn register(
        &self,
        payload: &RegistrationPayload,
    ) -> Result<RegistrationReceipt, RegistrationApiError>;
}

/// Fixture API that returns a fixed receipt.
#[derive(Debug, Clone)]
pub struct FixtureRegistrationApi {
    receipt: RegistrationReceipt,
}

impl FixtureRegistrationApi {
    pub fn new(receipt: RegistrationReceipt) -> Self {
        Self { receipt }
    }
}

impl Default for FixtureRegistrationApi {
    fn default() -> Self {
        Self::new(RegistrationReceipt::accepted())
    }
}

#[async_trait]
impl RegistrationApi for FixtureRegistrationApi {
    async fn register(
        &self,
        _payload: &RegistrationPayload,
    ) -> Result<RegistrationReceipt, RegistrationApiError> {
        Ok(self.receipt.clone())
    }
}
