//! Driven port for server-side CAPTCHA token verification.
//!
//! The submission flow only needs a yes/no answer; everything about the
//! verification service (secret, endpoint, response shape) stays in the
//! adapter.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::draft::CaptchaToken;

define_port_error! {
    /// Errors surfaced while verifying a CAPTCHA token.
    pub enum CaptchaVerifierError {
        /// The request never produced a response.
        Transport { message: String } =>
            "captcha verification transport failed: {message}",
        /// The verification call exceeded its deadline.
        Timeout { message: String } =>
            "captcha verification timed out: {message}",
        /// The service answered with a non-success status.
        Status { status: u16, message: String } =>
            "captcha verification returned status {status}: {message}",
        /// The service response could not be decoded.
        Decode { message: String } =>
            "captcha verification response decode failed: {message}",
    }
}

/// Port for checking a CAPTCHA widget token with the issuing service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CaptchaVerifier: Send + Sync {
    /// Return whether the service accepts `token`.
    ///
    /// `Ok(false)` means the service answered and rejected the token; any
    /// `Err` means no answer was obtained.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// use fiscal_registration::domain::draft::CaptchaToken;
    /// use fiscal_registration::domain::ports::{CaptchaVerifier, FixtureCaptchaVerifier};
    ///
    /// let verifier = FixtureCaptchaVerifier::accepting();
    /// let token = CaptchaToken::new("token")?;
    /// assert!(verifier.verify(&token).await?);
    /// ```
    async fn verify(&self, token: &CaptchaToken) -> Result<bool, CaptchaVerifierError>;
}

/// Fixture verifier with a fixed verdict.
#[derive(Debug, Clone, Copy)]
pub struct FixtureCaptchaVerifier {
    accept: bool,
}

impl FixtureCaptchaVerifier {
    pub const fn accepting() -> Self {
        Self { accept: true }
    }

    pub const fn rejecting() -> Self {
        Self { accept: false }
    }
}

impl Default for FixtureCaptchaVerifier {
    fn default() -> Self {
        Self::accepting()
    }
}

#[async_trait]
impl CaptchaVerifier for FixtureCaptchaVerifier {
    async fn verify(&self, _token: &CaptchaToken) -> Result<bool, CaptchaVerifierError> {
        Ok(self.accept)
    }
}
