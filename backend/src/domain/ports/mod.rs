//! Driven ports for the external collaborators of the registration flow.

mod macros;
pub(crate) use macros::define_port_error;

mod captcha_verifier;
mod registration_api;

#[cfg(test)]
pub use captcha_verifier::MockCaptchaVerifier;
pub use captcha_verifier::{CaptchaVerifier, CaptchaVerifierError, FixtureCaptchaVerifier};
#[cfg(test)]
pub use registration_api::MockRegistrationApi;
pub use registration_api::{
    FixtureRegistrationApi, RegistrationApi, RegistrationApiError, RegistrationReceipt,
};
