//! Outbound adapters implementing domain ports over HTTP.
//!
//! - **captcha**: reCAPTCHA-compatible `siteverify` client for
//!   `CaptchaVerifier`.
//! - **registration**: JSON client for the remote `RegistrationApi`.
//!
//! Adapters are thin translators between domain types and wire formats. They
//! contain no business logic: classifying a declined registration is the
//! submission state machine's job.

pub mod captcha;
mod http_support;
pub mod registration;
