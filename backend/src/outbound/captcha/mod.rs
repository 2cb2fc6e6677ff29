//! CAPTCHA verification adapters.
//!
//! This module provides a thin HTTP implementation of the `CaptchaVerifier`
//! port for services speaking the reCAPTCHA `siteverify` protocol.

mod recaptcha_http;

pub use recaptcha_http::RecaptchaHttpVerifier;
