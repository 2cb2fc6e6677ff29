//! Test helpers for inbound HTTP components.

use std::sync::Arc;

use crate::domain::LocalityCatalogue;
use crate::domain::ports::{CaptchaVerifier, RegistrationApi};
use crate::domain::test_fixtures::FixtureClock;
use crate::inbound::http::state::{HttpState, HttpStatePorts};

/// State over the built-in catalogue and a clock pinned to the fixture date.
pub fn test_state(
    captcha: Arc<dyn CaptchaVerifier>,
    registration: Arc<dyn RegistrationApi>,
) -> HttpState {
    HttpState::new(
        HttpStatePorts {
            captcha,
            registration,
        },
        Arc::new(LocalityCatalogue::builtin()),
        Arc::new(FixtureClock::new()),
    )
}
