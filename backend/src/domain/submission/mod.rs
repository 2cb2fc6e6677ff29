//! Submission state machine for a registration form session.
//!
//! ```text
//! Idle ──submit──▶ Validating ──▶ VerifyingCaptcha ──▶ Submitting ──▶ Success
//!  ▲                   │                 │                  │
//!  └──── invalid ──────┘                 └────── Failed ◀───┘
//! ```
//!
//! `Failed` returns to `Idle` when the user acknowledges the banner, or moves
//! straight to `Validating` on the next submit. Only one submission can be in
//! flight per session.

mod policy;

pub use policy::DuplicateRegistrationPolicy;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use serde::Serialize;
use tracing::{info, warn};
use url::form_urlencoded;
use utoipa::ToSchema;

use crate::domain::draft::{CaptchaToken, FieldUpdate, FormField, RegistrationDraft};
use crate::domain::form::{CAPTCHA_REQUIRED_MESSAGE, RegistrationForm};
use crate::domain::payload::{PayloadError, RegistrationPayload};
use crate::domain::ports::{
    CaptchaVerifier, RegistrationApi, RegistrationApiError, RegistrationReceipt,
};
use crate::domain::validation::FieldErrors;

/// Seconds a failure banner stays visible.
pub const BANNER_TTL_SECONDS: i64 = 8;

pub const CAPTCHA_REJECTED_MESSAGE: &str =
    "Verificación del captcha falló. Por favor, inténtalo de nuevo.";
pub const CAPTCHA_UNAVAILABLE_MESSAGE: &str =
    "Error en la verificación del captcha. Por favor, inténtalo de nuevo.";
pub const NETWORK_FAILURE_MESSAGE: &str =
    "Error de conexión. Verifica tu internet e inténtalo de nuevo.";
pub const UNKNOWN_REJECTION_MESSAGE: &str = "Error desconocido al registrar fiscal";
pub const GENERIC_FAILURE_MESSAGE: &str =
    "Error al enviar el formulario. Por favor, inténtalo de nuevo.";

/// Path of the confirmation page.
pub const SUCCESS_PATH: &str = "/registro-exitoso";

/// Lifecycle of one submission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum SubmissionState {
    Idle,
    Validating,
    VerifyingCaptcha,
    Submitting,
    Success,
    Failed,
}

impl SubmissionState {
    /// Whether a submission is currently running.
    pub const fn is_in_flight(self) -> bool {
        matches!(
            self,
            Self::Validating | Self::VerifyingCaptcha | Self::Submitting
        )
    }
}

/// Successful registration, including tolerated duplicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub first_name: String,
    /// The API reported an existing registration.
    pub duplicate: bool,
}

impl Confirmation {
    /// Confirmation page URL carrying the volunteer's first name.
    pub fn location(&self) -> String {
        let query: String = form_urlencoded::Serializer::new(String::new())
            .append_pair("nombre", &self.first_name)
            .finish();
        format!("{SUCCESS_PATH}?{query}")
    }
}

/// Why a submission ended in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum FailureReason {
    /// The CAPTCHA service rejected the token.
    CaptchaRejected,
    /// The CAPTCHA service could not be asked.
    CaptchaUnavailable,
    /// The registration API could not be reached.
    Network,
    /// The registration API declined the registration.
    Rejected,
    /// The registration API answered with something unusable.
    Unexpected,
}

/// User-facing description of a failed submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionFailure {
    pub reason: FailureReason,
    /// Banner text, when the failure raises one.
    pub banner: Option<String>,
    /// Field messages set by the failure.
    pub field_errors: FieldErrors,
}

impl SubmissionFailure {
    /// The most specific message available.
    pub fn message(&self) -> &str {
        self.banner
            .as_deref()
            .or_else(|| self.field_errors.iter().next().map(|(_, message)| message))
            .unwrap_or(GENERIC_FAILURE_MESSAGE)
    }
}

/// Result of [`RegistrationSubmission::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Registered(Confirmation),
    /// Validation failed; no network call was made.
    Invalid(FieldErrors),
    Failed(SubmissionFailure),
    /// Another submission is still running; nothing changed.
    AlreadyInFlight,
}

/// Auto-expiring failure banner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub message: String,
    pub expires_at: DateTime<Utc>,
}

struct Inner {
    form: RegistrationForm,
    state: SubmissionState,
    banner: Option<Banner>,
}

/// One registration session: the form plus its submission state machine.
pub struct RegistrationSubmission<C: ?Sized, R: ?Sized> {
    captcha: Arc<C>,
    registration: Arc<R>,
    clock: Arc<dyn Clock>,
    policy: DuplicateRegistrationPolicy,
    inner: Mutex<Inner>,
}

impl<C, R> RegistrationSubmission<C, R>
where
    C: CaptchaVerifier + ?Sized,
    R: RegistrationApi + ?Sized,
{
    pub fn new(
        form: RegistrationForm,
        captcha: Arc<C>,
        registration: Arc<R>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            captcha,
            registration,
            clock,
            policy: DuplicateRegistrationPolicy::default(),
            inner: Mutex::new(Inner {
                form,
                state: SubmissionState::Idle,
                banner: None,
            }),
        }
    }

    /// Replace the duplicate-registration policy.
    pub fn with_policy(mut self, policy: DuplicateRegistrationPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> SubmissionState {
        self.lock().state
    }

    /// Whether the submit action is enabled.
    pub fn can_submit(&self) -> bool {
        !self.lock().state.is_in_flight()
    }

    /// Snapshot of the current draft.
    pub fn draft(&self) -> RegistrationDraft {
        self.lock().form.draft().clone()
    }

    /// Errors currently shown on the form.
    pub fn errors(&self) -> FieldErrors {
        self.lock().form.errors().clone()
    }

    /// Run `f` against the form session.
    pub fn edit<T>(&self, f: impl FnOnce(&mut RegistrationForm) -> T) -> T {
        f(&mut self.lock().form)
    }

    pub fn change(&self, update: FieldUpdate) {
        self.edit(|form| form.change(update));
    }

    pub fn blur(&self, field: FormField) {
        self.edit(|form| form.blur(field));
    }

    /// Visible banner, dropping it once it has expired.
    pub fn banner(&self) -> Option<Banner> {
        let now = self.clock.utc();
        let mut inner = self.lock();
        if inner
            .banner
            .as_ref()
            .is_some_and(|banner| banner.expires_at <= now)
        {
            inner.banner = None;
        }
        inner.banner.clone()
    }

    /// Dismiss a failure and return to `Idle`.
    pub fn acknowledge_failure(&self) {
        let mut inner = self.lock();
        if inner.state == SubmissionState::Failed {
            inner.state = SubmissionState::Idle;
            inner.banner = None;
        }
    }

    /// Validate, verify the CAPTCHA and submit the registration.
    pub async fn submit(&self) -> SubmitOutcome {
        let (token, snapshot) = match self.begin() {
            Ok(started) => started,
            Err(outcome) => return outcome,
        };

        match self.captcha.verify(&token).await {
            Ok(true) => {}
            Ok(false) => {
                info!("captcha token rejected");
                return self.fail_on_captcha(FailureReason::CaptchaRejected, CAPTCHA_REJECTED_MESSAGE);
            }
            Err(error) => {
                warn!(error = %error, "captcha verification failed");
                return self.fail_on_captcha(
                    FailureReason::CaptchaUnavailable,
                    CAPTCHA_UNAVAILABLE_MESSAGE,
                );
            }
        }

        let payload = match self.prepare(&snapshot) {
            Ok(payload) => payload,
            Err(outcome) => return outcome,
        };
        let result = self.registration.register(&payload).await;
        self.finish(&payload, result)
    }

    /// `Idle/Failed/Success → Validating → VerifyingCaptcha`.
    fn begin(&self) -> Result<(CaptchaToken, RegistrationDraft), SubmitOutcome> {
        let mut inner = self.lock();
        if inner.state.is_in_flight() {
            return Err(SubmitOutcome::AlreadyInFlight);
        }
        inner.state = SubmissionState::Validating;
        inner.banner = None;

        let errors = inner.form.validate_all();
        if !errors.is_empty() {
            inner.state = SubmissionState::Idle;
            info!(invalid_fields = errors.len(), "submission blocked by validation");
            return Err(SubmitOutcome::Invalid(errors));
        }

        let Ok(token) = CaptchaToken::new(inner.form.draft().captcha_token.as_str()) else {
            inner.form.set_error(FormField::Captcha, CAPTCHA_REQUIRED_MESSAGE);
            inner.state = SubmissionState::Idle;
            return Err(SubmitOutcome::Invalid(inner.form.errors().clone()));
        };
        inner.state = SubmissionState::VerifyingCaptcha;
        Ok((token, inner.form.draft().clone()))
    }

    /// `VerifyingCaptcha → Submitting`.
    fn prepare(&self, snapshot: &RegistrationDraft) -> Result<RegistrationPayload, SubmitOutcome> {
        let mut inner = self.lock();
        let built = RegistrationPayload::from_draft(snapshot, &inner.form.context());
        match built {
            Ok(payload) => {
                inner.state = SubmissionState::Submitting;
                Ok(payload)
            }
            Err(PayloadError::InvalidDraft(errors)) => {
                for (field, message) in errors.iter() {
                    inner.form.set_error(field, message);
                }
                inner.state = SubmissionState::Idle;
                Err(SubmitOutcome::Invalid(errors))
            }
        }
    }

    fn finish(
        &self,
        payload: &RegistrationPayload,
        result: Result<RegistrationReceipt, RegistrationApiError>,
    ) -> SubmitOutcome {
        match result {
            Ok(receipt) if receipt.success => self.succeed(payload, false),
            Ok(receipt) => match receipt.message {
                Some(message) if self.policy.is_duplicate(&message) => {
                    info!("duplicate registration treated as success");
                    self.succeed(payload, true)
                }
                Some(message) => self.fail_on_rejection(message),
                None => self.fail_with_banner(FailureReason::Rejected, UNKNOWN_REJECTION_MESSAGE),
            },
            Err(error) if error.is_network() => {
                warn!(error = %error, "registration API unreachable");
                self.fail_with_banner(FailureReason::Network, NETWORK_FAILURE_MESSAGE)
            }
            Err(error) => {
                warn!(error = %error, "registration API call failed");
                self.fail_with_banner(FailureReason::Unexpected, GENERIC_FAILURE_MESSAGE)
            }
        }
    }

    fn succeed(&self, payload: &RegistrationPayload, duplicate: bool) -> SubmitOutcome {
        let mut inner = self.lock();
        inner.form.reset();
        inner.banner = None;
        inner.state = SubmissionState::Success;
        info!(duplicate, "registration submitted");
        SubmitOutcome::Registered(Confirmation {
            first_name: payload.first_name().to_owned(),
            duplicate,
        })
    }

    fn fail_on_captcha(&self, reason: FailureReason, message: &str) -> SubmitOutcome {
        let mut inner = self.lock();
        inner.form.set_error(FormField::Captcha, message);
        inner.state = SubmissionState::Failed;
        let mut field_errors = FieldErrors::new();
        field_errors.insert(FormField::Captcha, message);
        SubmitOutcome::Failed(SubmissionFailure {
            reason,
            banner: None,
            field_errors,
        })
    }

    /// A declined registration with a message from the API.
    fn fail_on_rejection(&self, message: String) -> SubmitOutcome {
        if !message.to_lowercase().contains("captcha") {
            info!("registration declined");
            return self.fail_with_banner(FailureReason::Rejected, &message);
        }

        info!("registration declined over the captcha");
        let mut field_errors = FieldErrors::new();
        field_errors.insert(FormField::Captcha, CAPTCHA_UNAVAILABLE_MESSAGE);
        let banner = self.raise_banner(GENERIC_FAILURE_MESSAGE, |form| {
            form.set_error(FormField::Captcha, CAPTCHA_UNAVAILABLE_MESSAGE);
        });
        SubmitOutcome::Failed(SubmissionFailure {
            reason: FailureReason::Rejected,
            banner: Some(banner),
            field_errors,
        })
    }

    fn fail_with_banner(&self, reason: FailureReason, message: &str) -> SubmitOutcome {
        let banner = self.raise_banner(message, |_| {});
        SubmitOutcome::Failed(SubmissionFailure {
            reason,
            banner: Some(banner),
            field_errors: FieldErrors::new(),
        })
    }

    /// Enter `Failed` with a banner expiring after [`BANNER_TTL_SECONDS`].
    fn raise_banner(&self, message: &str, update: impl FnOnce(&mut RegistrationForm)) -> String {
        let expires_at = self.clock.utc() + TimeDelta::seconds(BANNER_TTL_SECONDS);
        let mut inner = self.lock();
        update(&mut inner.form);
        inner.state = SubmissionState::Failed;
        inner.banner = Some(Banner {
            message: message.to_owned(),
            expires_at,
        });
        message.to_owned()
    }
}

#[cfg(test)]
mod tests;
