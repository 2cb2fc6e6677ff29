//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports and remain testable without I/O. Every request
//! gets its own [`RegistrationForm`] / [`RegistrationSubmission`]; nothing
//! about a volunteer's draft outlives the request. The only cross-request
//! state is [`InFlightRegistrations`], which keeps two submissions for the
//! same national ID from running at once.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;
use mockable::Clock;

use crate::domain::ports::{CaptchaVerifier, RegistrationApi};
use crate::domain::validation::default_reference_date;
use crate::domain::{
    DuplicateRegistrationPolicy, LocalityCatalogue, RegistrationDraft, RegistrationForm,
    RegistrationSubmission,
};

/// Submission controller as driven by the HTTP adapter.
pub type HttpSubmission = RegistrationSubmission<dyn CaptchaVerifier, dyn RegistrationApi>;

/// National IDs whose registration is currently being submitted.
#[derive(Debug, Default)]
pub struct InFlightRegistrations {
    ids: Mutex<HashSet<String>>,
}

impl InFlightRegistrations {
    fn ids(&self) -> MutexGuard<'_, HashSet<String>> {
        self.ids.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reserve `national_id` until the returned claim is dropped.
    ///
    /// Returns `None` while another claim for the same (trimmed) ID is held.
    /// A blank ID is never reserved; validation rejects it anyway.
    pub fn claim(self: &Arc<Self>, national_id: &str) -> Option<InFlightClaim> {
        let key = national_id.trim();
        if key.is_empty() {
            return Some(InFlightClaim {
                registry: Arc::clone(self),
                national_id: None,
            });
        }
        if !self.ids().insert(key.to_owned()) {
            return None;
        }
        Some(InFlightClaim {
            registry: Arc::clone(self),
            national_id: Some(key.to_owned()),
        })
    }

    /// Whether a submission for `national_id` is running.
    pub fn is_claimed(&self, national_id: &str) -> bool {
        self.ids().contains(national_id.trim())
    }
}

/// Reservation released on drop, including when the request is abandoned.
#[derive(Debug)]
pub struct InFlightClaim {
    registry: Arc<InFlightRegistrations>,
    national_id: Option<String>,
}

impl Drop for InFlightClaim {
    fn drop(&mut self) {
        if let Some(id) = self.national_id.take() {
            self.registry.ids().remove(&id);
        }
    }
}

/// Parameter object bundling the driven ports.
#[derive(Clone)]
pub struct HttpStatePorts {
    pub captcha: Arc<dyn CaptchaVerifier>,
    pub registration: Arc<dyn RegistrationApi>,
}

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub captcha: Arc<dyn CaptchaVerifier>,
    pub registration: Arc<dyn RegistrationApi>,
    pub catalogue: Arc<LocalityCatalogue>,
    pub clock: Arc<dyn Clock>,
    pub reference_date: NaiveDate,
    pub policy: DuplicateRegistrationPolicy,
    pub in_flight: Arc<InFlightRegistrations>,
}

impl HttpState {
    /// Construct state from the ports bundle, a catalogue and a clock.
    ///
    /// # Examples
    /// ```no_run
    /// use std::sync::Arc;
    ///
    /// use fiscal_registration::domain::LocalityCatalogue;
    /// use fiscal_registration::domain::ports::{
    ///     FixtureCaptchaVerifier, FixtureRegistrationApi,
    /// };
    /// use fiscal_registration::inbound::http::state::{HttpState, HttpStatePorts};
    ///
    /// let ports = HttpStatePorts {
    ///     captcha: Arc::new(FixtureCaptchaVerifier::accepting()),
    ///     registration: Arc::new(FixtureRegistrationApi::default()),
    /// };
    /// let state = HttpState::new(
    ///     ports,
    ///     Arc::new(LocalityCatalogue::builtin()),
    ///     Arc::new(mockable::DefaultClock),
    /// );
    /// let _form = state.form();
    /// ```
    pub fn new(
        ports: HttpStatePorts,
        catalogue: Arc<LocalityCatalogue>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let HttpStatePorts {
            captcha,
            registration,
        } = ports;
        Self {
            captcha,
            registration,
            catalogue,
            clock,
            reference_date: default_reference_date(),
            policy: DuplicateRegistrationPolicy::default(),
            in_flight: Arc::new(InFlightRegistrations::default()),
        }
    }

    /// Override the date on which the minimum age is checked.
    #[must_use]
    pub fn with_reference_date(mut self, reference_date: NaiveDate) -> Self {
        self.reference_date = reference_date;
        self
    }

    /// Replace the duplicate-registration policy.
    #[must_use]
    pub fn with_policy(mut self, policy: DuplicateRegistrationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Fresh, empty form session.
    pub fn form(&self) -> RegistrationForm {
        RegistrationForm::new(self.catalogue.clone(), self.clock.clone())
            .with_reference_date(self.reference_date)
    }

    /// Submission controller seeded with `draft`.
    pub fn submission(&self, draft: RegistrationDraft) -> HttpSubmission {
        RegistrationSubmission::new(
            self.form().with_draft(draft),
            self.captcha.clone(),
            self.registration.clone(),
            self.clock.clone(),
        )
        .with_policy(self.policy.clone())
    }
}
