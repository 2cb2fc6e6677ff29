//! Reactive form session around a [`RegistrationDraft`].
//!
//! Validation is triggered by user events rather than run continuously:
//!
//! - `blur(field)` marks a field as touched and validates it for the first
//!   time;
//! - `change(update)` applies an edit and re-validates the edited field and
//!   every field whose rule depends on it, but only once those fields have
//!   been touched;
//! - `validate_all()` is the submit-time pass over every field.
//!
//! Cross-field dependencies are declared in [`WATCHERS`], an explicit
//! subscription table from observed fields to the fields whose errors must be
//! recomputed.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;
use mockable::Clock;
use tracing::debug;

use crate::domain::draft::{FieldUpdate, FormField, RegistrationDraft, Selection};
use crate::domain::locality::LocalityCatalogue;
use crate::domain::validation::{
    FieldErrors, ValidationContext, default_reference_date, validate,
};

/// Message shown when the CAPTCHA token is missing or has expired.
pub const CAPTCHA_REQUIRED_MESSAGE: &str = "Debe completar el captcha";
/// Message shown when the CAPTCHA widget fails to load.
pub const CAPTCHA_LOAD_FAILED_MESSAGE: &str =
    "Error al cargar el captcha. Por favor, recarga la página.";

/// One entry of the field subscription table.
#[derive(Debug, Clone, Copy)]
pub struct Watcher {
    /// Edits to any of these fields trigger the watcher.
    pub observes: &'static [FormField],
    /// Fields whose errors are recomputed when it fires.
    pub recomputes: &'static [FormField],
}

const NATIONAL_ID_PAIR: &[FormField] = &[FormField::NationalId, FormField::NationalIdConfirmation];
const COUNTRY_CODE_PAIR: &[FormField] = &[FormField::CountryCode, FormField::ConfirmCountryCode];
const AREA_CODE_PAIR: &[FormField] = &[FormField::AreaCode, FormField::ConfirmAreaCode];
const LOCAL_NUMBER_PAIR: &[FormField] = &[FormField::LocalNumber, FormField::ConfirmLocalNumber];
const BIRTH_DATE: &[FormField] = &[
    FormField::BirthDay,
    FormField::BirthMonth,
    FormField::BirthYear,
];
const PLACE: &[FormField] = &[
    FormField::Locality,
    FormField::LocalityOther,
    FormField::Neighbourhood,
    FormField::NeighbourhoodOther,
];

/// Cross-field subscriptions.
pub const WATCHERS: &[Watcher] = &[
    Watcher {
        observes: NATIONAL_ID_PAIR,
        recomputes: NATIONAL_ID_PAIR,
    },
    Watcher {
        observes: COUNTRY_CODE_PAIR,
        recomputes: COUNTRY_CODE_PAIR,
    },
    Watcher {
        observes: AREA_CODE_PAIR,
        recomputes: AREA_CODE_PAIR,
    },
    Watcher {
        observes: LOCAL_NUMBER_PAIR,
        recomputes: LOCAL_NUMBER_PAIR,
    },
    Watcher {
        observes: BIRTH_DATE,
        recomputes: BIRTH_DATE,
    },
    Watcher {
        observes: PLACE,
        recomputes: PLACE,
    },
];

/// Fields whose errors depend on `field`, including `field` itself.
pub fn dependents_of(field: FormField) -> BTreeSet<FormField> {
    let mut fields = BTreeSet::from([field]);
    for watcher in WATCHERS {
        if watcher.observes.contains(&field) {
            fields.extend(watcher.recomputes.iter().copied());
        }
    }
    fields
}

/// Form session state: the draft, the touched set and the visible errors.
#[derive(Clone)]
pub struct RegistrationForm {
    draft: RegistrationDraft,
    touched: BTreeSet<FormField>,
    errors: FieldErrors,
    catalogue: Arc<LocalityCatalogue>,
    clock: Arc<dyn Clock>,
    reference_date: NaiveDate,
}

impl RegistrationForm {
    /// Start an empty session.
    pub fn new(catalogue: Arc<LocalityCatalogue>, clock: Arc<dyn Clock>) -> Self {
        Self {
            draft: RegistrationDraft::new(),
            touched: BTreeSet::new(),
            errors: FieldErrors::new(),
            catalogue,
            clock,
            reference_date: default_reference_date(),
        }
    }

    /// Replace the draft, e.g. with one posted by a client.
    ///
    /// Nothing is touched and no errors are shown until the next event.
    pub fn with_draft(mut self, draft: RegistrationDraft) -> Self {
        self.draft = draft;
        self.touched.clear();
        self.errors = FieldErrors::new();
        self
    }

    /// Override the date on which the minimum age is checked.
    pub fn with_reference_date(mut self, reference_date: NaiveDate) -> Self {
        self.reference_date = reference_date;
        self
    }

    pub fn draft(&self) -> &RegistrationDraft {
        &self.draft
    }

    pub fn catalogue(&self) -> &LocalityCatalogue {
        &self.catalogue
    }

    /// Errors currently shown.
    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn error(&self, field: FormField) -> Option<&str> {
        self.errors.get(field)
    }

    pub fn is_touched(&self, field: FormField) -> bool {
        self.touched.contains(&field)
    }

    /// Validation inputs as of now.
    pub fn context(&self) -> ValidationContext<'_> {
        ValidationContext {
            catalogue: &self.catalogue,
            reference_date: self.reference_date,
            today: self.clock.local().date_naive(),
        }
    }

    /// Apply an edit and re-validate the touched fields that depend on it.
    pub fn change(&mut self, update: FieldUpdate) {
        let field = update.field();
        self.draft.apply(update);
        if field == FormField::Locality {
            self.reconcile_neighbourhood();
        }
        debug!(field = %field, "form field changed");
        self.refresh(dependents_of(field));
    }

    /// Mark a field as touched and validate it.
    pub fn blur(&mut self, field: FormField) {
        self.touched.insert(field);
        self.refresh([field]);
    }

    /// Touch every field and show the full report.
    pub fn validate_all(&mut self) -> FieldErrors {
        self.touched.extend(FormField::ALL);
        self.errors = validate(&self.draft, &self.context());
        self.errors.clone()
    }

    /// Return to an empty draft with nothing touched.
    pub fn reset(&mut self) {
        self.draft = RegistrationDraft::new();
        self.touched.clear();
        self.errors = FieldErrors::new();
    }

    /// Show a message on `field` regardless of the rules.
    pub fn set_error(&mut self, field: FormField, message: impl Into<String>) {
        self.errors.insert(field, message);
    }

    pub fn clear_error(&mut self, field: FormField) {
        self.errors.remove(field);
    }

    /// The CAPTCHA widget produced a token.
    pub fn captcha_solved(&mut self, token: impl Into<String>) {
        self.draft.apply(FieldUpdate::Captcha(token.into()));
        self.errors.remove(FormField::Captcha);
    }

    /// The CAPTCHA token expired before submission.
    pub fn captcha_expired(&mut self) {
        self.draft.apply(FieldUpdate::Captcha(String::new()));
        self.errors.insert(FormField::Captcha, CAPTCHA_REQUIRED_MESSAGE);
    }

    /// The CAPTCHA widget failed to load.
    pub fn captcha_errored(&mut self) {
        self.errors
            .insert(FormField::Captcha, CAPTCHA_LOAD_FAILED_MESSAGE);
    }

    /// Accept the terms from the terms dialog.
    pub fn accept_terms(&mut self) {
        self.change(FieldUpdate::TermsAccepted(true));
    }

    fn refresh(&mut self, fields: impl IntoIterator<Item = FormField>) {
        let report = validate(&self.draft, &self.context());
        for field in fields {
            match report.get(field) {
                Some(message) if self.touched.contains(&field) => {
                    self.errors.insert(field, message);
                }
                Some(_) => {}
                None => {
                    self.errors.remove(field);
                }
            }
        }
    }

    /// Drop a neighbourhood choice that no longer fits the locality.
    fn reconcile_neighbourhood(&mut self) {
        let keep = match &self.draft.neighbourhood {
            Selection::Unset => true,
            Selection::Known { id } => self
                .draft
                .locality
                .known_id()
                .is_some_and(|locality| self.catalogue.contains_neighbourhood(*locality, *id)),
            Selection::Other { .. } => self.catalogue.requires_neighbourhood(&self.draft.locality),
        };
        if !keep {
            debug!("neighbourhood cleared after locality change");
            self.draft.neighbourhood = Selection::Unset;
        }
    }
}
