//! Registration domain: draft, validation rules, form session and the
//! submission state machine.
//!
//! Purpose: hold every rule of the fiscal registration flow independently of
//! HTTP or any UI framework. External collaborators (CAPTCHA service,
//! registration API) are reached only through the traits in [`ports`].
//!
//! Public surface:
//! - Error / ErrorCode — transport-agnostic error payload.
//! - RegistrationDraft, FieldUpdate, FormField — mutable form state.
//! - validate / FieldErrors — pure validation.
//! - RegistrationForm — reactive form session.
//! - RegistrationPayload — immutable data sent to the registration API.
//! - RegistrationSubmission — submission state machine.
//! - LocalityCatalogue — locality → neighbourhood lookup table.

pub mod draft;
pub mod error;
pub mod form;
pub mod locality;
pub mod payload;
pub mod ports;
pub mod submission;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_fixtures;

pub use self::draft::{
    BirthDateInput, CaptchaToken, CountryCode, FieldUpdate, FormField, LocalityChoice,
    NeighbourhoodChoice, PhoneInput, RegistrationDraft, Selection, Sex,
};
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::form::RegistrationForm;
pub use self::locality::{
    CatalogueError, Locality, LocalityCatalogue, LocalityId, Neighbourhood, NeighbourhoodId,
};
pub use self::payload::{PayloadError, RegistrationPayload};
pub use self::submission::{
    Confirmation, DuplicateRegistrationPolicy, FailureReason, RegistrationSubmission,
    SubmissionFailure, SubmissionState, SubmitOutcome,
};
pub use self::validation::{FieldErrors, ValidationContext, validate};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use fiscal_registration::domain::{ApiResult, Error};
///
/// fn lookup() -> ApiResult<()> {
///     Err(Error::not_found("unknown locality"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
