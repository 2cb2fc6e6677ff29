//! Registration draft: the mutable form state edited field by field.
//!
//! The draft holds raw user input. Nothing here validates; see
//! [`crate::domain::validation`] for the rules and
//! [`crate::domain::form::RegistrationForm`] for the reactive session that
//! decides when they run.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::locality::{LocalityId, NeighbourhoodId};

/// International dialling prefix offered by the form.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema,
)]
pub enum CountryCode {
    /// Argentina, the form default.
    #[default]
    #[serde(rename = "+54")]
    Argentina,
    /// Brazil.
    #[serde(rename = "+55")]
    Brazil,
    /// Chile.
    #[serde(rename = "+56")]
    Chile,
}

impl CountryCode {
    /// Dialling prefix including the leading `+`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Argentina => "+54",
            Self::Brazil => "+55",
            Self::Chile => "+56",
        }
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sex as declared on the national ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Sex {
    /// Declared male.
    #[serde(rename = "masculino")]
    Male,
    /// Declared female.
    #[serde(rename = "femenino")]
    Female,
}

impl Sex {
    /// Single-letter code sent to the registration API.
    pub const fn code(self) -> &'static str {
        match self {
            Self::Male => "M",
            Self::Female => "F",
        }
    }
}

/// Choice from an enumerated list, or free text when the entry is missing.
///
/// Replaces the reserved `999` id used on the wire so "other" can never be
/// confused with a real catalogue entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Selection<T> {
    /// Nothing chosen yet.
    Unset,
    /// An entry from the catalogue.
    Known {
        /// Catalogue identifier.
        id: T,
    },
    /// Not listed; the user describes it.
    Other {
        /// Free-text description typed by the user.
        description: String,
    },
}

impl<T> Default for Selection<T> {
    fn default() -> Self {
        Self::Unset
    }
}

impl<T> Selection<T> {
    /// Select a catalogue entry.
    pub const fn known(id: T) -> Self {
        Self::Known { id }
    }

    /// Select "other" with the given description.
    pub fn other(description: impl Into<String>) -> Self {
        Self::Other {
            description: description.into(),
        }
    }

    /// Whether nothing has been chosen.
    pub const fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    /// Whether the "other" entry is chosen.
    pub const fn is_other(&self) -> bool {
        matches!(self, Self::Other { .. })
    }

    /// Catalogue id when a listed entry is chosen.
    pub const fn known_id(&self) -> Option<&T> {
        match self {
            Self::Known { id } => Some(id),
            _ => None,
        }
    }

    /// Free text when "other" is chosen.
    pub fn other_description(&self) -> Option<&str> {
        match self {
            Self::Other { description } => Some(description.as_str()),
            _ => None,
        }
    }
}

/// Locality selection.
pub type LocalityChoice = Selection<LocalityId>;
/// Neighbourhood selection, scoped to the current locality.
pub type NeighbourhoodChoice = Selection<NeighbourhoodId>;

/// Mobile number split the way the form collects it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneInput {
    /// International prefix.
    pub country_code: CountryCode,
    /// Area code as typed, trunk zero included (e.g. `0351`).
    pub area_code: String,
    /// Local subscriber number.
    pub number: String,
}

/// Birth date as three separately typed values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BirthDateInput {
    /// Day of month.
    pub day: String,
    /// Month number.
    pub month: String,
    /// Four-digit year.
    pub year: String,
}

/// In-progress registration form state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationDraft {
    pub first_name: String,
    pub last_name: String,
    pub national_id: String,
    pub national_id_confirmation: String,
    pub phone: PhoneInput,
    pub phone_confirmation: PhoneInput,
    pub email: String,
    pub birth_date: BirthDateInput,
    pub locality: LocalityChoice,
    pub neighbourhood: NeighbourhoodChoice,
    pub sex: Option<Sex>,
    pub captcha_token: String,
    pub terms_accepted: bool,
}

impl RegistrationDraft {
    /// Empty draft with both country codes set to the default prefix.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a single field edit.
    ///
    /// Free-text updates for "other" entries only take effect while the
    /// matching selection is `Other`; otherwise the text is not applicable
    /// and is dropped.
    pub fn apply(&mut self, update: FieldUpdate) {
        match update {
            FieldUpdate::FirstName(value) => self.first_name = value,
            FieldUpdate::LastName(value) => self.last_name = value,
            FieldUpdate::NationalId(value) => self.national_id = value,
            FieldUpdate::NationalIdConfirmation(value) => self.national_id_confirmation = value,
            FieldUpdate::CountryCode(value) => self.phone.country_code = value,
            FieldUpdate::AreaCode(value) => self.phone.area_code = value,
            FieldUpdate::LocalNumber(value) => self.phone.number = value,
            FieldUpdate::ConfirmCountryCode(value) => self.phone_confirmation.country_code = value,
            FieldUpdate::ConfirmAreaCode(value) => self.phone_confirmation.area_code = value,
            FieldUpdate::ConfirmLocalNumber(value) => self.phone_confirmation.number = value,
            FieldUpdate::Email(value) => self.email = value,
            FieldUpdate::BirthDay(value) => self.birth_date.day = value,
            FieldUpdate::BirthMonth(value) => self.birth_date.month = value,
            FieldUpdate::BirthYear(value) => self.birth_date.year = value,
            FieldUpdate::Locality(value) => self.locality = value,
            FieldUpdate::LocalityOther(value) => {
                if let Selection::Other { description } = &mut self.locality {
                    *description = value;
                }
            }
            FieldUpdate::Neighbourhood(value) => self.neighbourhood = value,
            FieldUpdate::NeighbourhoodOther(value) => {
                if let Selection::Other { description } = &mut self.neighbourhood {
                    *description = value;
                }
            }
            FieldUpdate::Sex(value) => self.sex = value,
            FieldUpdate::Captcha(value) => self.captcha_token = value,
            FieldUpdate::TermsAccepted(value) => self.terms_accepted = value,
        }
    }
}

/// Addressable form fields, in the order the form renders them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "camelCase")]
pub enum FormField {
    LastName,
    FirstName,
    NationalId,
    NationalIdConfirmation,
    CountryCode,
    AreaCode,
    LocalNumber,
    ConfirmCountryCode,
    ConfirmAreaCode,
    ConfirmLocalNumber,
    Email,
    BirthDay,
    BirthMonth,
    BirthYear,
    Locality,
    LocalityOther,
    Neighbourhood,
    NeighbourhoodOther,
    Sex,
    TermsAccepted,
    Captcha,
}

impl FormField {
    /// Every field in render order.
    pub const ALL: [Self; 21] = [
        Self::LastName,
        Self::FirstName,
        Self::NationalId,
        Self::NationalIdConfirmation,
        Self::CountryCode,
        Self::AreaCode,
        Self::LocalNumber,
        Self::ConfirmCountryCode,
        Self::ConfirmAreaCode,
        Self::ConfirmLocalNumber,
        Self::Email,
        Self::BirthDay,
        Self::BirthMonth,
        Self::BirthYear,
        Self::Locality,
        Self::LocalityOther,
        Self::Neighbourhood,
        Self::NeighbourhoodOther,
        Self::Sex,
        Self::TermsAccepted,
        Self::Captcha,
    ];

    /// Wire name used in error payloads.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LastName => "lastName",
            Self::FirstName => "firstName",
            Self::NationalId => "nationalId",
            Self::NationalIdConfirmation => "nationalIdConfirmation",
            Self::CountryCode => "countryCode",
            Self::AreaCode => "areaCode",
            Self::LocalNumber => "localNumber",
            Self::ConfirmCountryCode => "confirmCountryCode",
            Self::ConfirmAreaCode => "confirmAreaCode",
            Self::ConfirmLocalNumber => "confirmLocalNumber",
            Self::Email => "email",
            Self::BirthDay => "birthDay",
            Self::BirthMonth => "birthMonth",
            Self::BirthYear => "birthYear",
            Self::Locality => "locality",
            Self::LocalityOther => "localityOther",
            Self::Neighbourhood => "neighbourhood",
            Self::NeighbourhoodOther => "neighbourhoodOther",
            Self::Sex => "sex",
            Self::TermsAccepted => "termsAccepted",
            Self::Captcha => "captcha",
        }
    }
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single edit coming from the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate {
    FirstName(String),
    LastName(String),
    NationalId(String),
    NationalIdConfirmation(String),
    CountryCode(CountryCode),
    AreaCode(String),
    LocalNumber(String),
    ConfirmCountryCode(CountryCode),
    ConfirmAreaCode(String),
    ConfirmLocalNumber(String),
    Email(String),
    BirthDay(String),
    BirthMonth(String),
    BirthYear(String),
    Locality(LocalityChoice),
    LocalityOther(String),
    Neighbourhood(NeighbourhoodChoice),
    NeighbourhoodOther(String),
    Sex(Option<Sex>),
    Captcha(String),
    TermsAccepted(bool),
}

impl FieldUpdate {
    /// Field targeted by this edit.
    pub const fn field(&self) -> FormField {
        match self {
            Self::FirstName(_) => FormField::FirstName,
            Self::LastName(_) => FormField::LastName,
            Self::NationalId(_) => FormField::NationalId,
            Self::NationalIdConfirmation(_) => FormField::NationalIdConfirmation,
            Self::CountryCode(_) => FormField::CountryCode,
            Self::AreaCode(_) => FormField::AreaCode,
            Self::LocalNumber(_) => FormField::LocalNumber,
            Self::ConfirmCountryCode(_) => FormField::ConfirmCountryCode,
            Self::ConfirmAreaCode(_) => FormField::ConfirmAreaCode,
            Self::ConfirmLocalNumber(_) => FormField::ConfirmLocalNumber,
            Self::Email(_) => FormField::Email,
            Self::BirthDay(_) => FormField::BirthDay,
            Self::BirthMonth(_) => FormField::BirthMonth,
            Self::BirthYear(_) => FormField::BirthYear,
            Self::Locality(_) => FormField::Locality,
            Self::LocalityOther(_) => FormField::LocalityOther,
            Self::Neighbourhood(_) => FormField::Neighbourhood,
            Self::NeighbourhoodOther(_) => FormField::NeighbourhoodOther,
            Self::Sex(_) => FormField::Sex,
            Self::Captcha(_) => FormField::Captcha,
            Self::TermsAccepted(_) => FormField::TermsAccepted,
        }
    }
}

/// Opaque token produced by the CAPTCHA widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptchaToken(String);

/// Validation errors for [`CaptchaToken::new`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaptchaTokenError {
    /// The widget has not produced a token.
    #[error("captcha token must not be empty")]
    Empty,
}

impl CaptchaToken {
    /// Wrap a non-empty widget token.
    pub fn new(token: impl Into<String>) -> Result<Self, CaptchaTokenError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(CaptchaTokenError::Empty);
        }
        Ok(Self(token))
    }
}

impl AsRef<str> for CaptchaToken {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}
