//! Field and cross-field validation rules for a [`RegistrationDraft`].
//!
//! [`validate`] is pure: the caller supplies "today" and the reference date
//! through [`ValidationContext`], so the same draft always yields the same
//! report.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::Serialize;

use crate::domain::draft::{BirthDateInput, FormField, RegistrationDraft, Selection};
use crate::domain::locality::LocalityCatalogue;

/// Minimum age, in whole years, on the reference date.
pub const MINIMUM_AGE: i32 = 18;

const NAME_MIN_CHARS: usize = 2;
const NAME_MAX_CHARS: usize = 50;
const EMAIL_MAX_CHARS: usize = 100;

/// Election-day reference date used for the age check.
pub fn default_reference_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 10, 26).unwrap_or(NaiveDate::MIN)
}

/// Inputs that are not part of the draft but affect its validity.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    /// Locality table used for the neighbourhood rules.
    pub catalogue: &'a LocalityCatalogue,
    /// Date on which the minimum age must be reached.
    pub reference_date: NaiveDate,
    /// Current date; birth dates after it are rejected.
    pub today: NaiveDate,
}

/// Failing fields mapped to a single user-facing message each.
///
/// Iteration follows form order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<FormField, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: FormField) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn contains(&self, field: FormField) -> bool {
        self.0.contains_key(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Set or replace the message for `field`.
    pub fn insert(&mut self, field: FormField, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }

    pub fn remove(&mut self, field: FormField) -> Option<String> {
        self.0.remove(&field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (FormField, &str)> {
        self.0.iter().map(|(field, message)| (*field, message.as_str()))
    }

    /// Fields with errors, in form order.
    pub fn fields(&self) -> impl Iterator<Item = FormField> + '_ {
        self.0.keys().copied()
    }
}

/// Validate every field of `draft`.
pub fn validate(draft: &RegistrationDraft, ctx: &ValidationContext<'_>) -> FieldErrors {
    let mut errors = FieldErrors::new();
    check_names(draft, &mut errors);
    check_national_id(draft, &mut errors);
    check_phone(draft, &mut errors);
    check_email(&draft.email, &mut errors);
    if let Err(error) = check_birth_date(&draft.birth_date, ctx) {
        errors.insert(error.field(), error.message());
    }
    check_places(draft, ctx.catalogue, &mut errors);

    if draft.sex.is_none() {
        errors.insert(FormField::Sex, "Sexo requerido");
    }
    if !draft.terms_accepted {
        errors.insert(FormField::TermsAccepted, "Debe aceptar los términos y condiciones");
    }
    if draft.captcha_token.trim().is_empty() {
        errors.insert(FormField::Captcha, "Debe completar el captcha");
    }
    errors
}

fn check_names(draft: &RegistrationDraft, errors: &mut FieldErrors) {
    if let Some(message) = name_error(&draft.first_name, "El nombre") {
        errors.insert(FormField::FirstName, message);
    }
    if let Some(message) = name_error(&draft.last_name, "El apellido") {
        errors.insert(FormField::LastName, message);
    }
}

fn name_error(value: &str, label: &str) -> Option<String> {
    let length = value.trim().chars().count();
    if length < NAME_MIN_CHARS {
        Some(format!("{label} debe tener al menos {NAME_MIN_CHARS} caracteres"))
    } else if length > NAME_MAX_CHARS {
        Some(format!("{label} debe tener como máximo {NAME_MAX_CHARS} caracteres"))
    } else {
        None
    }
}

fn is_digits(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|byte| byte.is_ascii_digit())
}

fn national_id_error(value: &str) -> Option<&'static str> {
    let value = value.trim();
    if value.is_empty() {
        Some("DNI requerido")
    } else if !is_digits(value) {
        Some("El DNI solo puede contener números")
    } else if value.len() < 7 {
        Some("DNI debe tener al menos 7 dígitos")
    } else if value.len() > 8 {
        Some("DNI debe tener máximo 8 dígitos")
    } else {
        None
    }
}

fn check_national_id(draft: &RegistrationDraft, errors: &mut FieldErrors) {
    let primary = national_id_error(&draft.national_id);
    let confirmation = national_id_error(&draft.national_id_confirmation);
    if let Some(message) = primary {
        errors.insert(FormField::NationalId, message);
    }
    if let Some(message) = confirmation {
        errors.insert(FormField::NationalIdConfirmation, message);
    }
    if primary.is_none()
        && confirmation.is_none()
        && draft.national_id.trim() != draft.national_id_confirmation.trim()
    {
        errors.insert(FormField::NationalId, "Los DNI no coinciden");
        errors.insert(FormField::NationalIdConfirmation, "Los DNI no coinciden");
    }
}

fn area_code_error(value: &str) -> Option<&'static str> {
    let value = value.trim();
    if value.is_empty() {
        Some("Código de área requerido")
    } else if !is_digits(value) || !(2..=4).contains(&value.len()) {
        Some("Código de área inválido")
    } else {
        None
    }
}

fn local_number_error(value: &str) -> Option<&'static str> {
    let value = value.trim();
    if value.is_empty() {
        Some("Número de celular requerido")
    } else if !is_digits(value) || !(6..=10).contains(&value.len()) {
        Some("Número de celular inválido")
    } else {
        None
    }
}

fn check_phone(draft: &RegistrationDraft, errors: &mut FieldErrors) {
    let primary = &draft.phone;
    let confirmation = &draft.phone_confirmation;

    if confirmation.country_code != primary.country_code {
        errors.insert(
            FormField::ConfirmCountryCode,
            "Los códigos de país no coinciden",
        );
    }

    let pairs = [
        (
            FormField::AreaCode,
            FormField::ConfirmAreaCode,
            primary.area_code.trim(),
            confirmation.area_code.trim(),
            area_code_error as fn(&str) -> Option<&'static str>,
        ),
        (
            FormField::LocalNumber,
            FormField::ConfirmLocalNumber,
            primary.number.trim(),
            confirmation.number.trim(),
            local_number_error,
        ),
    ];
    for (field, confirm_field, value, confirm_value, rule) in pairs {
        let primary_error = rule(value);
        let confirm_error = rule(confirm_value);
        if let Some(message) = primary_error {
            errors.insert(field, message);
        }
        if let Some(message) = confirm_error {
            errors.insert(confirm_field, message);
        }
        if primary_error.is_none() && confirm_error.is_none() && value != confirm_value {
            errors.insert(confirm_field, "Los números de celular no coinciden");
        }
    }
}

fn email_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok())
        .as_ref()
}

fn check_email(email: &str, errors: &mut FieldErrors) {
    let email = email.trim();
    let well_formed = email.chars().count() <= EMAIL_MAX_CHARS
        && email_pattern().is_some_and(|pattern| pattern.is_match(email));
    if !well_formed {
        errors.insert(FormField::Email, "Email inválido");
    }
}

/// Reasons a birth date is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BirthDateError {
    DayMissing,
    DayInvalid,
    MonthMissing,
    MonthInvalid,
    YearMissing,
    YearInvalid,
    /// The three parts do not form a calendar date.
    NotACalendarDate,
    InFuture,
    Underage,
}

impl BirthDateError {
    /// Field the error is reported on.
    pub const fn field(self) -> FormField {
        match self {
            Self::DayMissing | Self::DayInvalid => FormField::BirthDay,
            Self::MonthMissing | Self::MonthInvalid => FormField::BirthMonth,
            Self::YearMissing
            | Self::YearInvalid
            | Self::NotACalendarDate
            | Self::InFuture
            | Self::Underage => FormField::BirthYear,
        }
    }

    pub const fn message(self) -> &'static str {
        match self {
            Self::DayMissing => "Día requerido",
            Self::DayInvalid => "Día inválido",
            Self::MonthMissing => "Mes requerido",
            Self::MonthInvalid => "Mes inválido",
            Self::YearMissing => "Año requerido",
            Self::YearInvalid => "Año inválido",
            Self::NotACalendarDate => "Fecha de nacimiento inválida",
            Self::InFuture => "La fecha de nacimiento no puede ser futura",
            Self::Underage => "Debe ser mayor de 18 años",
        }
    }
}

fn parse_part(
    raw: &str,
    range: std::ops::RangeInclusive<u32>,
    missing: BirthDateError,
    invalid: BirthDateError,
) -> Result<u32, BirthDateError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(missing);
    }
    if !is_digits(raw) || raw.len() > 2 {
        return Err(invalid);
    }
    raw.parse::<u32>()
        .ok()
        .filter(|value| range.contains(value))
        .ok_or(invalid)
}

/// Parse the three birth-date parts into a calendar date.
pub fn parse_birth_date(input: &BirthDateInput) -> Result<NaiveDate, BirthDateError> {
    let day = parse_part(
        &input.day,
        1..=31,
        BirthDateError::DayMissing,
        BirthDateError::DayInvalid,
    )?;
    let month = parse_part(
        &input.month,
        1..=12,
        BirthDateError::MonthMissing,
        BirthDateError::MonthInvalid,
    )?;
    let year = input.year.trim();
    if year.is_empty() {
        return Err(BirthDateError::YearMissing);
    }
    if year.len() != 4 || !is_digits(year) {
        return Err(BirthDateError::YearInvalid);
    }
    let year: i32 = year.parse().map_err(|_| BirthDateError::YearInvalid)?;
    NaiveDate::from_ymd_opt(year, month, day).ok_or(BirthDateError::NotACalendarDate)
}

/// Whole years between `birth` and `reference`.
pub fn age_on(birth: NaiveDate, reference: NaiveDate) -> i32 {
    let years = reference.year() - birth.year();
    if (reference.month(), reference.day()) < (birth.month(), birth.day()) {
        years - 1
    } else {
        years
    }
}

/// Validate the birth date parts against the calendar, today and the minimum
/// age on the reference date.
pub fn check_birth_date(
    input: &BirthDateInput,
    ctx: &ValidationContext<'_>,
) -> Result<NaiveDate, BirthDateError> {
    let birth = parse_birth_date(input)?;
    if birth > ctx.today {
        return Err(BirthDateError::InFuture);
    }
    if age_on(birth, ctx.reference_date) < MINIMUM_AGE {
        return Err(BirthDateError::Underage);
    }
    Ok(birth)
}

fn check_places(draft: &RegistrationDraft, catalogue: &LocalityCatalogue, errors: &mut FieldErrors) {
    match &draft.locality {
        Selection::Unset => {
            errors.insert(FormField::Locality, "Localidad requerida");
        }
        Selection::Known { id } if catalogue.locality(*id).is_none() => {
            errors.insert(FormField::Locality, "Localidad inválida");
        }
        Selection::Known { .. } => {}
        Selection::Other { description } if description.trim().is_empty() => {
            errors.insert(FormField::LocalityOther, "Ingresá el nombre de tu localidad");
        }
        Selection::Other { .. } => {}
    }

    match &draft.neighbourhood {
        Selection::Unset if catalogue.requires_neighbourhood(&draft.locality) => {
            errors.insert(
                FormField::Neighbourhood,
                "Barrio requerido para Córdoba Capital y OTROS",
            );
        }
        Selection::Unset => {}
        Selection::Known { id } => {
            let listed = draft
                .locality
                .known_id()
                .is_some_and(|locality| catalogue.contains_neighbourhood(*locality, *id));
            if !listed {
                errors.insert(
                    FormField::Neighbourhood,
                    "Barrio inválido para la localidad seleccionada",
                );
            }
        }
        Selection::Other { description } if description.trim().is_empty() => {
            errors.insert(FormField::NeighbourhoodOther, "Ingresá el nombre de tu barrio");
        }
        Selection::Other { .. } => {}
    }
}
