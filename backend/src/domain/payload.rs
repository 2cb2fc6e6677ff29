//! Immutable registration payload derived from a validated draft.
//!
//! The payload is what the registration API receives. It is serialised with
//! the Spanish field names the API expects and encodes "other" selections as
//! the reserved id [`OTHER_WIRE_ID`] plus a description.

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::draft::{
    CaptchaToken, FormField, PhoneInput, RegistrationDraft, Selection, Sex,
};
use crate::domain::locality::OTHER_WIRE_ID;
use crate::domain::validation::{FieldErrors, ValidationContext, parse_birth_date, validate};

/// Reference to a catalogue entry or a free-text "other" entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaceRef {
    Listed(u32),
    Other(String),
}

impl PlaceRef {
    /// Id sent to the API; "other" uses the reserved id.
    pub fn wire_id(&self) -> u32 {
        match self {
            Self::Listed(id) => *id,
            Self::Other(_) => OTHER_WIRE_ID,
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            Self::Listed(_) => None,
            Self::Other(description) => Some(description.as_str()),
        }
    }

    fn from_selection<T: Copy>(selection: &Selection<T>, raw: impl Fn(T) -> u32) -> Option<Self> {
        match selection {
            Selection::Unset => None,
            Selection::Known { id } => Some(Self::Listed(raw(*id))),
            Selection::Other { description } => Some(Self::Other(description.trim().to_owned())),
        }
    }
}

/// Errors raised while deriving a payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    /// The draft still fails validation.
    #[error("registration draft has {} invalid field(s)", .0.len())]
    InvalidDraft(FieldErrors),
}

/// Finalised registration data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "RegistrationPayloadDto")]
pub struct RegistrationPayload {
    first_name: String,
    last_name: String,
    national_id: String,
    phone: String,
    email: String,
    birth_date: NaiveDate,
    locality: PlaceRef,
    neighbourhood: Option<PlaceRef>,
    sex: Sex,
    terms_accepted: bool,
    captcha: CaptchaToken,
}

impl RegistrationPayload {
    /// Derive the payload from a draft that passes every rule.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError::InvalidDraft`] with the full report when any
    /// rule fails.
    pub fn from_draft(
        draft: &RegistrationDraft,
        ctx: &ValidationContext<'_>,
    ) -> Result<Self, PayloadError> {
        let errors = validate(draft, ctx);
        if !errors.is_empty() {
            return Err(PayloadError::InvalidDraft(errors));
        }
        let invalid = |field: FormField, message: &str| {
            let mut errors = FieldErrors::new();
            errors.insert(field, message);
            PayloadError::InvalidDraft(errors)
        };

        let birth_date = parse_birth_date(&draft.birth_date)
            .map_err(|error| invalid(error.field(), error.message()))?;
        let captcha = CaptchaToken::new(draft.captcha_token.as_str())
            .map_err(|_| invalid(FormField::Captcha, "Debe completar el captcha"))?;
        let sex = draft
            .sex
            .ok_or_else(|| invalid(FormField::Sex, "Sexo requerido"))?;
        let locality = PlaceRef::from_selection(&draft.locality, |id| id.get())
            .ok_or_else(|| invalid(FormField::Locality, "Localidad requerida"))?;

        Ok(Self {
            first_name: draft.first_name.trim().to_owned(),
            last_name: draft.last_name.trim().to_owned(),
            national_id: draft.national_id.trim().to_owned(),
            phone: international_number(&draft.phone),
            email: draft.email.trim().to_owned(),
            birth_date,
            locality,
            neighbourhood: PlaceRef::from_selection(&draft.neighbourhood, |id| id.get()),
            sex,
            terms_accepted: draft.terms_accepted,
            captcha,
        })
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    pub fn national_id(&self) -> &str {
        &self.national_id
    }

    /// Mobile number in international format, e.g. `+543511234567`.
    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn birth_date(&self) -> NaiveDate {
        self.birth_date
    }

    pub fn locality(&self) -> &PlaceRef {
        &self.locality
    }

    pub fn neighbourhood(&self) -> Option<&PlaceRef> {
        self.neighbourhood.as_ref()
    }

    pub fn sex(&self) -> Sex {
        self.sex
    }

    pub fn terms_accepted(&self) -> bool {
        self.terms_accepted
    }

    pub fn captcha(&self) -> &CaptchaToken {
        &self.captcha
    }
}

/// Join the phone parts, dropping a single leading trunk `0` from the area
/// code.
pub fn international_number(phone: &PhoneInput) -> String {
    let area = phone.area_code.trim();
    let area = area.strip_prefix('0').unwrap_or(area);
    format!("{}{}{}", phone.country_code, area, phone.number.trim())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RegistrationPayloadDto {
    nombre: String,
    apellido: String,
    dni: String,
    celular: String,
    email: String,
    fecha_nacimiento: String,
    localidad_id: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    localidad_otra: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    barrio_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    barrio_otro: Option<String>,
    sexo: &'static str,
    acepta_terminos: bool,
    captcha: String,
}

impl From<RegistrationPayload> for RegistrationPayloadDto {
    fn from(value: RegistrationPayload) -> Self {
        let RegistrationPayload {
            first_name,
            last_name,
            national_id,
            phone,
            email,
            birth_date,
            locality,
            neighbourhood,
            sex,
            terms_accepted,
            captcha,
        } = value;
        Self {
            nombre: first_name,
            apellido: last_name,
            dni: national_id,
            celular: phone,
            email,
            fecha_nacimiento: birth_date.format("%Y-%m-%d").to_string(),
            localidad_id: locality.wire_id(),
            localidad_otra: locality.description().map(str::to_owned),
            barrio_id: neighbourhood.as_ref().map(PlaceRef::wire_id),
            barrio_otro: neighbourhood
                .as_ref()
                .and_then(PlaceRef::description)
                .map(str::to_owned),
            sexo: sex.code(),
            acepta_terminos: terms_accepted,
            captcha: captcha.as_ref().to_owned(),
        }
    }
}
