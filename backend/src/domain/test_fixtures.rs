//! Shared drafts and clocks for domain unit tests.

use chrono::{DateTime, Local, NaiveDate, Utc};
use mockable::Clock;

use crate::domain::draft::{
    BirthDateInput, CountryCode, PhoneInput, RegistrationDraft, Selection, Sex,
};
use crate::domain::locality::{LocalityId, NeighbourhoodId};

/// A draft that passes every rule against the built-in catalogue.
pub(crate) fn valid_draft() -> RegistrationDraft {
    let phone = PhoneInput {
        country_code: CountryCode::Argentina,
        area_code: "0351".into(),
        number: "1234567".into(),
    };
    RegistrationDraft {
        first_name: "Juan".into(),
        last_name: "Pérez".into(),
        national_id: "30123456".into(),
        national_id_confirmation: "30123456".into(),
        phone: phone.clone(),
        phone_confirmation: phone,
        email: "juan.perez@example.com".into(),
        birth_date: BirthDateInput {
            day: "15".into(),
            month: "5".into(),
            year: "1990".into(),
        },
        locality: Selection::known(LocalityId::new(1)),
        neighbourhood: Selection::known(NeighbourhoodId::new(107)),
        sex: Some(Sex::Male),
        captcha_token: "captcha-token".into(),
        terms_accepted: true,
    }
}

/// Date treated as "today" by the fixture clock.
pub(crate) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 10, 19).expect("valid fixture date")
}

/// Clock whose current time can be moved forward by tests.
#[derive(Debug)]
pub(crate) struct FixtureClock {
    now: std::sync::Mutex<DateTime<Utc>>,
}

impl FixtureClock {
    pub(crate) fn new() -> Self {
        let start = today()
            .and_hms_opt(12, 0, 0)
            .expect("valid fixture time")
            .and_utc();
        Self {
            now: std::sync::Mutex::new(start),
        }
    }

    pub(crate) fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().expect("clock lock");
        *now += by;
    }
}

impl Clock for FixtureClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock lock")
    }
}
