//! Tests for the registration handlers.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use actix_web::{App, http::StatusCode, test as actix_test};
use async_trait::async_trait;
use rstest::{fixture, rstest};
use serde_json::{Value, json};
use tokio::sync::Notify;

use super::*;
use crate::domain::ports::{
    CaptchaVerifier, FixtureCaptchaVerifier, FixtureRegistrationApi, MockCaptchaVerifier,
    MockRegistrationApi, RegistrationApi, RegistrationApiError, RegistrationReceipt,
};
use crate::domain::RegistrationPayload;
use crate::inbound::http::test_utils::test_state;

#[fixture]
fn valid_request() -> Value {
    let phone = json!({ "countryCode": "+54", "areaCode": "0351", "number": "1234567" });
    json!({
        "firstName": "Juan",
        "lastName": "Pérez",
        "nationalId": "30123456",
        "nationalIdConfirmation": "30123456",
        "phone": phone,
        "phoneConfirmation": phone,
        "email": "juan.perez@example.com",
        "birthDate": { "day": "15", "month": "5", "year": "1990" },
        "locality": { "kind": "known", "id": 1 },
        "neighbourhood": { "kind": "known", "id": 107 },
        "sex": "masculino",
        "captchaToken": "captcha-token",
        "termsAccepted": true
    })
}

async fn post_json(
    captcha: Arc<dyn CaptchaVerifier>,
    registration: Arc<dyn RegistrationApi>,
    uri: &str,
    body: &Value,
) -> (StatusCode, Option<String>, Value) {
    let state = test_state(captcha, registration);
    let app = actix_test::init_service(
        App::new().app_data(web::Data::new(state)).service(
            web::scope("/api/v1")
                .service(validate_registration)
                .service(submit_registration),
        ),
    )
    .await;
    let request = actix_test::TestRequest::post()
        .uri(uri)
        .set_json(body)
        .to_request();
    let response = actix_test::call_service(&app, request).await;
    let status = response.status();
    let location = response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    let bytes = actix_test::read_body(response).await;
    let value = serde_json::from_slice(&bytes).expect("JSON body");
    (status, location, value)
}

async fn submit(registration: Arc<dyn RegistrationApi>, body: &Value) -> (StatusCode, Value) {
    let (status, _, value) = post_json(
        Arc::new(FixtureCaptchaVerifier::accepting()),
        registration,
        "/api/v1/registrations",
        body,
    )
    .await;
    (status, value)
}

fn field_names(value: &Value) -> Vec<&str> {
    value
        .as_array()
        .expect("array of field errors")
        .iter()
        .filter_map(|entry| entry["field"].as_str())
        .collect()
}

#[rstest]
#[actix_web::test]
async fn validate_reports_every_field_of_an_empty_draft() {
    let (status, _, value) = post_json(
        Arc::new(FixtureCaptchaVerifier::accepting()),
        Arc::new(FixtureRegistrationApi::default()),
        "/api/v1/registrations/validate",
        &json!({ "draft": {} }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["valid"], false);
    let fields = field_names(&value["fieldErrors"]);
    assert_eq!(fields.first(), Some(&"lastName"));
    assert!(fields.contains(&"captcha"));
    assert!(fields.contains(&"termsAccepted"));
    assert!(!fields.contains(&"neighbourhood"));
}

#[rstest]
#[actix_web::test]
async fn validate_only_reports_touched_fields(valid_request: Value) {
    let mut draft = valid_request;
    draft["nationalIdConfirmation"] = json!("30123457");
    draft["email"] = json!("not-an-email");

    let (status, _, value) = post_json(
        Arc::new(FixtureCaptchaVerifier::accepting()),
        Arc::new(FixtureRegistrationApi::default()),
        "/api/v1/registrations/validate",
        &json!({ "draft": draft, "touched": ["nationalId", "nationalIdConfirmation"] }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["valid"], false);
    assert_eq!(
        value["fieldErrors"],
        json!([
            { "field": "nationalId", "message": "Los DNI no coinciden" },
            { "field": "nationalIdConfirmation", "message": "Los DNI no coinciden" }
        ])
    );
}

#[rstest]
#[actix_web::test]
async fn validate_accepts_a_complete_draft(valid_request: Value) {
    let (status, _, value) = post_json(
        Arc::new(FixtureCaptchaVerifier::accepting()),
        Arc::new(FixtureRegistrationApi::default()),
        "/api/v1/registrations/validate",
        &json!({ "draft": valid_request }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(value, json!({ "valid": true, "fieldErrors": [] }));
}

#[rstest]
#[actix_web::test]
async fn known_selection_without_id_is_rejected(valid_request: Value) {
    let mut draft = valid_request;
    draft["locality"] = json!({ "kind": "known" });

    let (status, value) = submit(Arc::new(FixtureRegistrationApi::default()), &draft).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["details"]["code"], "missing_id");
}

#[rstest]
#[actix_web::test]
async fn legacy_other_id_maps_to_free_text(valid_request: Value) {
    let mut draft = valid_request;
    draft["locality"] = json!({ "kind": "known", "id": 999, "description": "LA FALDA" });
    draft["neighbourhood"] = json!({ "kind": "other", "description": "CENTRO" });

    let mut api = MockRegistrationApi::new();
    api.expect_register()
        .withf(|payload| {
            payload.locality().wire_id() == OTHER_WIRE_ID
                && payload.locality().description() == Some("LA FALDA")
        })
        .times(1)
        .return_once(|_| Ok(RegistrationReceipt::accepted()));

    let (status, _) = submit(Arc::new(api), &draft).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[rstest]
#[actix_web::test]
async fn successful_submission_points_to_the_confirmation_page(valid_request: Value) {
    let (status, location, value) = post_json(
        Arc::new(FixtureCaptchaVerifier::accepting()),
        Arc::new(FixtureRegistrationApi::default()),
        "/api/v1/registrations",
        &valid_request,
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(location.as_deref(), Some("/registro-exitoso?nombre=Juan"));
    assert_eq!(
        value,
        json!({
            "location": "/registro-exitoso?nombre=Juan",
            "firstName": "Juan",
            "duplicate": false
        })
    );
}

#[rstest]
#[actix_web::test]
async fn duplicate_registration_is_reported_as_success(valid_request: Value) {
    let api = FixtureRegistrationApi::new(RegistrationReceipt::declined(
        "El DNI ya se encuentra registrado",
    ));
    let (status, value) = submit(Arc::new(api), &valid_request).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(value["duplicate"], true);
}

#[rstest]
#[actix_web::test]
async fn invalid_draft_never_reaches_the_ports(valid_request: Value) {
    let mut draft = valid_request;
    draft["termsAccepted"] = json!(false);

    let (status, _, value) = post_json(
        Arc::new(MockCaptchaVerifier::new()),
        Arc::new(MockRegistrationApi::new()),
        "/api/v1/registrations",
        &draft,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["message"], INVALID_FIELDS_MESSAGE);
    assert_eq!(
        value["details"]["fields"],
        json!([{ "field": "termsAccepted", "message": "Debe aceptar los términos y condiciones" }])
    );
}

#[rstest]
#[actix_web::test]
async fn rejected_captcha_is_a_field_error(valid_request: Value) {
    let (status, _, value) = post_json(
        Arc::new(FixtureCaptchaVerifier::rejecting()),
        Arc::new(MockRegistrationApi::new()),
        "/api/v1/registrations",
        &valid_request,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["details"]["reason"], "captchaRejected");
    assert_eq!(value["details"]["banner"], Value::Null);
    assert_eq!(field_names(&value["details"]["fields"]), vec!["captcha"]);
}

#[rstest]
#[case::unreachable(
    Err(RegistrationApiError::transport("connection refused")),
    StatusCode::SERVICE_UNAVAILABLE,
    "network",
    "Error de conexión. Verifica tu internet e inténtalo de nuevo."
)]
#[case::declined(
    Ok(RegistrationReceipt::declined("El padrón está cerrado")),
    StatusCode::BAD_GATEWAY,
    "rejected",
    "El padrón está cerrado"
)]
#[case::declined_without_message(
    Ok(RegistrationReceipt { success: false, message: None }),
    StatusCode::BAD_GATEWAY,
    "rejected",
    "Error desconocido al registrar fiscal"
)]
#[case::garbled(
    Err(RegistrationApiError::decode("not json")),
    StatusCode::BAD_GATEWAY,
    "unexpected",
    "Error al enviar el formulario. Por favor, inténtalo de nuevo."
)]
#[actix_web::test]
async fn registration_failures_map_to_statuses(
    valid_request: Value,
    #[case] answer: Result<RegistrationReceipt, RegistrationApiError>,
    #[case] expected_status: StatusCode,
    #[case] reason: &str,
    #[case] banner: &str,
) {
    let mut api = MockRegistrationApi::new();
    api.expect_register().times(1).return_once(move |_| answer);

    let (status, value) = submit(Arc::new(api), &valid_request).await;

    assert_eq!(status, expected_status);
    assert_eq!(value["message"], banner);
    assert_eq!(value["details"]["reason"], reason);
    assert_eq!(value["details"]["banner"], banner);
}

#[rstest]
#[actix_web::test]
async fn captcha_message_from_the_api_flags_the_captcha_field(valid_request: Value) {
    let api = FixtureRegistrationApi::new(RegistrationReceipt::declined("Captcha inválido"));
    let (status, value) = submit(Arc::new(api), &valid_request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(field_names(&value["details"]["fields"]), vec!["captcha"]);
    assert_eq!(
        value["details"]["banner"],
        "Error al enviar el formulario. Por favor, inténtalo de nuevo."
    );
}

/// Registration API that holds every call until released.
#[derive(Default)]
struct GatedRegistrationApi {
    release: Notify,
    calls: AtomicUsize,
}

#[async_trait]
impl RegistrationApi for GatedRegistrationApi {
    async fn register(
        &self,
        _payload: &RegistrationPayload,
    ) -> Result<RegistrationReceipt, RegistrationApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.release.notified().await;
        Ok(RegistrationReceipt::accepted())
    }
}

#[rstest]
#[actix_web::test]
async fn concurrent_submissions_for_one_national_id_reach_the_api_once(valid_request: Value) {
    let api = Arc::new(GatedRegistrationApi::default());
    let state = web::Data::new(test_state(
        Arc::new(FixtureCaptchaVerifier::accepting()),
        api.clone(),
    ));
    let app = actix_test::init_service(
        App::new()
            .app_data(state.clone())
            .service(web::scope("/api/v1").service(submit_registration)),
    )
    .await;

    let send = |body: &Value| {
        let request = actix_test::TestRequest::post()
            .uri("/api/v1/registrations")
            .set_json(body)
            .to_request();
        let app = &app;
        let api = Arc::clone(&api);
        async move {
            let response = actix_test::call_service(app, request).await;
            // Whichever request finishes first lets the held one through.
            api.release.notify_one();
            response.status().as_u16()
        }
    };
    let (first, second) = futures_util::join!(send(&valid_request), send(&valid_request));

    let mut statuses = [first, second];
    statuses.sort_unstable();
    assert_eq!(statuses, [201, 409]);
    assert_eq!(api.calls.load(Ordering::SeqCst), 1);
    assert!(!state.in_flight.is_claimed("30123456"));
}

#[rstest]
#[actix_web::test]
async fn failed_submission_releases_the_national_id(valid_request: Value) {
    let state = web::Data::new(test_state(
        Arc::new(FixtureCaptchaVerifier::rejecting()),
        Arc::new(MockRegistrationApi::new()),
    ));
    let app = actix_test::init_service(
        App::new()
            .app_data(state.clone())
            .service(web::scope("/api/v1").service(submit_registration)),
    )
    .await;

    for _ in 0..2 {
        let request = actix_test::TestRequest::post()
            .uri("/api/v1/registrations")
            .set_json(&valid_request)
            .to_request();
        let response = actix_test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
    assert!(!state.in_flight.is_claimed("30123456"));
}
