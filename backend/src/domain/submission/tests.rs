//! State machine coverage for registration submission.

use super::*;
use crate::domain::locality::LocalityCatalogue;
use crate::domain::ports::{
    CaptchaVerifierError, FixtureCaptchaVerifier, FixtureRegistrationApi, MockCaptchaVerifier,
    MockRegistrationApi,
};
use crate::domain::test_fixtures::{FixtureClock, valid_draft};
use async_trait::async_trait;
use rstest::rstest;
use tokio::sync::Notify;

type Submission = RegistrationSubmission<dyn CaptchaVerifier, dyn RegistrationApi>;

fn build(
    draft: RegistrationDraft,
    captcha: Arc<dyn CaptchaVerifier>,
    registration: Arc<dyn RegistrationApi>,
    clock: Arc<FixtureClock>,
) -> Submission {
    let form = RegistrationForm::new(Arc::new(LocalityCatalogue::builtin()), clock.clone())
        .with_draft(draft);
    RegistrationSubmission::new(form, captcha, registration, clock)
}

fn accepting_captcha() -> MockCaptchaVerifier {
    let mut captcha = MockCaptchaVerifier::new();
    captcha.expect_verify().times(1).return_once(|_| Ok(true));
    captcha
}

fn api_answering(
    result: Result<RegistrationReceipt, RegistrationApiError>,
) -> MockRegistrationApi {
    let mut api = MockRegistrationApi::new();
    api.expect_register().times(1).return_once(move |_| result);
    api
}

fn submission_with(
    captcha: MockCaptchaVerifier,
    api: MockRegistrationApi,
) -> (Submission, Arc<FixtureClock>) {
    let clock = Arc::new(FixtureClock::new());
    let submission = build(valid_draft(), Arc::new(captcha), Arc::new(api), clock.clone());
    (submission, clock)
}

fn expect_failure(outcome: SubmitOutcome) -> SubmissionFailure {
    match outcome {
        SubmitOutcome::Failed(failure) => failure,
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test]
async fn successful_submission_resets_the_draft() {
    let mut api = MockRegistrationApi::new();
    api.expect_register()
        .withf(|payload| payload.phone() == "+543511234567" && payload.first_name() == "Juan")
        .times(1)
        .return_once(|_| Ok(RegistrationReceipt::accepted()));
    let (submission, _clock) = submission_with(accepting_captcha(), api);

    let outcome = submission.submit().await;

    let confirmation = match outcome {
        SubmitOutcome::Registered(confirmation) => confirmation,
        other => panic!("expected registration, got {other:?}"),
    };
    assert_eq!(confirmation.first_name, "Juan");
    assert!(!confirmation.duplicate);
    assert_eq!(confirmation.location(), "/registro-exitoso?nombre=Juan");
    assert_eq!(submission.state(), SubmissionState::Success);
    assert_eq!(submission.draft(), RegistrationDraft::new());
    assert!(submission.draft().captcha_token.is_empty());
}

#[tokio::test]
async fn invalid_draft_never_reaches_the_network() {
    let clock = Arc::new(FixtureClock::new());
    let mut draft = valid_draft();
    draft.terms_accepted = false;
    let submission = build(
        draft,
        Arc::new(MockCaptchaVerifier::new()),
        Arc::new(MockRegistrationApi::new()),
        clock,
    );

    let outcome = submission.submit().await;

    let errors = match outcome {
        SubmitOutcome::Invalid(errors) => errors,
        other => panic!("expected validation errors, got {other:?}"),
    };
    assert!(errors.contains(FormField::TermsAccepted));
    assert_eq!(submission.state(), SubmissionState::Idle);
    assert_eq!(submission.errors(), errors);
}

#[tokio::test]
async fn rejected_captcha_skips_registration() {
    let mut captcha = MockCaptchaVerifier::new();
    captcha.expect_verify().times(1).return_once(|_| Ok(false));
    let (submission, _clock) = submission_with(captcha, MockRegistrationApi::new());

    let failure = expect_failure(submission.submit().await);

    assert_eq!(failure.reason, FailureReason::CaptchaRejected);
    assert_eq!(failure.banner, None);
    assert_eq!(failure.message(), CAPTCHA_REJECTED_MESSAGE);
    assert_eq!(
        submission.errors().get(FormField::Captcha),
        Some(CAPTCHA_REJECTED_MESSAGE)
    );
    assert_eq!(submission.state(), SubmissionState::Failed);
    assert!(submission.banner().is_none());
}

#[tokio::test]
async fn captcha_service_errors_are_reported_on_the_field() {
    let mut captcha = MockCaptchaVerifier::new();
    captcha
        .expect_verify()
        .times(1)
        .return_once(|_| Err(CaptchaVerifierError::timeout("deadline elapsed")));
    let (submission, _clock) = submission_with(captcha, MockRegistrationApi::new());

    let failure = expect_failure(submission.submit().await);

    assert_eq!(failure.reason, FailureReason::CaptchaUnavailable);
    assert_eq!(
        submission.errors().get(FormField::Captcha),
        Some(CAPTCHA_UNAVAILABLE_MESSAGE)
    );
}

#[rstest]
#[case("El DNI ya se encuentra registrado")]
#[case("DUPLICATE registration")]
#[tokio::test]
async fn duplicate_registration_counts_as_success(#[case] message: &str) {
    let api = api_answering(Ok(RegistrationReceipt::declined(message)));
    let (submission, _clock) = submission_with(accepting_captcha(), api);

    let outcome = submission.submit().await;

    assert_eq!(
        outcome,
        SubmitOutcome::Registered(Confirmation {
            first_name: "Juan".into(),
            duplicate: true,
        })
    );
    assert_eq!(submission.state(), SubmissionState::Success);
    assert_eq!(submission.draft(), RegistrationDraft::new());
}

#[tokio::test]
async fn disabled_policy_surfaces_duplicates_as_failures() {
    let api = api_answering(Ok(RegistrationReceipt::declined("ya existe")));
    let (submission, _clock) = submission_with(accepting_captcha(), api);
    let submission = submission.with_policy(DuplicateRegistrationPolicy::disabled());

    let failure = expect_failure(submission.submit().await);
    assert_eq!(failure.reason, FailureReason::Rejected);
    assert_eq!(failure.banner.as_deref(), Some("ya existe"));
}

#[tokio::test]
async fn banner_expires_after_eight_seconds() {
    let api = api_answering(Ok(RegistrationReceipt::declined("Padrón cerrado")));
    let (submission, clock) = submission_with(accepting_captcha(), api);

    let failure = expect_failure(submission.submit().await);
    assert_eq!(failure.banner.as_deref(), Some("Padrón cerrado"));
    assert_eq!(
        submission.banner().map(|banner| banner.message),
        Some("Padrón cerrado".to_owned())
    );

    clock.advance(TimeDelta::seconds(7));
    assert!(submission.banner().is_some());

    clock.advance(TimeDelta::seconds(1));
    assert!(submission.banner().is_none());
    assert_eq!(
        submission.state(),
        SubmissionState::Failed,
        "banner expiry does not change the state"
    );
}

#[rstest]
#[case(
    Ok(RegistrationReceipt { success: false, message: None }),
    FailureReason::Rejected,
    UNKNOWN_REJECTION_MESSAGE
)]
#[case(
    Err(RegistrationApiError::transport("connection refused")),
    FailureReason::Network,
    NETWORK_FAILURE_MESSAGE
)]
#[case(
    Err(RegistrationApiError::timeout("deadline elapsed")),
    FailureReason::Network,
    NETWORK_FAILURE_MESSAGE
)]
#[case(
    Err(RegistrationApiError::status(500_u16, "internal")),
    FailureReason::Unexpected,
    GENERIC_FAILURE_MESSAGE
)]
#[tokio::test]
async fn registration_failures_raise_a_banner(
    #[case] result: Result<RegistrationReceipt, RegistrationApiError>,
    #[case] reason: FailureReason,
    #[case] banner: &str,
) {
    let (submission, _clock) = submission_with(accepting_captcha(), api_answering(result));

    let failure = expect_failure(submission.submit().await);

    assert_eq!(failure.reason, reason);
    assert_eq!(failure.banner.as_deref(), Some(banner));
    assert!(failure.field_errors.is_empty());
    assert_eq!(submission.state(), SubmissionState::Failed);
    assert_ne!(
        submission.draft(),
        RegistrationDraft::new(),
        "failed submissions keep the draft"
    );
}

#[tokio::test]
async fn captcha_rejection_from_the_api_marks_the_captcha_field() {
    let api = api_answering(Ok(RegistrationReceipt::declined("Captcha inválido")));
    let (submission, _clock) = submission_with(accepting_captcha(), api);

    let failure = expect_failure(submission.submit().await);

    assert_eq!(failure.banner.as_deref(), Some(GENERIC_FAILURE_MESSAGE));
    assert_eq!(
        failure.field_errors.get(FormField::Captcha),
        Some(CAPTCHA_UNAVAILABLE_MESSAGE)
    );
    assert_eq!(
        submission.errors().get(FormField::Captcha),
        Some(CAPTCHA_UNAVAILABLE_MESSAGE)
    );
}

#[tokio::test]
async fn acknowledging_a_failure_returns_to_idle() {
    let api = api_answering(Err(RegistrationApiError::transport("offline")));
    let (submission, _clock) = submission_with(accepting_captcha(), api);
    submission.submit().await;

    submission.acknowledge_failure();

    assert_eq!(submission.state(), SubmissionState::Idle);
    assert!(submission.banner().is_none());
}

#[tokio::test]
async fn failed_submission_can_be_retried() {
    let mut captcha = MockCaptchaVerifier::new();
    captcha.expect_verify().times(2).returning(|_| Ok(true));
    let mut api = MockRegistrationApi::new();
    let mut answers = vec![
        Ok(RegistrationReceipt::accepted()),
        Err(RegistrationApiError::transport("offline")),
    ];
    api.expect_register()
        .times(2)
        .returning(move |_| answers.pop().expect("two answers"));
    let (submission, _clock) = submission_with(captcha, api);

    expect_failure(submission.submit().await);
    let outcome = submission.submit().await;

    assert!(matches!(outcome, SubmitOutcome::Registered(_)));
}

#[derive(Default)]
struct GatedVerifier {
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl CaptchaVerifier for GatedVerifier {
    async fn verify(&self, _token: &CaptchaToken) -> Result<bool, CaptchaVerifierError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(true)
    }
}

#[tokio::test]
async fn only_one_submission_runs_at_a_time() {
    let verifier = Arc::new(GatedVerifier::default());
    let submission = Arc::new(build(
        valid_draft(),
        verifier.clone(),
        Arc::new(FixtureRegistrationApi::default()),
        Arc::new(FixtureClock::new()),
    ));

    let running = tokio::spawn({
        let submission = Arc::clone(&submission);
        async move { submission.submit().await }
    });
    verifier.entered.notified().await;

    assert_eq!(submission.state(), SubmissionState::VerifyingCaptcha);
    assert!(!submission.can_submit());
    assert_eq!(submission.submit().await, SubmitOutcome::AlreadyInFlight);

    verifier.release.notify_one();
    let outcome = running.await.expect("submission task");
    assert!(matches!(outcome, SubmitOutcome::Registered(_)));
    assert!(submission.can_submit());
}

#[tokio::test]
async fn edits_during_flight_do_not_change_the_submitted_payload() {
    let verifier = Arc::new(GatedVerifier::default());
    let mut api = MockRegistrationApi::new();
    api.expect_register()
        .withf(|payload| payload.first_name() == "Juan")
        .times(1)
        .return_once(|_| Ok(RegistrationReceipt::accepted()));
    let submission = Arc::new(build(
        valid_draft(),
        verifier.clone(),
        Arc::new(api),
        Arc::new(FixtureClock::new()),
    ));

    let running = tokio::spawn({
        let submission = Arc::clone(&submission);
        async move { submission.submit().await }
    });
    verifier.entered.notified().await;
    submission.change(FieldUpdate::FirstName("Pedro".into()));
    verifier.release.notify_one();

    let outcome = running.await.expect("submission task");
    assert!(matches!(
        outcome,
        SubmitOutcome::Registered(Confirmation { ref first_name, .. }) if first_name == "Juan"
    ));
}

#[tokio::test]
async fn fixture_rejecting_verifier_fails_the_submission() {
    let submission = build(
        valid_draft(),
        Arc::new(FixtureCaptchaVerifier::rejecting()),
        Arc::new(FixtureRegistrationApi::default()),
        Arc::new(FixtureClock::new()),
    );

    let failure = expect_failure(submission.submit().await);
    assert_eq!(failure.reason, FailureReason::CaptchaRejected);
}
