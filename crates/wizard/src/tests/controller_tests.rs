use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use client_core::{
    AuthEvent, IdentityProvider, MissingIdentityProvider, MissingObjectStorage, ObjectStorage,
    RecordStore, UploadFailurePolicy, UploadFile, UserIdentity,
};
use shared::{
    domain::SubmissionId,
    error::{ApiException, ErrorCode},
    protocol::{InsertOutcome, StartupRecord},
};
use tokio::sync::broadcast;

use crate::{
    Field, FounderEntry, Navigation, ProfileForm, SubmissionError, SubmissionStatus,
    WizardController, WizardStep,
};

struct FakeIdentity {
    user: Option<UserIdentity>,
    lookups: Mutex<usize>,
    events: broadcast::Sender<AuthEvent>,
}

impl FakeIdentity {
    fn new(user: Option<UserIdentity>) -> Arc<Self> {
        let (events, _) = broadcast::channel(8);
        Arc::new(Self {
            user,
            lookups: Mutex::new(0),
            events,
        })
    }

    fn signed_in() -> Arc<Self> {
        Self::new(Some(identity()))
    }

    fn anonymous() -> Arc<Self> {
        Self::new(None)
    }

    fn lookups(&self) -> usize {
        *self.lookups.lock().expect("lookups")
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn current_user(&self) -> Result<Option<UserIdentity>> {
        *self.lookups.lock().expect("lookups") += 1;
        Ok(self.user.clone())
    }

    fn subscribe_auth_events(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

#[derive(Default)]
struct FakeStorage {
    fail: bool,
    objects: Mutex<Vec<String>>,
}

impl FakeStorage {
    fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::default()
        })
    }

    fn objects(&self) -> Vec<String> {
        self.objects.lock().expect("objects").clone()
    }
}

#[async_trait]
impl ObjectStorage for FakeStorage {
    async fn upload_object(
        &self,
        path: &str,
        _content: Vec<u8>,
        _content_type: &str,
        upsert: bool,
    ) -> Result<()> {
        if self.fail {
            return Err(ApiException::new(ErrorCode::NotFound, "Bucket not found").into());
        }
        assert!(upsert, "logo uploads always overwrite");
        let mut objects = self.objects.lock().expect("objects");
        objects.retain(|existing| existing != path);
        objects.push(path.to_string());
        Ok(())
    }

    fn public_url(&self, path: &str) -> Result<String> {
        Ok(format!("https://cdn.test/{path}"))
    }
}

#[derive(Default)]
struct FakeRecords {
    failures_left: Mutex<usize>,
    /// Store the row but report a failure, as when the response is lost.
    lose_response: Mutex<bool>,
    attempts: Mutex<Vec<SubmissionId>>,
    rows: Mutex<Vec<StartupRecord>>,
}

impl FakeRecords {
    fn failing_once() -> Arc<Self> {
        let records = Self::default();
        *records.failures_left.lock().expect("failures") = 1;
        Arc::new(records)
    }

    fn rows(&self) -> Vec<StartupRecord> {
        self.rows.lock().expect("rows").clone()
    }

    fn attempts(&self) -> Vec<SubmissionId> {
        self.attempts.lock().expect("attempts").clone()
    }
}

#[async_trait]
impl RecordStore for FakeRecords {
    async fn insert_startup(&self, record: &StartupRecord) -> Result<InsertOutcome> {
        self.attempts
            .lock()
            .expect("attempts")
            .push(record.idempotency_key);

        {
            let mut failures_left = self.failures_left.lock().expect("failures");
            if *failures_left > 0 {
                *failures_left -= 1;
                return Err(ApiException::new(ErrorCode::Internal, "upstream timeout").into());
            }
        }

        let mut rows = self.rows.lock().expect("rows");
        if rows
            .iter()
            .any(|row| row.idempotency_key == record.idempotency_key)
        {
            return Ok(InsertOutcome::AlreadyRecorded);
        }
        rows.push(record.clone());

        let mut lose_response = self.lose_response.lock().expect("lose");
        if *lose_response {
            *lose_response = false;
            return Err(anyhow!("connection reset before response"));
        }
        Ok(InsertOutcome::Created)
    }
}

fn identity() -> UserIdentity {
    UserIdentity {
        user_id: "6f1c1f55-2b1e-4a4c-9c39-0d3a0f1f7a10".parse().expect("uuid"),
        email: Some("founder@acme.io".to_string()),
    }
}

fn valid_form() -> ProfileForm {
    ProfileForm {
        startup_name: "Acme Analytics".into(),
        brand_name: String::new(),
        incorporation_date: "2023-04-01".into(),
        entity_type: "Private Limited".into(),
        registration_number: "U72900KA2023PTC123456".into(),
        pan_number: "AAACA1234A".into(),
        address: "12 MG Road, Bengaluru".into(),
        contact_name: "Asha Rao".into(),
        contact_role: "CEO".into(),
        contact_email: "asha@acme.io".into(),
        contact_phone: "+91 98765 43210".into(),
        num_founders: "2".into(),
        team_size: "12".into(),
        sector: "FinTech".into(),
        stage: "Seed".into(),
        business_model: "SaaS".into(),
        pitch: "Bookkeeping on autopilot for small retailers.".into(),
        problem_statement: "Retailers lose hours to manual ledgers.".into(),
        target_market: "Independent retailers in tier-2 cities".into(),
        product_description: "A mobile ledger with automatic reconciliation.".into(),
        terms_accepted: true,
        ..ProfileForm::default()
    }
}

fn logo() -> UploadFile {
    UploadFile {
        filename: "C:\\Users\\asha\\acme-logo.png".into(),
        content_type: Some("image/png".into()),
        content: vec![0x89, b'P', b'N', b'G'],
    }
}

struct Harness {
    identity: Arc<FakeIdentity>,
    storage: Arc<FakeStorage>,
    records: Arc<FakeRecords>,
}

impl Harness {
    fn new() -> Self {
        Self {
            identity: FakeIdentity::signed_in(),
            storage: Arc::new(FakeStorage::default()),
            records: Arc::new(FakeRecords::default()),
        }
    }

    fn controller(&self, form: ProfileForm) -> WizardController {
        WizardController::new(
            self.identity.clone(),
            self.storage.clone(),
            self.records.clone(),
        )
        .with_form(form)
    }
}

fn walk_to_final(controller: &mut WizardController) {
    while !controller.step().is_last() {
        let before = controller.step();
        assert_ne!(controller.next(), before, "blocked at {before}: {}", controller.errors());
    }
}

#[test]
fn next_advances_one_step_from_every_valid_step() {
    let harness = Harness::new();
    let mut controller = harness.controller(valid_form());

    for _ in WizardStep::ALL {
        let i = controller.step().index();
        assert_eq!(controller.next().index(), (i + 1).min(4));
        assert!(controller.errors().is_empty());
    }
    assert_eq!(controller.step(), WizardStep::FinalDetails);

    for _ in WizardStep::ALL {
        let i = controller.step().index();
        assert_eq!(controller.prev().index(), i.saturating_sub(1));
    }
    assert_eq!(controller.step(), WizardStep::BasicInformation);
}

#[test]
fn next_stays_put_until_required_fields_are_filled() {
    let harness = Harness::new();
    let mut form = valid_form();
    form.startup_name = "   ".into();
    let mut controller = harness.controller(form);

    assert_eq!(controller.next(), WizardStep::BasicInformation);
    assert!(controller.errors().contains(Field::StartupName));
    assert_eq!(
        controller
            .errors()
            .for_field(Field::StartupName)
            .next()
            .map(|e| e.message.as_str()),
        Some("Startup name is required")
    );

    controller
        .form_mut()
        .set_text(Field::StartupName, "Acme Analytics")
        .expect("text field");
    assert_eq!(controller.next(), WizardStep::ContactDetails);
    assert!(controller.errors().is_empty());
}

#[test]
fn prev_clears_errors_and_stops_at_first_step() {
    let harness = Harness::new();
    let mut controller = harness.controller(ProfileForm::default());

    assert_eq!(controller.next(), WizardStep::BasicInformation);
    assert!(!controller.errors().is_empty());
    assert_eq!(controller.prev(), WizardStep::BasicInformation);
    assert!(controller.errors().is_empty());
}

#[tokio::test]
async fn submit_is_refused_before_the_final_step() {
    let harness = Harness::new();
    let mut controller = harness.controller(valid_form());

    let err = controller.submit().await.expect_err("not on final step");
    assert!(matches!(
        err,
        SubmissionError::NotOnFinalStep(WizardStep::BasicInformation)
    ));
    assert!(harness.records.attempts().is_empty());
}

#[tokio::test]
async fn end_to_end_without_logo_inserts_expected_payload() {
    let harness = Harness::new();
    let mut controller = harness.controller(valid_form());
    assert!(controller.initialize().await.is_some());
    walk_to_final(&mut controller);

    let now = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).single().expect("time");
    let receipt = controller.submit_at(now).await.expect("submitted");

    assert_eq!(receipt.outcome, InsertOutcome::Created);
    assert_eq!(receipt.navigate, Navigation::Directory);
    assert_eq!(receipt.logo_url, None);
    assert_eq!(receipt.user_id, identity().user_id);
    assert_eq!(controller.status(), SubmissionStatus::Submitted);
    assert!(harness.storage.objects().is_empty());

    let rows = harness.records.rows();
    assert_eq!(rows.len(), 1);
    let payload = serde_json::to_value(&rows[0]).expect("json");
    assert_eq!(payload["logo_url"], serde_json::Value::Null);
    assert_eq!(payload["brand_name"], serde_json::Value::Null);
    assert_eq!(payload["terms_accepted"], true);
    assert_eq!(payload["num_founders"], 2);
    assert_eq!(payload["team_size"], 12);
    assert!(payload["num_founders"].is_number());
    assert_eq!(payload["founders"], serde_json::json!([]));
    assert_eq!(payload["products"], serde_json::json!([]));
    assert_eq!(payload["entity_type"], "Private Limited");
    assert_eq!(payload["business_model"], "SaaS");
    assert_eq!(payload["incorporation_date"], "2023-04-01");
    assert_eq!(
        payload["idempotency_key"],
        controller.submission_id().to_string()
    );
    assert_eq!(payload["user_id"], identity().user_id.to_string());
}

#[tokio::test]
async fn structured_collections_keep_entry_order() {
    let harness = Harness::new();
    let mut form = valid_form();
    form.add_founder(FounderEntry {
        name: "Asha Rao".into(),
        email: "asha@acme.io".into(),
        linkedin: "linkedin.com/in/asharao".into(),
        role: "CEO".into(),
    });
    form.add_founder(FounderEntry {
        name: "Vikram Shah".into(),
        email: "vikram@acme.io".into(),
        linkedin: String::new(),
        role: "CTO".into(),
    });
    form.add_product("Ledger");
    form.add_product("Payments");
    let mut controller = harness.controller(form);
    walk_to_final(&mut controller);

    controller.submit().await.expect("submitted");

    let payload = serde_json::to_value(&harness.records.rows()[0]).expect("json");
    assert_eq!(payload["products"], serde_json::json!(["Ledger", "Payments"]));
    assert_eq!(payload["founders"][0]["linkedin"], "linkedin.com/in/asharao");
    assert_eq!(payload["founders"][1]["name"], "Vikram Shah");
    assert!(payload["founders"][1].get("linkedin").is_none());
}

#[tokio::test]
async fn malformed_founders_import_never_reaches_the_insert() {
    let harness = Harness::new();
    let mut controller = harness.controller(valid_form());
    walk_to_final(&mut controller);

    let err = controller
        .form_mut()
        .import_founders_json(r#"[{"name": "Alice", "email": }]"#)
        .expect_err("malformed");
    assert!(err.to_string().starts_with("founders must be a JSON array"));
    assert!(controller.form().founders.is_empty());
    assert!(harness.records.attempts().is_empty());
}

#[tokio::test]
async fn unresolvable_identity_blocks_upload_and_insert() {
    let harness = Harness {
        identity: FakeIdentity::anonymous(),
        ..Harness::new()
    };
    let mut form = valid_form();
    form.logo = Some(logo());
    let mut controller = harness.controller(form);
    assert!(controller.initialize().await.is_none());
    walk_to_final(&mut controller);

    let err = controller.submit().await.expect_err("unauthenticated");
    assert!(matches!(err, SubmissionError::Unauthenticated { .. }));
    assert!(err.requires_reauth());
    assert_eq!(harness.identity.lookups(), 2);
    assert!(harness.storage.objects().is_empty());
    assert!(harness.records.attempts().is_empty());
    assert_eq!(controller.status(), SubmissionStatus::Editing);
}

#[tokio::test]
async fn failing_identity_provider_is_a_lookup_error_not_a_sign_out() {
    let storage = Arc::new(FakeStorage::default());
    let records = Arc::new(FakeRecords::default());
    let mut form = valid_form();
    form.logo = Some(logo());
    let mut controller = WizardController::new(
        Arc::new(MissingIdentityProvider::default()),
        storage.clone(),
        records.clone(),
    )
    .with_form(form);
    walk_to_final(&mut controller);

    let err = controller.submit().await.expect_err("lookup failed");
    match &err {
        SubmissionError::IdentityLookup(error) => {
            assert!(error.to_string().contains("identity provider is unavailable"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!err.requires_reauth());
    assert!(storage.objects().is_empty());
    assert!(records.attempts().is_empty());
    assert_eq!(controller.status(), SubmissionStatus::Editing);
}

#[tokio::test]
async fn missing_storage_degrades_to_null_logo() {
    let records = Arc::new(FakeRecords::default());
    let mut form = valid_form();
    form.logo = Some(logo());
    let mut controller = WizardController::new(
        FakeIdentity::signed_in(),
        Arc::new(MissingObjectStorage),
        records.clone(),
    )
    .with_form(form);
    walk_to_final(&mut controller);

    let receipt = controller.submit().await.expect("submitted");
    assert_eq!(receipt.logo_url, None);
    assert_eq!(records.rows().len(), 1);
}

#[tokio::test]
async fn logo_is_uploaded_under_the_users_folder() {
    let harness = Harness::new();
    let mut form = valid_form();
    form.logo = Some(logo());
    let mut controller = harness.controller(form);
    walk_to_final(&mut controller);

    let receipt = controller.submit().await.expect("submitted");

    let path = format!("logos/{}/acme-logo.png", identity().user_id);
    assert_eq!(harness.storage.objects(), vec![path.clone()]);
    let url = format!("https://cdn.test/{path}");
    assert_eq!(receipt.logo_url.as_deref(), Some(url.as_str()));
    assert_eq!(
        harness.records.rows()[0].logo_url.as_deref(),
        Some(url.as_str())
    );
}

#[tokio::test]
async fn degraded_upload_still_inserts_with_null_logo() {
    let harness = Harness {
        storage: FakeStorage::failing(),
        ..Harness::new()
    };
    let mut form = valid_form();
    form.logo = Some(logo());
    let mut controller = harness.controller(form);
    assert_eq!(
        controller.upload_failure_policy(),
        UploadFailurePolicy::Degrade
    );
    walk_to_final(&mut controller);

    let receipt = controller.submit().await.expect("submitted");
    assert_eq!(receipt.logo_url, None);
    assert_eq!(harness.records.rows()[0].logo_url, None);
}

#[tokio::test]
async fn aborting_upload_policy_skips_the_insert() {
    let harness = Harness {
        storage: FakeStorage::failing(),
        ..Harness::new()
    };
    let mut form = valid_form();
    form.logo = Some(logo());
    let mut controller = harness
        .controller(form)
        .with_upload_failure_policy(UploadFailurePolicy::Abort);
    walk_to_final(&mut controller);

    let err = controller.submit().await.expect_err("upload failed");
    assert!(matches!(err, SubmissionError::Upload(_)));
    assert!(!err.requires_reauth());
    assert!(harness.records.attempts().is_empty());
    assert_eq!(controller.status(), SubmissionStatus::Editing);
}

#[tokio::test]
async fn retry_after_insert_failure_reuses_the_idempotency_key() {
    let harness = Harness {
        records: FakeRecords::failing_once(),
        ..Harness::new()
    };
    let mut controller = harness.controller(valid_form());
    walk_to_final(&mut controller);

    let err = controller.submit().await.expect_err("first attempt fails");
    assert!(matches!(err, SubmissionError::Insert(_)));
    assert!(err.user_message().contains("Backend unreachable"));
    assert_eq!(controller.step(), WizardStep::FinalDetails);
    assert_eq!(controller.status(), SubmissionStatus::Editing);

    let receipt = controller.submit().await.expect("retry succeeds");
    assert_eq!(receipt.outcome, InsertOutcome::Created);

    let key = controller.submission_id();
    assert_eq!(harness.records.attempts(), vec![key, key]);
    assert_eq!(harness.records.rows().len(), 1);

    let err = controller.submit().await.expect_err("already submitted");
    assert!(matches!(err, SubmissionError::AlreadySubmitted(id) if id == key));
    assert_eq!(harness.records.attempts().len(), 2);
}

#[tokio::test]
async fn retry_after_lost_response_is_acknowledged_as_duplicate() {
    let harness = Harness::new();
    *harness.records.lose_response.lock().expect("lose") = true;
    let mut controller = harness.controller(valid_form());
    walk_to_final(&mut controller);

    controller.submit().await.expect_err("response lost");
    let receipt = controller.submit().await.expect("retry acknowledged");

    assert_eq!(receipt.outcome, InsertOutcome::AlreadyRecorded);
    assert_eq!(harness.records.rows().len(), 1);
}

#[tokio::test]
async fn submit_reports_first_invalid_step() {
    let harness = Harness::new();
    let mut controller = harness.controller(valid_form());
    walk_to_final(&mut controller);

    controller.form_mut().contact_email = "asha-at-acme".into();
    controller.form_mut().pitch = "x".repeat(501);

    let err = controller.submit().await.expect_err("invalid");
    match err {
        SubmissionError::Validation(failed) => {
            assert_eq!(failed.step, WizardStep::ContactDetails);
            assert!(failed.errors.contains(Field::ContactEmail));
            assert!(!failed.errors.contains(Field::Pitch));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(controller.errors().contains(Field::ContactEmail));
    assert_eq!(controller.step(), WizardStep::FinalDetails);
    assert!(harness.records.attempts().is_empty());
}

#[tokio::test]
async fn terms_must_be_accepted_to_submit() {
    let harness = Harness::new();
    let mut controller = harness.controller(valid_form());
    walk_to_final(&mut controller);
    controller.form_mut().terms_accepted = false;

    let err = controller.submit().await.expect_err("terms");
    assert!(matches!(
        err,
        SubmissionError::Validation(ref failed) if failed.step == WizardStep::FinalDetails
    ));
    assert!(controller.errors().contains(Field::TermsAccepted));
}

#[tokio::test]
async fn auth_events_update_identity_and_request_navigation() {
    let harness = Harness {
        identity: FakeIdentity::anonymous(),
        ..Harness::new()
    };
    let mut controller = harness.controller(valid_form());
    walk_to_final(&mut controller);

    harness
        .identity
        .events
        .send(AuthEvent::SignedIn(identity()))
        .expect("subscriber");
    assert_eq!(controller.poll_auth_events(), None);
    assert_eq!(controller.identity(), Some(&identity()));

    let receipt = controller.submit().await.expect("submitted with event identity");
    assert_eq!(receipt.user_id, identity().user_id);
    assert_eq!(harness.identity.lookups(), 0);

    harness
        .identity
        .events
        .send(AuthEvent::SignedOut)
        .expect("subscriber");
    assert_eq!(controller.poll_auth_events(), Some(Navigation::SignIn));
    assert_eq!(controller.identity(), None);
    assert_eq!(controller.poll_auth_events(), None);
}

#[test]
fn each_draft_gets_its_own_idempotency_key() {
    let harness = Harness::new();
    let first = harness.controller(valid_form());
    let second = harness.controller(valid_form());
    assert_ne!(first.submission_id(), second.submission_id());
}
