//! Drives the wizard: step transitions, auth-state tracking and the submit pipeline.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use client_core::{
    try_upload_file, upload_file, AuthEvent, IdentityProvider, ObjectStorage, RecordStore,
    UploadFailurePolicy, UserIdentity,
};
use shared::{domain::SubmissionId, protocol::LOGO_FOLDER};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, info, warn};

use super::{
    events::{Navigation, SubmissionError, SubmissionReceipt, SubmissionStatus},
    submission::build_record,
};
use crate::{
    form::ProfileForm,
    steps::WizardStep,
    validation::{validate_profile, validate_step, ValidationErrors},
};

pub struct WizardController {
    step: WizardStep,
    form: ProfileForm,
    errors: ValidationErrors,
    identity: Option<UserIdentity>,
    submission_id: SubmissionId,
    status: SubmissionStatus,
    upload_failure_policy: UploadFailurePolicy,
    identity_provider: Arc<dyn IdentityProvider>,
    storage: Arc<dyn ObjectStorage>,
    records: Arc<dyn RecordStore>,
    auth_events: broadcast::Receiver<AuthEvent>,
}

impl WizardController {
    pub fn new(
        identity_provider: Arc<dyn IdentityProvider>,
        storage: Arc<dyn ObjectStorage>,
        records: Arc<dyn RecordStore>,
    ) -> Self {
        let auth_events = identity_provider.subscribe_auth_events();
        Self {
            step: WizardStep::FIRST,
            form: ProfileForm::default(),
            errors: ValidationErrors::default(),
            identity: None,
            submission_id: SubmissionId::new_v4(),
            status: SubmissionStatus::Editing,
            upload_failure_policy: UploadFailurePolicy::default(),
            identity_provider,
            storage,
            records,
            auth_events,
        }
    }

    pub fn with_upload_failure_policy(mut self, policy: UploadFailurePolicy) -> Self {
        self.upload_failure_policy = policy;
        self
    }

    pub fn with_form(mut self, form: ProfileForm) -> Self {
        self.form = form;
        self
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn form(&self) -> &ProfileForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut ProfileForm {
        &mut self.form
    }

    /// Field errors from the last failed `next()` or submit.
    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn identity(&self) -> Option<&UserIdentity> {
        self.identity.as_ref()
    }

    /// Idempotency key of this draft; stable across submit retries.
    pub fn submission_id(&self) -> SubmissionId {
        self.submission_id
    }

    pub fn status(&self) -> SubmissionStatus {
        self.status
    }

    pub fn upload_failure_policy(&self) -> UploadFailurePolicy {
        self.upload_failure_policy
    }

    /// One-off identity lookup when the wizard is first shown. A provider
    /// failure leaves the wizard usable; submit will ask again.
    pub async fn initialize(&mut self) -> Option<UserIdentity> {
        match self.identity_provider.current_user().await {
            Ok(Some(identity)) => {
                info!(user_id = %identity.user_id, "wizard: identity resolved on start");
                self.identity = Some(identity);
            }
            Ok(None) => debug!("wizard: no signed-in user on start"),
            Err(error) => warn!(error = %format!("{error:#}"), "wizard: identity lookup failed on start"),
        }
        self.identity.clone()
    }

    pub fn observe_auth_event(&mut self, event: AuthEvent) -> Option<Navigation> {
        match event {
            AuthEvent::SignedIn(identity) => {
                info!(user_id = %identity.user_id, "wizard: signed in");
                self.identity = Some(identity);
                None
            }
            AuthEvent::SignedOut => {
                info!("wizard: signed out; redirecting to sign-in");
                self.identity = None;
                Some(Navigation::SignIn)
            }
        }
    }

    /// Applies every auth event queued since the last poll and returns the
    /// navigation requested by the most recent one, if any.
    pub fn poll_auth_events(&mut self) -> Option<Navigation> {
        let mut navigation = None;
        loop {
            match self.auth_events.try_recv() {
                Ok(event) => {
                    if let Some(requested) = self.observe_auth_event(event) {
                        navigation = Some(requested);
                    }
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "wizard: auth events dropped");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        navigation
    }

    /// Checks the current step without moving.
    pub fn validate_current(&mut self) -> bool {
        match validate_step(self.step, &self.form) {
            Ok(()) => {
                self.errors = ValidationErrors::default();
                true
            }
            Err(errors) => {
                debug!(step = %self.step, error_count = errors.len(), "wizard: step invalid");
                self.errors = errors;
                false
            }
        }
    }

    /// Advances once the current step validates. Stays put otherwise, with
    /// the field errors available from [`Self::errors`].
    pub fn next(&mut self) -> WizardStep {
        if self.step.is_last() {
            return self.step;
        }
        if self.validate_current() {
            self.step = self.step.next();
            debug!(step = %self.step, "wizard: advanced");
        }
        self.step
    }

    pub fn prev(&mut self) -> WizardStep {
        self.step = self.step.prev();
        self.errors = ValidationErrors::default();
        self.step
    }

    pub async fn submit(&mut self) -> Result<SubmissionReceipt, SubmissionError> {
        self.submit_at(Utc::now()).await
    }

    pub async fn submit_at(
        &mut self,
        now: DateTime<Utc>,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        if self.status == SubmissionStatus::Submitted {
            return Err(SubmissionError::AlreadySubmitted(self.submission_id));
        }
        if !self.step.is_last() {
            return Err(SubmissionError::NotOnFinalStep(self.step));
        }

        let profile = match validate_profile(&self.form) {
            Ok(profile) => profile,
            Err(failed) => {
                warn!(step = %failed.step, errors = %failed.errors, "wizard: submit blocked by validation");
                self.errors = failed.errors.clone();
                return Err(SubmissionError::Validation(failed));
            }
        };
        self.errors = ValidationErrors::default();

        let identity = self.resolve_identity().await?;
        let user_id = identity.user_id;

        let logo_url = match self.form.logo.as_ref() {
            None => None,
            Some(logo) => match self.upload_failure_policy {
                UploadFailurePolicy::Degrade => {
                    upload_file(self.storage.as_ref(), logo, LOGO_FOLDER, user_id).await
                }
                UploadFailurePolicy::Abort => Some(
                    try_upload_file(self.storage.as_ref(), logo, LOGO_FOLDER, user_id)
                        .await
                        .map_err(SubmissionError::Upload)?,
                ),
            },
        };

        let record = build_record(profile, user_id, self.submission_id, logo_url.clone(), now);
        let outcome = self.records.insert_startup(&record).await.map_err(|error| {
            warn!(
                submission_id = %self.submission_id,
                error = %format!("{error:#}"),
                "wizard: profile insert failed"
            );
            SubmissionError::Insert(error)
        })?;

        self.status = SubmissionStatus::Submitted;
        info!(
            submission_id = %self.submission_id,
            %user_id,
            has_logo = logo_url.is_some(),
            ?outcome,
            "wizard: profile submitted"
        );

        Ok(SubmissionReceipt {
            submission_id: self.submission_id,
            user_id,
            logo_url,
            outcome,
            navigate: Navigation::Directory,
        })
    }

    async fn resolve_identity(&mut self) -> Result<UserIdentity, SubmissionError> {
        if let Some(identity) = &self.identity {
            debug!(user_id = %identity.user_id, source = "session", "wizard: identity for submit");
            return Ok(identity.clone());
        }

        match self.identity_provider.current_user().await {
            Ok(Some(identity)) => {
                debug!(user_id = %identity.user_id, source = "provider", "wizard: identity for submit");
                self.identity = Some(identity.clone());
                Ok(identity)
            }
            Ok(None) => Err(SubmissionError::Unauthenticated {
                reason: "no active session".to_string(),
            }),
            Err(error) => {
                warn!(error = %format!("{error:#}"), "wizard: identity lookup failed at submit");
                Err(SubmissionError::IdentityLookup(error))
            }
        }
    }
}
