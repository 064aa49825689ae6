//! Outcomes the controller hands back to the shell, and submission error modeling.

use shared::{
    domain::{SubmissionId, UserId},
    error::{ApiException, ErrorCode},
    protocol::InsertOutcome,
};
use thiserror::Error;

use crate::{steps::WizardStep, validation::StepErrors};

/// Where the shell should take the user next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    SignIn,
    Directory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStatus {
    Editing,
    Submitted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub submission_id: SubmissionId,
    pub user_id: UserId,
    pub logo_url: Option<String>,
    pub outcome: InsertOutcome,
    pub navigate: Navigation,
}

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("submission is only possible from the last step, currently on {0}")]
    NotOnFinalStep(WizardStep),
    #[error("{} is incomplete: {}", .0.step, .0.errors)]
    Validation(StepErrors),
    #[error("no signed-in user: {reason}")]
    Unauthenticated { reason: String },
    #[error("could not look up the signed-in user: {0:#}")]
    IdentityLookup(#[source] anyhow::Error),
    #[error("logo upload failed: {0:#}")]
    Upload(#[source] anyhow::Error),
    #[error("saving the profile failed: {0:#}")]
    Insert(#[source] anyhow::Error),
    #[error("profile was already submitted as {0}")]
    AlreadySubmitted(SubmissionId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    Auth,
    Transport,
    Validation,
    Rejected,
    Unknown,
}

fn classify_backend_failure(error: &anyhow::Error) -> FailureCategory {
    if let Some(api) = error.downcast_ref::<ApiException>() {
        return match api.code {
            ErrorCode::Unauthorized => FailureCategory::Auth,
            ErrorCode::Validation | ErrorCode::Conflict => FailureCategory::Validation,
            ErrorCode::Forbidden | ErrorCode::NotFound => FailureCategory::Rejected,
            ErrorCode::RateLimited | ErrorCode::Internal => FailureCategory::Transport,
        };
    }
    if let Some(http) = error.downcast_ref::<reqwest::Error>() {
        if http.is_connect() || http.is_timeout() || http.is_request() {
            return FailureCategory::Transport;
        }
    }
    FailureCategory::Unknown
}

impl SubmissionError {
    pub fn category(&self) -> FailureCategory {
        match self {
            Self::NotOnFinalStep(_) | Self::Validation(_) | Self::AlreadySubmitted(_) => {
                FailureCategory::Validation
            }
            Self::Unauthenticated { .. } => FailureCategory::Auth,
            Self::IdentityLookup(error) | Self::Upload(error) | Self::Insert(error) => {
                classify_backend_failure(error)
            }
        }
    }

    pub fn requires_reauth(&self) -> bool {
        self.category() == FailureCategory::Auth
    }

    /// Short message suitable for a toast or status line.
    pub fn user_message(&self) -> String {
        match self {
            Self::NotOnFinalStep(_) => "Finish the remaining steps before submitting.".to_string(),
            Self::Validation(failed) => {
                format!("Please fix the highlighted fields in {}.", failed.step.title())
            }
            Self::Unauthenticated { .. } => "Please sign in again to submit your profile.".to_string(),
            Self::AlreadySubmitted(_) => "Your profile has already been submitted.".to_string(),
            Self::IdentityLookup(error) | Self::Upload(error) | Self::Insert(error) => {
                let action = match self {
                    Self::IdentityLookup(_) => "confirm your account",
                    Self::Upload(_) => "upload your logo",
                    _ => "create your profile",
                };
                match classify_backend_failure(error) {
                    FailureCategory::Auth => {
                        format!("Your session has expired; sign in again to {action}.")
                    }
                    FailureCategory::Transport => {
                        format!("Backend unreachable; could not {action}. Please retry.")
                    }
                    FailureCategory::Rejected => {
                        format!("The backend refused to {action} for this account.")
                    }
                    FailureCategory::Validation | FailureCategory::Unknown => {
                        format!("Failed to {action}. Please try again.")
                    }
                }
            }
        }
    }
}
