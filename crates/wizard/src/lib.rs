pub mod controller;
pub mod form;
pub mod steps;
pub mod validation;

pub use controller::{
    events::{FailureCategory, Navigation, SubmissionError, SubmissionReceipt, SubmissionStatus},
    orchestration::WizardController,
};
pub use form::{Field, FormError, FounderEntry, ProfileForm};
pub use steps::WizardStep;
pub use validation::{
    is_valid_email, validate_profile, validate_step, FieldError, StepErrors, ValidatedProfile,
    ValidationErrors, PITCH_MAX_CHARS,
};

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod controller_tests;
