use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    BusinessModel, ContactRole, EntityType, Sector, Stage, SubmissionId, UserId,
};

pub const STARTUPS_TABLE: &str = "startups";
pub const STARTUP_UPLOADS_BUCKET: &str = "startup-uploads";
pub const LOGO_FOLDER: &str = "logos";
/// Column the backend deduplicates inserts on.
pub const IDEMPOTENCY_COLUMN: &str = "idempotency_key";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FounderRecord {
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    pub role: String,
}

/// Row inserted into the startups table once the wizard completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartupRecord {
    pub user_id: UserId,
    pub idempotency_key: SubmissionId,
    pub startup_name: String,
    pub brand_name: Option<String>,
    pub incorporation_date: NaiveDate,
    pub entity_type: EntityType,
    pub registration_number: String,
    pub pan_number: String,
    pub address: String,
    pub contact_name: String,
    pub contact_role: ContactRole,
    pub contact_email: String,
    pub contact_phone: String,
    pub num_founders: u32,
    pub team_size: u32,
    pub sector: Sector,
    pub pitch: String,
    pub problem_statement: String,
    pub target_market: String,
    pub stage: Stage,
    pub business_model: BusinessModel,
    pub product_description: String,
    pub products: Vec<String>,
    pub founders: Vec<FounderRecord>,
    pub logo_url: Option<String>,
    pub terms_accepted: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertOutcome {
    Created,
    /// The backend already holds a row with the same idempotency key.
    AlreadyRecorded,
}
