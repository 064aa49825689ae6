use chrono::{DateTime, Utc};
use shared::{
    domain::{SubmissionId, UserId},
    protocol::StartupRecord,
};

use crate::validation::ValidatedProfile;

/// Flattens the validated sections into the insert payload. Only a fully
/// validated profile reaches this point, so terms are always accepted.
pub fn build_record(
    profile: ValidatedProfile,
    user_id: UserId,
    idempotency_key: SubmissionId,
    logo_url: Option<String>,
    created_at: DateTime<Utc>,
) -> StartupRecord {
    let ValidatedProfile {
        basic,
        contact,
        business,
        product,
        final_details,
    } = profile;

    StartupRecord {
        user_id,
        idempotency_key,
        startup_name: basic.startup_name,
        brand_name: basic.brand_name,
        incorporation_date: basic.incorporation_date,
        entity_type: basic.entity_type,
        registration_number: basic.registration_number,
        pan_number: basic.pan_number,
        address: basic.address,
        contact_name: contact.contact_name,
        contact_role: contact.contact_role,
        contact_email: contact.contact_email,
        contact_phone: contact.contact_phone,
        num_founders: business.num_founders,
        team_size: business.team_size,
        sector: business.sector,
        stage: business.stage,
        business_model: business.business_model,
        pitch: product.pitch,
        problem_statement: product.problem_statement,
        target_market: product.target_market,
        product_description: product.product_description,
        products: final_details.products,
        founders: final_details.founders,
        logo_url,
        terms_accepted: true,
        created_at,
    }
}
