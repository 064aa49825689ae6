//! Raw form state as the user entered it. Nothing here is validated; see
//! [`crate::validation`] for the per-step schema.

use std::fmt;

use client_core::UploadFile;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    StartupName,
    BrandName,
    IncorporationDate,
    EntityType,
    RegistrationNumber,
    PanNumber,
    Address,
    ContactName,
    ContactRole,
    ContactEmail,
    ContactPhone,
    NumFounders,
    TeamSize,
    Sector,
    Stage,
    BusinessModel,
    Pitch,
    ProblemStatement,
    TargetMarket,
    ProductDescription,
    Founders,
    Products,
    Logo,
    TermsAccepted,
}

impl Field {
    pub const ALL: [Field; 24] = [
        Field::StartupName,
        Field::BrandName,
        Field::IncorporationDate,
        Field::EntityType,
        Field::RegistrationNumber,
        Field::PanNumber,
        Field::Address,
        Field::ContactName,
        Field::ContactRole,
        Field::ContactEmail,
        Field::ContactPhone,
        Field::NumFounders,
        Field::TeamSize,
        Field::Sector,
        Field::Stage,
        Field::BusinessModel,
        Field::Pitch,
        Field::ProblemStatement,
        Field::TargetMarket,
        Field::ProductDescription,
        Field::Founders,
        Field::Products,
        Field::Logo,
        Field::TermsAccepted,
    ];

    /// Wire name, shared with the inserted record's column.
    pub fn name(self) -> &'static str {
        match self {
            Self::StartupName => "startup_name",
            Self::BrandName => "brand_name",
            Self::IncorporationDate => "incorporation_date",
            Self::EntityType => "entity_type",
            Self::RegistrationNumber => "registration_number",
            Self::PanNumber => "pan_number",
            Self::Address => "address",
            Self::ContactName => "contact_name",
            Self::ContactRole => "contact_role",
            Self::ContactEmail => "contact_email",
            Self::ContactPhone => "contact_phone",
            Self::NumFounders => "num_founders",
            Self::TeamSize => "team_size",
            Self::Sector => "sector",
            Self::Stage => "stage",
            Self::BusinessModel => "business_model",
            Self::Pitch => "pitch",
            Self::ProblemStatement => "problem_statement",
            Self::TargetMarket => "target_market",
            Self::ProductDescription => "product_description",
            Self::Founders => "founders",
            Self::Products => "products",
            Self::Logo => "logo",
            Self::TermsAccepted => "terms_accepted",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::StartupName => "Startup Name",
            Self::BrandName => "Brand Name",
            Self::IncorporationDate => "Incorporation Date",
            Self::EntityType => "Entity Type",
            Self::RegistrationNumber => "Registration Number",
            Self::PanNumber => "PAN Number",
            Self::Address => "Registered Address",
            Self::ContactName => "Primary Contact Name",
            Self::ContactRole => "Contact Role",
            Self::ContactEmail => "Contact Email",
            Self::ContactPhone => "Contact Phone",
            Self::NumFounders => "Number of Founders",
            Self::TeamSize => "Team Size",
            Self::Sector => "Sector",
            Self::Stage => "Stage",
            Self::BusinessModel => "Business Model",
            Self::Pitch => "Elevator Pitch",
            Self::ProblemStatement => "Problem Statement",
            Self::TargetMarket => "Target Market",
            Self::ProductDescription => "Product Description",
            Self::Founders => "Founders",
            Self::Products => "Products",
            Self::Logo => "Logo",
            Self::TermsAccepted => "Terms",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.name() == name.trim())
    }

    pub fn is_text(self) -> bool {
        !matches!(
            self,
            Self::Founders | Self::Products | Self::Logo | Self::TermsAccepted
        )
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One row of the repeatable founders sub-form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FounderEntry {
    pub name: String,
    pub email: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub linkedin: String,
    pub role: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Error)]
pub enum FormError {
    #[error("field '{0}' is not a text input")]
    NotText(Field),
    #[error("founders must be a JSON array of {{name, email, linkedin, role}} objects: {0}")]
    FoundersJson(#[source] serde_json::Error),
    #[error("products must be a JSON array of strings: {0}")]
    ProductsJson(#[source] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileForm {
    pub startup_name: String,
    pub brand_name: String,
    pub incorporation_date: String,
    pub entity_type: String,
    pub registration_number: String,
    pub pan_number: String,
    pub address: String,
    pub contact_name: String,
    pub contact_role: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub num_founders: String,
    pub team_size: String,
    pub sector: String,
    pub stage: String,
    pub business_model: String,
    pub pitch: String,
    pub problem_statement: String,
    pub target_market: String,
    pub product_description: String,
    pub founders: Vec<FounderEntry>,
    pub products: Vec<String>,
    pub logo: Option<UploadFile>,
    pub terms_accepted: bool,
}

impl ProfileForm {
    fn text_slot(&mut self, field: Field) -> Option<&mut String> {
        let slot = match field {
            Field::StartupName => &mut self.startup_name,
            Field::BrandName => &mut self.brand_name,
            Field::IncorporationDate => &mut self.incorporation_date,
            Field::EntityType => &mut self.entity_type,
            Field::RegistrationNumber => &mut self.registration_number,
            Field::PanNumber => &mut self.pan_number,
            Field::Address => &mut self.address,
            Field::ContactName => &mut self.contact_name,
            Field::ContactRole => &mut self.contact_role,
            Field::ContactEmail => &mut self.contact_email,
            Field::ContactPhone => &mut self.contact_phone,
            Field::NumFounders => &mut self.num_founders,
            Field::TeamSize => &mut self.team_size,
            Field::Sector => &mut self.sector,
            Field::Stage => &mut self.stage,
            Field::BusinessModel => &mut self.business_model,
            Field::Pitch => &mut self.pitch,
            Field::ProblemStatement => &mut self.problem_statement,
            Field::TargetMarket => &mut self.target_market,
            Field::ProductDescription => &mut self.product_description,
            Field::Founders | Field::Products | Field::Logo | Field::TermsAccepted => return None,
        };
        Some(slot)
    }

    pub fn set_text(&mut self, field: Field, value: impl Into<String>) -> Result<(), FormError> {
        let slot = self.text_slot(field).ok_or(FormError::NotText(field))?;
        *slot = value.into();
        Ok(())
    }

    pub fn text(&self, field: Field) -> Option<&str> {
        let value = match field {
            Field::StartupName => &self.startup_name,
            Field::BrandName => &self.brand_name,
            Field::IncorporationDate => &self.incorporation_date,
            Field::EntityType => &self.entity_type,
            Field::RegistrationNumber => &self.registration_number,
            Field::PanNumber => &self.pan_number,
            Field::Address => &self.address,
            Field::ContactName => &self.contact_name,
            Field::ContactRole => &self.contact_role,
            Field::ContactEmail => &self.contact_email,
            Field::ContactPhone => &self.contact_phone,
            Field::NumFounders => &self.num_founders,
            Field::TeamSize => &self.team_size,
            Field::Sector => &self.sector,
            Field::Stage => &self.stage,
            Field::BusinessModel => &self.business_model,
            Field::Pitch => &self.pitch,
            Field::ProblemStatement => &self.problem_statement,
            Field::TargetMarket => &self.target_market,
            Field::ProductDescription => &self.product_description,
            Field::Founders | Field::Products | Field::Logo | Field::TermsAccepted => return None,
        };
        Some(value.as_str())
    }

    pub fn add_founder(&mut self, founder: FounderEntry) -> usize {
        self.founders.push(founder);
        self.founders.len() - 1
    }

    pub fn remove_founder(&mut self, index: usize) -> Option<FounderEntry> {
        (index < self.founders.len()).then(|| self.founders.remove(index))
    }

    pub fn add_product(&mut self, product: impl Into<String>) -> usize {
        self.products.push(product.into());
        self.products.len() - 1
    }

    pub fn remove_product(&mut self, index: usize) -> Option<String> {
        (index < self.products.len()).then(|| self.products.remove(index))
    }

    /// Replaces the founders with a legacy JSON array. Blank text clears the
    /// list; on error the current founders are kept.
    pub fn import_founders_json(&mut self, text: &str) -> Result<usize, FormError> {
        let founders = if text.trim().is_empty() {
            Vec::new()
        } else {
            serde_json::from_str::<Vec<FounderEntry>>(text).map_err(FormError::FoundersJson)?
        };
        self.founders = founders;
        Ok(self.founders.len())
    }

    /// Replaces the products with a legacy JSON array of strings.
    pub fn import_products_json(&mut self, text: &str) -> Result<usize, FormError> {
        let products = if text.trim().is_empty() {
            Vec::new()
        } else {
            serde_json::from_str::<Vec<String>>(text).map_err(FormError::ProductsJson)?
        };
        self.products = products;
        Ok(self.products.len())
    }
}
