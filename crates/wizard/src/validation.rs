//! Per-step validation schema. Each step parses its slice of the raw form
//! into a typed section; a step may only be left forward once its section
//! parses without errors.

use std::{fmt, str::FromStr, sync::OnceLock};

use chrono::NaiveDate;
use regex::Regex;
use shared::{
    domain::{BusinessModel, ContactRole, EntityType, Sector, Stage},
    protocol::FounderRecord,
};

use crate::{
    form::{Field, ProfileForm},
    steps::WizardStep,
};

pub const PITCH_MAX_CHARS: usize = 500;
pub const MIN_FOUNDERS: i64 = 1;
pub const MIN_TEAM_SIZE: i64 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: Field,
    /// Row index for errors inside a repeatable sub-form.
    pub entry: Option<usize>,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.entry {
            Some(entry) => write!(f, "{} #{}: {}", self.field, entry + 1, self.message),
            None => write!(f, "{}: {}", self.field, self.message),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    pub fn for_field(&self, field: Field) -> impl Iterator<Item = &FieldError> {
        self.errors.iter().filter(move |e| e.field == field)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.for_field(field).next().is_some()
    }

    fn push(&mut self, field: Field, entry: Option<usize>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            entry,
            message: message.into(),
        });
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Errors of the first step that failed during a whole-profile check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepErrors {
    pub step: WizardStep,
    pub errors: ValidationErrors,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicSection {
    pub startup_name: String,
    pub brand_name: Option<String>,
    pub incorporation_date: NaiveDate,
    pub entity_type: EntityType,
    pub registration_number: String,
    pub pan_number: String,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactSection {
    pub contact_name: String,
    pub contact_role: ContactRole,
    pub contact_email: String,
    pub contact_phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusinessSection {
    pub num_founders: u32,
    pub team_size: u32,
    pub sector: Sector,
    pub stage: Stage,
    pub business_model: BusinessModel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSection {
    pub pitch: String,
    pub problem_statement: String,
    pub target_market: String,
    pub product_description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalSection {
    pub founders: Vec<FounderRecord>,
    pub products: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedProfile {
    pub basic: BasicSection,
    pub contact: ContactSection,
    pub business: BusinessSection,
    pub product: ProductSection,
    pub final_details: FinalSection,
}

pub fn is_valid_email(value: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let regex = RE.get_or_init(|| {
        Regex::new(r"(?i)^[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}$")
            .expect("email pattern compiles")
    });
    regex.is_match(value)
}

#[derive(Default)]
struct Checks {
    errors: ValidationErrors,
}

impl Checks {
    fn required(&mut self, field: Field, value: &str, message: &str) -> Option<String> {
        self.required_entry(field, None, value, message)
    }

    fn required_entry(
        &mut self,
        field: Field,
        entry: Option<usize>,
        value: &str,
        message: &str,
    ) -> Option<String> {
        let value = value.trim();
        if value.is_empty() {
            self.errors.push(field, entry, message);
            return None;
        }
        Some(value.to_string())
    }

    fn choice<T>(&mut self, field: Field, value: &str, required: &str) -> Option<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        let value = self.required(field, value, required)?;
        match value.parse::<T>() {
            Ok(choice) => Some(choice),
            Err(err) => {
                self.errors.push(field, None, format!("Select a valid option ({err})"));
                None
            }
        }
    }

    fn count(
        &mut self,
        field: Field,
        value: &str,
        required: &str,
        min: i64,
        below_min: &str,
    ) -> Option<u32> {
        let value = self.required(field, value, required)?;
        let Ok(parsed) = value.parse::<i64>() else {
            self.errors
                .push(field, None, format!("{} must be a whole number", field.label()));
            return None;
        };
        if parsed < min {
            self.errors.push(field, None, below_min);
            return None;
        }
        match u32::try_from(parsed) {
            Ok(count) => Some(count),
            Err(_) => {
                self.errors
                    .push(field, None, format!("{} is too large", field.label()));
                None
            }
        }
    }

    fn date(&mut self, field: Field, value: &str, required: &str) -> Option<NaiveDate> {
        let value = self.required(field, value, required)?;
        match NaiveDate::parse_from_str(&value, "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(_) => {
                self.errors
                    .push(field, None, "Enter the date as YYYY-MM-DD");
                None
            }
        }
    }

    fn email(
        &mut self,
        field: Field,
        entry: Option<usize>,
        value: &str,
        required: &str,
    ) -> Option<String> {
        let value = self.required_entry(field, entry, value, required)?;
        if !is_valid_email(&value) {
            self.errors.push(field, entry, "Invalid email address");
            return None;
        }
        Some(value)
    }
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn check_basic(form: &ProfileForm, checks: &mut Checks) -> Option<BasicSection> {
    let startup_name =
        checks.required(Field::StartupName, &form.startup_name, "Startup name is required");
    let incorporation_date =
        checks.date(Field::IncorporationDate, &form.incorporation_date, "Date is required");
    let entity_type =
        checks.choice(Field::EntityType, &form.entity_type, "Entity type is required");
    let registration_number = checks.required(
        Field::RegistrationNumber,
        &form.registration_number,
        "Registration number is required",
    );
    let pan_number = checks.required(Field::PanNumber, &form.pan_number, "PAN number is required");
    let address = checks.required(Field::Address, &form.address, "Address is required");

    Some(BasicSection {
        startup_name: startup_name?,
        brand_name: optional(&form.brand_name),
        incorporation_date: incorporation_date?,
        entity_type: entity_type?,
        registration_number: registration_number?,
        pan_number: pan_number?,
        address: address?,
    })
}

fn check_contact(form: &ProfileForm, checks: &mut Checks) -> Option<ContactSection> {
    let contact_name =
        checks.required(Field::ContactName, &form.contact_name, "Contact name is required");
    let contact_role =
        checks.choice(Field::ContactRole, &form.contact_role, "Contact role is required");
    let contact_email = checks.email(
        Field::ContactEmail,
        None,
        &form.contact_email,
        "Email is required",
    );
    let contact_phone =
        checks.required(Field::ContactPhone, &form.contact_phone, "Phone number is required");

    Some(ContactSection {
        contact_name: contact_name?,
        contact_role: contact_role?,
        contact_email: contact_email?,
        contact_phone: contact_phone?,
    })
}

fn check_business(form: &ProfileForm, checks: &mut Checks) -> Option<BusinessSection> {
    let num_founders = checks.count(
        Field::NumFounders,
        &form.num_founders,
        "Number of founders is required",
        MIN_FOUNDERS,
        "Must have at least 1 founder",
    );
    let team_size = checks.count(
        Field::TeamSize,
        &form.team_size,
        "Team size is required",
        MIN_TEAM_SIZE,
        "Team size must be at least 1",
    );
    let sector = checks.choice(Field::Sector, &form.sector, "Sector is required");
    let stage = checks.choice(Field::Stage, &form.stage, "Stage is required");
    let business_model = checks.choice(
        Field::BusinessModel,
        &form.business_model,
        "Business model is required",
    );

    Some(BusinessSection {
        num_founders: num_founders?,
        team_size: team_size?,
        sector: sector?,
        stage: stage?,
        business_model: business_model?,
    })
}

fn check_product(form: &ProfileForm, checks: &mut Checks) -> Option<ProductSection> {
    let mut pitch = checks.required(Field::Pitch, &form.pitch, "Elevator pitch is required");
    // Counted on the raw input, trailing whitespace included.
    if pitch.is_some() && form.pitch.chars().count() > PITCH_MAX_CHARS {
        checks.errors.push(
            Field::Pitch,
            None,
            "Elevator pitch should be under 500 characters",
        );
        pitch = None;
    }
    let problem_statement = checks.required(
        Field::ProblemStatement,
        &form.problem_statement,
        "Problem statement is required",
    );
    let target_market = checks.required(
        Field::TargetMarket,
        &form.target_market,
        "Target market is required",
    );
    let product_description = checks.required(
        Field::ProductDescription,
        &form.product_description,
        "Product description is required",
    );

    Some(ProductSection {
        pitch: pitch?,
        problem_statement: problem_statement?,
        target_market: target_market?,
        product_description: product_description?,
    })
}

fn check_final(form: &ProfileForm, checks: &mut Checks) -> Option<FinalSection> {
    let mut founders = Some(Vec::with_capacity(form.founders.len()));
    for (i, founder) in form.founders.iter().enumerate() {
        let name =
            checks.required_entry(Field::Founders, Some(i), &founder.name, "Founder name is required");
        let email = checks.email(
            Field::Founders,
            Some(i),
            &founder.email,
            "Founder email is required",
        );
        let role =
            checks.required_entry(Field::Founders, Some(i), &founder.role, "Founder role is required");

        founders = match (founders, name, email, role) {
            (Some(mut list), Some(name), Some(email), Some(role)) => {
                list.push(FounderRecord {
                    name,
                    email,
                    linkedin: optional(&founder.linkedin),
                    role,
                });
                Some(list)
            }
            _ => None,
        };
    }

    let mut products = Some(Vec::with_capacity(form.products.len()));
    for (i, product) in form.products.iter().enumerate() {
        let product = checks.required_entry(
            Field::Products,
            Some(i),
            product,
            "Product name cannot be empty",
        );
        products = match (products, product) {
            (Some(mut list), Some(product)) => {
                list.push(product);
                Some(list)
            }
            _ => None,
        };
    }

    if !form.terms_accepted {
        checks
            .errors
            .push(Field::TermsAccepted, None, "You must accept the terms");
    }

    Some(FinalSection {
        founders: founders?,
        products: products?,
    })
    .filter(|_| form.terms_accepted)
}

fn section<T>(
    step: WizardStep,
    form: &ProfileForm,
    check: fn(&ProfileForm, &mut Checks) -> Option<T>,
) -> Result<T, StepErrors> {
    let mut checks = Checks::default();
    match check(form, &mut checks) {
        Some(parsed) if checks.errors.is_empty() => Ok(parsed),
        _ => Err(StepErrors {
            step,
            errors: checks.errors,
        }),
    }
}

/// Checks only the fields shown on `step`.
pub fn validate_step(step: WizardStep, form: &ProfileForm) -> Result<(), ValidationErrors> {
    let result = match step {
        WizardStep::BasicInformation => section(step, form, check_basic).map(drop),
        WizardStep::ContactDetails => section(step, form, check_contact).map(drop),
        WizardStep::BusinessInformation => section(step, form, check_business).map(drop),
        WizardStep::ProductDetails => section(step, form, check_product).map(drop),
        WizardStep::FinalDetails => section(step, form, check_final).map(drop),
    };
    result.map_err(|failed| failed.errors)
}

/// Checks every step in order and reports the first one that fails.
pub fn validate_profile(form: &ProfileForm) -> Result<ValidatedProfile, StepErrors> {
    Ok(ValidatedProfile {
        basic: section(WizardStep::BasicInformation, form, check_basic)?,
        contact: section(WizardStep::ContactDetails, form, check_contact)?,
        business: section(WizardStep::BusinessInformation, form, check_business)?,
        product: section(WizardStep::ProductDetails, form, check_product)?,
        final_details: section(WizardStep::FinalDetails, form, check_final)?,
    })
}
