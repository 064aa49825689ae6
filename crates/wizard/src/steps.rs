use std::fmt;

use crate::form::Field;

/// The five fixed wizard positions, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WizardStep {
    BasicInformation,
    ContactDetails,
    BusinessInformation,
    ProductDetails,
    FinalDetails,
}

impl WizardStep {
    pub const ALL: [WizardStep; 5] = [
        WizardStep::BasicInformation,
        WizardStep::ContactDetails,
        WizardStep::BusinessInformation,
        WizardStep::ProductDetails,
        WizardStep::FinalDetails,
    ];
    pub const FIRST: WizardStep = WizardStep::BasicInformation;
    pub const LAST: WizardStep = WizardStep::FinalDetails;

    pub fn index(self) -> usize {
        match self {
            Self::BasicInformation => 0,
            Self::ContactDetails => 1,
            Self::BusinessInformation => 2,
            Self::ProductDetails => 3,
            Self::FinalDetails => 4,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Following step, saturating at the last one.
    pub fn next(self) -> Self {
        Self::from_index(self.index() + 1).unwrap_or(Self::LAST)
    }

    /// Preceding step, saturating at the first one.
    pub fn prev(self) -> Self {
        self.index()
            .checked_sub(1)
            .and_then(Self::from_index)
            .unwrap_or(Self::FIRST)
    }

    pub fn is_first(self) -> bool {
        self == Self::FIRST
    }

    pub fn is_last(self) -> bool {
        self == Self::LAST
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::BasicInformation => "Basic Information",
            Self::ContactDetails => "Contact Details",
            Self::BusinessInformation => "Business Information",
            Self::ProductDetails => "Product Details",
            Self::FinalDetails => "Final Details",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::BasicInformation => "Enter your startup's fundamental details",
            Self::ContactDetails => "Who should we contact regarding this application?",
            Self::BusinessInformation => "Tell us about your business structure",
            Self::ProductDetails => "Describe what your startup offers",
            Self::FinalDetails => "Complete your profile setup",
        }
    }

    pub fn fields(self) -> &'static [Field] {
        match self {
            Self::BasicInformation => &[
                Field::StartupName,
                Field::BrandName,
                Field::IncorporationDate,
                Field::EntityType,
                Field::RegistrationNumber,
                Field::PanNumber,
                Field::Address,
            ],
            Self::ContactDetails => &[
                Field::ContactName,
                Field::ContactRole,
                Field::ContactEmail,
                Field::ContactPhone,
            ],
            Self::BusinessInformation => &[
                Field::NumFounders,
                Field::TeamSize,
                Field::Sector,
                Field::Stage,
                Field::BusinessModel,
            ],
            Self::ProductDetails => &[
                Field::Pitch,
                Field::ProblemStatement,
                Field::TargetMarket,
                Field::ProductDescription,
            ],
            Self::FinalDetails => &[
                Field::Founders,
                Field::Products,
                Field::Logo,
                Field::TermsAccepted,
            ],
        }
    }

    /// Width of the progress indicator, 0 on the first step and 100 on the last.
    pub fn progress_percent(self) -> u8 {
        (self.index() * 100 / Self::LAST.index()) as u8
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step {} ({})", self.index() + 1, self.title())
    }
}
