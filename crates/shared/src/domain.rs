use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::UnknownChoice;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new_v4() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim()).map(Self)
            }
        }
    };
}

id_newtype!(UserId);
id_newtype!(SubmissionId);

/// Declares a closed set of form choices that serialise to their display label.
macro_rules! choice_enum {
    ($name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl FromStr for $name {
            type Err = UnknownChoice;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|choice| choice.label().eq_ignore_ascii_case(wanted))
                    .ok_or_else(|| UnknownChoice::new(stringify!($name), s))
            }
        }
    };
}

choice_enum!(EntityType {
    PrivateLimited => "Private Limited",
    Partnership => "Partnership",
    Llp => "LLP",
    SoleProprietorship => "Sole Proprietorship",
    Other => "Other",
});

choice_enum!(ContactRole {
    Founder => "Founder",
    CoFounder => "Co-founder",
    Ceo => "CEO",
    Cto => "CTO",
    Cfo => "CFO",
    Other => "Other",
});

choice_enum!(Sector {
    Software => "Software",
    FinTech => "FinTech",
    HealthTech => "HealthTech",
    EdTech => "EdTech",
    ECommerce => "E-commerce",
    AiMl => "AI/ML",
    Hardware => "Hardware",
    CleanTech => "CleanTech",
    Other => "Other",
});

choice_enum!(Stage {
    Idea => "Idea",
    Prototype => "Prototype",
    Mvp => "MVP",
    PreSeed => "Pre-seed",
    Seed => "Seed",
    SeriesA => "Series A",
    SeriesBPlus => "Series B+",
});

choice_enum!(BusinessModel {
    B2b => "B2B",
    B2c => "B2C",
    B2b2c => "B2B2C",
    D2c => "D2C",
    Marketplace => "Marketplace",
    Saas => "SaaS",
    Subscription => "Subscription",
    Freemium => "Freemium",
    Other => "Other",
});
