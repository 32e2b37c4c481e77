//! Form record and the fixed option sets it draws from.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Declares a closed option set whose wire value is a fixed string.
macro_rules! option_set {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $value:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $value)]
                $variant,
            )+
        }

        impl $name {
            /// Every option, in display order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The value sent to the relay endpoint.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $value,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownOption;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($value => Ok(Self::$variant),)+
                    other => Err(UnknownOption(other.to_string())),
                }
            }
        }
    };
}

/// A select value outside the fixed option set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown option: {0}")]
pub struct UnknownOption(pub String);

option_set! {
    /// Highest completed qualification.
    Qualification {
        TwelfthStandard => "12th",
        Graduation => "Graduation",
    }
}

option_set! {
    /// Field the applicant studied in.
    StudyField {
        Science => "Science",
        Commerce => "Commerce",
        Arts => "Arts",
        Engineering => "Engineering",
        Medical => "Medical",
        Management => "Management",
    }
}

option_set! {
    /// Program the applicant wants to enrol in.
    Program {
        BTech => "B.Tech",
        MTech => "M.Tech",
        Bca => "BCA",
        Mca => "MCA",
        BSc => "B.Sc",
        MSc => "M.Sc",
        BPharm => "B.Pharm",
        MPharm => "M.Pharm",
        PhD => "Ph.D",
        Diploma => "Diploma",
        Mba => "MBA",
    }
}

/// Names of the editable fields. Serialized in the camelCase form the relay
/// endpoint and the rendering layer use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Name,
    Phone,
    Email,
    Qualification,
    Percentage,
    StudyField,
    WantToStudy,
}

impl Field {
    pub const ALL: [Field; 7] = [
        Field::Name,
        Field::Phone,
        Field::Email,
        Field::Qualification,
        Field::Percentage,
        Field::StudyField,
        Field::WantToStudy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Phone => "phone",
            Self::Email => "email",
            Self::Qualification => "qualification",
            Self::Percentage => "percentage",
            Self::StudyField => "studyField",
            Self::WantToStudy => "wantToStudy",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = UnknownOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| UnknownOption(s.to_string()))
    }
}

/// The draft being filled in.
///
/// Text inputs are kept verbatim; selects are `None` until chosen.
/// `percentage` only carries meaning while `qualification` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormRecord {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub qualification: Option<Qualification>,
    pub percentage: Option<Decimal>,
    pub study_field: Option<StudyField>,
    pub want_to_study: Option<Program>,
}

/// Why a raw input could not be stored in the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    pub message: &'static str,
}

impl FormRecord {
    /// The percentage that counts, i.e. `None` whenever no qualification is
    /// selected.
    pub fn effective_percentage(&self) -> Option<Decimal> {
        self.qualification.and(self.percentage)
    }

    /// Store a raw input value for `field`.
    ///
    /// Empty input clears the field. Input that cannot be interpreted also
    /// clears it and reports the message to surface for that field.
    pub fn set_raw(&mut self, field: Field, raw: &str) -> Result<(), ParseFailure> {
        let trimmed = raw.trim();
        match field {
            Field::Name => self.name = raw.to_string(),
            Field::Phone => self.phone = raw.to_string(),
            Field::Email => self.email = raw.to_string(),
            Field::Qualification => {
                self.qualification = None;
                let parsed = parse_select(trimmed, "Please select your qualification");
                if !matches!(parsed, Ok(Some(_))) {
                    self.percentage = None;
                }
                self.qualification = parsed?;
            }
            Field::Percentage => {
                self.percentage = None;
                if !trimmed.is_empty() {
                    let value = Decimal::from_str(trimmed).map_err(|_| ParseFailure {
                        message: "Percentage must be a number",
                    })?;
                    self.percentage = Some(value);
                }
            }
            Field::StudyField => {
                self.study_field = None;
                self.study_field = parse_select(trimmed, "Please select your field of study")?;
            }
            Field::WantToStudy => {
                self.want_to_study = None;
                self.want_to_study = parse_select(trimmed, "Please select what you want to study")?;
            }
        }
        Ok(())
    }
}

fn parse_select<T: FromStr>(raw: &str, message: &'static str) -> Result<Option<T>, ParseFailure> {
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse().map(Some).map_err(|_| ParseFailure { message })
}
