//! Field validation rules.
//!
//! Each field has a fixed list of [`Rule`]s evaluated in order; the first
//! failing rule supplies the message. Whether a field is required at all is
//! a [`Requirement`] evaluated against the current record, so the
//! percentage-depends-on-qualification case lives in one place.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use serde::Serialize;

use super::model::{Field, FormRecord};
use super::state::Step;

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z\s]+$").expect("name pattern compiles"));

static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[6-9][0-9]{9}$").expect("phone pattern compiles"));

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}$").expect("email pattern compiles")
});

/// When a field has to be filled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Always,
    /// Only while a qualification is selected.
    WhenQualified,
}

impl Requirement {
    pub fn applies(&self, record: &FormRecord) -> bool {
        match self {
            Self::Always => true,
            Self::WhenQualified => record.qualification.is_some(),
        }
    }
}

/// A single check against a field's value.
#[derive(Debug, Clone, Copy)]
pub enum Rule {
    Required(&'static str),
    MinChars(usize, &'static str),
    Pattern(&'static LazyLock<Regex>, &'static str),
    AtLeast(Decimal, &'static str),
    AtMost(Decimal, &'static str),
}

/// The value a rule sees.
enum Value<'a> {
    Text(&'a str),
    Number(Option<Decimal>),
    Choice(bool),
}

impl Value<'_> {
    fn is_empty(&self) -> bool {
        match self {
            Value::Text(s) => s.trim().is_empty(),
            Value::Number(n) => n.is_none(),
            Value::Choice(chosen) => !chosen,
        }
    }
}

impl Rule {
    fn check(&self, value: &Value<'_>) -> Result<(), &'static str> {
        match (*self, value) {
            (Rule::Required(msg), v) if v.is_empty() => Err(msg),
            (Rule::MinChars(min, msg), Value::Text(s)) if s.chars().count() < min => Err(msg),
            (Rule::Pattern(re, msg), Value::Text(s)) if !re.is_match(s) => Err(msg),
            (Rule::AtLeast(min, msg), Value::Number(Some(n))) if *n < min => Err(msg),
            (Rule::AtMost(max, msg), Value::Number(Some(n))) if *n > max => Err(msg),
            _ => Ok(()),
        }
    }
}

static NAME_RULES: &[Rule] = &[
    Rule::Required("Name is required"),
    Rule::MinChars(2, "Name must be at least 2 characters"),
    Rule::Pattern(&NAME_PATTERN, "Name should contain only letters and spaces"),
];

static PHONE_RULES: &[Rule] = &[
    Rule::Required("Phone number is required"),
    Rule::Pattern(&PHONE_PATTERN, "Please enter a valid 10-digit Indian phone number"),
];

static EMAIL_RULES: &[Rule] = &[
    Rule::Required("Email is required"),
    Rule::Pattern(&EMAIL_PATTERN, "Please enter a valid email address"),
];

static PERCENTAGE_RULES: &[Rule] = &[
    Rule::Required("Percentage is required"),
    Rule::AtLeast(Decimal::ZERO, "Percentage cannot be negative"),
    Rule::AtMost(Decimal::ONE_HUNDRED, "Percentage cannot exceed 100%"),
];

static QUALIFICATION_RULES: &[Rule] = &[Rule::Required("Please select your qualification")];
static STUDY_FIELD_RULES: &[Rule] = &[Rule::Required("Please select your field of study")];
static WANT_TO_STUDY_RULES: &[Rule] = &[Rule::Required("Please select what you want to study")];

impl Field {
    /// When this field must be filled in.
    pub fn requirement(&self) -> Requirement {
        match self {
            Field::Percentage => Requirement::WhenQualified,
            _ => Requirement::Always,
        }
    }

    /// Ordered rules for this field.
    pub fn rules(&self) -> &'static [Rule] {
        match self {
            Field::Name => NAME_RULES,
            Field::Phone => PHONE_RULES,
            Field::Email => EMAIL_RULES,
            Field::Qualification => QUALIFICATION_RULES,
            Field::Percentage => PERCENTAGE_RULES,
            Field::StudyField => STUDY_FIELD_RULES,
            Field::WantToStudy => WANT_TO_STUDY_RULES,
        }
    }
}

fn value_of(field: Field, record: &FormRecord) -> Value<'_> {
    match field {
        Field::Name => Value::Text(&record.name),
        Field::Phone => Value::Text(&record.phone),
        Field::Email => Value::Text(&record.email),
        Field::Qualification => Value::Choice(record.qualification.is_some()),
        Field::Percentage => Value::Number(record.percentage),
        Field::StudyField => Value::Choice(record.study_field.is_some()),
        Field::WantToStudy => Value::Choice(record.want_to_study.is_some()),
    }
}

/// Validate one field against the current record.
///
/// A field whose [`Requirement`] does not apply is always valid.
pub fn validate_field(field: Field, record: &FormRecord) -> Result<(), &'static str> {
    if !field.requirement().applies(record) {
        return Ok(());
    }
    let value = value_of(field, record);
    field.rules().iter().try_for_each(|rule| rule.check(&value))
}

/// Fields gated by `step`, given what the record currently holds.
pub fn required_fields(step: Step, record: &FormRecord) -> Vec<Field> {
    let candidates: &[Field] = match step {
        Step::PersonalInfo => &[Field::Name, Field::Phone, Field::Email],
        Step::Education => &[Field::Qualification, Field::StudyField, Field::Percentage],
        Step::Preferences => &[Field::WantToStudy],
        Step::Submitted => &[],
    };
    candidates
        .iter()
        .copied()
        .filter(|f| f.requirement().applies(record))
        .collect()
}

/// Every field that has to pass before the record may be submitted.
pub fn submission_fields(record: &FormRecord) -> Vec<Field> {
    [Step::PersonalInfo, Step::Education, Step::Preferences]
        .into_iter()
        .flat_map(|step| required_fields(step, record))
        .collect()
}

/// Validate exactly `fields`, collecting every failure.
pub fn validate_fields(fields: &[Field], record: &FormRecord) -> ValidationState {
    let mut state = ValidationState::default();
    for &field in fields {
        if let Err(message) = validate_field(field, record) {
            state.set(field, message);
        }
    }
    state
}

/// Per-field error messages. A field with no entry is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationState {
    errors: BTreeMap<Field, &'static str>,
}

impl ValidationState {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn get(&self, field: Field) -> Option<&'static str> {
        self.errors.get(&field).copied()
    }

    pub fn set(&mut self, field: Field, message: &'static str) {
        self.errors.insert(field, message);
    }

    pub fn clear_field(&mut self, field: Field) {
        self.errors.remove(&field);
    }

    pub fn clear(&mut self) {
        self.errors.clear();
    }

    /// Fields that currently carry an error.
    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.errors.keys().copied()
    }

    /// Record the outcome of re-validating `fields`: failures in `result`
    /// are set, every other listed field is cleared.
    pub fn apply(&mut self, fields: &[Field], result: &ValidationState) {
        for &field in fields {
            match result.get(field) {
                Some(message) => self.set(field, message),
                None => self.clear_field(field),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::wizard::model::{Program, Qualification, StudyField};

    fn with_phone(phone: &str) -> FormRecord {
        FormRecord {
            phone: phone.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn phone_pattern() {
        assert!(validate_field(Field::Phone, &with_phone("9876543210")).is_ok());
        assert!(validate_field(Field::Phone, &with_phone("8123456789")).is_ok());
        assert!(validate_field(Field::Phone, &with_phone("6000000000")).is_ok());
        assert_eq!(
            validate_field(Field::Phone, &with_phone("5123456789")),
            Err("Please enter a valid 10-digit Indian phone number")
        );
        assert!(validate_field(Field::Phone, &with_phone("98765432")).is_err());
        assert!(validate_field(Field::Phone, &with_phone("98765432101")).is_err());
        assert!(validate_field(Field::Phone, &with_phone("98765x3210")).is_err());
        assert_eq!(
            validate_field(Field::Phone, &with_phone("")),
            Err("Phone number is required")
        );
    }

    #[test]
    fn name_rules_in_order() {
        let mut record = FormRecord::default();
        assert_eq!(validate_field(Field::Name, &record), Err("Name is required"));

        record.name = "A".into();
        assert_eq!(
            validate_field(Field::Name, &record),
            Err("Name must be at least 2 characters")
        );

        record.name = "R2D2".into();
        assert_eq!(
            validate_field(Field::Name, &record),
            Err("Name should contain only letters and spaces")
        );

        record.name = "Asha Verma".into();
        assert!(validate_field(Field::Name, &record).is_ok());
    }

    #[test]
    fn email_is_case_insensitive() {
        let mut record = FormRecord {
            email: "Asha.Verma+intake@Example.CO.IN".into(),
            ..Default::default()
        };
        assert!(validate_field(Field::Email, &record).is_ok());

        for bad in ["asha@", "asha@example", "@example.com", "asha example@x.com"] {
            record.email = bad.into();
            assert_eq!(
                validate_field(Field::Email, &record),
                Err("Please enter a valid email address"),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn percentage_only_required_with_qualification() {
        let mut record = FormRecord::default();
        assert!(validate_field(Field::Percentage, &record).is_ok());
        assert!(!required_fields(Step::Education, &record).contains(&Field::Percentage));

        record.qualification = Some(Qualification::TwelfthStandard);
        assert!(required_fields(Step::Education, &record).contains(&Field::Percentage));
        assert_eq!(
            validate_field(Field::Percentage, &record),
            Err("Percentage is required")
        );

        for (value, expected) in [
            (dec!(0), Ok(())),
            (dec!(100), Ok(())),
            (dec!(64.25), Ok(())),
            (dec!(-0.01), Err("Percentage cannot be negative")),
            (dec!(100.5), Err("Percentage cannot exceed 100%")),
        ] {
            record.percentage = Some(value);
            assert_eq!(validate_field(Field::Percentage, &record), expected, "{value}");
        }

        record.qualification = Some(Qualification::Graduation);
        record.percentage = Some(dec!(101));
        assert!(validate_field(Field::Percentage, &record).is_err());
    }

    #[test]
    fn out_of_range_percentage_ignored_without_qualification() {
        let record = FormRecord {
            percentage: Some(dec!(250)),
            ..Default::default()
        };
        assert!(validate_field(Field::Percentage, &record).is_ok());
    }

    #[test]
    fn required_fields_per_step() {
        let record = FormRecord::default();
        assert_eq!(
            required_fields(Step::PersonalInfo, &record),
            vec![Field::Name, Field::Phone, Field::Email]
        );
        assert_eq!(
            required_fields(Step::Education, &record),
            vec![Field::Qualification, Field::StudyField]
        );
        assert_eq!(required_fields(Step::Preferences, &record), vec![Field::WantToStudy]);
        assert!(required_fields(Step::Submitted, &record).is_empty());
    }

    #[test]
    fn validate_fields_reports_each_missing_field() {
        let record = FormRecord {
            name: "Asha".into(),
            ..Default::default()
        };
        let state = validate_fields(&required_fields(Step::PersonalInfo, &record), &record);
        assert_eq!(state.fields().collect::<Vec<_>>(), vec![Field::Phone, Field::Email]);
        assert_eq!(state.get(Field::Email), Some("Email is required"));
        assert!(state.get(Field::Name).is_none());
    }

    #[test]
    fn complete_record_passes_submission_fields() {
        let record = FormRecord {
            name: "Asha Verma".into(),
            phone: "9876543210".into(),
            email: "asha@example.com".into(),
            qualification: Some(Qualification::Graduation),
            percentage: Some(dec!(81.4)),
            study_field: Some(StudyField::Science),
            want_to_study: Some(Program::MTech),
        };
        let fields = submission_fields(&record);
        assert_eq!(fields.len(), 7);
        assert!(validate_fields(&fields, &record).is_valid());
    }

    #[test]
    fn apply_merges_only_listed_fields() {
        let mut state = ValidationState::default();
        state.set(Field::Name, "Name is required");
        state.set(Field::WantToStudy, "Please select what you want to study");

        let mut result = ValidationState::default();
        result.set(Field::Phone, "Phone number is required");
        state.apply(&[Field::Name, Field::Phone], &result);

        assert!(state.get(Field::Name).is_none());
        assert_eq!(state.get(Field::Phone), Some("Phone number is required"));
        assert!(state.get(Field::WantToStudy).is_some());
    }

    #[test]
    fn serializes_as_field_map() {
        let mut state = ValidationState::default();
        state.set(Field::StudyField, "Please select your field of study");
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"studyField": "Please select your field of study"})
        );
    }
}
