//! Field extraction over free-text claim descriptions.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{ExtractedField, FieldType};

static AGE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)[\s-]*(?:year|yr|y)").unwrap());

static FEMALE_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bfemale\b").unwrap());

static MALE_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bmale\b").unwrap());

static POLICY_DURATION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)[\s-]*month").unwrap());

/// Procedure vocabulary, in match priority.
pub const PROCEDURES: &[&str] = &["knee surgery", "dental", "heart surgery", "emergency"];

/// Known cities and their display form.
const LOCATIONS: &[(&str, &str)] = &[("pune", "Pune, India"), ("mumbai", "Mumbai, India")];

/// Run every matcher in order. Non-matches add nothing.
pub fn extract_fields(input: &str) -> Vec<ExtractedField> {
    let text = input.to_lowercase();
    let mut fields = Vec::new();

    if let Some(caps) = AGE_PATTERN.captures(&text) {
        fields.push(ExtractedField::new(FieldType::Age, format!("{} years", &caps[1])));
    }

    if FEMALE_PATTERN.is_match(&text) {
        fields.push(ExtractedField::new(FieldType::Gender, "Female"));
    } else if MALE_PATTERN.is_match(&text) {
        fields.push(ExtractedField::new(FieldType::Gender, "Male"));
    }

    if let Some(procedure) = PROCEDURES.iter().find(|p| text.contains(*p)) {
        fields.push(ExtractedField::new(FieldType::Procedure, title_case(procedure)));
    }

    if let Some((_, display)) = LOCATIONS.iter().find(|(city, _)| text.contains(city)) {
        fields.push(ExtractedField::new(FieldType::Location, *display));
    }

    if let Some(caps) = POLICY_DURATION_PATTERN.captures(&text) {
        fields.push(ExtractedField::new(
            FieldType::PolicyDuration,
            format!("{} months", &caps[1]),
        ));
    }

    fields
}

fn title_case(phrase: &str) -> String {
    phrase
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
