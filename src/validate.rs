use std::error::Error;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::domain::record::{CustomerInput, Field, RecordPatch};
use crate::normalize::parse_date_added;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    MissingFields(Vec<Field>),
    InvalidPhone(String),
    InvalidDate(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::MissingFields(fields) => {
                let names = fields
                    .iter()
                    .map(|field| field.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "required fields are missing: {}", names)
            }
            ValidationError::InvalidPhone(value) => {
                write!(f, "phone number must be 10-13 digits, got '{}'", value)
            }
            ValidationError::InvalidDate(value) => write!(
                f,
                "date added '{}' is not a recognized date; use YYYY-MM-DD or YYYY-MM-DD HH:MM:SS",
                value
            ),
        }
    }
}

impl Error for ValidationError {}

fn phone_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9]{10,13}$").expect("phone pattern should compile"))
}

pub fn is_valid_phone(value: &str) -> bool {
    phone_pattern().is_match(value.trim())
}

/// Checks a new customer: every required field present, then phone format,
/// then an explicit date (blank means "stamp now").
pub fn validate_new(input: &CustomerInput) -> Result<(), ValidationError> {
    let missing: Vec<Field> = Field::REQUIRED
        .iter()
        .copied()
        .filter(|field| input.value(*field).trim().is_empty())
        .collect();
    if !missing.is_empty() {
        return Err(ValidationError::MissingFields(missing));
    }
    if !is_valid_phone(&input.phone) {
        return Err(ValidationError::InvalidPhone(input.phone.trim().to_string()));
    }
    if let Some(date) = input.date_added.as_deref().map(str::trim) {
        if !date.is_empty() && parse_date_added(date).is_none() {
            return Err(ValidationError::InvalidDate(date.to_string()));
        }
    }
    Ok(())
}

/// Checks only the fields a patch touches, so legacy rows stay editable.
pub fn validate_patch(patch: &RecordPatch) -> Result<(), ValidationError> {
    let missing: Vec<Field> = Field::REQUIRED
        .iter()
        .copied()
        .filter(|field| {
            patch
                .get(*field)
                .is_some_and(|value| value.trim().is_empty())
        })
        .collect();
    if !missing.is_empty() {
        return Err(ValidationError::MissingFields(missing));
    }
    if let Some(phone) = patch.get(Field::Phone) {
        if !is_valid_phone(phone) {
            return Err(ValidationError::InvalidPhone(phone.trim().to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_input() -> CustomerInput {
        CustomerInput {
            nearest_access_point: "ODP-BDG-001".to_string(),
            name: "Budi".to_string(),
            address: "Jl. Merdeka".to_string(),
            phone: "0812345678".to_string(),
            assigned_agent: "Nandi".to_string(),
            ..CustomerInput::default()
        }
    }

    #[test]
    fn ten_digit_phone_passes() {
        assert_eq!(validate_new(&complete_input()), Ok(()));
    }

    #[test]
    fn five_digit_phone_fails() {
        let input = CustomerInput {
            phone: "12345".to_string(),
            ..complete_input()
        };
        assert_eq!(
            validate_new(&input),
            Err(ValidationError::InvalidPhone("12345".to_string()))
        );
    }

    #[test]
    fn phone_length_bounds() {
        assert!(is_valid_phone("0812345678"));
        assert!(is_valid_phone("0812345678901"));
        assert!(!is_valid_phone("08123456789012"));
        assert!(!is_valid_phone("0812-345-678"));
        assert!(!is_valid_phone("+62812345678"));
    }

    #[test]
    fn missing_fields_are_listed_in_required_order() {
        let input = CustomerInput {
            name: " ".to_string(),
            assigned_agent: String::new(),
            ..complete_input()
        };
        let err = validate_new(&input).expect_err("blank fields should fail");
        assert_eq!(
            err,
            ValidationError::MissingFields(vec![Field::Name, Field::AssignedAgent])
        );
        assert_eq!(err.to_string(), "required fields are missing: name, agent");
    }

    #[test]
    fn missing_fields_win_over_phone_format() {
        let input = CustomerInput {
            phone: String::new(),
            ..complete_input()
        };
        assert_eq!(
            validate_new(&input),
            Err(ValidationError::MissingFields(vec![Field::Phone]))
        );
    }

    #[test]
    fn explicit_date_must_be_readable_back() {
        let unreadable = CustomerInput {
            date_added: Some(" kemarin ".to_string()),
            ..complete_input()
        };
        assert_eq!(
            validate_new(&unreadable),
            Err(ValidationError::InvalidDate("kemarin".to_string()))
        );

        for date in ["2026-01-05", "2026-01-05 09:30:00", "5/1/2026", "  "] {
            let input = CustomerInput {
                date_added: Some(date.to_string()),
                ..complete_input()
            };
            assert_eq!(validate_new(&input), Ok(()), "date {date:?}");
        }
    }

    #[test]
    fn patch_validation_ignores_untouched_fields() {
        let patch = RecordPatch {
            status: Some("Diterima".to_string()),
            ..RecordPatch::default()
        };
        assert_eq!(validate_patch(&patch), Ok(()));
    }

    #[test]
    fn patch_cannot_blank_required_field_or_break_phone() {
        let blanked = RecordPatch {
            address: Some("  ".to_string()),
            ..RecordPatch::default()
        };
        assert_eq!(
            validate_patch(&blanked),
            Err(ValidationError::MissingFields(vec![Field::Address]))
        );

        let bad_phone = RecordPatch {
            phone: Some("12345".to_string()),
            ..RecordPatch::default()
        };
        assert!(matches!(
            validate_patch(&bad_phone),
            Err(ValidationError::InvalidPhone(_))
        ));
    }
}
