//! # Validation Errors
//!
//! Errors raised while constructing identity newtypes from untrusted input.
//! Each variant names the wire field so that the API layer can report it
//! without guesswork.

use thiserror::Error;

/// Validation errors for identity newtypes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field was absent or empty.
    #[error("required field \"{0}\" is missing or empty")]
    EmptyField(&'static str),

    /// A field exceeded its maximum length.
    #[error("field \"{field}\" exceeds {max} characters")]
    FieldTooLong {
        /// Wire name of the offending field.
        field: &'static str,
        /// Maximum accepted length in characters.
        max: usize,
    },
}

impl ValidationError {
    /// Wire name of the field that failed validation.
    pub fn field(&self) -> &'static str {
        match self {
            Self::EmptyField(field) => field,
            Self::FieldTooLong { field, .. } => field,
        }
    }
}

/// Presence and length check shared by every string newtype.
///
/// The value is kept byte-for-byte: `" "` is present, and `"V1 "` differs
/// from `"V1"`.
pub(crate) fn require(
    value: impl Into<String>,
    field: &'static str,
    max: usize,
) -> Result<String, ValidationError> {
    let value = value.into();
    if value.is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    if value.chars().count() > max {
        return Err(ValidationError::FieldTooLong { field, max });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_field_message_names_field() {
        let err = ValidationError::EmptyField("phone");
        assert!(err.to_string().contains("phone"));
        assert_eq!(err.field(), "phone");
    }

    #[test]
    fn too_long_message_names_limit() {
        let err = ValidationError::FieldTooLong {
            field: "voterId",
            max: 128,
        };
        assert!(err.to_string().contains("128"));
        assert_eq!(err.field(), "voterId");
    }

    #[test]
    fn require_keeps_value_verbatim() {
        assert_eq!(require(" a\t", "f", 8).unwrap(), " a\t");
        assert_eq!(require(" ", "f", 8).unwrap(), " ");
        assert_eq!(require("", "f", 8), Err(ValidationError::EmptyField("f")));
    }

    #[test]
    fn require_counts_chars_not_bytes() {
        assert!(require("ééé", "f", 3).is_ok());
        assert_eq!(
            require("éééé", "f", 3),
            Err(ValidationError::FieldTooLong { field: "f", max: 3 })
        );
    }
}
