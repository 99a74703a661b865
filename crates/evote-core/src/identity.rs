//! # Voter Identity Primitives
//!
//! Newtypes for the two halves of the identity key. Both are opaque strings
//! from the caller's point of view; validation only enforces presence and a
//! sane upper bound on length. Values are never trimmed or case-folded, so
//! `"V1 "` and `"V1"` address different records.

use serde::{Deserialize, Serialize};

use crate::error::{require, ValidationError};

/// Maximum accepted length of a voter identifier.
pub const MAX_VOTER_ID_LEN: usize = 128;

/// Maximum accepted length of a phone number.
pub const MAX_PHONE_LEN: usize = 32;

/// Opaque external voter identifier.
///
/// # Validation
///
/// - Non-empty
/// - At most [`MAX_VOTER_ID_LEN`] characters
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VoterId(String);

impl VoterId {
    /// Create a voter identifier, validating presence and length.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyField`] for empty input and
    /// [`ValidationError::FieldTooLong`] when over the length limit.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        require(value, "voterId", MAX_VOTER_ID_LEN).map(Self)
    }

    /// Access the identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VoterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for VoterId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<VoterId> for String {
    fn from(value: VoterId) -> Self {
        value.0
    }
}

/// Contact phone number, the second half of the identity key.
///
/// The format is deliberately not parsed: the notification channel decides
/// what it can deliver to.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Create a phone number, validating presence and length.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyField`] for empty input and
    /// [`ValidationError::FieldTooLong`] when over the length limit.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        require(value, "phone", MAX_PHONE_LEN).map(Self)
    }

    /// Access the phone number string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Masked rendering for logs: everything but the last four characters
    /// is replaced by `*`.
    pub fn masked(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        let visible = chars.len().min(4);
        let hidden = chars.len() - visible;
        let tail: String = chars[hidden..].iter().collect();
        format!("{}{}", "*".repeat(hidden.min(3)), tail)
    }
}

// Phone numbers are personal data; keep them out of Debug output.
impl std::fmt::Debug for PhoneNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PhoneNumber").field(&self.masked()).finish()
    }
}

impl TryFrom<String> for PhoneNumber {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PhoneNumber> for String {
    fn from(value: PhoneNumber) -> Self {
        value.0
    }
}

/// The natural key of a voter record: the `(voterId, phone)` pair.
///
/// Two records with the same voter ID but different phones are distinct
/// identities.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentityKey {
    /// External voter identifier.
    pub voter_id: VoterId,
    /// Contact phone.
    pub phone: PhoneNumber,
}

impl IdentityKey {
    /// Build a key from already-validated parts.
    pub fn new(voter_id: VoterId, phone: PhoneNumber) -> Self {
        Self { voter_id, phone }
    }

    /// Validate both raw fields and build the key.
    ///
    /// The voter ID is checked first, so a request missing both fields
    /// reports `voterId`.
    pub fn parse(voter_id: &str, phone: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            voter_id: VoterId::new(voter_id)?,
            phone: PhoneNumber::new(phone)?,
        })
    }
}

/// Log-safe rendering: `V1/***0100`.
impl std::fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.voter_id, self.phone.masked())
    }
}
