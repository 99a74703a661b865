//! # Ballot Inputs
//!
//! Newtypes for the free-form values a voter submits after identification:
//! the one-time code, the biometric sample token and the ballot choice. Same
//! presence rules as the identity fields; each is matched exactly as sent.

use serde::{Deserialize, Serialize};

use crate::error::{require, ValidationError};

/// Maximum accepted length of a submitted one-time code.
pub const MAX_CODE_INPUT_LEN: usize = 256;

/// Maximum accepted length of a biometric sample token.
pub const MAX_SAMPLE_LEN: usize = 256;

/// Maximum accepted length of a ballot choice.
pub const MAX_CHOICE_LEN: usize = 256;

/// A one-time code as submitted by the voter (wire field `otp`).
///
/// Only presence is checked here. Whether it matches the pending code is
/// decided by the voter record.
#[derive(Clone, PartialEq, Eq)]
pub struct SubmittedCode(String);

impl SubmittedCode {
    /// Validate a submitted code.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        require(value, "otp", MAX_CODE_INPUT_LEN).map(Self)
    }

    /// Access the code string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SubmittedCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SubmittedCode(<redacted>)")
    }
}

/// Opaque identifier of a simulated biometric (iris) sample.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BiometricSample(String);

impl BiometricSample {
    /// Validate a submitted sample token (wire field `irisHash`).
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        require(value, "irisHash", MAX_SAMPLE_LEN).map(Self)
    }

    /// Access the token string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

/// The vote target (wire field `party`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BallotChoice(String);

impl BallotChoice {
    /// Validate a submitted ballot choice.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        require(value, "party", MAX_CHOICE_LEN).map(Self)
    }

    /// Access the choice string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}
