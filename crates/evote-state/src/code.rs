//! # One-Time Verification Codes
//!
//! A [`OneTimeCode`] is the plaintext that travels to the voter over the
//! notification channel. It is never persisted: the record keeps a
//! [`CodeDigest`], the SHA-256 of `record_id ":" code`. Two codes are equal
//! exactly when their digests under the same record ID are equal, so the
//! exact-string-equality check on submission is preserved.
//!
//! ## Format
//!
//! Six decimal digits, `100000..=999999`. The leading digit is never zero.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use uuid::Uuid;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Number of digits in a verification code.
pub const CODE_LENGTH: usize = 6;

/// Smallest valid code value.
pub const CODE_MIN: u32 = 100_000;

/// Largest valid code value.
pub const CODE_MAX: u32 = 999_999;

/// A code value outside the accepted format.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("verification code must be a 6-digit number in 100000..=999999")]
pub struct CodeFormatError;

/// A freshly generated verification code.
///
/// Wiped from memory on drop. `Debug` is redacted.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct OneTimeCode(String);

impl OneTimeCode {
    /// Build a code from its numeric value.
    ///
    /// # Errors
    ///
    /// Returns [`CodeFormatError`] when `value` is outside
    /// `CODE_MIN..=CODE_MAX`.
    pub fn from_value(value: u32) -> Result<Self, CodeFormatError> {
        if !(CODE_MIN..=CODE_MAX).contains(&value) {
            return Err(CodeFormatError);
        }
        Ok(Self(value.to_string()))
    }

    /// Plaintext code, for delivery to the voter only.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Digest of this code bound to a record.
    pub fn digest_for(&self, record_id: &Uuid) -> CodeDigest {
        CodeDigest::compute(record_id, &self.0)
    }
}

impl std::fmt::Debug for OneTimeCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("OneTimeCode([REDACTED])")
    }
}

/// Lowercase hex SHA-256 of a code salted with the owning record's ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeDigest(String);

impl CodeDigest {
    /// Digest `code` for the record identified by `record_id`.
    pub fn compute(record_id: &Uuid, code: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(record_id.as_bytes());
        hasher.update(b":");
        hasher.update(code.as_bytes());
        let bytes = hasher.finalize();
        Self(bytes.iter().map(|b| format!("{b:02x}")).collect())
    }

    /// Wrap a digest loaded from storage.
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// Hex representation, as stored.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Constant-time check that `submitted` is the code this digest was
    /// computed from.
    pub fn matches(&self, record_id: &Uuid, submitted: &str) -> bool {
        let candidate = Self::compute(record_id, submitted);
        let expected = self.0.as_bytes();
        let provided = candidate.0.as_bytes();
        if expected.len() != provided.len() {
            return false;
        }
        provided.ct_eq(expected).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn from_value_accepts_range_bounds() {
        assert_eq!(OneTimeCode::from_value(CODE_MIN).unwrap().expose(), "100000");
        assert_eq!(OneTimeCode::from_value(CODE_MAX).unwrap().expose(), "999999");
    }

    #[test]
    fn from_value_rejects_out_of_range() {
        assert_eq!(OneTimeCode::from_value(99_999), Err(CodeFormatError));
        assert_eq!(OneTimeCode::from_value(1_000_000), Err(CodeFormatError));
    }

    #[test]
    fn debug_is_redacted() {
        let code = OneTimeCode::from_value(424_242).unwrap();
        let dbg = format!("{code:?}");
        assert!(!dbg.contains("424242"));
    }

    #[test]
    fn digest_matches_same_code_only() {
        let id = Uuid::new_v4();
        let code = OneTimeCode::from_value(123_456).unwrap();
        let digest = code.digest_for(&id);
        assert!(digest.matches(&id, "123456"));
        assert!(!digest.matches(&id, "123457"));
        assert!(!digest.matches(&id, " 123456"));
        assert!(!digest.matches(&id, ""));
    }

    #[test]
    fn digest_is_salted_by_record() {
        let code = OneTimeCode::from_value(123_456).unwrap();
        let a = code.digest_for(&Uuid::new_v4());
        let b = code.digest_for(&Uuid::new_v4());
        assert_ne!(a, b);
    }

    #[test]
    fn digest_is_lowercase_hex() {
        let digest = CodeDigest::compute(&Uuid::nil(), "100000");
        assert_eq!(digest.as_str().len(), 64);
        assert!(digest
            .as_str()
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn stored_digest_roundtrips() {
        let id = Uuid::new_v4();
        let digest = CodeDigest::compute(&id, "654321");
        let loaded = CodeDigest::from_hex(digest.as_str().to_string());
        assert!(loaded.matches(&id, "654321"));
    }

    proptest! {
        #[test]
        fn every_valid_value_is_six_digits(v in CODE_MIN..=CODE_MAX) {
            let code = OneTimeCode::from_value(v).unwrap();
            prop_assert_eq!(code.expose().len(), CODE_LENGTH);
            prop_assert!(code.expose().chars().all(|c| c.is_ascii_digit()));
        }
    }
}
