//! # evote-state — Voter Verification State Machine
//!
//! Pure, synchronous transition logic for the verification-and-vote
//! sequence. No I/O: the API crate loads a [`VoterRecord`], applies one of
//! the transition methods on a copy, and persists the result with a
//! version check.
//!
//! ## Modules
//!
//! - **Voter** ([`voter`]): `Unverified → CodeSent → CodeVerified →
//!   BiometricVerified → Voted`, with code re-issue regressing to
//!   `CodeSent`. The `has_voted` latch is one-way.
//!
//! - **Code** ([`code`]): six-digit one-time codes and their salted
//!   SHA-256 digests. Plaintext codes never reach the record.
//!
//! - **Biometric** ([`biometric`]): the immutable reference set that
//!   simulated iris samples are checked against.

pub mod biometric;
pub mod code;
pub mod voter;

// Re-export primary types.
pub use biometric::{BiometricReferenceSet, ReferenceSetError};
pub use code::{CodeDigest, CodeFormatError, OneTimeCode, CODE_LENGTH, CODE_MAX, CODE_MIN};
pub use voter::{CodePolicy, CodeRejection, VerificationError, VerificationStage, VoterRecord};
