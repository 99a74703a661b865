//! # Voter Verification State Machine
//!
//! Each voter identity moves through a fixed sequence of authentication
//! gates before a single vote is accepted.
//!
//! ## States
//!
//! ```text
//! Unverified ──▶ CodeSent ──▶ CodeVerified ──▶ BiometricVerified ──▶ Voted
//!                   ▲              │                  │               (terminal
//!                   └──────────────┴──────────────────┘                for the
//!                        re-issuing a code regresses                   vote)
//! ```
//!
//! The stage is derived from the record's flags rather than stored, so the
//! flags are the single source of truth that the store persists.
//!
//! ## Invariants
//!
//! - `has_voted` is a one-way latch; no method clears it.
//! - `has_voted` implies `voted_choice` is set; the choice is written once.
//! - A vote is only recorded while `code_verified` and `biometric_token` hold.
//! - `biometric_token` is only set while `code_verified` holds.
//! - Issuing a code clears `code_verified` and, unless the latch is set,
//!   the biometric token.
//! - Every failed guard leaves the record untouched.
//!
//! Transition methods mutate `self` in place and bump [`VoterRecord::version`]
//! on success. Callers persist with a compare-and-swap on the previous
//! version, which makes the read-guard-write sequence atomic per identity.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use evote_core::{BallotChoice, BiometricSample, IdentityKey, Timestamp};

use crate::biometric::BiometricReferenceSet;
use crate::code::{CodeDigest, OneTimeCode};

// ─── Stage ───────────────────────────────────────────────────────────

/// Position of a voter record in the verification sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStage {
    /// Record exists but no code has been issued.
    Unverified,
    /// A code has been issued and not yet matched.
    CodeSent,
    /// The current code has been matched.
    CodeVerified,
    /// The biometric sample has been accepted.
    BiometricVerified,
    /// The vote has been recorded.
    Voted,
}

impl VerificationStage {
    /// Canonical string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unverified => "UNVERIFIED",
            Self::CodeSent => "CODE_SENT",
            Self::CodeVerified => "CODE_VERIFIED",
            Self::BiometricVerified => "BIOMETRIC_VERIFIED",
            Self::Voted => "VOTED",
        }
    }
}

impl std::fmt::Display for VerificationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Why a submitted code was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeRejection {
    /// No code has been issued for this record.
    NoPendingCode,
    /// The pending code is older than the policy TTL.
    Expired,
    /// The submitted code differs from the pending one.
    Mismatch,
}

impl std::fmt::Display for CodeRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NoPendingCode => "no code pending",
            Self::Expired => "code expired",
            Self::Mismatch => "code mismatch",
        };
        f.write_str(s)
    }
}

/// Guard failures raised by the verification transitions.
///
/// None of these are retryable: the caller has to supply different data or
/// repeat an earlier step.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    /// Submitted code was not accepted.
    #[error("invalid verification code: {0}")]
    InvalidCode(CodeRejection),

    /// A step was attempted out of order.
    #[error("precondition failed: {required} required, record is {stage}")]
    PreconditionFailed {
        /// Stage the record is in.
        stage: VerificationStage,
        /// Stage the step requires.
        required: VerificationStage,
    },

    /// Submitted sample is not in the reference set.
    #[error("biometric sample not recognised")]
    BiometricMismatch,

    /// The vote latch is already set.
    #[error("vote already recorded for this identity")]
    AlreadyVoted,
}

// ─── Policy ──────────────────────────────────────────────────────────

/// Acceptance policy for verification codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodePolicy {
    /// How long an issued code stays acceptable.
    pub ttl: Duration,
}

impl Default for CodePolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::minutes(10),
        }
    }
}

// ─── Record ──────────────────────────────────────────────────────────

/// Durable per-identity verification state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterRecord {
    /// Surrogate row identifier; also salts the code digest.
    pub id: Uuid,
    /// The `(voterId, phone)` natural key.
    pub key: IdentityKey,
    /// Digest of the last issued code.
    pub pending_code: Option<CodeDigest>,
    /// When the pending code was issued.
    pub code_issued_at: Option<Timestamp>,
    /// Whether the current pending code has been matched.
    pub code_verified: bool,
    /// Accepted biometric sample token.
    pub biometric_token: Option<String>,
    /// The vote latch.
    pub has_voted: bool,
    /// The recorded vote target.
    pub voted_choice: Option<String>,
    /// When the vote was recorded.
    pub voted_at: Option<Timestamp>,
    /// Optimistic concurrency counter, bumped on every successful transition.
    pub version: u64,
    /// Creation time.
    pub created_at: Timestamp,
    /// Last successful transition.
    pub updated_at: Timestamp,
}

impl VoterRecord {
    /// Create a fresh record for `key` at the current time.
    pub fn new(key: IdentityKey) -> Self {
        Self::new_at(key, Timestamp::now())
    }

    /// Create a fresh record for `key` at `now`.
    pub fn new_at(key: IdentityKey, now: Timestamp) -> Self {
        Self {
            id: Uuid::new_v4(),
            key,
            pending_code: None,
            code_issued_at: None,
            code_verified: false,
            biometric_token: None,
            has_voted: false,
            voted_choice: None,
            voted_at: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Current stage, derived from the flags.
    pub fn stage(&self) -> VerificationStage {
        if self.has_voted {
            VerificationStage::Voted
        } else if self.code_verified && self.biometric_token.is_some() {
            VerificationStage::BiometricVerified
        } else if self.code_verified {
            VerificationStage::CodeVerified
        } else if self.pending_code.is_some() {
            VerificationStage::CodeSent
        } else {
            VerificationStage::Unverified
        }
    }

    /// Store a freshly issued code (any stage → CODE_SENT, or stays VOTED).
    ///
    /// Always succeeds. Invalidates any previous code and the verified flag.
    /// The vote fields are never touched; once the latch is set the
    /// biometric token that authorised the vote is kept with it.
    pub fn issue_code(&mut self, code: &OneTimeCode, now: Timestamp) {
        self.pending_code = Some(code.digest_for(&self.id));
        self.code_issued_at = Some(now);
        self.code_verified = false;
        if !self.has_voted {
            self.biometric_token = None;
        }
        self.touch(now);
    }

    /// Match a submitted code against the pending one (CODE_SENT → CODE_VERIFIED).
    ///
    /// Re-submitting the current code after it was verified succeeds again.
    pub fn verify_code(
        &mut self,
        submitted: &str,
        policy: &CodePolicy,
        now: Timestamp,
    ) -> Result<(), VerificationError> {
        let digest = self
            .pending_code
            .as_ref()
            .ok_or(VerificationError::InvalidCode(CodeRejection::NoPendingCode))?;
        if let Some(issued_at) = self.code_issued_at {
            if issued_at.is_older_than(policy.ttl, now) {
                return Err(VerificationError::InvalidCode(CodeRejection::Expired));
            }
        }
        if !digest.matches(&self.id, submitted) {
            return Err(VerificationError::InvalidCode(CodeRejection::Mismatch));
        }
        self.code_verified = true;
        self.touch(now);
        Ok(())
    }

    /// Accept a biometric sample (CODE_VERIFIED → BIOMETRIC_VERIFIED).
    pub fn verify_biometric(
        &mut self,
        sample: &BiometricSample,
        reference: &BiometricReferenceSet,
        now: Timestamp,
    ) -> Result<(), VerificationError> {
        self.require(self.code_verified, VerificationStage::CodeVerified)?;
        if !reference.contains(sample.as_str()) {
            return Err(VerificationError::BiometricMismatch);
        }
        self.biometric_token = Some(sample.as_str().to_string());
        self.touch(now);
        Ok(())
    }

    /// Record the vote (BIOMETRIC_VERIFIED → VOTED).
    ///
    /// Authentication is checked before the latch, so a voter who re-issued
    /// a code after voting sees `PreconditionFailed` until they verify again.
    pub fn cast_vote(
        &mut self,
        choice: &BallotChoice,
        now: Timestamp,
    ) -> Result<(), VerificationError> {
        self.require(
            self.code_verified && self.biometric_token.is_some(),
            VerificationStage::BiometricVerified,
        )?;
        if self.has_voted {
            return Err(VerificationError::AlreadyVoted);
        }
        self.has_voted = true;
        self.voted_choice = Some(choice.as_str().to_string());
        self.voted_at = Some(now);
        self.touch(now);
        Ok(())
    }

    fn require(
        &self,
        satisfied: bool,
        required: VerificationStage,
    ) -> Result<(), VerificationError> {
        if satisfied {
            Ok(())
        } else {
            Err(VerificationError::PreconditionFailed {
                stage: self.stage(),
                required,
            })
        }
    }

    fn touch(&mut self, now: Timestamp) {
        self.version += 1;
        self.updated_at = now;
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn key(voter: &str, phone: &str) -> IdentityKey {
        IdentityKey::parse(voter, phone).unwrap()
    }

    fn code(v: u32) -> OneTimeCode {
        OneTimeCode::from_value(v).unwrap()
    }

    fn sample(s: &str) -> BiometricSample {
        BiometricSample::new(s).unwrap()
    }

    fn choice(s: &str) -> BallotChoice {
        BallotChoice::new(s).unwrap()
    }

    fn verified_record() -> VoterRecord {
        let now = Timestamp::now();
        let mut rec = VoterRecord::new_at(key("V1", "555-0100"), now);
        rec.issue_code(&code(123_456), now);
        rec.verify_code("123456", &CodePolicy::default(), now).unwrap();
        rec.verify_biometric(&sample("iris_sample_01"), &BiometricReferenceSet::builtin(), now)
            .unwrap();
        rec
    }

    // ── Happy path ───────────────────────────────────────────────────

    #[test]
    fn test_new_record_is_unverified() {
        let rec = VoterRecord::new(key("V1", "555-0100"));
        assert_eq!(rec.stage(), VerificationStage::Unverified);
        assert_eq!(rec.version, 0);
        assert!(!rec.has_voted);
    }

    #[test]
    fn test_full_sequence_reaches_voted() {
        let mut rec = verified_record();
        assert_eq!(rec.stage(), VerificationStage::BiometricVerified);
        rec.cast_vote(&choice("PartyA"), Timestamp::now()).unwrap();
        assert_eq!(rec.stage(), VerificationStage::Voted);
        assert_eq!(rec.voted_choice.as_deref(), Some("PartyA"));
        assert!(rec.voted_at.is_some());
        assert_eq!(rec.version, 4);
    }

    #[test]
    fn test_issue_code_moves_to_code_sent() {
        let mut rec = VoterRecord::new(key("V1", "555-0100"));
        rec.issue_code(&code(111_111), Timestamp::now());
        assert_eq!(rec.stage(), VerificationStage::CodeSent);
        assert!(rec.pending_code.is_some());
        assert_eq!(rec.version, 1);
    }

    // ── Code verification ────────────────────────────────────────────

    #[test]
    fn test_wrong_code_is_rejected_and_state_unchanged() {
        let now = Timestamp::now();
        let mut rec = VoterRecord::new_at(key("V1", "555-0100"), now);
        rec.issue_code(&code(123_456), now);
        let before = rec.clone();
        let err = rec
            .verify_code("000000", &CodePolicy::default(), now)
            .unwrap_err();
        assert_eq!(err, VerificationError::InvalidCode(CodeRejection::Mismatch));
        assert_eq!(rec, before);
    }

    #[test]
    fn test_verify_without_pending_code() {
        let mut rec = VoterRecord::new(key("V1", "555-0100"));
        let err = rec
            .verify_code("123456", &CodePolicy::default(), Timestamp::now())
            .unwrap_err();
        assert_eq!(
            err,
            VerificationError::InvalidCode(CodeRejection::NoPendingCode)
        );
    }

    #[test]
    fn test_expired_code_is_rejected() {
        let issued = Timestamp::now();
        let mut rec = VoterRecord::new_at(key("V1", "555-0100"), issued);
        rec.issue_code(&code(123_456), issued);
        let later = Timestamp::from_datetime(*issued.as_datetime() + Duration::minutes(11));
        let err = rec
            .verify_code("123456", &CodePolicy::default(), later)
            .unwrap_err();
        assert_eq!(err, VerificationError::InvalidCode(CodeRejection::Expired));
        assert!(!rec.code_verified);
    }

    #[test]
    fn test_reissue_invalidates_first_code() {
        let now = Timestamp::now();
        let mut rec = VoterRecord::new_at(key("V1", "555-0100"), now);
        rec.issue_code(&code(111_111), now);
        rec.issue_code(&code(222_222), now);
        let err = rec
            .verify_code("111111", &CodePolicy::default(), now)
            .unwrap_err();
        assert_eq!(err, VerificationError::InvalidCode(CodeRejection::Mismatch));
        rec.verify_code("222222", &CodePolicy::default(), now).unwrap();
        assert!(rec.code_verified);
    }

    #[test]
    fn test_reissue_regresses_to_code_sent() {
        let mut rec = verified_record();
        rec.issue_code(&code(333_333), Timestamp::now());
        assert_eq!(rec.stage(), VerificationStage::CodeSent);
        assert!(!rec.code_verified);
        assert!(rec.biometric_token.is_none());
    }

    // ── Ordering guards ──────────────────────────────────────────────

    #[test]
    fn test_biometric_before_code_verification_fails() {
        let now = Timestamp::now();
        let mut rec = VoterRecord::new_at(key("V1", "555-0100"), now);
        rec.issue_code(&code(123_456), now);
        let err = rec
            .verify_biometric(&sample("iris_sample_01"), &BiometricReferenceSet::builtin(), now)
            .unwrap_err();
        assert_eq!(
            err,
            VerificationError::PreconditionFailed {
                stage: VerificationStage::CodeSent,
                required: VerificationStage::CodeVerified,
            }
        );
        assert!(rec.biometric_token.is_none());
    }

    #[test]
    fn test_unknown_sample_is_mismatch_and_field_unset() {
        let now = Timestamp::now();
        let mut rec = VoterRecord::new_at(key("V2", "555-0200"), now);
        rec.issue_code(&code(123_456), now);
        rec.verify_code("123456", &CodePolicy::default(), now).unwrap();
        let err = rec
            .verify_biometric(&sample("unknown_sample"), &BiometricReferenceSet::builtin(), now)
            .unwrap_err();
        assert_eq!(err, VerificationError::BiometricMismatch);
        assert!(rec.biometric_token.is_none());
        assert_eq!(rec.stage(), VerificationStage::CodeVerified);
    }

    #[test]
    fn test_vote_before_biometric_fails() {
        let now = Timestamp::now();
        let mut rec = VoterRecord::new_at(key("V1", "555-0100"), now);
        rec.issue_code(&code(123_456), now);
        rec.verify_code("123456", &CodePolicy::default(), now).unwrap();
        let err = rec.cast_vote(&choice("PartyA"), now).unwrap_err();
        assert!(matches!(
            err,
            VerificationError::PreconditionFailed {
                required: VerificationStage::BiometricVerified,
                ..
            }
        ));
        assert!(!rec.has_voted);
    }

    // ── Vote latch ───────────────────────────────────────────────────

    #[test]
    fn test_second_vote_is_rejected() {
        let mut rec = verified_record();
        rec.cast_vote(&choice("PartyA"), Timestamp::now()).unwrap();
        let err = rec.cast_vote(&choice("PartyB"), Timestamp::now()).unwrap_err();
        assert_eq!(err, VerificationError::AlreadyVoted);
        assert_eq!(rec.voted_choice.as_deref(), Some("PartyA"));
    }

    #[test]
    fn test_reissue_after_vote_keeps_latch() {
        let mut rec = verified_record();
        rec.cast_vote(&choice("PartyA"), Timestamp::now()).unwrap();
        rec.issue_code(&code(444_444), Timestamp::now());
        assert!(rec.has_voted);
        assert_eq!(rec.voted_choice.as_deref(), Some("PartyA"));
        assert_eq!(rec.biometric_token.as_deref(), Some("iris_sample_01"));
        assert_eq!(rec.stage(), VerificationStage::Voted);
    }

    // ── Display / serialization ──────────────────────────────────────

    #[test]
    fn test_stage_display() {
        assert_eq!(VerificationStage::Unverified.to_string(), "UNVERIFIED");
        assert_eq!(VerificationStage::CodeSent.to_string(), "CODE_SENT");
        assert_eq!(VerificationStage::CodeVerified.to_string(), "CODE_VERIFIED");
        assert_eq!(
            VerificationStage::BiometricVerified.to_string(),
            "BIOMETRIC_VERIFIED"
        );
        assert_eq!(VerificationStage::Voted.to_string(), "VOTED");
    }

    #[test]
    fn test_stage_serializes_screaming_snake() {
        let json = serde_json::to_string(&VerificationStage::BiometricVerified).unwrap();
        assert_eq!(json, "\"BIOMETRIC_VERIFIED\"");
    }

    #[test]
    fn test_record_serialization_omits_plaintext_code() {
        let now = Timestamp::now();
        let mut rec = VoterRecord::new_at(key("V1", "555-0100"), now);
        rec.issue_code(&code(987_654), now);
        let json = serde_json::to_string(&rec).unwrap();
        assert!(!json.contains("987654"));
        let parsed: VoterRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, rec);
    }

    // ── Property: invariants hold under any operation sequence ───────

    #[derive(Debug, Clone)]
    enum Op {
        Issue(u32),
        Verify(u32),
        Biometric(bool),
        Vote(u8),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (100_000u32..=100_003).prop_map(Op::Issue),
            (100_000u32..=100_003).prop_map(Op::Verify),
            any::<bool>().prop_map(Op::Biometric),
            (0u8..3).prop_map(Op::Vote),
        ]
    }

    proptest! {
        #[test]
        fn invariants_hold_for_any_sequence(ops in prop::collection::vec(op_strategy(), 0..40)) {
            let reference = BiometricReferenceSet::builtin();
            let policy = CodePolicy::default();
            let now = Timestamp::now();
            let mut rec = VoterRecord::new_at(key("V9", "555-0900"), now);
            let mut first_choice: Option<String> = None;

            for op in ops {
                let before = rec.clone();
                let was_verified = rec.code_verified;
                let result = match op {
                    Op::Issue(v) => {
                        rec.issue_code(&code(v), now);
                        Ok(())
                    }
                    Op::Verify(v) => rec.verify_code(&v.to_string(), &policy, now),
                    Op::Biometric(known) => {
                        let token = if known { "iris_sample_02" } else { "nope" };
                        rec.verify_biometric(&sample(token), &reference, now)
                    }
                    Op::Vote(n) => rec.cast_vote(&choice(&format!("Party{n}")), now),
                };

                match result {
                    Err(_) => prop_assert_eq!(&rec, &before),
                    Ok(()) => prop_assert_eq!(rec.version, before.version + 1),
                }
                if before.has_voted {
                    prop_assert!(rec.has_voted);
                }
                if rec.has_voted {
                    prop_assert!(rec.voted_choice.is_some());
                    match &first_choice {
                        None => first_choice = rec.voted_choice.clone(),
                        Some(c) => prop_assert_eq!(rec.voted_choice.as_ref(), Some(c)),
                    }
                }
                if rec.biometric_token.is_some() && before.biometric_token.is_none() {
                    prop_assert!(was_verified);
                }
            }
        }
    }
}
