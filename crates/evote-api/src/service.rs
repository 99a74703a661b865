//! # Verification Service
//!
//! Orchestrates the four voter operations over the injected collaborators:
//! a [`VoterStore`], a [`NotificationSink`], a [`CodeGenerator`], and the
//! [`BiometricReferenceSet`].
//!
//! ## Write Path
//!
//! Every mutating operation runs the same loop:
//!
//! 1. Load the record for the identity key (`NotFound` if absent).
//! 2. Apply the pure transition from `evote-state` to a copy. A guard
//!    failure returns immediately; nothing is written.
//! 3. `replace_if_version` with the version read in step 1.
//! 4. On a version conflict, go back to 1 and re-evaluate the guards
//!    against the fresh record.
//!
//! Two concurrent `cast_vote` calls for the same identity therefore cannot
//! both succeed: the loser's retry observes the latch and fails with
//! `AlreadyVoted`. Operations on different identities never contend.
//!
//! ## Timeouts
//!
//! Store calls are bounded by `store_timeout`; expiry surfaces as
//! [`ServiceError::Unavailable`]. Notifications run on a spawned task after
//! the commit, bounded by `notify_timeout`, and their failures are only
//! logged and counted.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use evote_core::{
    BallotChoice, BiometricSample, IdentityKey, PhoneNumber, SubmittedCode, Timestamp,
    ValidationError,
};
use evote_state::{
    BiometricReferenceSet, CodePolicy, CodeRejection, VerificationError, VerificationStage,
    VoterRecord,
};
use thiserror::Error;

use crate::codegen::CodeGenerator;
use crate::middleware::ApiMetrics;
use crate::notify::{code_message, vote_confirmation_message, NotificationSink};
use crate::store::{InsertOutcome, StoreError, VoterStore};

/// Tunables for the verification service.
#[derive(Debug, Clone, Copy)]
pub struct ServiceConfig {
    /// Code acceptance policy.
    pub code_policy: CodePolicy,
    /// Upper bound on a single store call.
    pub store_timeout: Duration,
    /// Upper bound on a single notification send.
    pub notify_timeout: Duration,
    /// Re-reads allowed after a version conflict before giving up.
    pub max_conflict_retries: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            code_policy: CodePolicy::default(),
            store_timeout: Duration::from_millis(2_000),
            notify_timeout: Duration::from_millis(3_000),
            max_conflict_retries: 8,
        }
    }
}

/// Errors returned by the verification service.
///
/// Everything except `Unavailable` is a terminal domain outcome; the caller
/// must supply different data or repeat an earlier step. `Unavailable` is
/// transient and safe to retry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// A required field was missing or malformed.
    #[error("invalid input: {0}")]
    InvalidInput(#[from] ValidationError),

    /// No record exists for the identity key.
    #[error("voter record not found")]
    NotFound,

    /// The submitted code was not accepted.
    #[error("invalid verification code: {0}")]
    InvalidCode(CodeRejection),

    /// A step was attempted out of order.
    #[error("precondition failed: {required} required, record is {stage}")]
    PreconditionFailed {
        stage: VerificationStage,
        required: VerificationStage,
    },

    /// The biometric sample is not in the reference set.
    #[error("biometric sample not recognised")]
    BiometricMismatch,

    /// The vote latch is already set.
    #[error("vote already recorded")]
    AlreadyVoted,

    /// Store unreachable, timed out, or persistently contended.
    #[error("service unavailable: {0}")]
    Unavailable(String),
}

impl ServiceError {
    /// Metric label for this outcome.
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::NotFound => "not_found",
            Self::InvalidCode(_) => "invalid_code",
            Self::PreconditionFailed { .. } => "precondition_failed",
            Self::BiometricMismatch => "biometric_mismatch",
            Self::AlreadyVoted => "already_voted",
            Self::Unavailable(_) => "unavailable",
        }
    }
}

impl From<VerificationError> for ServiceError {
    fn from(err: VerificationError) -> Self {
        match err {
            VerificationError::InvalidCode(reason) => Self::InvalidCode(reason),
            VerificationError::PreconditionFailed { stage, required } => {
                Self::PreconditionFailed { stage, required }
            }
            VerificationError::BiometricMismatch => Self::BiometricMismatch,
            VerificationError::AlreadyVoted => Self::AlreadyVoted,
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        Self::Unavailable(err.to_string())
    }
}

/// Read-only view of a voter's progress. Never includes the code or the
/// recorded choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoterStatus {
    pub stage: VerificationStage,
    pub has_voted: bool,
}

#[derive(Debug, Clone, Copy)]
enum Step {
    RequestCode,
    VerifyCode,
    VerifyBiometric,
    CastVote,
}

impl Step {
    fn as_str(self) -> &'static str {
        match self {
            Self::RequestCode => "request_code",
            Self::VerifyCode => "verify_code",
            Self::VerifyBiometric => "verify_biometric",
            Self::CastVote => "cast_vote",
        }
    }
}

/// The voter verification and vote-casting service.
pub struct VerificationService {
    store: Arc<dyn VoterStore>,
    notifier: Arc<dyn NotificationSink>,
    codes: Arc<dyn CodeGenerator>,
    reference: Arc<BiometricReferenceSet>,
    config: ServiceConfig,
    metrics: ApiMetrics,
}

impl std::fmt::Debug for VerificationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationService")
            .field("store", &self.store.backend())
            .field("notifier", &self.notifier.name())
            .field("reference_samples", &self.reference.len())
            .field("config", &self.config)
            .finish()
    }
}

impl VerificationService {
    pub fn new(
        store: Arc<dyn VoterStore>,
        notifier: Arc<dyn NotificationSink>,
        codes: Arc<dyn CodeGenerator>,
        reference: Arc<BiometricReferenceSet>,
        config: ServiceConfig,
        metrics: ApiMetrics,
    ) -> Self {
        Self {
            store,
            notifier,
            codes,
            reference,
            config,
            metrics,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn metrics(&self) -> &ApiMetrics {
        &self.metrics
    }

    /// Backend name of the configured store.
    pub fn store_backend(&self) -> &'static str {
        self.store.backend()
    }

    // ── Operations ───────────────────────────────────────────────────

    /// Issue a fresh code for `(voter_id, phone)`, creating the record on
    /// first contact, and send it to the phone.
    pub async fn request_code(&self, voter_id: &str, phone: &str) -> Result<(), ServiceError> {
        let result = self.request_code_inner(voter_id, phone).await;
        self.record_outcome(Step::RequestCode, &result);
        result
    }

    /// Match a submitted code against the pending one.
    pub async fn verify_code(
        &self,
        voter_id: &str,
        phone: &str,
        otp: &str,
    ) -> Result<(), ServiceError> {
        let result = self.verify_code_inner(voter_id, phone, otp).await;
        self.record_outcome(Step::VerifyCode, &result);
        result
    }

    /// Check a biometric sample against the reference set.
    pub async fn verify_biometric(
        &self,
        voter_id: &str,
        phone: &str,
        sample: &str,
    ) -> Result<(), ServiceError> {
        let result = self.verify_biometric_inner(voter_id, phone, sample).await;
        self.record_outcome(Step::VerifyBiometric, &result);
        result
    }

    /// Record the vote, at most once per identity.
    pub async fn cast_vote(
        &self,
        voter_id: &str,
        phone: &str,
        choice: &str,
    ) -> Result<(), ServiceError> {
        let result = self.cast_vote_inner(voter_id, phone, choice).await;
        self.record_outcome(Step::CastVote, &result);
        result
    }

    /// Current stage of a voter record.
    pub async fn status(&self, voter_id: &str, phone: &str) -> Result<VoterStatus, ServiceError> {
        let key = IdentityKey::parse(voter_id, phone)?;
        let record = self
            .bounded(self.store.find(&key))
            .await?
            .ok_or(ServiceError::NotFound)?;
        Ok(VoterStatus {
            stage: record.stage(),
            has_voted: record.has_voted,
        })
    }

    /// Store connectivity check for the readiness check.
    pub async fn ping(&self) -> Result<(), ServiceError> {
        self.bounded(self.store.ping()).await?;
        Ok(())
    }

    // ── Internals ────────────────────────────────────────────────────

    async fn request_code_inner(&self, voter_id: &str, phone: &str) -> Result<(), ServiceError> {
        let key = IdentityKey::parse(voter_id, phone)?;
        self.ensure_record(&key).await?;

        let code = self.codes.next_code();
        let record = self
            .mutate(&key, |rec, now| {
                rec.issue_code(&code, now);
                Ok(())
            })
            .await?;
        tracing::info!(voter = %key, stage = %record.stage(), "verification code issued");

        self.dispatch(key.phone.clone(), code_message(code.expose()), "code");
        Ok(())
    }

    async fn verify_code_inner(
        &self,
        voter_id: &str,
        phone: &str,
        otp: &str,
    ) -> Result<(), ServiceError> {
        let key = IdentityKey::parse(voter_id, phone)?;
        let submitted = SubmittedCode::new(otp)?;
        let policy = self.config.code_policy;

        self.mutate(&key, |rec, now| rec.verify_code(submitted.as_str(), &policy, now))
            .await?;
        tracing::info!(voter = %key, "verification code accepted");
        Ok(())
    }

    async fn verify_biometric_inner(
        &self,
        voter_id: &str,
        phone: &str,
        sample: &str,
    ) -> Result<(), ServiceError> {
        let key = IdentityKey::parse(voter_id, phone)?;
        let sample = BiometricSample::new(sample)?;
        let reference = Arc::clone(&self.reference);

        self.mutate(&key, |rec, now| rec.verify_biometric(&sample, &reference, now))
            .await?;
        tracing::info!(voter = %key, "biometric sample accepted");
        Ok(())
    }

    async fn cast_vote_inner(
        &self,
        voter_id: &str,
        phone: &str,
        choice: &str,
    ) -> Result<(), ServiceError> {
        let key = IdentityKey::parse(voter_id, phone)?;
        let choice = BallotChoice::new(choice)?;

        self.mutate(&key, |rec, now| rec.cast_vote(&choice, now))
            .await?;
        self.metrics.record_vote();
        tracing::info!(voter = %key, "vote recorded");

        self.dispatch(
            key.phone.clone(),
            vote_confirmation_message(choice.as_str()),
            "vote_confirmation",
        );
        Ok(())
    }

    /// Find the record for `key`, creating an empty one if absent. A racing
    /// creator winning the insert is not an error.
    async fn ensure_record(&self, key: &IdentityKey) -> Result<(), ServiceError> {
        if self.bounded(self.store.find(key)).await?.is_some() {
            return Ok(());
        }
        let fresh = VoterRecord::new(key.clone());
        match self.bounded(self.store.insert_if_absent(fresh)).await? {
            InsertOutcome::Inserted => tracing::info!(voter = %key, "voter record created"),
            InsertOutcome::AlreadyExists => {
                tracing::debug!(voter = %key, "voter record created concurrently")
            }
        }
        Ok(())
    }

    /// Load, transition, and conditionally write back, retrying on version
    /// conflicts. Guard failures are returned without writing.
    async fn mutate<F>(&self, key: &IdentityKey, mut apply: F) -> Result<VoterRecord, ServiceError>
    where
        F: FnMut(&mut VoterRecord, Timestamp) -> Result<(), VerificationError>,
    {
        for attempt in 0..=self.config.max_conflict_retries {
            let current = self
                .bounded(self.store.find(key))
                .await?
                .ok_or(ServiceError::NotFound)?;

            let mut next = current.clone();
            apply(&mut next, Timestamp::now())?;

            if self
                .bounded(self.store.replace_if_version(&next, current.version))
                .await?
            {
                return Ok(next);
            }
            tracing::debug!(voter = %key, attempt, "version conflict, re-reading record");
        }

        tracing::warn!(
            voter = %key,
            retries = self.config.max_conflict_retries,
            "giving up after repeated version conflicts"
        );
        Err(ServiceError::Unavailable(
            "too many concurrent updates for this identity".to_string(),
        ))
    }

    async fn bounded<T>(
        &self,
        op: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        let limit = self.config.store_timeout;
        tokio::time::timeout(limit, op)
            .await
            .map_err(|_| StoreError::Timeout(limit))?
    }

    fn dispatch(&self, to: PhoneNumber, message: String, kind: &'static str) {
        let sink = Arc::clone(&self.notifier);
        let limit = self.config.notify_timeout;
        let metrics = self.metrics.clone();

        tokio::spawn(async move {
            match tokio::time::timeout(limit, sink.send(&to, &message)).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    tracing::warn!(to = %to.masked(), sink = sink.name(), kind, error = %err, "notification failed");
                    metrics.record_notification_failure(kind);
                }
                Err(_) => {
                    tracing::warn!(to = %to.masked(), sink = sink.name(), kind, ?limit, "notification timed out");
                    metrics.record_notification_failure(kind);
                }
            }
        });
    }

    fn record_outcome<T>(&self, step: Step, result: &Result<T, ServiceError>) {
        let outcome = match result {
            Ok(_) => "ok",
            Err(err) => {
                match err {
                    ServiceError::Unavailable(_) => {
                        tracing::warn!(step = step.as_str(), error = %err, "store unavailable")
                    }
                    _ => tracing::debug!(step = step.as_str(), error = %err, "step rejected"),
                }
                err.outcome()
            }
        };
        self.metrics.record_outcome(step.as_str(), outcome);
    }
}
