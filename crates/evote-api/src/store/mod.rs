//! # Voter Record Store
//!
//! Durable keyed storage for [`VoterRecord`]s, addressed by
//! [`IdentityKey`].
//!
//! ## Atomicity Contract
//!
//! Stores never lock across identities. Per-identity atomicity comes from
//! two conditional writes:
//!
//! - [`VoterStore::insert_if_absent`] creates a record only when no record
//!   for the key exists. Two racing creators see exactly one `Inserted`.
//! - [`VoterStore::replace_if_version`] overwrites a record only when the
//!   stored version equals the version the caller read. Two racing writers
//!   that read the same version see exactly one `true`.
//!
//! The verification service builds its read-guard-write sequences on top of
//! these, so a naive load-then-save is never issued.
//!
//! Trait methods return boxed futures so that the store can be held as
//! `Arc<dyn VoterStore>`.

pub mod memory;
pub mod postgres;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use evote_core::IdentityKey;
use evote_state::VoterRecord;
use thiserror::Error;

pub use memory::InMemoryVoterStore;
pub use postgres::PgVoterStore;

/// Owned, sendable future returned by collaborator traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Transient store failures. All of these are retryable by the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Backend unreachable or returned an error.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Operation did not complete within the configured bound.
    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),

    /// A stored row could not be mapped back to a record.
    #[error("stored record is corrupt: {0}")]
    Corrupt(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Unavailable(err.to_string())
    }
}

/// Result of [`VoterStore::insert_if_absent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The record was created.
    Inserted,
    /// A record for the key already existed; nothing was written.
    AlreadyExists,
}

/// Keyed voter record storage with conditional writes.
pub trait VoterStore: Send + Sync {
    /// Load the record for `key`, if any.
    fn find<'a>(
        &'a self,
        key: &'a IdentityKey,
    ) -> BoxFuture<'a, Result<Option<VoterRecord>, StoreError>>;

    /// Create `record` unless a record for its key already exists.
    fn insert_if_absent(
        &self,
        record: VoterRecord,
    ) -> BoxFuture<'_, Result<InsertOutcome, StoreError>>;

    /// Overwrite the stored record for `record.key` with `record` if the
    /// stored version is `expected_version`. Returns `false` on a version
    /// mismatch or when no record exists.
    fn replace_if_version<'a>(
        &'a self,
        record: &'a VoterRecord,
        expected_version: u64,
    ) -> BoxFuture<'a, Result<bool, StoreError>>;

    /// Check backend connectivity.
    fn ping(&self) -> BoxFuture<'_, Result<(), StoreError>>;

    /// Short backend name for logs.
    fn backend(&self) -> &'static str;
}
