//! In-memory voter store backed by a sharded `DashMap`.
//!
//! Conditional writes hold only the shard lock of the key being written, so
//! operations on different identities proceed in parallel.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use evote_core::IdentityKey;
use evote_state::VoterRecord;

use super::{BoxFuture, InsertOutcome, StoreError, VoterStore};

/// Process-local voter store. Cheaply cloneable; clones share data.
#[derive(Clone, Default)]
pub struct InMemoryVoterStore {
    records: Arc<DashMap<IdentityKey, VoterRecord>>,
}

impl InMemoryVoterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl std::fmt::Debug for InMemoryVoterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryVoterStore")
            .field("records", &self.records.len())
            .finish()
    }
}

impl VoterStore for InMemoryVoterStore {
    fn find<'a>(
        &'a self,
        key: &'a IdentityKey,
    ) -> BoxFuture<'a, Result<Option<VoterRecord>, StoreError>> {
        Box::pin(async move { Ok(self.records.get(key).map(|r| r.value().clone())) })
    }

    fn insert_if_absent(
        &self,
        record: VoterRecord,
    ) -> BoxFuture<'_, Result<InsertOutcome, StoreError>> {
        Box::pin(async move {
            match self.records.entry(record.key.clone()) {
                Entry::Occupied(_) => Ok(InsertOutcome::AlreadyExists),
                Entry::Vacant(slot) => {
                    slot.insert(record);
                    Ok(InsertOutcome::Inserted)
                }
            }
        })
    }

    fn replace_if_version<'a>(
        &'a self,
        record: &'a VoterRecord,
        expected_version: u64,
    ) -> BoxFuture<'a, Result<bool, StoreError>> {
        Box::pin(async move {
            match self.records.get_mut(&record.key) {
                Some(mut current) if current.version == expected_version => {
                    *current = record.clone();
                    Ok(true)
                }
                _ => Ok(false),
            }
        })
    }

    fn ping(&self) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async { Ok(()) })
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
