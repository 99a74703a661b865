//! Postgres voter store.
//!
//! Operates on the `voter_records` table (see `migrations/`). The unique
//! index on `(voter_id, phone)` backs `insert_if_absent`; the `version`
//! predicate on `UPDATE` backs `replace_if_version`.

use chrono::{DateTime, Utc};
use evote_core::{IdentityKey, Timestamp};
use evote_state::{CodeDigest, VoterRecord};
use sqlx::PgPool;
use uuid::Uuid;

use super::{BoxFuture, InsertOutcome, StoreError, VoterStore};

/// Voter store over a shared SQLx connection pool.
#[derive(Debug, Clone)]
pub struct PgVoterStore {
    pool: PgPool,
}

impl PgVoterStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl VoterStore for PgVoterStore {
    fn find<'a>(
        &'a self,
        key: &'a IdentityKey,
    ) -> BoxFuture<'a, Result<Option<VoterRecord>, StoreError>> {
        Box::pin(async move {
            let row = sqlx::query_as::<_, VoterRow>(
                "SELECT id, voter_id, phone, pending_code_digest, code_issued_at, code_verified,
                        biometric_token, has_voted, voted_choice, voted_at, version,
                        created_at, updated_at
                 FROM voter_records WHERE voter_id = $1 AND phone = $2",
            )
            .bind(key.voter_id.as_str())
            .bind(key.phone.as_str())
            .fetch_optional(&self.pool)
            .await?;

            row.map(VoterRow::into_record).transpose()
        })
    }

    fn insert_if_absent(
        &self,
        record: VoterRecord,
    ) -> BoxFuture<'_, Result<InsertOutcome, StoreError>> {
        Box::pin(async move {
            let version = version_to_db(record.version)?;
            let result = sqlx::query(
                "INSERT INTO voter_records (id, voter_id, phone, pending_code_digest, code_issued_at,
                        code_verified, biometric_token, has_voted, voted_choice, voted_at,
                        version, created_at, updated_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                 ON CONFLICT (voter_id, phone) DO NOTHING",
            )
            .bind(record.id)
            .bind(record.key.voter_id.as_str())
            .bind(record.key.phone.as_str())
            .bind(record.pending_code.as_ref().map(CodeDigest::as_str))
            .bind(record.code_issued_at.map(DateTime::<Utc>::from))
            .bind(record.code_verified)
            .bind(record.biometric_token.as_deref())
            .bind(record.has_voted)
            .bind(record.voted_choice.as_deref())
            .bind(record.voted_at.map(DateTime::<Utc>::from))
            .bind(version)
            .bind(DateTime::<Utc>::from(record.created_at))
            .bind(DateTime::<Utc>::from(record.updated_at))
            .execute(&self.pool)
            .await?;

            if result.rows_affected() > 0 {
                Ok(InsertOutcome::Inserted)
            } else {
                Ok(InsertOutcome::AlreadyExists)
            }
        })
    }

    fn replace_if_version<'a>(
        &'a self,
        record: &'a VoterRecord,
        expected_version: u64,
    ) -> BoxFuture<'a, Result<bool, StoreError>> {
        Box::pin(async move {
            let version = version_to_db(record.version)?;
            let expected = version_to_db(expected_version)?;
            let result = sqlx::query(
                "UPDATE voter_records SET
                        pending_code_digest = $1, code_issued_at = $2, code_verified = $3,
                        biometric_token = $4, has_voted = $5, voted_choice = $6, voted_at = $7,
                        version = $8, updated_at = $9
                 WHERE voter_id = $10 AND phone = $11 AND version = $12",
            )
            .bind(record.pending_code.as_ref().map(CodeDigest::as_str))
            .bind(record.code_issued_at.map(DateTime::<Utc>::from))
            .bind(record.code_verified)
            .bind(record.biometric_token.as_deref())
            .bind(record.has_voted)
            .bind(record.voted_choice.as_deref())
            .bind(record.voted_at.map(DateTime::<Utc>::from))
            .bind(version)
            .bind(DateTime::<Utc>::from(record.updated_at))
            .bind(record.key.voter_id.as_str())
            .bind(record.key.phone.as_str())
            .bind(expected)
            .execute(&self.pool)
            .await?;

            Ok(result.rows_affected() > 0)
        })
    }

    fn ping(&self) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            sqlx::query("SELECT 1").execute(&self.pool).await?;
            Ok(())
        })
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}

fn version_to_db(version: u64) -> Result<i64, StoreError> {
    i64::try_from(version).map_err(|_| StoreError::Corrupt(format!("version {version} out of range")))
}

/// Internal row type for SQLx mapping.
#[derive(Debug, sqlx::FromRow)]
struct VoterRow {
    id: Uuid,
    voter_id: String,
    phone: String,
    pending_code_digest: Option<String>,
    code_issued_at: Option<DateTime<Utc>>,
    code_verified: bool,
    biometric_token: Option<String>,
    has_voted: bool,
    voted_choice: Option<String>,
    voted_at: Option<DateTime<Utc>>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl VoterRow {
    fn into_record(self) -> Result<VoterRecord, StoreError> {
        let key = IdentityKey::parse(&self.voter_id, &self.phone)
            .map_err(|e| StoreError::Corrupt(format!("row {}: {e}", self.id)))?;
        let version = u64::try_from(self.version)
            .map_err(|_| StoreError::Corrupt(format!("row {}: negative version", self.id)))?;
        if self.has_voted && self.voted_choice.is_none() {
            return Err(StoreError::Corrupt(format!(
                "row {}: vote latch set without a choice",
                self.id
            )));
        }
        Ok(VoterRecord {
            id: self.id,
            key,
            pending_code: self.pending_code_digest.map(CodeDigest::from_hex),
            code_issued_at: self.code_issued_at.map(Timestamp::from_datetime),
            code_verified: self.code_verified,
            biometric_token: self.biometric_token,
            has_voted: self.has_voted,
            voted_choice: self.voted_choice,
            voted_at: self.voted_at.map(Timestamp::from_datetime),
            version,
            created_at: Timestamp::from_datetime(self.created_at),
            updated_at: Timestamp::from_datetime(self.updated_at),
        })
    }
}
