//! # Database Persistence Layer
//!
//! Postgres persistence for voter records via SQLx.
//!
//! The database is **optional**. When a database URL is configured, voter
//! records live in the `voter_records` table and the vote latch survives
//! restarts. When absent, the API keeps records in memory, which suits
//! development and tests but loses every record on shutdown.
//!
//! Queries live in [`crate::store::postgres`]; this module only owns the
//! pool and migrations.

use sqlx::postgres::{PgPool, PgPoolOptions};

/// Initialize the database connection pool and run migrations.
///
/// Returns `None` if no URL is configured (in-memory-only mode).
/// Returns `Err` if the URL is set but the connection or migration fails.
pub async fn init_pool(database_url: Option<&str>) -> Result<Option<PgPool>, sqlx::Error> {
    let Some(url) = database_url else {
        tracing::warn!(
            "DATABASE_URL not set; running in-memory only. \
             Voter records will not survive restarts."
        );
        return Ok(None);
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(Some(pool))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn absent_url_means_in_memory() {
        assert!(init_pool(None).await.unwrap().is_none());
    }
}
