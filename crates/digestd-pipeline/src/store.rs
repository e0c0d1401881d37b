//! Persistence seam for the pipeline and batch driver.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use digestd_core::{Digest, Source};
use digestd_db::DbError;
use sqlx::PgPool;
use uuid::Uuid;

/// Everything the pipeline reads or writes. Run transitions must be guarded
/// the way `digestd_db` guards them: a wrong current status is
/// [`DbError::InvalidRunTransition`], and creating a run while the digest
/// already has a `queued` or `processing` one is [`DbError::RunInProgress`].
#[async_trait]
pub trait DigestStore: Send + Sync {
    async fn get_digest(&self, id: Uuid) -> Result<Option<Digest>, DbError>;

    async fn list_active_digests(&self) -> Result<Vec<Digest>, DbError>;

    async fn list_sources(&self, digest_id: Uuid) -> Result<Vec<Source>, DbError>;

    async fn user_email(&self, user_id: Uuid) -> Result<Option<String>, DbError>;

    /// Insert a `queued` run and return its id. This is the per-digest lease.
    async fn create_run(&self, digest_id: Uuid, run_at: DateTime<Utc>) -> Result<Uuid, DbError>;

    async fn start_run(&self, run_id: Uuid) -> Result<(), DbError>;

    async fn complete_run(&self, run_id: Uuid, email_sent_at: DateTime<Utc>)
        -> Result<(), DbError>;

    async fn fail_run(&self, run_id: Uuid, error_message: &str) -> Result<(), DbError>;

    async fn reap_stale_runs(&self, lease: Duration) -> Result<u64, DbError>;
}

/// [`DigestStore`] backed by Postgres.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl DigestStore for PgStore {
    async fn get_digest(&self, id: Uuid) -> Result<Option<Digest>, DbError> {
        match digestd_db::get_digest(&self.pool, id).await {
            Ok(row) => Ok(Some(Digest::try_from(row)?)),
            Err(DbError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn list_active_digests(&self) -> Result<Vec<Digest>, DbError> {
        let rows = digestd_db::list_active_digests(&self.pool).await?;
        let digests = rows
            .into_iter()
            .filter_map(|row| {
                let id = row.id;
                match Digest::try_from(row) {
                    Ok(digest) => Some(digest),
                    Err(e) => {
                        tracing::warn!(digest_id = %id, error = %e, "skipping undecodable digest");
                        None
                    }
                }
            })
            .collect();
        Ok(digests)
    }

    async fn list_sources(&self, digest_id: Uuid) -> Result<Vec<Source>, DbError> {
        let rows = digestd_db::list_sources_for_digest(&self.pool, digest_id).await?;
        Ok(rows.into_iter().map(Source::from).collect())
    }

    async fn user_email(&self, user_id: Uuid) -> Result<Option<String>, DbError> {
        digestd_db::get_user_email(&self.pool, user_id).await
    }

    async fn create_run(&self, digest_id: Uuid, run_at: DateTime<Utc>) -> Result<Uuid, DbError> {
        Ok(digestd_db::create_run(&self.pool, digest_id, run_at).await?.id)
    }

    async fn start_run(&self, run_id: Uuid) -> Result<(), DbError> {
        digestd_db::start_run(&self.pool, run_id).await
    }

    async fn complete_run(
        &self,
        run_id: Uuid,
        email_sent_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        digestd_db::complete_run(&self.pool, run_id, email_sent_at).await
    }

    async fn fail_run(&self, run_id: Uuid, error_message: &str) -> Result<(), DbError> {
        digestd_db::fail_run(&self.pool, run_id, error_message).await
    }

    async fn reap_stale_runs(&self, lease: Duration) -> Result<u64, DbError> {
        digestd_db::reap_stale_runs(&self.pool, lease).await
    }
}
