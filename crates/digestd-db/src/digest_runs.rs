//! Database operations for `digest_runs`.
//!
//! Every transition is a single `UPDATE ... WHERE status = <expected>`, so a
//! run can only move `queued -> processing -> completed | failed` and is
//! never revisited once terminal. Zero affected rows surfaces as
//! [`DbError::InvalidRunTransition`].

use std::time::Duration;

use chrono::{DateTime, Utc};
use digestd_core::RunStatus;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const ONE_OPEN_INDEX: &str = "digest_runs_one_open";
const LEASE_EXPIRED_MESSAGE: &str = "run lease expired before an outcome was recorded";

/// A row from the `digest_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DigestRunRow {
    pub id: Uuid,
    pub digest_id: Uuid,
    pub status: String,
    pub run_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub email_sent_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl DigestRunRow {
    /// Parsed status.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Decode`] if the stored status is not a known state.
    pub fn status(&self) -> Result<RunStatus, DbError> {
        Ok(self.status.parse::<RunStatus>()?)
    }
}

/// Creates a new run in `queued` status.
///
/// This is the per-digest lease: the partial unique index on
/// `(digest_id) WHERE status IN ('queued', 'processing')` admits one open run
/// per digest, so a concurrent invocation is rejected before any row exists
/// for it.
///
/// # Errors
///
/// Returns [`DbError::RunInProgress`] if the digest already has an open run,
/// or [`DbError::Sqlx`] if the insert fails (including an unknown
/// `digest_id`, which violates the foreign key).
pub async fn create_run(
    pool: &PgPool,
    digest_id: Uuid,
    run_at: DateTime<Utc>,
) -> Result<DigestRunRow, DbError> {
    let result = sqlx::query_as::<_, DigestRunRow>(
        "INSERT INTO digest_runs (id, digest_id, status, run_at) \
         VALUES ($1, $2, 'queued', $3) \
         RETURNING id, digest_id, status, run_at, started_at, completed_at, \
                   email_sent_at, error_message",
    )
    .bind(Uuid::new_v4())
    .bind(digest_id)
    .bind(run_at)
    .fetch_one(pool)
    .await;

    match result {
        Ok(row) => Ok(row),
        Err(sqlx::Error::Database(e)) if e.constraint() == Some(ONE_OPEN_INDEX) => {
            Err(DbError::RunInProgress { digest_id })
        }
        Err(e) => Err(e.into()),
    }
}

/// Marks a run as `processing` and sets `started_at = NOW()`.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is missing or not
/// `queued`, or [`DbError::Sqlx`] if the update fails.
pub async fn start_run(pool: &PgPool, id: Uuid) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE digest_runs \
         SET status = 'processing', started_at = NOW() \
         WHERE id = $1 AND status = 'queued'",
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidRunTransition {
            id,
            expected_status: "queued",
        });
    }

    Ok(())
}

/// Marks a run as `completed`, stamps `completed_at` and `email_sent_at`,
/// and sets the parent digest's `last_run_at` to the run's `run_at`.
///
/// Both writes happen in one transaction so `last_run_at` moves if and only
/// if the run reaches `completed`.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is not `processing`,
/// or [`DbError::Sqlx`] if either update fails.
pub async fn complete_run(
    pool: &PgPool,
    id: Uuid,
    email_sent_at: DateTime<Utc>,
) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;

    let updated = sqlx::query_as::<_, (Uuid, DateTime<Utc>)>(
        "UPDATE digest_runs \
         SET status = 'completed', completed_at = NOW(), email_sent_at = $1 \
         WHERE id = $2 AND status = 'processing' \
         RETURNING digest_id, run_at",
    )
    .bind(email_sent_at)
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some((digest_id, run_at)) = updated else {
        return Err(DbError::InvalidRunTransition {
            id,
            expected_status: "processing",
        });
    };

    sqlx::query("UPDATE digests SET last_run_at = $1, updated_at = NOW() WHERE id = $2")
        .bind(run_at)
        .bind(digest_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

/// Marks a run as `failed`, sets `completed_at = NOW()` and `error_message`.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is not `processing`,
/// or [`DbError::Sqlx`] if the update fails.
pub async fn fail_run(pool: &PgPool, id: Uuid, error_message: &str) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE digest_runs \
         SET status = 'failed', completed_at = NOW(), error_message = $1 \
         WHERE id = $2 AND status = 'processing'",
    )
    .bind(error_message)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidRunTransition {
            id,
            expected_status: "processing",
        });
    }

    Ok(())
}

/// Fails every open run that has outlived `lease`.
///
/// Releases the per-digest lease held by a worker that died mid-run: a
/// `processing` run whose `started_at` is older than `lease`, or a `queued`
/// run created more than `lease` ago that was never started. The latter is
/// moved through `processing` first so its status history stays
/// `queued, processing, failed`. Returns the number of runs reaped.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if either update fails.
pub async fn reap_stale_runs(pool: &PgPool, lease: Duration) -> Result<u64, DbError> {
    let lease_secs = i64::try_from(lease.as_secs()).unwrap_or(i64::MAX);
    let mut tx = pool.begin().await?;

    let never_started = sqlx::query_scalar::<_, Uuid>(
        "UPDATE digest_runs \
         SET status = 'processing', started_at = NOW() \
         WHERE status = 'queued' \
           AND created_at < NOW() - ($1::bigint * INTERVAL '1 second') \
         RETURNING id",
    )
    .bind(lease_secs)
    .fetch_all(&mut *tx)
    .await?;

    let result = sqlx::query(
        "UPDATE digest_runs \
         SET status = 'failed', completed_at = NOW(), error_message = $1 \
         WHERE status = 'processing' \
           AND (started_at < NOW() - ($2::bigint * INTERVAL '1 second') OR id = ANY($3))",
    )
    .bind(LEASE_EXPIRED_MESSAGE)
    .bind(lease_secs)
    .bind(&never_started)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(result.rows_affected())
}

/// Fetches a single run by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_run(pool: &PgPool, id: Uuid) -> Result<DigestRunRow, DbError> {
    sqlx::query_as::<_, DigestRunRow>(
        "SELECT id, digest_id, status, run_at, started_at, completed_at, \
                email_sent_at, error_message \
         FROM digest_runs \
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Returns the most recent `limit` runs of a digest, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_runs_for_digest(
    pool: &PgPool,
    digest_id: Uuid,
    limit: i64,
) -> Result<Vec<DigestRunRow>, DbError> {
    let rows = sqlx::query_as::<_, DigestRunRow>(
        "SELECT id, digest_id, status, run_at, started_at, completed_at, \
                email_sent_at, error_message \
         FROM digest_runs \
         WHERE digest_id = $1 \
         ORDER BY run_at DESC, id DESC \
         LIMIT $2",
    )
    .bind(digest_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
