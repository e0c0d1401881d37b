//! Read access to the `digests` table.
//!
//! The pipeline never writes digests directly; `last_run_at` is stamped by
//! [`crate::complete_run`] inside the run-completion transaction.

use chrono::{DateTime, Utc};
use digestd_core::{Digest, Frequency};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `digests` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DigestRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub frequency: String,
    pub active: bool,
    pub last_run_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DigestRow> for Digest {
    type Error = DbError;

    fn try_from(row: DigestRow) -> Result<Self, Self::Error> {
        Ok(Digest {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            description: row.description.filter(|d| !d.trim().is_empty()),
            frequency: row.frequency.parse::<Frequency>()?,
            active: row.active,
            last_run_at: row.last_run_at,
        })
    }
}

/// Fetches a single digest by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists, or [`DbError::Sqlx`] if
/// the query fails.
pub async fn get_digest(pool: &PgPool, id: Uuid) -> Result<DigestRow, DbError> {
    sqlx::query_as::<_, DigestRow>(
        "SELECT id, user_id, name, description, frequency, active, last_run_at, \
                created_at, updated_at \
         FROM digests \
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Returns every active digest, oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_digests(pool: &PgPool) -> Result<Vec<DigestRow>, DbError> {
    let rows = sqlx::query_as::<_, DigestRow>(
        "SELECT id, user_id, name, description, frequency, active, last_run_at, \
                created_at, updated_at \
         FROM digests \
         WHERE active = true \
         ORDER BY created_at, id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
