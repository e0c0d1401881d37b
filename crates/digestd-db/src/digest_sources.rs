use chrono::{DateTime, Utc};
use digestd_core::Source;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `digest_sources` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DigestSourceRow {
    pub id: Uuid,
    pub digest_id: Uuid,
    pub source_type: String,
    pub source_value: String,
    pub created_at: DateTime<Utc>,
}

impl From<DigestSourceRow> for Source {
    fn from(row: DigestSourceRow) -> Self {
        Source {
            id: row.id,
            digest_id: row.digest_id,
            source_type: row.source_type,
            source_value: row.source_value,
        }
    }
}

/// Returns all sources attached to a digest in insertion order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_sources_for_digest(
    pool: &PgPool,
    digest_id: Uuid,
) -> Result<Vec<DigestSourceRow>, DbError> {
    let rows = sqlx::query_as::<_, DigestSourceRow>(
        "SELECT id, digest_id, source_type, source_value, created_at \
         FROM digest_sources \
         WHERE digest_id = $1 \
         ORDER BY created_at, id",
    )
    .bind(digest_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
