use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// Resolves a user's email address for digest delivery.
///
/// Returns `Ok(None)` when the user does not exist.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_user_email(pool: &PgPool, user_id: Uuid) -> Result<Option<String>, DbError> {
    let email = sqlx::query_scalar::<_, String>("SELECT email FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    Ok(email)
}
