use chrono::Utc;
use sqlx::SqlitePool;

use super::conflict_on_unique;
use crate::db::models::DbSession;
use crate::db::patch::SessionCreate;
use crate::error::PanelError;

pub(crate) async fn create(pool: &SqlitePool, create: SessionCreate) -> Result<i64, PanelError> {
    sqlx::query_scalar(
        r#"
        INSERT INTO user_sessions (user_id, session_token, ip_address, user_agent, created_at, expires_at, is_active)
        VALUES (?, ?, ?, ?, ?, ?, 1)
        RETURNING id
        "#,
    )
    .bind(create.user_id)
    .bind(create.session_token)
    .bind(create.ip_address)
    .bind(create.user_agent)
    .bind(Utc::now())
    .bind(create.expires_at)
    .fetch_one(pool)
    .await
    .map_err(|e| conflict_on_unique(e, "session token collision"))
}

pub(crate) async fn get_by_token(
    pool: &SqlitePool,
    token: &str,
) -> Result<Option<DbSession>, PanelError> {
    let row = sqlx::query_as::<_, DbSession>(
        r#"
        SELECT id, user_id, session_token, ip_address, user_agent, created_at, expires_at, is_active
        FROM user_sessions
        WHERE session_token = ?
        "#,
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Returns whether an active session was ended.
pub(crate) async fn end(pool: &SqlitePool, token: &str) -> Result<bool, PanelError> {
    let res = sqlx::query(
        "UPDATE user_sessions SET is_active = 0 WHERE session_token = ? AND is_active = 1",
    )
    .bind(token)
    .execute(pool)
    .await?;
    Ok(res.rows_affected() > 0)
}

pub(crate) async fn end_all_for_user(pool: &SqlitePool, user_id: i64) -> Result<u64, PanelError> {
    let res = sqlx::query("UPDATE user_sessions SET is_active = 0 WHERE user_id = ? AND is_active = 1")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

pub(crate) async fn expire(pool: &SqlitePool) -> Result<u64, PanelError> {
    let res = sqlx::query("UPDATE user_sessions SET is_active = 0 WHERE is_active = 1 AND expires_at <= ?")
        .bind(Utc::now())
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

pub(crate) async fn recent_for_user(
    pool: &SqlitePool,
    user_id: i64,
    limit: i64,
) -> Result<Vec<DbSession>, PanelError> {
    let rows = sqlx::query_as::<_, DbSession>(
        r#"
        SELECT id, user_id, session_token, ip_address, user_agent, created_at, expires_at, is_active
        FROM user_sessions
        WHERE user_id = ?
        ORDER BY created_at DESC, id DESC
        LIMIT ?
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
