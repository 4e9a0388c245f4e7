use chrono::Utc;
use sqlx::SqlitePool;

use crate::db::models::DbLogEntry;
use crate::db::patch::{LogCreate, LogQuery};
use crate::error::PanelError;

pub(crate) async fn insert(pool: &SqlitePool, log: LogCreate) -> Result<i64, PanelError> {
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO system_logs (level, message, context, user_id, ip_address, user_agent, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(log.level)
    .bind(log.message)
    .bind(log.context)
    .bind(log.user_id)
    .bind(log.ip_address)
    .bind(log.user_agent)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;
    Ok(id)
}

pub(crate) async fn list(pool: &SqlitePool, query: LogQuery) -> Result<Vec<DbLogEntry>, PanelError> {
    let rows = sqlx::query_as::<_, DbLogEntry>(
        r#"
        SELECT l.id, l.level, l.message, l.context, l.user_id, u.username, l.ip_address, l.user_agent, l.created_at
        FROM system_logs l
        LEFT JOIN users u ON u.id = l.user_id
        WHERE (? IS NULL OR l.level = ?)
        ORDER BY l.created_at DESC, l.id DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(&query.level)
    .bind(&query.level)
    .bind(query.limit)
    .bind(query.offset)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub(crate) async fn recent_for_user(
    pool: &SqlitePool,
    user_id: i64,
    limit: i64,
) -> Result<Vec<DbLogEntry>, PanelError> {
    let rows = sqlx::query_as::<_, DbLogEntry>(
        r#"
        SELECT l.id, l.level, l.message, l.context, l.user_id, u.username, l.ip_address, l.user_agent, l.created_at
        FROM system_logs l
        LEFT JOIN users u ON u.id = l.user_id
        WHERE l.user_id = ?
        ORDER BY l.created_at DESC, l.id DESC
        LIMIT ?
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
