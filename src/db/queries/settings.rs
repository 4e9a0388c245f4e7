use chrono::Utc;
use sqlx::SqlitePool;

use crate::db::models::DbSetting;
use crate::db::schema::DEFAULT_SETTINGS;
use crate::error::PanelError;

pub(crate) async fn seed_defaults(pool: &SqlitePool) -> Result<(), PanelError> {
    let now = Utc::now();
    for &(key, value, description, category) in DEFAULT_SETTINGS {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO system_config (key, value, description, category, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(description)
        .bind(category)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;
    }
    Ok(())
}

pub(crate) async fn get(pool: &SqlitePool, key: &str) -> Result<Option<DbSetting>, PanelError> {
    let row = sqlx::query_as::<_, DbSetting>(
        "SELECT key, value, description, category, updated_at FROM system_config WHERE key = ?",
    )
    .bind(key)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Upserts `key`; an existing description and category are kept.
pub(crate) async fn set(
    pool: &SqlitePool,
    key: &str,
    value: &str,
    description: Option<String>,
) -> Result<(), PanelError> {
    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO system_config (key, value, description, category, created_at, updated_at)
        VALUES (?, ?, ?, 'general', ?, ?)
        ON CONFLICT(key) DO UPDATE SET
            value = excluded.value,
            description = COALESCE(excluded.description, description),
            updated_at = excluded.updated_at
        "#,
    )
    .bind(key)
    .bind(value)
    .bind(description)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) async fn list(pool: &SqlitePool) -> Result<Vec<DbSetting>, PanelError> {
    let rows = sqlx::query_as::<_, DbSetting>(
        "SELECT key, value, description, category, updated_at FROM system_config ORDER BY category, key",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
