use chrono::Utc;
use sqlx::SqlitePool;

use crate::db::models::{DbPlugin, DbPluginData};
use crate::db::patch::PluginUpsert;
use crate::error::PanelError;

const PLUGIN_COLUMNS: &str =
    "id, name, version, description, author, enabled, config, installed_at, updated_at";

pub(crate) async fn get(pool: &SqlitePool, name: &str) -> Result<Option<DbPlugin>, PanelError> {
    let row = sqlx::query_as::<_, DbPlugin>(&format!(
        "SELECT {PLUGIN_COLUMNS} FROM plugins WHERE name = ?"
    ))
    .bind(name)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Inserts the row or refreshes its manifest metadata. `enabled`/`config` of an existing row are kept.
pub(crate) async fn upsert(pool: &SqlitePool, upsert: PluginUpsert) -> Result<(), PanelError> {
    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO plugins (name, version, description, author, enabled, config, installed_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(name) DO UPDATE SET
            version = excluded.version,
            description = excluded.description,
            author = excluded.author,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(upsert.name)
    .bind(upsert.version)
    .bind(upsert.description)
    .bind(upsert.author)
    .bind(upsert.enabled)
    .bind(upsert.config)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) async fn set_enabled(pool: &SqlitePool, name: &str, enabled: bool) -> Result<(), PanelError> {
    let res = sqlx::query("UPDATE plugins SET enabled = ?, updated_at = ? WHERE name = ?")
        .bind(enabled)
        .bind(Utc::now())
        .bind(name)
        .execute(pool)
        .await?;
    if res.rows_affected() == 0 {
        return Err(PanelError::not_found(format!("plugin {name:?}")));
    }
    Ok(())
}

pub(crate) async fn set_config(pool: &SqlitePool, name: &str, config: &str) -> Result<(), PanelError> {
    let res = sqlx::query("UPDATE plugins SET config = ?, updated_at = ? WHERE name = ?")
        .bind(config)
        .bind(Utc::now())
        .bind(name)
        .execute(pool)
        .await?;
    if res.rows_affected() == 0 {
        return Err(PanelError::not_found(format!("plugin {name:?}")));
    }
    Ok(())
}

pub(crate) async fn list(pool: &SqlitePool) -> Result<Vec<DbPlugin>, PanelError> {
    let rows = sqlx::query_as::<_, DbPlugin>(&format!(
        "SELECT {PLUGIN_COLUMNS} FROM plugins ORDER BY name"
    ))
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub(crate) async fn get_data(
    pool: &SqlitePool,
    plugin: &str,
    key: &str,
) -> Result<Option<String>, PanelError> {
    let value: Option<String> =
        sqlx::query_scalar("SELECT value FROM plugin_data WHERE plugin = ? AND key = ?")
            .bind(plugin)
            .bind(key)
            .fetch_optional(pool)
            .await?;
    Ok(value)
}

pub(crate) async fn put_data(
    pool: &SqlitePool,
    plugin: &str,
    key: &str,
    value: &str,
) -> Result<(), PanelError> {
    sqlx::query(
        r#"
        INSERT INTO plugin_data (plugin, key, value, updated_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(plugin, key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        "#,
    )
    .bind(plugin)
    .bind(key)
    .bind(value)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) async fn delete_data(pool: &SqlitePool, plugin: &str, key: &str) -> Result<bool, PanelError> {
    let res = sqlx::query("DELETE FROM plugin_data WHERE plugin = ? AND key = ?")
        .bind(plugin)
        .bind(key)
        .execute(pool)
        .await?;
    Ok(res.rows_affected() > 0)
}

pub(crate) async fn list_data(pool: &SqlitePool, plugin: &str) -> Result<Vec<DbPluginData>, PanelError> {
    let rows = sqlx::query_as::<_, DbPluginData>(
        "SELECT key, value, updated_at FROM plugin_data WHERE plugin = ? ORDER BY key",
    )
    .bind(plugin)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
