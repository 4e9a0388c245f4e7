use chrono::{TimeDelta, Utc};
use sqlx::SqlitePool;

use crate::db::models::{DbAlertHistory, DbAlertRule, DbAlertStat};
use crate::db::patch::{AlertHistoryCreate, AlertHistoryQuery, AlertRuleCreate};
use crate::error::PanelError;

const RULE_COLUMNS: &str = "id, name, description, metric, operator, threshold, severity, enabled, \
     notification_channels, created_by, created_at, updated_at";

pub(crate) async fn create_rule(
    pool: &SqlitePool,
    create: AlertRuleCreate,
) -> Result<i64, PanelError> {
    let now = Utc::now();
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO alert_rules (
            name, description, metric, operator, threshold, severity, enabled, notification_channels,
            created_by, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(create.name)
    .bind(create.description)
    .bind(create.metric)
    .bind(create.operator)
    .bind(create.threshold)
    .bind(create.severity)
    .bind(create.enabled)
    .bind(create.notification_channels)
    .bind(create.created_by)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

/// Newest first; `enabled` filters when set.
pub(crate) async fn list_rules(
    pool: &SqlitePool,
    enabled: Option<bool>,
) -> Result<Vec<DbAlertRule>, PanelError> {
    let rows = sqlx::query_as::<_, DbAlertRule>(&format!(
        "SELECT {RULE_COLUMNS} FROM alert_rules WHERE (? IS NULL OR enabled = ?) \
         ORDER BY created_at DESC, id DESC"
    ))
    .bind(enabled)
    .bind(enabled)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub(crate) async fn get_rule(pool: &SqlitePool, id: i64) -> Result<Option<DbAlertRule>, PanelError> {
    let row = sqlx::query_as::<_, DbAlertRule>(&format!(
        "SELECT {RULE_COLUMNS} FROM alert_rules WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Deletes the rule and its history atomically. Returns whether the rule existed.
pub(crate) async fn delete_rule(pool: &SqlitePool, id: i64) -> Result<bool, PanelError> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM alert_history WHERE rule_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    let res = sqlx::query("DELETE FROM alert_rules WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(res.rows_affected() > 0)
}

pub(crate) async fn record(pool: &SqlitePool, create: AlertHistoryCreate) -> Result<i64, PanelError> {
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO alert_history (rule_id, triggered_at, value, status, message)
        VALUES (?, ?, ?, 'triggered', ?)
        RETURNING id
        "#,
    )
    .bind(create.rule_id)
    .bind(create.triggered_at)
    .bind(create.value)
    .bind(create.message)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

pub(crate) async fn list_history(
    pool: &SqlitePool,
    query: AlertHistoryQuery,
) -> Result<Vec<DbAlertHistory>, PanelError> {
    let rows = sqlx::query_as::<_, DbAlertHistory>(
        r#"
        SELECT
            h.id, h.rule_id, r.name AS rule_name, r.metric, r.severity, h.triggered_at, h.resolved_at,
            h.value, h.status, h.message, h.acknowledged_by, h.acknowledged_at
        FROM alert_history h
        LEFT JOIN alert_rules r ON r.id = h.rule_id
        WHERE (? IS NULL OR h.rule_id = ?)
        ORDER BY h.triggered_at DESC, h.id DESC
        LIMIT ?
        "#,
    )
    .bind(query.rule_id)
    .bind(query.rule_id)
    .bind(query.limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Returns whether the entry existed and was not already resolved.
pub(crate) async fn acknowledge(
    pool: &SqlitePool,
    id: i64,
    user_id: i64,
) -> Result<bool, PanelError> {
    let res = sqlx::query(
        r#"
        UPDATE alert_history
        SET status = 'acknowledged', acknowledged_by = ?, acknowledged_at = ?
        WHERE id = ? AND status != 'resolved'
        "#,
    )
    .bind(user_id)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;
    Ok(res.rows_affected() > 0)
}

/// Returns whether the entry existed and was not already resolved.
pub(crate) async fn resolve(pool: &SqlitePool, id: i64) -> Result<bool, PanelError> {
    let res = sqlx::query(
        "UPDATE alert_history SET status = 'resolved', resolved_at = ? WHERE id = ? AND status != 'resolved'",
    )
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;
    Ok(res.rows_affected() > 0)
}

pub(crate) async fn stats(pool: &SqlitePool, days: u32) -> Result<Vec<DbAlertStat>, PanelError> {
    let since = super::since(TimeDelta::try_days(i64::from(days)));
    let rows = sqlx::query_as::<_, DbAlertStat>(
        r#"
        SELECT
            substr(h.triggered_at, 1, 10) AS date,
            r.severity,
            r.metric,
            COUNT(*) AS count
        FROM alert_history h
        LEFT JOIN alert_rules r ON r.id = h.rule_id
        WHERE h.triggered_at > ?
        GROUP BY date, r.severity, r.metric
        ORDER BY date DESC, count DESC
        "#,
    )
    .bind(since)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
