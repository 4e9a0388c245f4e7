use chrono::TimeDelta;
use sqlx::SqlitePool;

use crate::db::models::{DbPerformanceSample, PurgeReport};
use crate::db::patch::PerformanceSampleCreate;
use crate::error::PanelError;

pub(crate) async fn record(
    pool: &SqlitePool,
    sample: PerformanceSampleCreate,
) -> Result<i64, PanelError> {
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO performance_history (
            timestamp, cpu_usage, memory_usage, disk_usage, network_in, network_out, load_average,
            swap_usage, process_count
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(sample.timestamp)
    .bind(sample.cpu_usage)
    .bind(sample.memory_usage)
    .bind(sample.disk_usage)
    .bind(sample.network_in)
    .bind(sample.network_out)
    .bind(sample.load_average)
    .bind(sample.swap_usage)
    .bind(sample.process_count)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

/// Oldest first so the rows can be plotted directly.
pub(crate) async fn last_hours(
    pool: &SqlitePool,
    hours: u32,
) -> Result<Vec<DbPerformanceSample>, PanelError> {
    let since = super::since(TimeDelta::try_hours(i64::from(hours)));
    let rows = sqlx::query_as::<_, DbPerformanceSample>(
        r#"
        SELECT
            id, timestamp, cpu_usage, memory_usage, disk_usage, network_in, network_out, load_average,
            swap_usage, process_count
        FROM performance_history
        WHERE timestamp > ?
        ORDER BY timestamp ASC
        "#,
    )
    .bind(since)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Deletes logs, alert history and samples older than `days`, in one transaction.
pub(crate) async fn purge_older_than(pool: &SqlitePool, days: u32) -> Result<PurgeReport, PanelError> {
    let cutoff = super::since(TimeDelta::try_days(i64::from(days)));
    let mut tx = pool.begin().await?;

    let logs = sqlx::query("DELETE FROM system_logs WHERE created_at < ?")
        .bind(cutoff)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    let alert_history = sqlx::query("DELETE FROM alert_history WHERE triggered_at < ?")
        .bind(cutoff)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    let performance_history = sqlx::query("DELETE FROM performance_history WHERE timestamp < ?")
        .bind(cutoff)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    tx.commit().await?;
    Ok(PurgeReport {
        logs,
        alert_history,
        performance_history,
    })
}
