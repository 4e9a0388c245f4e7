use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Full account row. Never serialized to clients; see [`DbUserSummary`].
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct DbUser {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub email: Option<String>,
    pub role: String,
    pub avatar: Option<String>,
    /// JSON object text.
    pub preferences: String,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub login_attempts: i64,
    pub locked_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbUserSummary {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub role: String,
    pub avatar: Option<String>,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub active_sessions: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbUserStats {
    pub total: i64,
    pub admins: i64,
    pub users: i64,
    pub viewers: i64,
    pub active_last_7_days: i64,
    pub new_last_30_days: i64,
    pub active_sessions: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbSession {
    pub id: i64,
    pub user_id: i64,
    #[serde(skip_serializing)]
    pub session_token: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbLogEntry {
    pub id: i64,
    pub level: String,
    pub message: String,
    pub context: Option<String>,
    pub user_id: Option<i64>,
    pub username: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbAlertRule {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub metric: String,
    pub operator: String,
    pub threshold: f64,
    pub severity: String,
    pub enabled: bool,
    /// JSON array text.
    pub notification_channels: String,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbAlertHistory {
    pub id: i64,
    pub rule_id: i64,
    pub rule_name: Option<String>,
    pub metric: Option<String>,
    pub severity: Option<String>,
    pub triggered_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub value: f64,
    pub status: String,
    pub message: Option<String>,
    pub acknowledged_by: Option<i64>,
    pub acknowledged_at: Option<DateTime<Utc>>,
}

/// One `(date, severity, metric)` bucket of alert history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbAlertStat {
    pub date: String,
    pub severity: Option<String>,
    pub metric: Option<String>,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbPerformanceSample {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub disk_usage: f64,
    pub network_in: Option<f64>,
    pub network_out: Option<f64>,
    pub load_average: Option<f64>,
    pub swap_usage: f64,
    pub process_count: i64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct PurgeReport {
    pub logs: u64,
    pub alert_history: u64,
    pub performance_history: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbSetting {
    pub key: String,
    pub value: String,
    pub description: Option<String>,
    pub category: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbPlugin {
    pub id: i64,
    pub name: String,
    pub version: String,
    pub description: Option<String>,
    pub author: Option<String>,
    pub enabled: bool,
    /// JSON object text.
    pub config: String,
    pub installed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbPluginData {
    pub key: String,
    /// JSON text.
    pub value: String,
    pub updated_at: DateTime<Utc>,
}
