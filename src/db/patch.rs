//! Insert payloads and partial-update envelopes handed to the DB actor.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::error::PanelError;

/// Abstraction for applying a patch payload to the database.
#[async_trait]
pub trait DbPatchable {
    async fn apply_patch(&self, pool: &SqlitePool) -> Result<(), PanelError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCreate {
    pub username: String,
    pub password_hash: String,
    pub email: Option<String>,
    pub role: String,
    pub avatar: Option<String>,
    pub preferences: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserPatch {
    pub id: i64,
    /// `None` => do not change; `Some(v)` => update
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<String>,
    pub avatar: Option<String>,
    pub preferences: Option<String>,
    pub is_active: Option<bool>,
    pub last_login: Option<DateTime<Utc>>,
    pub login_attempts: Option<i64>,
    pub locked_until: Option<DateTime<Utc>>,
    /// Forces `locked_until` back to NULL; wins over `locked_until`.
    pub clear_lock: bool,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct UserListQuery {
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionCreate {
    pub user_id: i64,
    pub session_token: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogCreate {
    pub level: String,
    pub message: String,
    pub context: Option<String>,
    pub user_id: Option<i64>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl LogCreate {
    pub fn new(level: &str, message: impl Into<String>) -> Self {
        Self {
            level: level.to_string(),
            message: message.into(),
            context: None,
            user_id: None,
            ip_address: None,
            user_agent: None,
        }
    }

    pub fn context(mut self, context: &str) -> Self {
        self.context = Some(context.to_string());
        self
    }

    pub fn user(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn client(mut self, ip_address: Option<String>, user_agent: Option<String>) -> Self {
        self.ip_address = ip_address;
        self.user_agent = user_agent;
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogQuery {
    pub limit: i64,
    pub offset: i64,
    pub level: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRuleCreate {
    pub name: String,
    pub description: Option<String>,
    pub metric: String,
    pub operator: String,
    pub threshold: f64,
    pub severity: String,
    pub enabled: bool,
    pub notification_channels: String,
    pub created_by: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertRulePatch {
    pub id: i64,
    /// `None` => do not change; `Some(v)` => update
    pub name: Option<String>,
    pub description: Option<String>,
    pub metric: Option<String>,
    pub operator: Option<String>,
    pub threshold: Option<f64>,
    pub severity: Option<String>,
    pub enabled: Option<bool>,
    pub notification_channels: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertHistoryCreate {
    pub rule_id: i64,
    pub value: f64,
    pub message: String,
    pub triggered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AlertHistoryQuery {
    pub limit: i64,
    pub rule_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceSampleCreate {
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

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginUpsert {
    pub name: String,
    pub version: String,
    pub description: Option<String>,
    pub author: Option<String>,
    /// Only used when the row does not exist yet.
    pub enabled: bool,
    /// Only used when the row does not exist yet.
    pub config: String,
}
