use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Broadcast to every open socket when a rule fires.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct AlertEvent {
    pub history_id: i64,
    pub rule_id: i64,
    pub rule_name: String,
    pub metric: String,
    pub severity: String,
    pub value: f64,
    pub threshold: f64,
    pub message: String,
    pub triggered_at: DateTime<Utc>,
}
