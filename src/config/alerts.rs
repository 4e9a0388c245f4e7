use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AlertsConfig {
    /// Repeat notifications for the same rule are suppressed inside this window.
    /// TOML: `alerts.cooldown_secs`. Default: `300`.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    /// Active alerts older than this are swept by the maintenance job.
    /// TOML: `alerts.active_max_age_secs`. Default: `86400`.
    #[serde(default = "default_active_max_age_secs")]
    pub active_max_age_secs: u64,

    /// TOML: `alerts.webhook_timeout_secs`. Default: `10`.
    #[serde(default = "default_webhook_timeout_secs")]
    pub webhook_timeout_secs: u64,

    /// TOML: `alerts.webhook_retry_max_times`. Default: `3`.
    #[serde(default = "default_webhook_retry_max_times")]
    pub webhook_retry_max_times: usize,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: default_cooldown_secs(),
            active_max_age_secs: default_active_max_age_secs(),
            webhook_timeout_secs: default_webhook_timeout_secs(),
            webhook_retry_max_times: default_webhook_retry_max_times(),
        }
    }
}

fn default_cooldown_secs() -> u64 {
    5 * 60
}

fn default_active_max_age_secs() -> u64 {
    24 * 60 * 60
}

fn default_webhook_timeout_secs() -> u64 {
    10
}

fn default_webhook_retry_max_times() -> usize {
    3
}
