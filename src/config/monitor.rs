use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MonitorConfig {
    /// Socket push period while a client is monitoring.
    /// TOML: `monitor.ws_push_interval_ms`. Default: `2000`.
    #[serde(default = "default_ws_push_interval_ms")]
    pub ws_push_interval_ms: u64,

    /// Alert evaluation period.
    /// TOML: `monitor.sample_interval_secs`. Default: `10`.
    #[serde(default = "default_sample_interval_secs")]
    pub sample_interval_secs: u64,

    /// Performance history persistence period.
    /// TOML: `monitor.history_interval_secs`. Default: `60`.
    #[serde(default = "default_history_interval_secs")]
    pub history_interval_secs: u64,

    /// TOML: `monitor.system_info_ttl_secs`. Default: `600`.
    #[serde(default = "default_system_info_ttl_secs")]
    pub system_info_ttl_secs: u64,

    /// TOML: `monitor.performance_ttl_ms`. Default: `1000`.
    #[serde(default = "default_performance_ttl_ms")]
    pub performance_ttl_ms: u64,

    /// Cache eviction, session expiry and history purge period.
    /// TOML: `monitor.maintenance_interval_secs`. Default: `300`.
    #[serde(default = "default_maintenance_interval_secs")]
    pub maintenance_interval_secs: u64,

    /// Fallback when `data_retention_days` is missing from `system_config`.
    /// TOML: `monitor.retention_days`. Default: `30`.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    /// Number of top-CPU processes included in each snapshot.
    /// TOML: `monitor.process_list_limit`. Default: `10`.
    #[serde(default = "default_process_list_limit")]
    pub process_list_limit: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            ws_push_interval_ms: default_ws_push_interval_ms(),
            sample_interval_secs: default_sample_interval_secs(),
            history_interval_secs: default_history_interval_secs(),
            system_info_ttl_secs: default_system_info_ttl_secs(),
            performance_ttl_ms: default_performance_ttl_ms(),
            maintenance_interval_secs: default_maintenance_interval_secs(),
            retention_days: default_retention_days(),
            process_list_limit: default_process_list_limit(),
        }
    }
}

fn default_ws_push_interval_ms() -> u64 {
    2000
}

fn default_sample_interval_secs() -> u64 {
    10
}

fn default_history_interval_secs() -> u64 {
    60
}

fn default_system_info_ttl_secs() -> u64 {
    10 * 60
}

fn default_performance_ttl_ms() -> u64 {
    1000
}

fn default_maintenance_interval_secs() -> u64 {
    5 * 60
}

fn default_retention_days() -> u32 {
    30
}

fn default_process_list_limit() -> usize {
    10
}
