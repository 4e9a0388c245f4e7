mod alerts;
mod auth;
mod basic;
mod monitor;
mod plugins;

pub use alerts::AlertsConfig;
pub use auth::AuthConfig;
pub use basic::BasicConfig;
pub use monitor::MonitorConfig;
pub use plugins::PluginsConfig;

use figment::{
    Figment,
    providers::{Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error as ThisError;

/// Application configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Listener, database and log level (see `basic` table in config.toml).
    #[serde(default)]
    pub basic: BasicConfig,

    /// Token signing, password hashing and login throttling.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Sampling, socket push and retention intervals.
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Alert cooldown and notification delivery.
    #[serde(default)]
    pub alerts: AlertsConfig,

    /// Plugin directory.
    #[serde(default)]
    pub plugins: PluginsConfig,
}

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("failed to extract configuration: {0}")]
    Extract(#[from] Box<figment::Error>),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

const DEFAULT_CONFIG_FILE: &str = "config.toml";

impl Config {
    /// Defaults overlaid with `config.toml` when one exists in the working directory.
    pub fn figment() -> Figment {
        let figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if PathBuf::from(DEFAULT_CONFIG_FILE).is_file() {
            figment.merge(Toml::file(DEFAULT_CONFIG_FILE))
        } else {
            figment
        }
    }

    pub fn load() -> Result<Self, ConfigError> {
        let cfg: Self = Self::figment().extract().map_err(Box::new)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(4..=31).contains(&self.auth.bcrypt_cost) {
            return Err(ConfigError::Invalid(format!(
                "auth.bcrypt_cost must be within 4..=31, got {}",
                self.auth.bcrypt_cost
            )));
        }
        if self.auth.max_login_attempts == 0 {
            return Err(ConfigError::Invalid(
                "auth.max_login_attempts must be at least 1".to_string(),
            ));
        }
        if !crate::jobs::RETENTION_DAYS_RANGE.contains(&self.monitor.retention_days) {
            return Err(ConfigError::Invalid(format!(
                "monitor.retention_days must be within 1..=36500, got {}",
                self.monitor.retention_days
            )));
        }
        let intervals = [
            ("auth.token_ttl_secs", self.auth.token_ttl_secs),
            ("monitor.ws_push_interval_ms", self.monitor.ws_push_interval_ms),
            ("monitor.sample_interval_secs", self.monitor.sample_interval_secs),
            ("monitor.history_interval_secs", self.monitor.history_interval_secs),
            (
                "monitor.maintenance_interval_secs",
                self.monitor.maintenance_interval_secs,
            ),
            ("monitor.performance_ttl_ms", self.monitor.performance_ttl_ms),
            ("monitor.system_info_ttl_secs", self.monitor.system_info_ttl_secs),
        ];
        if let Some((name, _)) = intervals.iter().find(|(_, v)| *v == 0) {
            return Err(ConfigError::Invalid(format!("{name} must be non-zero")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = Config::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.basic.listen_port, 3000);
        assert_eq!(cfg.alerts.cooldown_secs, 300);
        assert_eq!(cfg.auth.max_login_attempts, 5);
    }

    #[test]
    fn toml_overrides_only_the_keys_it_names() {
        let cfg: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::string(
                "[basic]\nlisten_port = 8080\n\n[alerts]\ncooldown_secs = 60\n",
            ))
            .extract()
            .expect("config must extract");
        assert_eq!(cfg.basic.listen_port, 8080);
        assert_eq!(cfg.basic.loglevel, "info");
        assert_eq!(cfg.alerts.cooldown_secs, 60);
        assert_eq!(cfg.alerts.webhook_retry_max_times, 3);
    }

    #[test]
    fn rejects_out_of_range_cost_and_zero_intervals() {
        let mut cfg = Config::default();
        cfg.auth.bcrypt_cost = 3;
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));

        let mut cfg = Config::default();
        cfg.monitor.retention_days = 100_000_000;
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));

        let mut cfg = Config::default();
        cfg.monitor.ws_push_interval_ms = 0;
        let err = cfg.validate().expect_err("zero interval must be rejected");
        assert!(err.to_string().contains("ws_push_interval_ms"));
    }
}
