//! Background timers: metric sampling and periodic maintenance.

use aquapanel_alert_core::Metric;
use aquapanel_schema::PerformanceSnapshot;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::alerts::AlertService;
use crate::config::MonitorConfig;
use crate::db::{DbActorHandle, PerformanceSampleCreate};
use crate::metrics::MetricsHandle;
use crate::plugins::{PluginManager, hooks};
use crate::users::UserService;
use crate::utils::logging::with_pretty_json_debug;

/// `system_config` key overriding `monitor.retention_days`.
pub const RETENTION_SETTING: &str = "data_retention_days";

/// Accepted retention window, in days.
pub const RETENTION_DAYS_RANGE: std::ops::RangeInclusive<u32> = 1..=36_500;

/// Parses a stored retention value; `None` when it is not a whole number of days in range.
pub fn parse_retention_days(raw: &str) -> Option<u32> {
    raw.trim()
        .parse::<u32>()
        .ok()
        .filter(|days| RETENTION_DAYS_RANGE.contains(days))
}

#[derive(Clone)]
pub struct JobDeps {
    pub db: DbActorHandle,
    pub metrics: MetricsHandle,
    pub alerts: AlertService,
    pub users: UserService,
    pub plugins: PluginManager,
}

/// Running background tasks; dropping this without `shutdown` leaves them running.
pub struct Jobs {
    stop: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl Jobs {
    pub fn spawn(deps: JobDeps, cfg: &MonitorConfig) -> Self {
        let (stop, stop_rx) = watch::channel(false);
        let sampler = tokio::spawn(run_sampler(
            deps.clone(),
            Duration::from_secs(cfg.sample_interval_secs.max(1)),
            Duration::from_secs(cfg.history_interval_secs.max(1)),
            stop_rx.clone(),
        ));
        let maintenance = tokio::spawn(run_maintenance(
            deps,
            Duration::from_secs(cfg.maintenance_interval_secs.max(1)),
            cfg.retention_days,
            stop_rx,
        ));
        info!(
            sample_secs = cfg.sample_interval_secs,
            history_secs = cfg.history_interval_secs,
            maintenance_secs = cfg.maintenance_interval_secs,
            "background jobs started"
        );
        Self {
            stop,
            tasks: vec![sampler, maintenance],
        }
    }

    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "background job ended abnormally");
            }
        }
        info!("background jobs stopped");
    }
}

/// Row persisted to `performance_history` for one snapshot.
pub fn history_row(snapshot: &PerformanceSnapshot) -> PerformanceSampleCreate {
    PerformanceSampleCreate {
        timestamp: snapshot.timestamp,
        cpu_usage: snapshot.cpu.usage,
        memory_usage: snapshot.memory.usage,
        disk_usage: snapshot.disk.usage,
        network_in: Metric::NetworkIn.extract(snapshot),
        network_out: Metric::NetworkOut.extract(snapshot),
        load_average: Metric::LoadAverage.extract(snapshot),
        swap_usage: Metric::SwapUsage.extract(snapshot).unwrap_or(0.0),
        process_count: i64::try_from(snapshot.processes.all).unwrap_or(i64::MAX),
    }
}

async fn run_sampler(
    deps: JobDeps,
    sample_every: Duration,
    history_every: Duration,
    mut stop: watch::Receiver<bool>,
) {
    let mut sample = interval(sample_every);
    sample.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut history = interval(history_every);
    history.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = stop.changed() => break,
            _ = sample.tick() => sample_once(&deps).await,
            _ = history.tick() => persist_history(&deps).await,
        }
    }
    debug!("sampler stopped");
}

async fn sample_once(deps: &JobDeps) {
    let snapshot = match deps.metrics.performance().await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!(error = %e, "metric sampling failed");
            return;
        }
    };

    deps.alerts.check(&snapshot).await;

    match serde_json::to_value(snapshot.as_ref()) {
        Ok(payload) => {
            deps.plugins
                .call_hook(hooks::METRICS_SNAPSHOT, payload)
                .await;
        }
        Err(e) => warn!(error = %e, "failed to encode snapshot for plugins"),
    }
}

async fn persist_history(deps: &JobDeps) {
    let snapshot = match deps.metrics.performance().await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!(error = %e, "metric sampling failed");
            return;
        }
    };
    let row = history_row(&snapshot);
    with_pretty_json_debug(&row, |pretty| debug!("performance sample:\n{pretty}"));
    if let Err(e) = deps.db.record_performance(row).await {
        warn!(error = %e, "failed to persist performance sample");
    }
}

async fn run_maintenance(
    deps: JobDeps,
    every: Duration,
    default_retention_days: u32,
    mut stop: watch::Receiver<bool>,
) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = stop.changed() => break,
            _ = ticker.tick() => maintain(&deps, default_retention_days).await,
        }
    }
    debug!("maintenance stopped");
}

async fn retention_days(db: &DbActorHandle, fallback: u32) -> u32 {
    match db.get_setting(RETENTION_SETTING).await {
        Ok(Some(setting)) => match parse_retention_days(&setting.value) {
            Some(days) => days,
            None => {
                warn!(value = %setting.value, "ignoring invalid {RETENTION_SETTING}");
                fallback
            }
        },
        Ok(None) => fallback,
        Err(e) => {
            warn!(error = %e, "could not read {RETENTION_SETTING}");
            fallback
        }
    }
}

async fn maintain(deps: &JobDeps, default_retention_days: u32) {
    deps.metrics.run_pending_tasks();

    if let Err(e) = deps.users.cleanup_expired_sessions().await {
        warn!(error = %e, "session cleanup failed");
    }
    deps.alerts.cleanup_active().await;

    let days = retention_days(&deps.db, default_retention_days).await;
    match deps.db.purge_older_than(days).await {
        Ok(report) => {
            let removed = report.logs + report.alert_history + report.performance_history;
            if removed > 0 {
                info!(
                    days,
                    logs = report.logs,
                    alert_history = report.alert_history,
                    performance_history = report.performance_history,
                    "old records purged"
                );
            }
        }
        Err(e) => warn!(error = %e, "history purge failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aquapanel_schema::{CoreLoad, NetworkStat};
    use chrono::Utc;

    #[test]
    fn history_row_uses_alert_metric_definitions() {
        let mut s = PerformanceSnapshot::empty(Utc::now());
        s.cpu.usage = 12.5;
        s.cpu.cores = vec![
            CoreLoad {
                name: "cpu0".into(),
                load: 20.0,
            },
            CoreLoad {
                name: "cpu1".into(),
                load: 40.0,
            },
        ];
        s.network = vec![NetworkStat {
            interface: "eth0".into(),
            rx_sec: 10.0,
            tx_sec: 5.0,
            ..Default::default()
        }];
        s.processes.all = 42;

        let row = history_row(&s);
        assert_eq!(row.cpu_usage, 12.5);
        assert_eq!(row.load_average, Some(30.0));
        assert_eq!(row.network_in, Some(10.0));
        assert_eq!(row.network_out, Some(5.0));
        assert_eq!(row.swap_usage, 0.0);
        assert_eq!(row.process_count, 42);
    }

    #[test]
    fn retention_values_outside_the_window_are_rejected() {
        assert_eq!(parse_retention_days(" 30 "), Some(30));
        assert_eq!(parse_retention_days("36500"), Some(36_500));
        assert_eq!(parse_retention_days("0"), None);
        assert_eq!(parse_retention_days("36501"), None);
        assert_eq!(parse_retention_days("100000000"), None);
        assert_eq!(parse_retention_days("thirty"), None);
    }

    #[test]
    fn history_row_without_interfaces_has_no_rates() {
        let row = history_row(&PerformanceSnapshot::empty(Utc::now()));
        assert_eq!(row.network_in, None);
        assert_eq!(row.load_average, None);
    }
}
