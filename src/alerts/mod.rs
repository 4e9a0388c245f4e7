//! Rule storage, evaluation against live snapshots, and alert fan-out.

mod notify;

pub use notify::{Notification, NotificationChannel, Notifier, parse_channels};

use ahash::AHashMap;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, sync::Arc, time::Duration};
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info, warn};

use aquapanel_alert_core::{
    ActiveAlert, ActiveAlertTracker, Metric, Operator, RuleSpec, Severity, format_alert_message,
};
use aquapanel_schema::{AlertEvent, PerformanceSnapshot};

use crate::config::AlertsConfig;
use crate::db::{
    AlertHistoryCreate, AlertHistoryQuery, AlertRuleCreate, AlertRulePatch, DbActorHandle,
    DbAlertHistory, DbAlertRule, DbAlertStat, LogCreate,
};
use crate::error::PanelError;
use crate::plugins::{PluginManager, hooks};

const EVENT_CHANNEL_CAPACITY: usize = 64;
const MAX_HISTORY_LIMIT: u32 = 1000;

#[derive(Debug, Clone, Deserialize)]
pub struct NewRule {
    pub name: String,
    pub description: Option<String>,
    pub metric: String,
    pub operator: String,
    pub threshold: f64,
    pub severity: Option<String>,
    pub enabled: Option<bool>,
    pub notification_channels: Option<Vec<NotificationChannel>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuleUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub metric: Option<String>,
    pub operator: Option<String>,
    pub threshold: Option<f64>,
    pub severity: Option<String>,
    pub enabled: Option<bool>,
    pub notification_channels: Option<Vec<NotificationChannel>>,
}

/// Ad-hoc rule evaluated by `test_rule`.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleDraft {
    #[serde(default = "default_draft_name")]
    pub name: String,
    pub metric: String,
    pub operator: String,
    pub threshold: f64,
    pub severity: Option<String>,
}

fn default_draft_name() -> String {
    "test".to_string()
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RuleTestResult {
    pub metric: Metric,
    pub value: Option<f64>,
    pub threshold: f64,
    pub operator: Operator,
    pub triggered: bool,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AlertRuleView {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub metric: String,
    pub operator: String,
    pub threshold: f64,
    pub severity: String,
    pub enabled: bool,
    pub notification_channels: Vec<NotificationChannel>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DbAlertRule> for AlertRuleView {
    fn from(row: DbAlertRule) -> Self {
        Self {
            notification_channels: parse_channels(&row.notification_channels),
            id: row.id,
            name: row.name,
            description: row.description,
            metric: row.metric,
            operator: row.operator,
            threshold: row.threshold,
            severity: row.severity,
            enabled: row.enabled,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AlertStats {
    pub days: u32,
    pub total: i64,
    pub by_severity: BTreeMap<String, i64>,
    pub by_metric: BTreeMap<String, i64>,
    pub daily: Vec<DbAlertStat>,
}

impl AlertStats {
    fn from_buckets(days: u32, daily: Vec<DbAlertStat>) -> Self {
        let mut by_severity = BTreeMap::new();
        let mut by_metric = BTreeMap::new();
        let mut total = 0;
        for bucket in &daily {
            total += bucket.count;
            let severity = bucket.severity.clone().unwrap_or_else(|| "unknown".into());
            *by_severity.entry(severity).or_insert(0) += bucket.count;
            let metric = bucket.metric.clone().unwrap_or_else(|| "unknown".into());
            *by_metric.entry(metric).or_insert(0) += bucket.count;
        }
        Self {
            days,
            total,
            by_severity,
            by_metric,
            daily,
        }
    }
}

fn parse_metric(raw: &str) -> Result<Metric, PanelError> {
    raw.parse()
        .map_err(|e: aquapanel_alert_core::ParseError| PanelError::validation(e.to_string()))
}

fn parse_operator(raw: &str) -> Result<Operator, PanelError> {
    raw.parse()
        .map_err(|e: aquapanel_alert_core::ParseError| PanelError::validation(e.to_string()))
}

fn parse_severity(raw: &str) -> Result<Severity, PanelError> {
    raw.parse()
        .map_err(|e: aquapanel_alert_core::ParseError| PanelError::validation(e.to_string()))
}

fn check_name(name: &str) -> Result<(), PanelError> {
    let len = name.trim().chars().count();
    if len == 0 || len > 100 {
        return Err(PanelError::validation(
            "rule name must be between 1 and 100 characters",
        ));
    }
    Ok(())
}

fn check_threshold(threshold: f64) -> Result<(), PanelError> {
    if !threshold.is_finite() {
        return Err(PanelError::validation("threshold must be a finite number"));
    }
    Ok(())
}

fn to_spec(row: &DbAlertRule) -> Result<RuleSpec, aquapanel_alert_core::ParseError> {
    Ok(RuleSpec {
        id: row.id,
        name: row.name.clone(),
        metric: row.metric.parse()?,
        operator: row.operator.parse()?,
        threshold: row.threshold,
        severity: row.severity.parse()?,
    })
}

fn secs(secs: u64) -> TimeDelta {
    TimeDelta::from_std(Duration::from_secs(secs)).unwrap_or(TimeDelta::MAX)
}

#[derive(Clone)]
pub struct AlertService {
    db: DbActorHandle,
    notifier: Notifier,
    plugins: PluginManager,
    tracker: Arc<Mutex<ActiveAlertTracker>>,
    events: broadcast::Sender<AlertEvent>,
}

impl AlertService {
    pub fn new(
        db: DbActorHandle,
        cfg: &AlertsConfig,
        plugins: PluginManager,
    ) -> Result<Self, PanelError> {
        let notifier = Notifier::new(
            Duration::from_secs(cfg.webhook_timeout_secs),
            cfg.webhook_retry_max_times,
        )?;
        let tracker = ActiveAlertTracker::new(secs(cfg.cooldown_secs), secs(cfg.active_max_age_secs));
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self {
            db,
            notifier,
            plugins,
            tracker: Arc::new(Mutex::new(tracker)),
            events,
        })
    }

    /// Live alert feed for sockets.
    pub fn subscribe(&self) -> broadcast::Receiver<AlertEvent> {
        self.events.subscribe()
    }

    async fn audit(&self, entry: LogCreate) {
        if let Err(e) = self.db.insert_log(entry).await {
            warn!(error = %e, "failed to persist alert audit log");
        }
    }

    /// Evaluates every enabled rule against `snapshot` and returns the alerts that fired.
    ///
    /// Never fails: storage and delivery problems are logged and the firing is skipped.
    pub async fn check(&self, snapshot: &PerformanceSnapshot) -> Vec<AlertEvent> {
        let rows = match self.db.list_alert_rules(Some(true)).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "alert check could not load rules");
                return Vec::new();
            }
        };

        let mut specs = Vec::with_capacity(rows.len());
        let mut channels: AHashMap<i64, Vec<NotificationChannel>> = AHashMap::new();
        for row in &rows {
            match to_spec(row) {
                Ok(spec) => {
                    channels.insert(row.id, parse_channels(&row.notification_channels));
                    specs.push(spec);
                }
                Err(e) => warn!(rule_id = row.id, error = %e, "skipping unreadable alert rule"),
            }
        }
        if specs.is_empty() {
            return Vec::new();
        }

        let firings = self
            .tracker
            .lock()
            .await
            .assess(&specs, snapshot, Utc::now());

        let mut fired = Vec::with_capacity(firings.len());
        for firing in firings {
            let history_id = match self
                .db
                .record_alert(AlertHistoryCreate {
                    rule_id: firing.rule.id,
                    value: firing.value,
                    message: firing.message.clone(),
                    triggered_at: firing.fired_at,
                })
                .await
            {
                Ok(id) => id,
                Err(e) => {
                    self.tracker.lock().await.forget(&firing.key);
                    warn!(rule_id = firing.rule.id, error = %e, "failed to record alert");
                    self.audit(
                        LogCreate::new("error", format!("Failed to record alert: {e}"))
                            .context("alert_system"),
                    )
                    .await;
                    continue;
                }
            };
            self.tracker
                .lock()
                .await
                .attach_history(&firing.key, history_id);

            if let Some(channels) = channels.get(&firing.rule.id) {
                let notification = Notification {
                    rule: &firing.rule,
                    value: firing.value,
                    message: &firing.message,
                    snapshot,
                };
                self.notifier.dispatch(channels, &notification).await;
            }

            let event = AlertEvent {
                history_id,
                rule_id: firing.rule.id,
                rule_name: firing.rule.name.clone(),
                metric: firing.rule.metric.to_string(),
                severity: firing.rule.severity.to_string(),
                value: firing.value,
                threshold: firing.rule.threshold,
                message: firing.message.clone(),
                triggered_at: firing.fired_at,
            };
            // No subscribers is fine.
            let _ = self.events.send(event.clone());

            match serde_json::to_value(&event) {
                Ok(payload) => {
                    self.plugins
                        .call_hook(hooks::ALERT_TRIGGERED, payload)
                        .await;
                }
                Err(e) => warn!(error = %e, "failed to encode alert for plugins"),
            }

            self.audit(
                LogCreate::new("warning", firing.message.clone()).context("alert_system"),
            )
            .await;
            fired.push(event);
        }

        if !fired.is_empty() {
            info!(count = fired.len(), "alerts fired");
        }
        fired
    }

    pub async fn create_rule(
        &self,
        input: NewRule,
        created_by: Option<i64>,
    ) -> Result<AlertRuleView, PanelError> {
        check_name(&input.name)?;
        check_threshold(input.threshold)?;
        let metric = parse_metric(&input.metric)?;
        let operator = parse_operator(&input.operator)?;
        let severity = match input.severity.as_deref() {
            Some(raw) => parse_severity(raw)?,
            None => Severity::default(),
        };
        let channels = input
            .notification_channels
            .unwrap_or_else(|| vec![NotificationChannel::Console]);

        let id = self
            .db
            .create_alert_rule(AlertRuleCreate {
                name: input.name.trim().to_string(),
                description: input.description,
                metric: metric.to_string(),
                operator: operator.to_string(),
                threshold: input.threshold,
                severity: severity.to_string(),
                enabled: input.enabled.unwrap_or(true),
                notification_channels: serde_json::to_string(&channels)?,
                created_by,
            })
            .await?;

        info!(rule_id = id, %metric, %operator, threshold = input.threshold, "alert rule created");
        let mut entry = LogCreate::new("info", format!("Alert rule created: {}", input.name))
            .context("alert_system");
        if let Some(user) = created_by {
            entry = entry.user(user);
        }
        self.audit(entry).await;
        self.get_rule(id).await
    }

    pub async fn list_rules(&self, enabled: Option<bool>) -> Result<Vec<AlertRuleView>, PanelError> {
        let rows = self.db.list_alert_rules(enabled).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn get_rule(&self, id: i64) -> Result<AlertRuleView, PanelError> {
        self.db
            .get_alert_rule(id)
            .await?
            .map(Into::into)
            .ok_or_else(|| PanelError::not_found(format!("alert rule {id}")))
    }

    pub async fn update_rule(&self, id: i64, update: RuleUpdate) -> Result<AlertRuleView, PanelError> {
        if let Some(name) = update.name.as_deref() {
            check_name(name)?;
        }
        if let Some(threshold) = update.threshold {
            check_threshold(threshold)?;
        }
        let metric = update.metric.as_deref().map(parse_metric).transpose()?;
        let operator = update.operator.as_deref().map(parse_operator).transpose()?;
        let severity = update.severity.as_deref().map(parse_severity).transpose()?;
        let channels = update
            .notification_channels
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        self.db
            .patch_alert_rule(AlertRulePatch {
                id,
                name: update.name.map(|n| n.trim().to_string()),
                description: update.description,
                metric: metric.map(|m| m.to_string()),
                operator: operator.map(|o| o.to_string()),
                threshold: update.threshold,
                severity: severity.map(|s| s.to_string()),
                enabled: update.enabled,
                notification_channels: channels,
            })
            .await?;

        if metric.is_some() || update.enabled == Some(false) {
            self.tracker.lock().await.forget_rule(id);
        }
        info!(rule_id = id, "alert rule updated");
        self.get_rule(id).await
    }

    /// Deletes the rule together with its history.
    pub async fn delete_rule(&self, id: i64) -> Result<(), PanelError> {
        if !self.db.delete_alert_rule(id).await? {
            return Err(PanelError::not_found(format!("alert rule {id}")));
        }
        self.tracker.lock().await.forget_rule(id);
        info!(rule_id = id, "alert rule deleted");
        self.audit(LogCreate::new("info", format!("Alert rule deleted: {id}")).context("alert_system"))
            .await;
        Ok(())
    }

    pub async fn history(
        &self,
        limit: Option<u32>,
        rule_id: Option<i64>,
    ) -> Result<Vec<DbAlertHistory>, PanelError> {
        let limit = limit.unwrap_or(100).clamp(1, MAX_HISTORY_LIMIT);
        self.db
            .list_alert_history(AlertHistoryQuery {
                limit: i64::from(limit),
                rule_id,
            })
            .await
    }

    pub async fn acknowledge(&self, id: i64, user_id: i64) -> Result<(), PanelError> {
        if !self.db.acknowledge_alert(id, user_id).await? {
            return Err(PanelError::not_found(format!("unresolved alert {id}")));
        }
        debug!(alert_id = id, user_id, "alert acknowledged");
        Ok(())
    }

    pub async fn resolve(&self, id: i64) -> Result<(), PanelError> {
        if !self.db.resolve_alert(id).await? {
            return Err(PanelError::not_found(format!("unresolved alert {id}")));
        }
        self.tracker.lock().await.resolve_history(id);
        info!(alert_id = id, "alert resolved");
        Ok(())
    }

    pub async fn stats(&self, days: u32) -> Result<AlertStats, PanelError> {
        let days = days.clamp(1, 365);
        let buckets = self.db.alert_stats(days).await?;
        Ok(AlertStats::from_buckets(days, buckets))
    }

    pub async fn active(&self) -> Vec<ActiveAlert> {
        self.tracker.lock().await.active()
    }

    /// Drops active entries past their maximum age.
    pub async fn cleanup_active(&self) -> usize {
        let removed = self.tracker.lock().await.sweep(Utc::now());
        if removed > 0 {
            debug!(removed, "stale active alerts swept");
        }
        removed
    }

    /// Evaluates a rule without recording or notifying anything.
    pub fn test_rule(
        &self,
        draft: &RuleDraft,
        snapshot: &PerformanceSnapshot,
    ) -> Result<RuleTestResult, PanelError> {
        check_threshold(draft.threshold)?;
        let spec = RuleSpec {
            id: 0,
            name: draft.name.clone(),
            metric: parse_metric(&draft.metric)?,
            operator: parse_operator(&draft.operator)?,
            threshold: draft.threshold,
            severity: match draft.severity.as_deref() {
                Some(raw) => parse_severity(raw)?,
                None => Severity::default(),
            },
        };
        let eval = spec.evaluate(snapshot);
        Ok(RuleTestResult {
            metric: spec.metric,
            value: eval.value,
            threshold: spec.threshold,
            operator: spec.operator,
            triggered: eval.triggered,
            message: eval
                .value
                .filter(|_| eval.triggered)
                .map(|v| format_alert_message(&spec, v)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket(date: &str, severity: &str, metric: &str, count: i64) -> DbAlertStat {
        DbAlertStat {
            date: date.into(),
            severity: Some(severity.into()),
            metric: Some(metric.into()),
            count,
        }
    }

    #[test]
    fn stats_fold_buckets() {
        let stats = AlertStats::from_buckets(
            7,
            vec![
                bucket("2026-10-01", "warning", "cpu_usage", 3),
                bucket("2026-10-01", "critical", "cpu_usage", 1),
                bucket("2026-10-02", "warning", "memory_usage", 2),
            ],
        );
        assert_eq!(stats.total, 6);
        assert_eq!(stats.by_severity["warning"], 5);
        assert_eq!(stats.by_metric["cpu_usage"], 4);
        assert_eq!(stats.daily.len(), 3);
    }

    #[test]
    fn unknown_fields_are_validation_errors() {
        assert!(matches!(parse_metric("gpu"), Err(PanelError::Validation(_))));
        assert!(matches!(parse_operator("=~"), Err(PanelError::Validation(_))));
        assert!(matches!(parse_severity("fatal"), Err(PanelError::Validation(_))));
        assert!(check_threshold(f64::NAN).is_err());
        assert!(check_name("  ").is_err());
    }
}
