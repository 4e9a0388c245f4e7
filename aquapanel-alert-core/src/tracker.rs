use crate::{Metric, RuleSpec, Severity, format_alert_message};
use aquapanel_schema::PerformanceSnapshot;
use ahash::AHashMap;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct AlertKey {
    pub rule_id: i64,
    pub metric: Metric,
}

impl AlertKey {
    pub fn of(rule: &RuleSpec) -> Self {
        Self {
            rule_id: rule.id,
            metric: rule.metric,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveAlert {
    pub rule_id: i64,
    pub rule_name: String,
    pub metric: Metric,
    pub severity: Severity,
    pub value: f64,
    pub threshold: f64,
    pub message: String,
    pub fired_at: DateTime<Utc>,
    /// Set once the firing has been written to alert history.
    pub history_id: Option<i64>,
}

/// A rule that crossed its threshold and is not inside its cooldown window.
#[derive(Debug, Clone, PartialEq)]
pub struct Firing {
    pub key: AlertKey,
    pub rule: RuleSpec,
    pub value: f64,
    pub message: String,
    pub fired_at: DateTime<Utc>,
}

/// Remembers the last firing per rule so repeats inside `cooldown` are suppressed.
#[derive(Debug)]
pub struct ActiveAlertTracker {
    cooldown: TimeDelta,
    max_age: TimeDelta,
    active: AHashMap<AlertKey, ActiveAlert>,
}

impl ActiveAlertTracker {
    pub fn new(cooldown: TimeDelta, max_age: TimeDelta) -> Self {
        Self {
            cooldown,
            max_age,
            active: AHashMap::new(),
        }
    }

    pub fn cooldown(&self) -> TimeDelta {
        self.cooldown
    }

    pub fn is_suppressed(&self, key: &AlertKey, now: DateTime<Utc>) -> bool {
        self.active
            .get(key)
            .is_some_and(|prev| now - prev.fired_at < self.cooldown)
    }

    /// Evaluates `rules` against `snapshot` and records every unsuppressed firing as active.
    pub fn assess(
        &mut self,
        rules: &[RuleSpec],
        snapshot: &PerformanceSnapshot,
        now: DateTime<Utc>,
    ) -> Vec<Firing> {
        let mut firings = Vec::new();
        for rule in rules {
            let eval = rule.evaluate(snapshot);
            let Some(value) = eval.value.filter(|_| eval.triggered) else {
                continue;
            };
            let key = AlertKey::of(rule);
            if self.is_suppressed(&key, now) {
                continue;
            }

            let message = format_alert_message(rule, value);
            self.active.insert(
                key,
                ActiveAlert {
                    rule_id: rule.id,
                    rule_name: rule.name.clone(),
                    metric: rule.metric,
                    severity: rule.severity,
                    value,
                    threshold: rule.threshold,
                    message: message.clone(),
                    fired_at: now,
                    history_id: None,
                },
            );
            firings.push(Firing {
                key,
                rule: rule.clone(),
                value,
                message,
                fired_at: now,
            });
        }
        firings
    }

    pub fn attach_history(&mut self, key: &AlertKey, history_id: i64) {
        if let Some(active) = self.active.get_mut(key) {
            active.history_id = Some(history_id);
        }
    }

    /// Drops a firing whose side effects could not be recorded, so the next check retries it.
    pub fn forget(&mut self, key: &AlertKey) {
        self.active.remove(key);
    }

    /// Removes the active entry backed by `history_id`. Returns whether one existed.
    pub fn resolve_history(&mut self, history_id: i64) -> bool {
        let before = self.active.len();
        self.active
            .retain(|_, alert| alert.history_id != Some(history_id));
        self.active.len() != before
    }

    /// Drops the entries of a rule that no longer exists.
    pub fn forget_rule(&mut self, rule_id: i64) {
        self.active.retain(|key, _| key.rule_id != rule_id);
    }

    /// Drops entries older than the maximum age. Returns how many were removed.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.active.len();
        let max_age = self.max_age;
        self.active.retain(|_, alert| now - alert.fired_at <= max_age);
        before - self.active.len()
    }

    /// Newest first.
    pub fn active(&self) -> Vec<ActiveAlert> {
        let mut list: Vec<ActiveAlert> = self.active.values().cloned().collect();
        list.sort_by(|a, b| b.fired_at.cmp(&a.fired_at));
        list
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Operator;

    fn rules() -> Vec<RuleSpec> {
        vec![
            RuleSpec {
                id: 1,
                name: "cpu".into(),
                metric: Metric::CpuUsage,
                operator: Operator::Gt,
                threshold: 80.0,
                severity: Severity::Warning,
            },
            RuleSpec {
                id: 2,
                name: "mem".into(),
                metric: Metric::MemoryUsage,
                operator: Operator::Gt,
                threshold: 90.0,
                severity: Severity::Critical,
            },
        ]
    }

    fn hot_snapshot(now: DateTime<Utc>) -> PerformanceSnapshot {
        let mut s = PerformanceSnapshot::empty(now);
        s.cpu.usage = 95.0;
        s.memory.usage = 40.0;
        s
    }

    fn tracker() -> ActiveAlertTracker {
        ActiveAlertTracker::new(TimeDelta::minutes(5), TimeDelta::hours(24))
    }

    #[test]
    fn fires_once_within_cooldown() {
        let mut t = tracker();
        let t0 = Utc::now();
        let snapshot = hot_snapshot(t0);

        let first = t.assess(&rules(), &snapshot, t0);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].rule.id, 1);
        assert_eq!(first[0].value, 95.0);

        let again = t.assess(&rules(), &snapshot, t0 + TimeDelta::minutes(4));
        assert!(again.is_empty());

        let later = t.assess(&rules(), &snapshot, t0 + TimeDelta::minutes(5));
        assert_eq!(later.len(), 1);
    }

    #[test]
    fn forget_allows_immediate_retry() {
        let mut t = tracker();
        let t0 = Utc::now();
        let snapshot = hot_snapshot(t0);

        let firing = t.assess(&rules(), &snapshot, t0).remove(0);
        t.forget(&firing.key);
        assert_eq!(t.assess(&rules(), &snapshot, t0).len(), 1);
    }

    #[test]
    fn resolve_clears_matching_history_only() {
        let mut t = tracker();
        let t0 = Utc::now();
        let firing = t.assess(&rules(), &hot_snapshot(t0), t0).remove(0);
        t.attach_history(&firing.key, 77);

        assert!(!t.resolve_history(78));
        assert_eq!(t.len(), 1);
        assert!(t.resolve_history(77));
        assert!(t.is_empty());
    }

    #[test]
    fn sweep_drops_stale_entries() {
        let mut t = tracker();
        let t0 = Utc::now();
        t.assess(&rules(), &hot_snapshot(t0), t0);

        assert_eq!(t.sweep(t0 + TimeDelta::hours(23)), 0);
        assert_eq!(t.sweep(t0 + TimeDelta::hours(25)), 1);
        assert!(t.active().is_empty());
    }
}
