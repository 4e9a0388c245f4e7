use crate::{Metric, Operator, ParseError};
use aquapanel_schema::PerformanceSnapshot;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    #[default]
    Warning,
    Error,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(Severity::Info),
            "warning" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            "critical" => Ok(Severity::Critical),
            other => Err(ParseError {
                field: "severity",
                value: other.to_string(),
            }),
        }
    }
}

/// The evaluable part of a stored alert rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub id: i64,
    pub name: String,
    pub metric: Metric,
    pub operator: Operator,
    pub threshold: f64,
    #[serde(default)]
    pub severity: Severity,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Evaluation {
    pub value: Option<f64>,
    pub triggered: bool,
}

impl RuleSpec {
    pub fn evaluate(&self, snapshot: &PerformanceSnapshot) -> Evaluation {
        let value = self.metric.extract(snapshot);
        let triggered = value.is_some_and(|v| self.operator.evaluate(v, self.threshold));
        Evaluation { value, triggered }
    }
}

pub fn format_alert_message(rule: &RuleSpec, value: f64) -> String {
    let unit = if rule.metric.is_percentage() { "%" } else { "" };
    format!(
        "Alert triggered: {} - {} current value: {:.2}{unit}, threshold: {} {}{unit}",
        rule.name, rule.metric, value, rule.operator, rule.threshold
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn cpu_rule(threshold: f64) -> RuleSpec {
        RuleSpec {
            id: 1,
            name: "High CPU".into(),
            metric: Metric::CpuUsage,
            operator: Operator::Gt,
            threshold,
            severity: Severity::Critical,
        }
    }

    #[test]
    fn evaluate_reports_value_even_when_not_triggered() {
        let mut snapshot = PerformanceSnapshot::empty(Utc::now());
        snapshot.cpu.usage = 50.0;

        let eval = cpu_rule(80.0).evaluate(&snapshot);
        assert_eq!(eval.value, Some(50.0));
        assert!(!eval.triggered);

        let eval = cpu_rule(40.0).evaluate(&snapshot);
        assert!(eval.triggered);
    }

    #[test]
    fn message_mentions_unit_for_percentages() {
        let msg = format_alert_message(&cpu_rule(80.0), 91.234);
        assert_eq!(
            msg,
            "Alert triggered: High CPU - cpu_usage current value: 91.23%, threshold: > 80%"
        );
    }

    #[test]
    fn severity_defaults_to_warning() {
        let spec: RuleSpec = serde_json::from_str(
            r#"{"id":3,"name":"n","metric":"process_count","operator":"gte","threshold":500}"#,
        )
        .expect("rule must parse");
        assert_eq!(spec.severity, Severity::Warning);
        assert_eq!(spec.operator, Operator::Gte);
    }
}
