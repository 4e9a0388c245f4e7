pub mod metric;
pub mod operator;
pub mod rule;
mod tracker;

pub use metric::Metric;
pub use operator::Operator;
pub use rule::{Evaluation, RuleSpec, Severity, format_alert_message};
pub use tracker::{ActiveAlert, ActiveAlertTracker, AlertKey, Firing};

use std::fmt;

/// Parse failure for the textual rule fields stored in the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub field: &'static str,
    pub value: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported {}: {:?}", self.field, self.value)
    }
}

impl std::error::Error for ParseError {}
