//! Plain SQL behind each `DbActorMessage`, grouped by table.

pub(super) mod alerts;
pub(super) mod logs;
pub(super) mod performance;
pub(super) mod plugins;
pub(super) mod sessions;
pub(super) mod settings;
pub(super) mod users;

use chrono::{DateTime, TimeDelta, Utc};

use crate::error::PanelError;

/// Maps a UNIQUE constraint failure to `Conflict`, everything else to a database error.
fn conflict_on_unique(err: sqlx::Error, what: impl Into<String>) -> PanelError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => PanelError::Conflict(what.into()),
        _ => PanelError::DatabaseError(err),
    }
}

/// `now - span`, saturating at the earliest representable instant instead of panicking.
fn since(span: Option<TimeDelta>) -> DateTime<Utc> {
    span.and_then(|span| Utc::now().checked_sub_signed(span))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn since_saturates_out_of_range_spans() {
        assert_eq!(since(TimeDelta::try_days(100_000_000)), DateTime::<Utc>::MIN_UTC);
        assert_eq!(since(None), DateTime::<Utc>::MIN_UTC);
        let day_ago = since(TimeDelta::try_days(1));
        assert!(Utc::now() - day_ago >= TimeDelta::days(1));
    }
}
