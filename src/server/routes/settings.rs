use crate::auth::Role;
use crate::db::{DbSetting, LogCreate};
use crate::error::PanelError;
use crate::jobs::{RETENTION_DAYS_RANGE, RETENTION_SETTING, parse_retention_days};
use crate::server::ApiJson;
use crate::server::guards::auth::RequireAuth;
use crate::server::router::PanelState;
use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
pub(super) struct SetSetting {
    value: Value,
    description: Option<String>,
}

fn valid_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= 64
        && key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '.')
}

/// Strings are stored verbatim, anything else as JSON text.
fn stored_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub(super) async fn list(
    State(state): State<PanelState>,
    auth: RequireAuth,
) -> Result<Json<Vec<DbSetting>>, PanelError> {
    auth.require(Role::Viewer)?;
    Ok(Json(state.db.list_settings().await?))
}

pub(super) async fn set(
    State(state): State<PanelState>,
    auth: RequireAuth,
    Path(key): Path<String>,
    ApiJson(body): ApiJson<SetSetting>,
) -> Result<Json<DbSetting>, PanelError> {
    let caller = auth.require(Role::Admin)?;
    if !valid_key(&key) {
        return Err(PanelError::validation(format!("invalid config key {key:?}")));
    }
    let value = stored_value(&body.value);
    if key == RETENTION_SETTING && parse_retention_days(&value).is_none() {
        return Err(PanelError::validation(format!(
            "{RETENTION_SETTING} must be a whole number of days within {}..={}",
            RETENTION_DAYS_RANGE.start(),
            RETENTION_DAYS_RANGE.end()
        )));
    }
    state.db.set_setting(&key, &value, body.description).await?;

    info!(%key, %value, username = %caller.username, "config updated");
    let entry = LogCreate::new("info", format!("Config updated: {key} = {value}"))
        .context("system_config")
        .user(caller.user_id);
    if let Err(e) = state.db.insert_log(entry).await {
        warn!(error = %e, "failed to persist config audit log");
    }

    state
        .db
        .get_setting(&key)
        .await?
        .map(Json)
        .ok_or_else(|| PanelError::UnexpectedError(format!("setting {key} vanished")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keys_and_values() {
        assert!(valid_key("data_retention_days"));
        assert!(!valid_key("Bad Key"));
        assert!(!valid_key(""));
        assert_eq!(stored_value(&json!("AquaPanel")), "AquaPanel");
        assert_eq!(stored_value(&json!(30)), "30");
        assert_eq!(stored_value(&json!(true)), "true");
    }
}
