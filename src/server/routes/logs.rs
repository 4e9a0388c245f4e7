use crate::auth::Role;
use crate::db::{DbLogEntry, LogQuery};
use crate::error::PanelError;
use crate::server::guards::auth::RequireAuth;
use crate::server::router::PanelState;
use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

const LEVELS: [&str; 4] = ["debug", "info", "warning", "error"];

#[derive(Debug, Deserialize)]
pub(super) struct ListQuery {
    limit: Option<u32>,
    offset: Option<u32>,
    level: Option<String>,
}

pub(super) async fn list(
    State(state): State<PanelState>,
    auth: RequireAuth,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<DbLogEntry>>, PanelError> {
    auth.require(Role::Viewer)?;
    let level = query.level.filter(|l| !l.is_empty());
    if let Some(level) = level.as_deref()
        && !LEVELS.contains(&level)
    {
        return Err(PanelError::validation(format!("unknown log level {level:?}")));
    }
    let logs = state
        .db
        .list_logs(LogQuery {
            limit: i64::from(query.limit.unwrap_or(100).clamp(1, 1000)),
            offset: i64::from(query.offset.unwrap_or(0)),
            level,
        })
        .await?;
    Ok(Json(logs))
}
