use crate::auth::Role;
use crate::db::DbPerformanceSample;
use crate::error::PanelError;
use crate::server::guards::auth::RequireAuth;
use crate::server::router::PanelState;
use aquapanel_schema::{PerformanceSnapshot, SystemInfo};
use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

const MAX_HISTORY_HOURS: u32 = 24 * 7;

pub(super) async fn system_info(
    State(state): State<PanelState>,
    auth: RequireAuth,
) -> Result<Json<SystemInfo>, PanelError> {
    auth.require(Role::Viewer)?;
    let info = state.metrics.system_info().await?;
    Ok(Json(info.as_ref().clone()))
}

pub(super) async fn performance(
    State(state): State<PanelState>,
    auth: RequireAuth,
) -> Result<Json<PerformanceSnapshot>, PanelError> {
    auth.require(Role::Viewer)?;
    let snapshot = state.metrics.performance().await?;
    Ok(Json(snapshot.as_ref().clone()))
}

#[derive(Debug, Deserialize)]
pub(super) struct HistoryQuery {
    hours: Option<u32>,
}

pub(super) async fn performance_history(
    State(state): State<PanelState>,
    auth: RequireAuth,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<DbPerformanceSample>>, PanelError> {
    auth.require(Role::Viewer)?;
    let hours = query.hours.unwrap_or(1).clamp(1, MAX_HISTORY_HOURS);
    Ok(Json(state.db.performance_history(hours).await?))
}
