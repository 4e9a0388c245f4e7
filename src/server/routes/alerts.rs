use crate::alerts::{AlertRuleView, AlertStats, NewRule, RuleDraft, RuleTestResult, RuleUpdate};
use crate::auth::Role;
use crate::db::DbAlertHistory;
use crate::error::PanelError;
use crate::server::ApiJson;
use crate::server::guards::auth::RequireAuth;
use crate::server::router::PanelState;
use aquapanel_alert_core::ActiveAlert;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, Deserialize)]
pub(super) struct RulesQuery {
    enabled: Option<bool>,
}

pub(super) async fn list_rules(
    State(state): State<PanelState>,
    auth: RequireAuth,
    Query(query): Query<RulesQuery>,
) -> Result<Json<Vec<AlertRuleView>>, PanelError> {
    auth.require(Role::Viewer)?;
    Ok(Json(state.alerts.list_rules(query.enabled).await?))
}

pub(super) async fn create_rule(
    State(state): State<PanelState>,
    auth: RequireAuth,
    ApiJson(body): ApiJson<NewRule>,
) -> Result<(StatusCode, Json<AlertRuleView>), PanelError> {
    let caller = auth.require(Role::User)?;
    let rule = state.alerts.create_rule(body, Some(caller.user_id)).await?;
    Ok((StatusCode::CREATED, Json(rule)))
}

pub(super) async fn get_rule(
    State(state): State<PanelState>,
    auth: RequireAuth,
    Path(id): Path<i64>,
) -> Result<Json<AlertRuleView>, PanelError> {
    auth.require(Role::Viewer)?;
    Ok(Json(state.alerts.get_rule(id).await?))
}

pub(super) async fn update_rule(
    State(state): State<PanelState>,
    auth: RequireAuth,
    Path(id): Path<i64>,
    ApiJson(body): ApiJson<RuleUpdate>,
) -> Result<Json<AlertRuleView>, PanelError> {
    auth.require(Role::User)?;
    Ok(Json(state.alerts.update_rule(id, body).await?))
}

pub(super) async fn delete_rule(
    State(state): State<PanelState>,
    auth: RequireAuth,
    Path(id): Path<i64>,
) -> Result<StatusCode, PanelError> {
    auth.require(Role::User)?;
    state.alerts.delete_rule(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn test_rule(
    State(state): State<PanelState>,
    auth: RequireAuth,
    ApiJson(body): ApiJson<RuleDraft>,
) -> Result<Json<RuleTestResult>, PanelError> {
    auth.require(Role::Viewer)?;
    let snapshot = state.metrics.performance().await?;
    Ok(Json(state.alerts.test_rule(&body, &snapshot)?))
}

#[derive(Debug, Deserialize)]
pub(super) struct HistoryQuery {
    limit: Option<u32>,
    rule_id: Option<i64>,
}

pub(super) async fn history(
    State(state): State<PanelState>,
    auth: RequireAuth,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<DbAlertHistory>>, PanelError> {
    auth.require(Role::Viewer)?;
    Ok(Json(state.alerts.history(query.limit, query.rule_id).await?))
}

pub(super) async fn acknowledge(
    State(state): State<PanelState>,
    auth: RequireAuth,
    Path(id): Path<i64>,
) -> Result<Json<Value>, PanelError> {
    let caller = auth.require(Role::User)?;
    state.alerts.acknowledge(id, caller.user_id).await?;
    Ok(Json(json!({ "id": id, "status": "acknowledged" })))
}

pub(super) async fn resolve(
    State(state): State<PanelState>,
    auth: RequireAuth,
    Path(id): Path<i64>,
) -> Result<Json<Value>, PanelError> {
    auth.require(Role::User)?;
    state.alerts.resolve(id).await?;
    Ok(Json(json!({ "id": id, "status": "resolved" })))
}

pub(super) async fn active(
    State(state): State<PanelState>,
    auth: RequireAuth,
) -> Result<Json<Vec<ActiveAlert>>, PanelError> {
    auth.require(Role::Viewer)?;
    Ok(Json(state.alerts.active().await))
}

#[derive(Debug, Deserialize)]
pub(super) struct StatsQuery {
    days: Option<u32>,
}

pub(super) async fn stats(
    State(state): State<PanelState>,
    auth: RequireAuth,
    Query(query): Query<StatsQuery>,
) -> Result<Json<AlertStats>, PanelError> {
    auth.require(Role::Viewer)?;
    Ok(Json(state.alerts.stats(query.days.unwrap_or(7)).await?))
}
