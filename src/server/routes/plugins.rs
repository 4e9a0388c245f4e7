use crate::auth::Role;
use crate::error::PanelError;
use crate::plugins::{PluginStats, PluginStatusView};
use crate::server::ApiJson;
use crate::server::guards::auth::RequireAuth;
use crate::server::router::PanelState;
use crate::utils::logging::with_pretty_json_debug;
use axum::{
    Json,
    extract::{Path, State},
};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use tracing::debug;

pub(super) async fn list(
    State(state): State<PanelState>,
    auth: RequireAuth,
) -> Result<Json<Value>, PanelError> {
    auth.require(Role::Viewer)?;
    let loaded = state.plugins.list().await;
    let installed = state.db.list_plugins().await?;
    Ok(Json(json!({ "loaded": loaded, "installed": installed })))
}

pub(super) async fn hooks(
    State(state): State<PanelState>,
    auth: RequireAuth,
) -> Result<Json<BTreeMap<String, usize>>, PanelError> {
    auth.require(Role::Viewer)?;
    Ok(Json(state.plugins.registered_hooks().await))
}

pub(super) async fn stats(
    State(state): State<PanelState>,
    auth: RequireAuth,
) -> Result<Json<PluginStats>, PanelError> {
    auth.require(Role::Viewer)?;
    Ok(Json(state.plugins.stats().await))
}

pub(super) async fn status(
    State(state): State<PanelState>,
    auth: RequireAuth,
    Path(name): Path<String>,
) -> Result<Json<PluginStatusView>, PanelError> {
    auth.require(Role::Viewer)?;
    Ok(Json(state.plugins.status(&name).await?))
}

pub(super) async fn enable(
    State(state): State<PanelState>,
    auth: RequireAuth,
    Path(name): Path<String>,
) -> Result<Json<Value>, PanelError> {
    auth.require(Role::Admin)?;
    let loaded = state.plugins.enable(&name).await?;
    Ok(Json(json!({ "name": name, "enabled": true, "loaded": loaded })))
}

pub(super) async fn disable(
    State(state): State<PanelState>,
    auth: RequireAuth,
    Path(name): Path<String>,
) -> Result<Json<Value>, PanelError> {
    auth.require(Role::Admin)?;
    state.plugins.disable(&name).await?;
    Ok(Json(json!({ "name": name, "enabled": false, "loaded": false })))
}

pub(super) async fn reload(
    State(state): State<PanelState>,
    auth: RequireAuth,
    Path(name): Path<String>,
) -> Result<Json<Value>, PanelError> {
    auth.require(Role::Admin)?;
    let loaded = state.plugins.reload(&name).await?;
    Ok(Json(json!({ "name": name, "loaded": loaded })))
}

pub(super) async fn config(
    State(state): State<PanelState>,
    auth: RequireAuth,
    Path(name): Path<String>,
) -> Result<Json<Value>, PanelError> {
    auth.require(Role::Admin)?;
    Ok(Json(state.plugins.config(&name).await?))
}

pub(super) async fn set_config(
    State(state): State<PanelState>,
    auth: RequireAuth,
    Path(name): Path<String>,
    ApiJson(body): ApiJson<Value>,
) -> Result<Json<Value>, PanelError> {
    auth.require(Role::Admin)?;
    with_pretty_json_debug(&body, |pretty| {
        debug!(plugin = %name, "plugin config update:\n{pretty}");
    });
    state.plugins.set_config(&name, body.clone()).await?;
    Ok(Json(body))
}
