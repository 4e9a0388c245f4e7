use crate::auth::{AuthUser, Role};
use crate::db::DbUserStats;
use crate::error::PanelError;
use crate::server::ApiJson;
use crate::server::guards::auth::RequireAuth;
use crate::server::router::PanelState;
use crate::users::{NewUser, UserPage, UserProfile, UserUpdate, UserView};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};

/// Admins may act on anyone; everyone else only on themselves.
fn self_or_admin(user: &AuthUser, username: &str) -> Result<(), PanelError> {
    if user.is_admin() || user.username == username {
        Ok(())
    } else {
        Err(PanelError::forbidden("cannot access another user's account"))
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct ListQuery {
    page: Option<u32>,
    limit: Option<u32>,
    role: Option<String>,
}

pub(super) async fn list(
    State(state): State<PanelState>,
    auth: RequireAuth,
    Query(query): Query<ListQuery>,
) -> Result<Json<UserPage>, PanelError> {
    auth.require(Role::Admin)?;
    let role = query.role.as_deref().filter(|r| !r.is_empty());
    let page = state
        .users
        .list_users(query.page.unwrap_or(1), query.limit.unwrap_or(20), role)
        .await?;
    Ok(Json(page))
}

pub(super) async fn create(
    State(state): State<PanelState>,
    auth: RequireAuth,
    ApiJson(body): ApiJson<NewUser>,
) -> Result<(StatusCode, Json<UserView>), PanelError> {
    let caller = auth.require(Role::Admin)?;
    let user = state.users.create_user(body, caller.role).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub(super) async fn stats(
    State(state): State<PanelState>,
    auth: RequireAuth,
) -> Result<Json<DbUserStats>, PanelError> {
    auth.require(Role::Admin)?;
    Ok(Json(state.users.stats().await?))
}

pub(super) async fn profile(
    State(state): State<PanelState>,
    RequireAuth(user): RequireAuth,
    Path(username): Path<String>,
) -> Result<Json<UserProfile>, PanelError> {
    self_or_admin(&user, &username)?;
    Ok(Json(state.users.profile(&username).await?))
}

pub(super) async fn update(
    State(state): State<PanelState>,
    RequireAuth(user): RequireAuth,
    Path(username): Path<String>,
    ApiJson(body): ApiJson<UserUpdate>,
) -> Result<Json<UserView>, PanelError> {
    self_or_admin(&user, &username)?;
    let updated = state.users.update_user(&username, body, user.role).await?;
    Ok(Json(updated))
}

pub(super) async fn delete(
    State(state): State<PanelState>,
    RequireAuth(user): RequireAuth,
    Path(username): Path<String>,
) -> Result<Json<Value>, PanelError> {
    state.users.delete_user(&username, user.role).await?;
    Ok(Json(json!({ "message": format!("User {username} deleted") })))
}

pub(super) async fn preferences(
    State(state): State<PanelState>,
    RequireAuth(user): RequireAuth,
    Path(username): Path<String>,
    ApiJson(body): ApiJson<Value>,
) -> Result<Json<Value>, PanelError> {
    self_or_admin(&user, &username)?;
    let merged = state.users.update_preferences(&username, body).await?;
    Ok(Json(json!({ "preferences": merged })))
}
