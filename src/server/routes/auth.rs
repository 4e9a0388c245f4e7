use crate::error::PanelError;
use crate::server::guards::auth::RequireAuth;
use crate::server::router::PanelState;
use crate::server::{ApiJson, ClientMeta};
use crate::users::{LoginOutcome, UserProfile};
use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, Deserialize)]
pub(super) struct LoginRequest {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

pub(super) async fn login(
    State(state): State<PanelState>,
    ClientMeta(client): ClientMeta,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Json<LoginOutcome>, PanelError> {
    let outcome = state
        .users
        .login(body.username.trim(), &body.password, client)
        .await?;
    Ok(Json(outcome))
}

pub(super) async fn logout(
    State(state): State<PanelState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Value>, PanelError> {
    state.users.logout(&user.session, user.user_id).await?;
    Ok(Json(json!({ "message": "Logged out" })))
}

pub(super) async fn me(
    State(state): State<PanelState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<UserProfile>, PanelError> {
    Ok(Json(state.users.profile(&user.username).await?))
}
