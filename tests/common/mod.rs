#![allow(dead_code)]

use aquapanel::Config;
use aquapanel::server::{PanelState, panel_router};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

pub const ADMIN_PASSWORD: &str = "admin123";

pub struct TestPanel {
    pub dir: TempDir,
    pub state: PanelState,
    pub app: Router,
}

pub fn test_config(dir: &TempDir) -> Config {
    let mut cfg = Config::default();
    cfg.basic.database_url = format!("sqlite:{}", dir.path().join("panel.db").display());
    cfg.auth.jwt_secret = "integration-test-secret".to_string();
    cfg.auth.bcrypt_cost = 4;
    cfg.auth.bootstrap_admin_password = ADMIN_PASSWORD.to_string();
    cfg.plugins.dir = dir.path().join("plugins");
    cfg.plugins.autoload = false;
    cfg
}

pub async fn panel_with(tweak: impl FnOnce(&mut Config)) -> TestPanel {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut cfg = test_config(&dir);
    tweak(&mut cfg);
    let state = aquapanel::assemble(&cfg).await.expect("assemble panel");
    let app = panel_router(state.clone());
    TestPanel { dir, state, app }
}

pub async fn panel() -> TestPanel {
    panel_with(|_| {}).await
}

pub async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(json) => {
            req = req.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let resp = app
        .clone()
        .oneshot(req.body(body).expect("build request"))
        .await
        .expect("request failed");
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("response is JSON")
    };
    (status, json)
}

pub async fn login(app: &Router, username: &str, password: &str) -> String {
    let (status, body) = call(
        app,
        "POST",
        "/api/login",
        None,
        Some(serde_json::json!({ "username": username, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    body["token"].as_str().expect("token").to_string()
}
