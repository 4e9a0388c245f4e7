use crate::alerts::AlertService;
use crate::config::MonitorConfig;
use crate::db::DbActorHandle;
use crate::metrics::MetricsHandle;
use crate::plugins::PluginManager;
use crate::server::{routes, ws};
use crate::users::UserService;

use axum::{
    Json, Router,
    extract::Request,
    http::{HeaderName, HeaderValue, StatusCode, Version, header::USER_AGENT},
    middleware::{self, Next},
    response::Response,
    routing::get,
};
use base64::Engine as _;
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Instant;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info, warn};

const MAX_REQUEST_ID_LEN: usize = 128;
const MAX_BODY_BYTES: usize = 1024 * 1024;
const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

fn generate_request_id() -> String {
    // 96 bits => 16 chars base64url (no padding).
    let mut bytes = [0u8; 12];
    rand::rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

fn format_http_version(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_11 => "HTTP/1.1",
        Version::HTTP_2 => "HTTP/2",
        Version::HTTP_3 => "HTTP/3",
        _ => "HTTP/?",
    }
}

#[derive(Clone)]
pub struct PanelState {
    pub db: DbActorHandle,
    pub metrics: MetricsHandle,
    pub users: UserService,
    pub alerts: AlertService,
    pub plugins: PluginManager,
    pub monitor: Arc<MonitorConfig>,
    pub started_at: DateTime<Utc>,
}

impl PanelState {
    pub fn new(
        db: DbActorHandle,
        metrics: MetricsHandle,
        users: UserService,
        alerts: AlertService,
        plugins: PluginManager,
        monitor: MonitorConfig,
    ) -> Self {
        Self {
            db,
            metrics,
            users,
            alerts,
            plugins,
            monitor: Arc::new(monitor),
            started_at: Utc::now(),
        }
    }
}

async fn not_found_handler() -> StatusCode {
    StatusCode::NOT_FOUND
}

async fn health(
    axum::extract::State(state): axum::extract::State<PanelState>,
) -> Json<Value> {
    let now = Utc::now();
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": now,
        "uptime_secs": (now - state.started_at).num_seconds(),
    }))
}

/// Tags every response with `x-request-id` (echoing a sane client value) and logs one line per
/// request at a level chosen by the status class. For `/ws` the latency is the upgrade only.
async fn access_log(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let protocol = format_http_version(req.version());
    let request_id = req
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty() && v.len() <= MAX_REQUEST_ID_LEN)
        .map_or_else(generate_request_id, str::to_string);
    let user_agent = req
        .headers()
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();

    let started = Instant::now();
    let mut resp = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        resp.headers_mut().insert(X_REQUEST_ID, value);
    }

    let status = resp.status().as_u16();
    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    macro_rules! access {
        ($lvl:ident) => {
            $lvl!(
                request_id = %request_id,
                method = %method,
                %path,
                status,
                latency_ms,
                protocol,
                user_agent = %user_agent,
                "request"
            )
        };
    }
    match resp.status() {
        s if s.is_server_error() => access!(error),
        s if s.is_client_error() => access!(warn),
        _ => access!(info),
    }
    resp
}

pub fn panel_router(state: PanelState) -> Router {
    Router::new()
        .nest("/api", routes::router())
        .route("/health", get(health))
        .route("/ws", get(ws::ws_handler))
        .fallback(not_found_handler)
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(middleware::from_fn(access_log))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_ids_are_short_and_url_safe() {
        let id = generate_request_id();
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn http_versions() {
        assert_eq!(format_http_version(Version::HTTP_11), "HTTP/1.1");
        assert_eq!(format_http_version(Version::HTTP_2), "HTTP/2");
    }
}
