use crate::server::router::PanelState;
use axum::{
    Router,
    routing::{get, post, put},
};

mod alerts;
mod auth;
mod logs;
mod plugins;
mod settings;
mod system;
mod users;

pub fn router() -> Router<PanelState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
        .route("/system-info", get(system::system_info))
        .route("/performance", get(system::performance))
        .route("/performance/history", get(system::performance_history))
        .route("/logs", get(logs::list))
        .route("/users", get(users::list).post(users::create))
        .route("/users/stats", get(users::stats))
        .route(
            "/users/{username}",
            get(users::profile).put(users::update).delete(users::delete),
        )
        .route("/users/{username}/preferences", put(users::preferences))
        .route(
            "/alerts/rules",
            get(alerts::list_rules).post(alerts::create_rule),
        )
        .route("/alerts/rules/test", post(alerts::test_rule))
        .route(
            "/alerts/rules/{id}",
            get(alerts::get_rule)
                .put(alerts::update_rule)
                .delete(alerts::delete_rule),
        )
        .route("/alerts/history", get(alerts::history))
        .route("/alerts/history/{id}/acknowledge", post(alerts::acknowledge))
        .route("/alerts/history/{id}/resolve", post(alerts::resolve))
        .route("/alerts/active", get(alerts::active))
        .route("/alerts/stats", get(alerts::stats))
        .route("/plugins", get(plugins::list))
        .route("/plugins/hooks", get(plugins::hooks))
        .route("/plugins/stats", get(plugins::stats))
        .route("/plugins/{name}", get(plugins::status))
        .route("/plugins/{name}/enable", post(plugins::enable))
        .route("/plugins/{name}/disable", post(plugins::disable))
        .route("/plugins/{name}/reload", post(plugins::reload))
        .route(
            "/plugins/{name}/config",
            get(plugins::config).put(plugins::set_config),
        )
        .route("/config", get(settings::list))
        .route("/config/{key}", put(settings::set))
}
