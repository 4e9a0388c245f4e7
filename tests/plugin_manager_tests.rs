mod common;

use aquapanel::PanelError;
use aquapanel::plugins::hooks;
use axum::http::StatusCode;
use common::{ADMIN_PASSWORD, call, login, panel};
use serde_json::{Value, json};
use std::path::Path;

fn install(plugins_dir: &Path, name: &str, entry: &str, host: Value) {
    let dir = plugins_dir.join(name);
    std::fs::create_dir_all(&dir).expect("plugin dir");
    let manifest = json!({
        "name": name,
        "version": "1.0.0",
        "description": "test plugin",
        "entry": entry,
        "aquapanel": host,
    });
    std::fs::write(dir.join("plugin.json"), manifest.to_string()).expect("manifest");
}

#[tokio::test]
async fn load_all_sorts_plugins_into_outcomes() {
    let p = panel().await;
    let plugins = &p.state.plugins;
    plugins.ensure_dir().await.expect("plugins dir");

    install(
        plugins.dir(),
        "audit-trail",
        "audit-trail",
        json!({ "enabled": true, "config": { "max_events": 5 } }),
    );
    install(plugins.dir(), "dormant", "load-watch", json!({ "enabled": false }));
    install(
        plugins.dir(),
        "future",
        "load-watch",
        json!({ "enabled": true, "version": "9.0" }),
    );
    install(plugins.dir(), "ghost", "no-such-entry", json!({ "enabled": true }));

    let report = plugins.load_all().await.expect("scan");
    assert_eq!(report.loaded, vec!["audit-trail".to_string()]);
    assert_eq!(report.skipped, vec!["dormant".to_string()]);
    let failed: Vec<&str> = report.failed.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(failed, vec!["future", "ghost"]);

    let hooks = plugins.registered_hooks().await;
    assert_eq!(hooks.get("user.login"), Some(&1));
    assert_eq!(hooks.get("alert.triggered"), Some(&1));

    let stats = plugins.stats().await;
    assert_eq!(stats.loaded_plugins, 1);
    assert_eq!(stats.total_hook_callbacks, 2);

    let status = plugins.status("dormant").await.expect("status");
    assert!(status.installed);
    assert!(!status.enabled);
    assert!(!status.loaded);
}

#[tokio::test]
async fn builtins_subscribe_to_the_hooks_the_host_emits() {
    let p = panel().await;
    let plugins = &p.state.plugins;
    plugins.ensure_dir().await.expect("plugins dir");
    install(plugins.dir(), "audit-trail", "audit-trail", json!({ "enabled": true }));
    install(plugins.dir(), "load-watch", "load-watch", json!({ "enabled": true }));
    plugins.load_all().await.expect("scan");

    let registered = plugins.registered_hooks().await;
    let names: Vec<&str> = registered.keys().map(String::as_str).collect();
    let mut expected = vec![
        hooks::ALERT_TRIGGERED,
        hooks::METRICS_SNAPSHOT,
        hooks::USER_LOGIN,
    ];
    expected.sort_unstable();
    assert_eq!(names, expected);
}

#[tokio::test]
async fn login_hook_reaches_plugin_store() {
    let p = panel().await;
    let plugins = &p.state.plugins;
    plugins.ensure_dir().await.expect("plugins dir");
    install(
        plugins.dir(),
        "audit-trail",
        "audit-trail",
        json!({ "enabled": true, "config": { "max_events": 2 } }),
    );
    plugins.load_all().await.expect("scan");

    for _ in 0..3 {
        login(&p.app, "admin", ADMIN_PASSWORD).await;
    }

    let raw = p
        .state
        .db
        .get_plugin_data("audit-trail", "events")
        .await
        .expect("read store")
        .expect("events recorded");
    let events: Vec<Value> = serde_json::from_str(&raw).expect("json array");
    assert_eq!(events.len(), 2, "store is capped by max_events");
    assert_eq!(events[0]["kind"], "user.login");
    assert_eq!(events[1]["payload"]["username"], "admin");
}

#[tokio::test]
async fn disable_unloads_and_enable_restores() {
    let p = panel().await;
    let plugins = &p.state.plugins;
    plugins.ensure_dir().await.expect("plugins dir");
    install(plugins.dir(), "audit-trail", "audit-trail", json!({ "enabled": true }));
    plugins.load_all().await.expect("scan");

    plugins.disable("audit-trail").await.expect("disable");
    assert!(plugins.list().await.is_empty());
    assert!(plugins.registered_hooks().await.is_empty());
    assert!(
        plugins
            .call_hook("user.login", json!({ "username": "x" }))
            .await
            .is_empty()
    );

    // The stored disabled flag wins over the manifest on the next scan.
    let report = plugins.load_all().await.expect("rescan");
    assert_eq!(report.skipped, vec!["audit-trail".to_string()]);

    assert!(plugins.enable("audit-trail").await.expect("enable"));
    let results = plugins
        .call_hook("user.login", json!({ "username": "x" }))
        .await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["recorded"], "user.login");

    assert!(plugins.reload("audit-trail").await.expect("reload"));
    assert_eq!(plugins.list().await.len(), 1);
    assert!(matches!(
        plugins.unload("missing").await,
        Err(PanelError::NotFound(_))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_loads_register_hooks_once() {
    let p = panel().await;
    let plugins = &p.state.plugins;
    plugins.ensure_dir().await.expect("plugins dir");
    install(plugins.dir(), "audit-trail", "audit-trail", json!({ "enabled": true }));

    for round in 0..20 {
        let (a, b, c) = tokio::join!(
            plugins.load("audit-trail"),
            plugins.load("audit-trail"),
            plugins.reload("audit-trail"),
        );
        assert!(a.expect("first load") && b.expect("second load"));
        // reload may run first and find nothing to unload
        if let Err(e) = c {
            assert!(matches!(e, PanelError::NotFound(_)), "round {round}: {e}");
        }

        let hooks = plugins.registered_hooks().await;
        assert_eq!(hooks.get("user.login"), Some(&1), "round {round}");
        assert_eq!(hooks.get("alert.triggered"), Some(&1), "round {round}");
        assert_eq!(plugins.list().await.len(), 1);

        plugins.unload("audit-trail").await.expect("unload");
        assert!(plugins.registered_hooks().await.is_empty());
    }
}

#[tokio::test]
async fn config_updates_merge_into_live_plugin() {
    let p = panel().await;
    let plugins = &p.state.plugins;
    plugins.ensure_dir().await.expect("plugins dir");
    install(
        plugins.dir(),
        "load-watch",
        "load-watch",
        json!({ "enabled": true, "config": { "warn_above": 95 } }),
    );
    plugins.load_all().await.expect("scan");

    plugins
        .call_hook("metrics.snapshot", json!({ "cpu": { "usage": 42.0 } }))
        .await;
    let config = plugins.config("load-watch").await.expect("config");
    assert_eq!(config["peak_cpu"], 42.0);
    assert_eq!(config["warn_above"], 95);

    assert!(matches!(
        plugins.set_config("load-watch", json!([1, 2])).await,
        Err(PanelError::Validation(_))
    ));
    plugins
        .set_config("load-watch", json!({ "warn_above": 80 }))
        .await
        .expect("set config");
    assert_eq!(
        plugins.config("load-watch").await.expect("config"),
        json!({ "warn_above": 80 })
    );
}

#[tokio::test]
async fn plugin_routes_require_admin_for_changes() {
    let p = panel().await;
    p.state.plugins.ensure_dir().await.expect("plugins dir");
    install(
        p.state.plugins.dir(),
        "audit-trail",
        "audit-trail",
        json!({ "enabled": false }),
    );
    let admin = login(&p.app, "admin", ADMIN_PASSWORD).await;

    let (status, _) = call(
        &p.app,
        "POST",
        "/api/users",
        Some(&admin),
        Some(json!({ "username": "operator", "password": "operator1", "role": "user" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let operator = login(&p.app, "operator", "operator1").await;

    let (status, _) = call(
        &p.app,
        "POST",
        "/api/plugins/audit-trail/enable",
        Some(&operator),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(
        &p.app,
        "POST",
        "/api/plugins/audit-trail/enable",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&p.app, "GET", "/api/plugins/hooks", Some(&operator), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user.login"], 1);

    let (status, _) = call(&p.app, "GET", "/api/plugins/nope", Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
