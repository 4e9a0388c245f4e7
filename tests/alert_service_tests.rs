mod common;

use aquapanel::alerts::{NewRule, NotificationChannel, RuleDraft, RuleUpdate};
use aquapanel::error::PanelError;
use aquapanel_schema::PerformanceSnapshot;
use axum::http::StatusCode;
use chrono::Utc;
use common::{ADMIN_PASSWORD, call, login, panel};
use serde_json::json;

fn cpu_rule(threshold: f64) -> NewRule {
    NewRule {
        name: "High CPU".to_string(),
        description: None,
        metric: "cpu_usage".to_string(),
        operator: ">".to_string(),
        threshold,
        severity: Some("critical".to_string()),
        enabled: None,
        notification_channels: Some(vec![NotificationChannel::Console]),
    }
}

fn hot_snapshot() -> PerformanceSnapshot {
    let mut s = PerformanceSnapshot::empty(Utc::now());
    s.cpu.usage = 93.0;
    s.memory.usage = 20.0;
    s
}

#[tokio::test]
async fn metric_above_threshold_fires_once_within_cooldown() {
    let p = panel().await;
    let alerts = &p.state.alerts;
    let mut feed = alerts.subscribe();

    let rule = alerts.create_rule(cpu_rule(80.0), None).await.expect("create rule");
    assert_eq!(rule.operator, ">");
    assert_eq!(rule.severity, "critical");
    assert!(rule.enabled);

    let snapshot = hot_snapshot();
    let first = alerts.check(&snapshot).await;
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].rule_id, rule.id);
    assert_eq!(first[0].value, 93.0);

    let second = alerts.check(&snapshot).await;
    assert!(second.is_empty(), "cooldown must suppress the repeat");

    let event = feed.recv().await.expect("broadcast event");
    assert_eq!(event.history_id, first[0].history_id);

    let history = alerts.history(None, Some(rule.id)).await.expect("history");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, "triggered");
    assert_eq!(history[0].rule_name.as_deref(), Some("High CPU"));

    assert_eq!(alerts.active().await.len(), 1);
    alerts.resolve(first[0].history_id).await.expect("resolve");
    assert!(alerts.active().await.is_empty());

    // Resolving clears the active entry, so the rule can fire again.
    assert_eq!(alerts.check(&snapshot).await.len(), 1);

    let stats = alerts.stats(7).await.expect("stats");
    assert_eq!(stats.total, 2);
    assert_eq!(stats.by_severity["critical"], 2);
}

#[tokio::test]
async fn disabled_and_quiet_rules_do_not_fire() {
    let p = panel().await;
    let alerts = &p.state.alerts;

    let rule = alerts.create_rule(cpu_rule(95.0), None).await.expect("create rule");
    assert!(alerts.check(&hot_snapshot()).await.is_empty());

    alerts
        .update_rule(
            rule.id,
            RuleUpdate {
                threshold: Some(50.0),
                enabled: Some(false),
                ..Default::default()
            },
        )
        .await
        .expect("update");
    assert!(alerts.check(&hot_snapshot()).await.is_empty());

    alerts
        .update_rule(
            rule.id,
            RuleUpdate {
                enabled: Some(true),
                ..Default::default()
            },
        )
        .await
        .expect("update");
    assert_eq!(alerts.check(&hot_snapshot()).await.len(), 1);

    alerts.delete_rule(rule.id).await.expect("delete");
    assert!(matches!(
        alerts.get_rule(rule.id).await,
        Err(PanelError::NotFound(_))
    ));
    assert!(alerts.history(None, Some(rule.id)).await.expect("history").is_empty());
}

#[tokio::test]
async fn invalid_rules_are_rejected() {
    let p = panel().await;
    let alerts = &p.state.alerts;

    let mut bad = cpu_rule(80.0);
    bad.operator = "=~".to_string();
    assert!(matches!(
        alerts.create_rule(bad, None).await,
        Err(PanelError::Validation(_))
    ));

    let mut bad = cpu_rule(80.0);
    bad.metric = "gpu_usage".to_string();
    assert!(matches!(
        alerts.create_rule(bad, None).await,
        Err(PanelError::Validation(_))
    ));
}

#[tokio::test]
async fn test_rule_has_no_side_effects() {
    let p = panel().await;
    let alerts = &p.state.alerts;
    let draft = RuleDraft {
        name: "dry run".to_string(),
        metric: "cpu_usage".to_string(),
        operator: "gte".to_string(),
        threshold: 90.0,
        severity: None,
    };

    let result = alerts.test_rule(&draft, &hot_snapshot()).expect("test rule");
    assert!(result.triggered);
    assert_eq!(result.value, Some(93.0));
    assert!(result.message.is_some_and(|m| m.contains("dry run")));
    assert!(alerts.history(None, None).await.expect("history").is_empty());
    assert!(alerts.active().await.is_empty());
}

#[tokio::test]
async fn rule_routes_respect_roles() {
    let p = panel().await;
    let admin = login(&p.app, "admin", ADMIN_PASSWORD).await;

    let (status, _) = call(
        &p.app,
        "POST",
        "/api/users",
        Some(&admin),
        Some(json!({ "username": "viewer1", "password": "viewer123", "role": "viewer" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let viewer = login(&p.app, "viewer1", "viewer123").await;

    let rule = json!({
        "name": "Memory",
        "metric": "memory_usage",
        "operator": ">=",
        "threshold": 90
    });
    let (status, _) = call(&p.app, "POST", "/api/alerts/rules", Some(&viewer), Some(rule.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(&p.app, "POST", "/api/alerts/rules", Some(&admin), Some(rule)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["notification_channels"], json!([{ "type": "console" }]));
    let id = body["id"].as_i64().expect("id");

    let (status, body) = call(&p.app, "GET", "/api/alerts/rules", Some(&viewer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(1));

    let (status, _) = call(
        &p.app,
        "DELETE",
        &format!("/api/alerts/rules/{id}"),
        Some(&viewer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(
        &p.app,
        "POST",
        "/api/alerts/history/999/resolve",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
