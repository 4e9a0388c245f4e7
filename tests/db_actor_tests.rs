use aquapanel::db::{
    self, AlertHistoryCreate, AlertHistoryQuery, AlertRuleCreate, DbActorHandle, LogCreate,
    LogQuery, PerformanceSampleCreate, PluginUpsert, SessionCreate, UserCreate, UserListQuery,
    UserPatch,
};
use chrono::{TimeDelta, Utc};
use tempfile::TempDir;

async fn open() -> (TempDir, DbActorHandle) {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite:{}", dir.path().join("db.sqlite").display());
    let handle = db::spawn(&url).await.expect("spawn db actor");
    (dir, handle)
}

fn user(name: &str, role: &str) -> UserCreate {
    UserCreate {
        username: name.to_string(),
        password_hash: "$2b$04$notarealhash".to_string(),
        email: Some(format!("{name}@example.com")),
        role: role.to_string(),
        avatar: None,
        preferences: "{}".to_string(),
    }
}

#[tokio::test]
async fn users_and_sessions() {
    let (_dir, db) = open().await;

    let alice = db.create_user(user("alice", "admin")).await.expect("create alice");
    let bob = db.create_user(user("bob", "viewer")).await.expect("create bob");
    assert!(db.create_user(user("alice", "user")).await.is_err());

    assert!(db.email_taken("bob@example.com", None).await.expect("email check"));
    assert!(!db.email_taken("bob@example.com", Some(bob)).await.expect("email check"));

    let token = "session-token-1".to_string();
    db.create_session(SessionCreate {
        user_id: alice,
        session_token: token.clone(),
        ip_address: Some("10.0.0.1".to_string()),
        user_agent: None,
        expires_at: Utc::now() + TimeDelta::hours(1),
    })
    .await
    .expect("create session");
    db.create_session(SessionCreate {
        user_id: bob,
        session_token: "stale".to_string(),
        ip_address: None,
        user_agent: None,
        expires_at: Utc::now() - TimeDelta::minutes(1),
    })
    .await
    .expect("create stale session");

    let (page, total) = db
        .list_users(UserListQuery { limit: 10, offset: 0 }, None)
        .await
        .expect("list users");
    assert_eq!(total, 2);
    assert_eq!(page.len(), 2);
    let (viewers, total) = db
        .list_users(UserListQuery { limit: 10, offset: 0 }, Some("viewer".to_string()))
        .await
        .expect("list viewers");
    assert_eq!(total, 1);
    assert_eq!(viewers[0].username, "bob");

    let stats = db.user_stats().await.expect("stats");
    assert_eq!(stats.total, 2);
    assert_eq!(stats.admins, 1);
    assert_eq!(stats.viewers, 1);
    assert_eq!(stats.active_sessions, 1);

    assert_eq!(db.expire_sessions().await.expect("expire"), 1);
    assert!(db.end_session(&token).await.expect("end"));
    assert!(!db.end_session(&token).await.expect("end twice"));
    let session = db.get_session(&token).await.expect("get").expect("row kept");
    assert!(!session.is_active);

    db.patch_user(UserPatch {
        id: bob,
        is_active: Some(false),
        ..Default::default()
    })
    .await
    .expect("deactivate");
    assert!(db.get_user_by_username("bob").await.expect("lookup").is_none());
    assert!(db.get_user_by_id(bob).await.expect("lookup").is_some());
}

#[tokio::test]
async fn user_patch_lock_and_clear() {
    let (_dir, db) = open().await;
    let id = db.create_user(user("carol", "user")).await.expect("create");

    let until = Utc::now() + TimeDelta::minutes(15);
    db.patch_user(UserPatch {
        id,
        login_attempts: Some(5),
        locked_until: Some(until),
        ..Default::default()
    })
    .await
    .expect("lock");
    let row = db.get_user_by_id(id).await.expect("get").expect("exists");
    assert_eq!(row.login_attempts, 5);
    assert!(row.locked_until.is_some());
    assert_eq!(row.email.as_deref(), Some("carol@example.com"));

    db.patch_user(UserPatch {
        id,
        login_attempts: Some(0),
        clear_lock: true,
        ..Default::default()
    })
    .await
    .expect("unlock");
    let row = db.get_user_by_id(id).await.expect("get").expect("exists");
    assert_eq!(row.login_attempts, 0);
    assert!(row.locked_until.is_none());
}

#[tokio::test]
async fn logs_filter_by_level() {
    let (_dir, db) = open().await;
    let id = db.create_user(user("dave", "user")).await.expect("create");

    db.insert_log(LogCreate::new("info", "hello").user(id))
        .await
        .expect("log");
    db.insert_log(LogCreate::new("error", "boom").context("test"))
        .await
        .expect("log");

    let all = db
        .list_logs(LogQuery {
            limit: 50,
            ..Default::default()
        })
        .await
        .expect("list");
    assert_eq!(all.len(), 2);

    let errors = db
        .list_logs(LogQuery {
            limit: 50,
            offset: 0,
            level: Some("error".to_string()),
        })
        .await
        .expect("list errors");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].context.as_deref(), Some("test"));

    let mine = db.recent_user_logs(id, 10).await.expect("user logs");
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].username.as_deref(), Some("dave"));
}

#[tokio::test]
async fn deleting_a_rule_removes_its_history() {
    let (_dir, db) = open().await;
    let rule = db
        .create_alert_rule(AlertRuleCreate {
            name: "disk".to_string(),
            description: None,
            metric: "disk_usage".to_string(),
            operator: ">=".to_string(),
            threshold: 90.0,
            severity: "error".to_string(),
            enabled: true,
            notification_channels: r#"[{"type":"console"}]"#.to_string(),
            created_by: None,
        })
        .await
        .expect("create rule");

    let history = db
        .record_alert(AlertHistoryCreate {
            rule_id: rule,
            value: 95.5,
            message: "disk full".to_string(),
            triggered_at: Utc::now(),
        })
        .await
        .expect("record");

    let rows = db
        .list_alert_history(AlertHistoryQuery {
            limit: 10,
            rule_id: Some(rule),
        })
        .await
        .expect("history");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].metric.as_deref(), Some("disk_usage"));

    assert!(db.resolve_alert(history).await.expect("resolve"));
    assert!(!db.resolve_alert(history).await.expect("resolve twice"));

    let buckets = db.alert_stats(7).await.expect("stats");
    assert_eq!(buckets.iter().map(|b| b.count).sum::<i64>(), 1);

    assert!(db.delete_alert_rule(rule).await.expect("delete"));
    assert!(!db.delete_alert_rule(rule).await.expect("delete twice"));
    let rows = db
        .list_alert_history(AlertHistoryQuery {
            limit: 10,
            rule_id: None,
        })
        .await
        .expect("history");
    assert!(rows.is_empty());
}

#[tokio::test]
async fn settings_are_seeded_and_upserted() {
    let (_dir, db) = open().await;

    let retention = db
        .get_setting("data_retention_days")
        .await
        .expect("get")
        .expect("seeded");
    assert_eq!(retention.value, "30");

    db.set_setting("data_retention_days", "7", None)
        .await
        .expect("set");
    db.set_setting("custom_banner", "hi", Some("Banner".to_string()))
        .await
        .expect("set new");

    let all = db.list_settings().await.expect("list");
    let value = |key: &str| {
        all.iter()
            .find(|s| s.key == key)
            .map(|s| s.value.clone())
    };
    assert_eq!(value("data_retention_days").as_deref(), Some("7"));
    assert_eq!(value("custom_banner").as_deref(), Some("hi"));
}

#[tokio::test]
async fn plugin_rows_keep_enabled_state_across_upserts() {
    let (_dir, db) = open().await;
    let upsert = |version: &str| PluginUpsert {
        name: "audit-trail".to_string(),
        version: version.to_string(),
        description: None,
        author: None,
        enabled: true,
        config: "{}".to_string(),
    };

    db.upsert_plugin(upsert("1.0.0")).await.expect("insert");
    db.set_plugin_enabled("audit-trail", false)
        .await
        .expect("disable");
    db.upsert_plugin(upsert("1.1.0")).await.expect("update");

    let row = db
        .get_plugin("audit-trail")
        .await
        .expect("get")
        .expect("exists");
    assert_eq!(row.version, "1.1.0");
    assert!(!row.enabled);

    db.put_plugin_data("audit-trail", "count", "1".to_string())
        .await
        .expect("put");
    db.put_plugin_data("audit-trail", "count", "2".to_string())
        .await
        .expect("overwrite");
    assert_eq!(
        db.get_plugin_data("audit-trail", "count")
            .await
            .expect("get data")
            .as_deref(),
        Some("2")
    );
    assert_eq!(db.list_plugin_data("audit-trail").await.expect("list").len(), 1);
    assert!(db.delete_plugin_data("audit-trail", "count").await.expect("delete"));
    assert!(db.get_plugin_data("audit-trail", "count").await.expect("get").is_none());

    assert!(db.set_plugin_enabled("missing", true).await.is_err());
}

#[tokio::test]
async fn purge_keeps_recent_rows() {
    let (_dir, db) = open().await;
    let sample = |age: TimeDelta| PerformanceSampleCreate {
        timestamp: Utc::now() - age,
        cpu_usage: 10.0,
        memory_usage: 20.0,
        disk_usage: 30.0,
        network_in: None,
        network_out: None,
        load_average: Some(0.5),
        swap_usage: 0.0,
        process_count: 100,
    };
    db.record_performance(sample(TimeDelta::days(40)))
        .await
        .expect("old sample");
    db.record_performance(sample(TimeDelta::minutes(5)))
        .await
        .expect("new sample");

    let report = db.purge_older_than(30).await.expect("purge");
    assert_eq!(report.performance_history, 1);
    assert_eq!(db.performance_history(24).await.expect("history").len(), 1);
}

#[tokio::test]
async fn oversized_windows_saturate_instead_of_killing_the_actor() {
    let (_dir, db) = open().await;
    db.create_user(user("erin", "user")).await.expect("create");
    db.insert_log(LogCreate::new("info", "kept")).await.expect("log");

    let report = db.purge_older_than(100_000_000).await.expect("purge");
    assert_eq!(report.logs, 0);
    db.performance_history(u32::MAX).await.expect("history");
    db.alert_stats(u32::MAX).await.expect("stats");

    // The actor must still be serving requests.
    assert_eq!(db.count_users().await.expect("count"), 1);
}
