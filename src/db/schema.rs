//! SQL DDL for initializing the database schema.
//! Timestamps are RFC3339 text bound from Rust, so every comparison is lexical on UTC values.

/// SQLite schema includes:
/// - `users` / `user_sessions` (accounts and bearer-token sessions)
/// - `system_logs` (audit trail shown on the logs page)
/// - `alert_rules` / `alert_history`
/// - `performance_history` (periodic samples for charts)
/// - `system_config` (runtime-editable settings)
/// - `plugins` / `plugin_data` (plugin metadata and per-plugin key/value store)
pub const SQLITE_INIT: &str = r#"
-- ---------------------------------------------------------------------------
-- Accounts
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY NOT NULL,
    username TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    email TEXT NULL,
    role TEXT NOT NULL DEFAULT 'user',
    avatar TEXT NULL,
    preferences TEXT NOT NULL DEFAULT '{}',
    is_active INTEGER NOT NULL DEFAULT 1,
    last_login TEXT NULL,
    login_attempts INTEGER NOT NULL DEFAULT 0,
    locked_until TEXT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);

CREATE TABLE IF NOT EXISTS user_sessions (
    id INTEGER PRIMARY KEY NOT NULL,
    user_id INTEGER NOT NULL REFERENCES users(id),
    session_token TEXT NOT NULL UNIQUE,
    ip_address TEXT NULL,
    user_agent TEXT NULL,
    created_at TEXT NOT NULL,
    expires_at TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1
);

CREATE INDEX IF NOT EXISTS idx_user_sessions_user ON user_sessions(user_id, is_active);

-- ---------------------------------------------------------------------------
-- Audit log
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS system_logs (
    id INTEGER PRIMARY KEY NOT NULL,
    level TEXT NOT NULL,
    message TEXT NOT NULL,
    context TEXT NULL,
    user_id INTEGER NULL REFERENCES users(id),
    ip_address TEXT NULL,
    user_agent TEXT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_system_logs_created ON system_logs(created_at);

-- ---------------------------------------------------------------------------
-- Alerting
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS alert_rules (
    id INTEGER PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    description TEXT NULL,
    metric TEXT NOT NULL,
    operator TEXT NOT NULL,
    threshold REAL NOT NULL,
    severity TEXT NOT NULL DEFAULT 'warning',
    enabled INTEGER NOT NULL DEFAULT 1,
    notification_channels TEXT NOT NULL DEFAULT '[]',
    created_by INTEGER NULL REFERENCES users(id),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS alert_history (
    id INTEGER PRIMARY KEY NOT NULL,
    rule_id INTEGER NOT NULL REFERENCES alert_rules(id),
    triggered_at TEXT NOT NULL,
    resolved_at TEXT NULL,
    value REAL NOT NULL,
    status TEXT NOT NULL DEFAULT 'triggered',
    message TEXT NULL,
    acknowledged_by INTEGER NULL REFERENCES users(id),
    acknowledged_at TEXT NULL
);

CREATE INDEX IF NOT EXISTS idx_alert_history_rule ON alert_history(rule_id);
CREATE INDEX IF NOT EXISTS idx_alert_history_triggered ON alert_history(triggered_at);

-- ---------------------------------------------------------------------------
-- Metrics
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS performance_history (
    id INTEGER PRIMARY KEY NOT NULL,
    timestamp TEXT NOT NULL,
    cpu_usage REAL NOT NULL,
    memory_usage REAL NOT NULL,
    disk_usage REAL NOT NULL,
    network_in REAL NULL,
    network_out REAL NULL,
    load_average REAL NULL,
    swap_usage REAL NOT NULL,
    process_count INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_performance_history_ts ON performance_history(timestamp);

-- ---------------------------------------------------------------------------
-- Settings and plugins
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS system_config (
    id INTEGER PRIMARY KEY NOT NULL,
    key TEXT NOT NULL UNIQUE,
    value TEXT NOT NULL,
    description TEXT NULL,
    category TEXT NOT NULL DEFAULT 'general',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS plugins (
    id INTEGER PRIMARY KEY NOT NULL,
    name TEXT NOT NULL UNIQUE,
    version TEXT NOT NULL,
    description TEXT NULL,
    author TEXT NULL,
    enabled INTEGER NOT NULL DEFAULT 0,
    config TEXT NOT NULL DEFAULT '{}',
    installed_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS plugin_data (
    plugin TEXT NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (plugin, key)
);
"#;

/// Rows seeded into `system_config` with `INSERT OR IGNORE`: `(key, value, description, category)`.
pub const DEFAULT_SETTINGS: &[(&str, &str, &str, &str)] = &[
    ("app_name", "AquaPanel", "Application name", "general"),
    ("app_version", "1.2.0-enterprise", "Application version", "general"),
    ("theme", "liquid-glass", "Interface theme", "appearance"),
    (
        "auto_refresh_interval",
        "2000",
        "Dashboard refresh interval (ms)",
        "performance",
    ),
    ("data_retention_days", "30", "History retention (days)", "storage"),
    ("enable_email_alerts", "false", "Enable email alerts", "alerts"),
    ("max_login_attempts", "5", "Failed logins before lockout", "security"),
    ("session_timeout", "86400", "Session lifetime (s)", "security"),
];
