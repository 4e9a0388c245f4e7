use crate::db::models::{
    DbAlertHistory, DbAlertRule, DbAlertStat, DbLogEntry, DbPerformanceSample, DbPlugin,
    DbPluginData, DbSession, DbSetting, DbUser, DbUserStats, DbUserSummary, PurgeReport,
};
use crate::db::patch::{
    AlertHistoryCreate, AlertHistoryQuery, AlertRuleCreate, AlertRulePatch, DbPatchable,
    LogCreate, LogQuery, PerformanceSampleCreate, PluginUpsert, SessionCreate, UserCreate,
    UserListQuery, UserPatch,
};
use crate::db::queries::{alerts, logs, performance, plugins, sessions, settings, users};
use crate::db::schema::SQLITE_INIT;
use crate::error::PanelError;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use std::fmt::Display;
use std::{str::FromStr, time::Duration};
use tracing::info;

type Reply<T> = RpcReplyPort<Result<T, PanelError>>;

#[derive(Debug)]
pub enum DbActorMessage {
    // ---- users ----
    CreateUser(UserCreate, Reply<i64>),
    /// Active users only.
    GetUserByUsername(String, Reply<Option<DbUser>>),
    GetUserById(i64, Reply<Option<DbUser>>),
    /// `(email, user to exclude)`.
    EmailTaken(String, Option<i64>, Reply<bool>),
    ListUsers(UserListQuery, Option<String>, Reply<(Vec<DbUserSummary>, i64)>),
    PatchUser(UserPatch, Reply<()>),
    UserStats(Reply<DbUserStats>),
    CountUsers(Reply<i64>),

    // ---- sessions ----
    CreateSession(SessionCreate, Reply<i64>),
    GetSession(String, Reply<Option<DbSession>>),
    EndSession(String, Reply<bool>),
    EndUserSessions(i64, Reply<u64>),
    ExpireSessions(Reply<u64>),
    RecentSessions(i64, i64, Reply<Vec<DbSession>>),

    // ---- logs ----
    InsertLog(LogCreate, Reply<i64>),
    ListLogs(LogQuery, Reply<Vec<DbLogEntry>>),
    RecentUserLogs(i64, i64, Reply<Vec<DbLogEntry>>),

    // ---- alerts ----
    CreateAlertRule(AlertRuleCreate, Reply<i64>),
    ListAlertRules(Option<bool>, Reply<Vec<DbAlertRule>>),
    GetAlertRule(i64, Reply<Option<DbAlertRule>>),
    PatchAlertRule(AlertRulePatch, Reply<()>),
    DeleteAlertRule(i64, Reply<bool>),
    RecordAlert(AlertHistoryCreate, Reply<i64>),
    ListAlertHistory(AlertHistoryQuery, Reply<Vec<DbAlertHistory>>),
    /// `(history id, user id)`.
    AcknowledgeAlert(i64, i64, Reply<bool>),
    ResolveAlert(i64, Reply<bool>),
    AlertStats(u32, Reply<Vec<DbAlertStat>>),

    // ---- performance ----
    RecordPerformance(PerformanceSampleCreate, Reply<i64>),
    PerformanceHistory(u32, Reply<Vec<DbPerformanceSample>>),
    PurgeOlderThan(u32, Reply<PurgeReport>),

    // ---- settings ----
    GetSetting(String, Reply<Option<DbSetting>>),
    /// `(key, value, description)`.
    SetSetting(String, String, Option<String>, Reply<()>),
    ListSettings(Reply<Vec<DbSetting>>),

    // ---- plugins ----
    GetPlugin(String, Reply<Option<DbPlugin>>),
    UpsertPlugin(PluginUpsert, Reply<()>),
    SetPluginEnabled(String, bool, Reply<()>),
    /// `(plugin, JSON text)`.
    SetPluginConfig(String, String, Reply<()>),
    ListPlugins(Reply<Vec<DbPlugin>>),
    /// `(plugin, key)`.
    GetPluginData(String, String, Reply<Option<String>>),
    /// `(plugin, key, JSON text)`.
    PutPluginData(String, String, String, Reply<()>),
    DeletePluginData(String, String, Reply<bool>),
    ListPluginData(String, Reply<Vec<DbPluginData>>),
}

fn rpc_failed(op: &str, e: impl Display) -> PanelError {
    PanelError::RactorError(format!("DbActor {op} RPC failed: {e}"))
}

#[derive(Clone)]
pub struct DbActorHandle {
    actor: ActorRef<DbActorMessage>,
}

impl DbActorHandle {
    pub async fn create_user(&self, create: UserCreate) -> Result<i64, PanelError> {
        ractor::call!(self.actor, DbActorMessage::CreateUser, create)
            .map_err(|e| rpc_failed("CreateUser", e))?
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<DbUser>, PanelError> {
        ractor::call!(
            self.actor,
            DbActorMessage::GetUserByUsername,
            username.to_string()
        )
        .map_err(|e| rpc_failed("GetUserByUsername", e))?
    }

    pub async fn get_user_by_id(&self, id: i64) -> Result<Option<DbUser>, PanelError> {
        ractor::call!(self.actor, DbActorMessage::GetUserById, id)
            .map_err(|e| rpc_failed("GetUserById", e))?
    }

    pub async fn email_taken(
        &self,
        email: &str,
        exclude_user: Option<i64>,
    ) -> Result<bool, PanelError> {
        ractor::call!(
            self.actor,
            DbActorMessage::EmailTaken,
            email.to_string(),
            exclude_user
        )
        .map_err(|e| rpc_failed("EmailTaken", e))?
    }

    pub async fn list_users(
        &self,
        query: UserListQuery,
        role: Option<String>,
    ) -> Result<(Vec<DbUserSummary>, i64), PanelError> {
        ractor::call!(self.actor, DbActorMessage::ListUsers, query, role)
            .map_err(|e| rpc_failed("ListUsers", e))?
    }

    pub async fn patch_user(&self, patch: UserPatch) -> Result<(), PanelError> {
        ractor::call!(self.actor, DbActorMessage::PatchUser, patch)
            .map_err(|e| rpc_failed("PatchUser", e))?
    }

    pub async fn user_stats(&self) -> Result<DbUserStats, PanelError> {
        ractor::call!(self.actor, DbActorMessage::UserStats)
            .map_err(|e| rpc_failed("UserStats", e))?
    }

    pub async fn count_users(&self) -> Result<i64, PanelError> {
        ractor::call!(self.actor, DbActorMessage::CountUsers)
            .map_err(|e| rpc_failed("CountUsers", e))?
    }

    pub async fn create_session(&self, create: SessionCreate) -> Result<i64, PanelError> {
        ractor::call!(self.actor, DbActorMessage::CreateSession, create)
            .map_err(|e| rpc_failed("CreateSession", e))?
    }

    pub async fn get_session(&self, token: &str) -> Result<Option<DbSession>, PanelError> {
        ractor::call!(self.actor, DbActorMessage::GetSession, token.to_string())
            .map_err(|e| rpc_failed("GetSession", e))?
    }

    pub async fn end_session(&self, token: &str) -> Result<bool, PanelError> {
        ractor::call!(self.actor, DbActorMessage::EndSession, token.to_string())
            .map_err(|e| rpc_failed("EndSession", e))?
    }

    pub async fn end_user_sessions(&self, user_id: i64) -> Result<u64, PanelError> {
        ractor::call!(self.actor, DbActorMessage::EndUserSessions, user_id)
            .map_err(|e| rpc_failed("EndUserSessions", e))?
    }

    pub async fn expire_sessions(&self) -> Result<u64, PanelError> {
        ractor::call!(self.actor, DbActorMessage::ExpireSessions)
            .map_err(|e| rpc_failed("ExpireSessions", e))?
    }

    pub async fn recent_sessions(
        &self,
        user_id: i64,
        limit: i64,
    ) -> Result<Vec<DbSession>, PanelError> {
        ractor::call!(self.actor, DbActorMessage::RecentSessions, user_id, limit)
            .map_err(|e| rpc_failed("RecentSessions", e))?
    }

    pub async fn insert_log(&self, log: LogCreate) -> Result<i64, PanelError> {
        ractor::call!(self.actor, DbActorMessage::InsertLog, log)
            .map_err(|e| rpc_failed("InsertLog", e))?
    }

    pub async fn list_logs(&self, query: LogQuery) -> Result<Vec<DbLogEntry>, PanelError> {
        ractor::call!(self.actor, DbActorMessage::ListLogs, query)
            .map_err(|e| rpc_failed("ListLogs", e))?
    }

    pub async fn recent_user_logs(
        &self,
        user_id: i64,
        limit: i64,
    ) -> Result<Vec<DbLogEntry>, PanelError> {
        ractor::call!(self.actor, DbActorMessage::RecentUserLogs, user_id, limit)
            .map_err(|e| rpc_failed("RecentUserLogs", e))?
    }

    pub async fn create_alert_rule(&self, create: AlertRuleCreate) -> Result<i64, PanelError> {
        ractor::call!(self.actor, DbActorMessage::CreateAlertRule, create)
            .map_err(|e| rpc_failed("CreateAlertRule", e))?
    }

    pub async fn list_alert_rules(
        &self,
        enabled: Option<bool>,
    ) -> Result<Vec<DbAlertRule>, PanelError> {
        ractor::call!(self.actor, DbActorMessage::ListAlertRules, enabled)
            .map_err(|e| rpc_failed("ListAlertRules", e))?
    }

    pub async fn get_alert_rule(&self, id: i64) -> Result<Option<DbAlertRule>, PanelError> {
        ractor::call!(self.actor, DbActorMessage::GetAlertRule, id)
            .map_err(|e| rpc_failed("GetAlertRule", e))?
    }

    pub async fn patch_alert_rule(&self, patch: AlertRulePatch) -> Result<(), PanelError> {
        ractor::call!(self.actor, DbActorMessage::PatchAlertRule, patch)
            .map_err(|e| rpc_failed("PatchAlertRule", e))?
    }

    pub async fn delete_alert_rule(&self, id: i64) -> Result<bool, PanelError> {
        ractor::call!(self.actor, DbActorMessage::DeleteAlertRule, id)
            .map_err(|e| rpc_failed("DeleteAlertRule", e))?
    }

    pub async fn record_alert(&self, create: AlertHistoryCreate) -> Result<i64, PanelError> {
        ractor::call!(self.actor, DbActorMessage::RecordAlert, create)
            .map_err(|e| rpc_failed("RecordAlert", e))?
    }

    pub async fn list_alert_history(
        &self,
        query: AlertHistoryQuery,
    ) -> Result<Vec<DbAlertHistory>, PanelError> {
        ractor::call!(self.actor, DbActorMessage::ListAlertHistory, query)
            .map_err(|e| rpc_failed("ListAlertHistory", e))?
    }

    pub async fn acknowledge_alert(&self, id: i64, user_id: i64) -> Result<bool, PanelError> {
        ractor::call!(self.actor, DbActorMessage::AcknowledgeAlert, id, user_id)
            .map_err(|e| rpc_failed("AcknowledgeAlert", e))?
    }

    pub async fn resolve_alert(&self, id: i64) -> Result<bool, PanelError> {
        ractor::call!(self.actor, DbActorMessage::ResolveAlert, id)
            .map_err(|e| rpc_failed("ResolveAlert", e))?
    }

    pub async fn alert_stats(&self, days: u32) -> Result<Vec<DbAlertStat>, PanelError> {
        ractor::call!(self.actor, DbActorMessage::AlertStats, days)
            .map_err(|e| rpc_failed("AlertStats", e))?
    }

    pub async fn record_performance(
        &self,
        sample: PerformanceSampleCreate,
    ) -> Result<i64, PanelError> {
        ractor::call!(self.actor, DbActorMessage::RecordPerformance, sample)
            .map_err(|e| rpc_failed("RecordPerformance", e))?
    }

    pub async fn performance_history(
        &self,
        hours: u32,
    ) -> Result<Vec<DbPerformanceSample>, PanelError> {
        ractor::call!(self.actor, DbActorMessage::PerformanceHistory, hours)
            .map_err(|e| rpc_failed("PerformanceHistory", e))?
    }

    pub async fn purge_older_than(&self, days: u32) -> Result<PurgeReport, PanelError> {
        ractor::call!(self.actor, DbActorMessage::PurgeOlderThan, days)
            .map_err(|e| rpc_failed("PurgeOlderThan", e))?
    }

    pub async fn get_setting(&self, key: &str) -> Result<Option<DbSetting>, PanelError> {
        ractor::call!(self.actor, DbActorMessage::GetSetting, key.to_string())
            .map_err(|e| rpc_failed("GetSetting", e))?
    }

    pub async fn set_setting(
        &self,
        key: &str,
        value: &str,
        description: Option<String>,
    ) -> Result<(), PanelError> {
        ractor::call!(
            self.actor,
            DbActorMessage::SetSetting,
            key.to_string(),
            value.to_string(),
            description
        )
        .map_err(|e| rpc_failed("SetSetting", e))?
    }

    pub async fn list_settings(&self) -> Result<Vec<DbSetting>, PanelError> {
        ractor::call!(self.actor, DbActorMessage::ListSettings)
            .map_err(|e| rpc_failed("ListSettings", e))?
    }

    pub async fn get_plugin(&self, name: &str) -> Result<Option<DbPlugin>, PanelError> {
        ractor::call!(self.actor, DbActorMessage::GetPlugin, name.to_string())
            .map_err(|e| rpc_failed("GetPlugin", e))?
    }

    pub async fn upsert_plugin(&self, upsert: PluginUpsert) -> Result<(), PanelError> {
        ractor::call!(self.actor, DbActorMessage::UpsertPlugin, upsert)
            .map_err(|e| rpc_failed("UpsertPlugin", e))?
    }

    pub async fn set_plugin_enabled(&self, name: &str, enabled: bool) -> Result<(), PanelError> {
        ractor::call!(
            self.actor,
            DbActorMessage::SetPluginEnabled,
            name.to_string(),
            enabled
        )
        .map_err(|e| rpc_failed("SetPluginEnabled", e))?
    }

    pub async fn set_plugin_config(&self, name: &str, config: String) -> Result<(), PanelError> {
        ractor::call!(
            self.actor,
            DbActorMessage::SetPluginConfig,
            name.to_string(),
            config
        )
        .map_err(|e| rpc_failed("SetPluginConfig", e))?
    }

    pub async fn list_plugins(&self) -> Result<Vec<DbPlugin>, PanelError> {
        ractor::call!(self.actor, DbActorMessage::ListPlugins)
            .map_err(|e| rpc_failed("ListPlugins", e))?
    }

    pub async fn get_plugin_data(
        &self,
        plugin: &str,
        key: &str,
    ) -> Result<Option<String>, PanelError> {
        ractor::call!(
            self.actor,
            DbActorMessage::GetPluginData,
            plugin.to_string(),
            key.to_string()
        )
        .map_err(|e| rpc_failed("GetPluginData", e))?
    }

    pub async fn put_plugin_data(
        &self,
        plugin: &str,
        key: &str,
        value: String,
    ) -> Result<(), PanelError> {
        ractor::call!(
            self.actor,
            DbActorMessage::PutPluginData,
            plugin.to_string(),
            key.to_string(),
            value
        )
        .map_err(|e| rpc_failed("PutPluginData", e))?
    }

    pub async fn delete_plugin_data(&self, plugin: &str, key: &str) -> Result<bool, PanelError> {
        ractor::call!(
            self.actor,
            DbActorMessage::DeletePluginData,
            plugin.to_string(),
            key.to_string()
        )
        .map_err(|e| rpc_failed("DeletePluginData", e))?
    }

    pub async fn list_plugin_data(&self, plugin: &str) -> Result<Vec<DbPluginData>, PanelError> {
        ractor::call!(self.actor, DbActorMessage::ListPluginData, plugin.to_string())
            .map_err(|e| rpc_failed("ListPluginData", e))?
    }
}

struct DbActorState {
    pool: SqlitePool,
}

struct DbActor;

#[ractor::async_trait]
impl Actor for DbActor {
    type Msg = DbActorMessage;
    type State = DbActorState;
    type Arguments = String;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        database_url: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let connect_opts = SqliteConnectOptions::from_str(database_url.as_str())
            .map_err(|e| ActorProcessingErr::from(format!("invalid database url: {e}")))?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5))
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .connect_with(connect_opts)
            .await
            .map_err(|e| ActorProcessingErr::from(format!("db connect failed: {e}")))?;

        apply_schema(&pool)
            .await
            .map_err(|e| ActorProcessingErr::from(format!("db schema init failed: {e}")))?;

        info!("DbActor initialized");
        Ok(DbActorState { pool })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        let pool = &state.pool;
        match message {
            DbActorMessage::CreateUser(create, reply) => {
                let _ = reply.send(users::create(pool, create).await);
            }
            DbActorMessage::GetUserByUsername(username, reply) => {
                let _ = reply.send(users::get_active_by_username(pool, &username).await);
            }
            DbActorMessage::GetUserById(id, reply) => {
                let _ = reply.send(users::get_by_id(pool, id).await);
            }
            DbActorMessage::EmailTaken(email, exclude, reply) => {
                let _ = reply.send(users::email_taken(pool, &email, exclude).await);
            }
            DbActorMessage::ListUsers(query, role, reply) => {
                let _ = reply.send(users::list(pool, query, role).await);
            }
            DbActorMessage::PatchUser(patch, reply) => {
                let _ = reply.send(patch.apply_patch(pool).await);
            }
            DbActorMessage::UserStats(reply) => {
                let _ = reply.send(users::stats(pool).await);
            }
            DbActorMessage::CountUsers(reply) => {
                let _ = reply.send(users::count(pool).await);
            }

            DbActorMessage::CreateSession(create, reply) => {
                let _ = reply.send(sessions::create(pool, create).await);
            }
            DbActorMessage::GetSession(token, reply) => {
                let _ = reply.send(sessions::get_by_token(pool, &token).await);
            }
            DbActorMessage::EndSession(token, reply) => {
                let _ = reply.send(sessions::end(pool, &token).await);
            }
            DbActorMessage::EndUserSessions(user_id, reply) => {
                let _ = reply.send(sessions::end_all_for_user(pool, user_id).await);
            }
            DbActorMessage::ExpireSessions(reply) => {
                let _ = reply.send(sessions::expire(pool).await);
            }
            DbActorMessage::RecentSessions(user_id, limit, reply) => {
                let _ = reply.send(sessions::recent_for_user(pool, user_id, limit).await);
            }

            DbActorMessage::InsertLog(log, reply) => {
                let _ = reply.send(logs::insert(pool, log).await);
            }
            DbActorMessage::ListLogs(query, reply) => {
                let _ = reply.send(logs::list(pool, query).await);
            }
            DbActorMessage::RecentUserLogs(user_id, limit, reply) => {
                let _ = reply.send(logs::recent_for_user(pool, user_id, limit).await);
            }

            DbActorMessage::CreateAlertRule(create, reply) => {
                let _ = reply.send(alerts::create_rule(pool, create).await);
            }
            DbActorMessage::ListAlertRules(enabled, reply) => {
                let _ = reply.send(alerts::list_rules(pool, enabled).await);
            }
            DbActorMessage::GetAlertRule(id, reply) => {
                let _ = reply.send(alerts::get_rule(pool, id).await);
            }
            DbActorMessage::PatchAlertRule(patch, reply) => {
                let _ = reply.send(patch.apply_patch(pool).await);
            }
            DbActorMessage::DeleteAlertRule(id, reply) => {
                let _ = reply.send(alerts::delete_rule(pool, id).await);
            }
            DbActorMessage::RecordAlert(create, reply) => {
                let _ = reply.send(alerts::record(pool, create).await);
            }
            DbActorMessage::ListAlertHistory(query, reply) => {
                let _ = reply.send(alerts::list_history(pool, query).await);
            }
            DbActorMessage::AcknowledgeAlert(id, user_id, reply) => {
                let _ = reply.send(alerts::acknowledge(pool, id, user_id).await);
            }
            DbActorMessage::ResolveAlert(id, reply) => {
                let _ = reply.send(alerts::resolve(pool, id).await);
            }
            DbActorMessage::AlertStats(days, reply) => {
                let _ = reply.send(alerts::stats(pool, days).await);
            }

            DbActorMessage::RecordPerformance(sample, reply) => {
                let _ = reply.send(performance::record(pool, sample).await);
            }
            DbActorMessage::PerformanceHistory(hours, reply) => {
                let _ = reply.send(performance::last_hours(pool, hours).await);
            }
            DbActorMessage::PurgeOlderThan(days, reply) => {
                let _ = reply.send(performance::purge_older_than(pool, days).await);
            }

            DbActorMessage::GetSetting(key, reply) => {
                let _ = reply.send(settings::get(pool, &key).await);
            }
            DbActorMessage::SetSetting(key, value, description, reply) => {
                let _ = reply.send(settings::set(pool, &key, &value, description).await);
            }
            DbActorMessage::ListSettings(reply) => {
                let _ = reply.send(settings::list(pool).await);
            }

            DbActorMessage::GetPlugin(name, reply) => {
                let _ = reply.send(plugins::get(pool, &name).await);
            }
            DbActorMessage::UpsertPlugin(upsert, reply) => {
                let _ = reply.send(plugins::upsert(pool, upsert).await);
            }
            DbActorMessage::SetPluginEnabled(name, enabled, reply) => {
                let _ = reply.send(plugins::set_enabled(pool, &name, enabled).await);
            }
            DbActorMessage::SetPluginConfig(name, config, reply) => {
                let _ = reply.send(plugins::set_config(pool, &name, &config).await);
            }
            DbActorMessage::ListPlugins(reply) => {
                let _ = reply.send(plugins::list(pool).await);
            }
            DbActorMessage::GetPluginData(plugin, key, reply) => {
                let _ = reply.send(plugins::get_data(pool, &plugin, &key).await);
            }
            DbActorMessage::PutPluginData(plugin, key, value, reply) => {
                let _ = reply.send(plugins::put_data(pool, &plugin, &key, &value).await);
            }
            DbActorMessage::DeletePluginData(plugin, key, reply) => {
                let _ = reply.send(plugins::delete_data(pool, &plugin, &key).await);
            }
            DbActorMessage::ListPluginData(plugin, reply) => {
                let _ = reply.send(plugins::list_data(pool, &plugin).await);
            }
        }
        Ok(())
    }
}

/// Spawn the database actor and return a cloneable handle.
///
/// The actor is unnamed so several instances can coexist (one per test database).
pub async fn spawn(database_url: &str) -> Result<DbActorHandle, PanelError> {
    let (actor, _jh) = Actor::spawn(None, DbActor, database_url.to_string())
        .await
        .map_err(|e| PanelError::RactorError(format!("failed to spawn DbActor: {e}")))?;

    Ok(DbActorHandle { actor })
}

async fn apply_schema(pool: &SqlitePool) -> Result<(), PanelError> {
    for stmt in SQLITE_INIT.split(';') {
        let s = stmt.trim();
        if s.is_empty() {
            continue;
        }
        sqlx::query(s).execute(pool).await?;
    }
    settings::seed_defaults(pool).await
}
