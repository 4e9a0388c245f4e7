//! Database module: models, schema and the actor that owns the SQLite pool.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows
//! - `schema.rs`: SQL DDL and seeded settings
//! - `patch.rs`: insert payloads and COALESCE-style patch envelopes
//! - `queries/`: one file of plain SQL per table group

pub mod actor;
pub mod models;
pub mod patch;
pub mod schema;

mod patch_impl;
mod queries;

pub use actor::{DbActorHandle, spawn};
pub use models::{
    DbAlertHistory, DbAlertRule, DbAlertStat, DbLogEntry, DbPerformanceSample, DbPlugin,
    DbPluginData, DbSession, DbSetting, DbUser, DbUserStats, DbUserSummary, PurgeReport,
};
pub use patch::{
    AlertHistoryCreate, AlertHistoryQuery, AlertRuleCreate, AlertRulePatch, DbPatchable,
    LogCreate, LogQuery, PerformanceSampleCreate, PluginUpsert, SessionCreate, UserCreate,
    UserListQuery, UserPatch,
};
pub use schema::SQLITE_INIT;
