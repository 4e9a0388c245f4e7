//! Directory-scanned plugins backed by compile-time factories.
//!
//! Each `<plugins.dir>/<name>/plugin.json` names an `entry` in the [`PluginRegistry`]; the
//! resulting [`Plugin`] receives a [`PluginContext`] to register hooks and keep state.

pub mod builtin;
mod context;
mod manager;
mod manifest;
mod registry;

pub use context::{HookFuture, HookHandler, PluginContext, PluginStore, hook};
pub use manager::{
    LoadReport, PluginInfo, PluginManager, PluginStats, PluginStatusView, host_version,
};
pub use manifest::{HostRequirements, MANIFEST_FILE, PluginManifest, is_compatible};
pub use registry::{Plugin, PluginFactory, PluginRegistry};

/// Hook names emitted by the host.
pub mod hooks {
    pub const METRICS_SNAPSHOT: &str = "metrics.snapshot";
    pub const ALERT_TRIGGERED: &str = "alert.triggered";
    pub const USER_LOGIN: &str = "user.login";
}
