//! Plugins compiled into the host.

mod audit_trail;
mod load_watch;

use std::sync::Arc;

use super::registry::Plugin;

pub const AUDIT_TRAIL: &str = "audit-trail";
pub const LOAD_WATCH: &str = "load-watch";

pub fn audit_trail() -> Arc<dyn Plugin> {
    Arc::new(audit_trail::AuditTrail)
}

pub fn load_watch() -> Arc<dyn Plugin> {
    Arc::new(load_watch::LoadWatch)
}
