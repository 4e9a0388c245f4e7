//! Compile-time plugin factories, looked up by a manifest's `entry`.

use ahash::AHashMap;
use async_trait::async_trait;
use std::sync::Arc;

use super::builtin;
use super::context::PluginContext;
use crate::error::PanelError;

/// A loadable plugin. `init` registers hooks through the context; `destroy` runs on unload.
#[async_trait]
pub trait Plugin: Send + Sync {
    async fn init(&self, ctx: PluginContext) -> Result<(), PanelError>;

    async fn destroy(&self) {}
}

pub type PluginFactory = fn() -> Arc<dyn Plugin>;

#[derive(Clone, Default)]
pub struct PluginRegistry {
    factories: AHashMap<String, PluginFactory>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the plugins shipped in this crate.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(builtin::AUDIT_TRAIL, builtin::audit_trail);
        registry.register(builtin::LOAD_WATCH, builtin::load_watch);
        registry
    }

    pub fn register(&mut self, entry: &str, factory: PluginFactory) {
        self.factories.insert(entry.to_string(), factory);
    }

    pub fn create(&self, entry: &str) -> Option<Arc<dyn Plugin>> {
        self.factories.get(entry).map(|factory| factory())
    }

    pub fn entries(&self) -> Vec<&str> {
        let mut entries: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        entries.sort_unstable();
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_registered() {
        let registry = PluginRegistry::with_builtins();
        assert_eq!(registry.entries(), vec!["audit-trail", "load-watch"]);
        assert!(registry.create("audit-trail").is_some());
        assert!(registry.create("missing").is_none());
    }
}
