use ahash::AHashMap;
use chrono::{DateTime, Utc};
use semver::Version;
use serde::Serialize;
use serde_json::Value;
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::context::{ConfigTable, HookTable, PluginContext};
use super::manifest::{PluginManifest, is_compatible};
use super::registry::{Plugin, PluginRegistry};
use crate::db::{DbActorHandle, DbPlugin, LogCreate, PluginUpsert};
use crate::error::PanelError;

/// Version plugins are checked against.
pub fn host_version() -> Version {
    Version::parse(env!("CARGO_PKG_VERSION")).unwrap_or_else(|_| Version::new(1, 2, 0))
}

struct LoadedPlugin {
    manifest: PluginManifest,
    instance: Arc<dyn Plugin>,
    loaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PluginInfo {
    pub name: String,
    pub version: String,
    pub description: Option<String>,
    pub author: Option<String>,
    pub entry: String,
    pub status: &'static str,
    pub loaded_at: DateTime<Utc>,
    pub config: Value,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PluginStatusView {
    pub name: String,
    pub installed: bool,
    pub enabled: bool,
    pub loaded: bool,
    pub version: Option<String>,
    pub loaded_at: Option<DateTime<Utc>>,
    pub hooks: Vec<String>,
    pub config: Value,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct PluginStats {
    pub total_plugins: usize,
    pub loaded_plugins: usize,
    pub registered_hooks: usize,
    pub total_hook_callbacks: usize,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct LoadReport {
    pub loaded: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<(String, String)>,
}

/// Directory-backed plugin loader plus the host's hook bus.
#[derive(Clone)]
pub struct PluginManager {
    dir: PathBuf,
    host: Version,
    registry: Arc<PluginRegistry>,
    db: DbActorHandle,
    hooks: HookTable,
    configs: ConfigTable,
    loaded: Arc<RwLock<AHashMap<String, LoadedPlugin>>>,
    /// Held across every load/unload so a plugin is never initialised twice.
    lifecycle: Arc<Mutex<()>>,
}

fn shallow_merge(base: &Value, overlay: &Value) -> Value {
    let mut merged = base.as_object().cloned().unwrap_or_default();
    if let Some(overlay) = overlay.as_object() {
        for (k, v) in overlay {
            merged.insert(k.clone(), v.clone());
        }
    }
    Value::Object(merged)
}

impl PluginManager {
    pub fn new(dir: impl Into<PathBuf>, registry: PluginRegistry, db: DbActorHandle) -> Self {
        Self::with_host_version(dir, registry, db, host_version())
    }

    pub fn with_host_version(
        dir: impl Into<PathBuf>,
        registry: PluginRegistry,
        db: DbActorHandle,
        host: Version,
    ) -> Self {
        Self {
            dir: dir.into(),
            host,
            registry: Arc::new(registry),
            db,
            hooks: Arc::default(),
            configs: Arc::default(),
            loaded: Arc::default(),
            lifecycle: Arc::default(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn ensure_dir(&self) -> Result<(), PanelError> {
        if !tokio::fs::try_exists(&self.dir).await? {
            tokio::fs::create_dir_all(&self.dir).await?;
            info!(dir = %self.dir.display(), "plugin directory created");
        }
        Ok(())
    }

    /// Loads every sub-directory; individual failures are reported, not propagated.
    pub async fn load_all(&self) -> Result<LoadReport, PanelError> {
        self.ensure_dir().await?;
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();

        let mut report = LoadReport::default();
        for name in names {
            match self.load(&name).await {
                Ok(true) => report.loaded.push(name),
                Ok(false) => report.skipped.push(name),
                Err(e) => {
                    warn!(plugin = %name, error = %e, "plugin failed to load");
                    report.failed.push((name, e.to_string()));
                }
            }
        }
        info!(
            loaded = report.loaded.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "plugins scanned"
        );
        Ok(report)
    }

    async fn read_manifest(&self, name: &str) -> Result<PluginManifest, PanelError> {
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(PanelError::validation(format!("invalid plugin name {name:?}")));
        }
        let manifest = PluginManifest::read(&self.dir.join(name)).await?;
        if manifest.name != name {
            return Err(PanelError::Plugin(format!(
                "manifest name {:?} does not match directory {name:?}",
                manifest.name
            )));
        }
        Ok(manifest)
    }

    fn upsert_for(manifest: &PluginManifest) -> Result<PluginUpsert, PanelError> {
        Ok(PluginUpsert {
            name: manifest.name.clone(),
            version: manifest.version.to_string(),
            description: manifest.description.clone(),
            author: manifest.author.clone(),
            enabled: manifest.aquapanel.enabled,
            config: serde_json::to_string(&manifest.aquapanel.config)?,
        })
    }

    /// Loads one plugin. `Ok(false)` means it is disabled and was skipped.
    pub async fn load(&self, name: &str) -> Result<bool, PanelError> {
        let _guard = self.lifecycle.lock().await;
        self.load_locked(name).await
    }

    async fn load_locked(&self, name: &str) -> Result<bool, PanelError> {
        if self.loaded.read().await.contains_key(name) {
            debug!(plugin = name, "plugin already loaded");
            return Ok(true);
        }

        let manifest = self.read_manifest(name).await?;
        if !is_compatible(manifest.aquapanel.version.as_deref(), &self.host)? {
            return Err(PanelError::Plugin(format!(
                "{name} requires host {}, running {}",
                manifest.aquapanel.version.as_deref().unwrap_or("*"),
                self.host
            )));
        }

        let row = self.db.get_plugin(name).await?;
        self.db.upsert_plugin(Self::upsert_for(&manifest)?).await?;

        let enabled = row
            .as_ref()
            .map(|r| r.enabled)
            .unwrap_or(manifest.aquapanel.enabled);
        if !enabled {
            info!(plugin = name, "plugin disabled, skipping");
            return Ok(false);
        }

        let instance = self.registry.create(&manifest.entry).ok_or_else(|| {
            PanelError::Plugin(format!("{name}: unknown entry {:?}", manifest.entry))
        })?;

        let stored: Value = match &row {
            Some(r) => serde_json::from_str(&r.config).unwrap_or(Value::Null),
            None => Value::Null,
        };
        let config = shallow_merge(&manifest.aquapanel.config, &stored);
        self.configs.write().await.insert(name.to_string(), config);

        let ctx = PluginContext::new(
            name,
            self.db.clone(),
            self.hooks.clone(),
            self.configs.clone(),
        );
        if let Err(e) = instance.init(ctx).await {
            self.drop_hooks(name).await;
            self.configs.write().await.remove(name);
            return Err(PanelError::Plugin(format!("{name}: init failed: {e}")));
        }

        let version = manifest.version.to_string();
        self.loaded.write().await.insert(
            name.to_string(),
            LoadedPlugin {
                manifest,
                instance,
                loaded_at: Utc::now(),
            },
        );

        info!(plugin = name, %version, "plugin loaded");
        self.audit("info", format!("Plugin loaded: {name} v{version}"))
            .await;
        Ok(true)
    }

    pub async fn unload(&self, name: &str) -> Result<(), PanelError> {
        let _guard = self.lifecycle.lock().await;
        self.unload_locked(name).await
    }

    async fn unload_locked(&self, name: &str) -> Result<(), PanelError> {
        let plugin = self
            .loaded
            .write()
            .await
            .remove(name)
            .ok_or_else(|| PanelError::not_found(format!("loaded plugin {name:?}")))?;

        plugin.instance.destroy().await;
        self.drop_hooks(name).await;
        self.configs.write().await.remove(name);

        info!(plugin = name, "plugin unloaded");
        self.audit("info", format!("Plugin unloaded: {name}")).await;
        Ok(())
    }

    pub async fn reload(&self, name: &str) -> Result<bool, PanelError> {
        let _guard = self.lifecycle.lock().await;
        self.unload_locked(name).await?;
        self.load_locked(name).await
    }

    pub async fn enable(&self, name: &str) -> Result<bool, PanelError> {
        let _guard = self.lifecycle.lock().await;
        let manifest = self.read_manifest(name).await?;
        self.db.upsert_plugin(Self::upsert_for(&manifest)?).await?;
        self.db.set_plugin_enabled(name, true).await?;
        self.load_locked(name).await
    }

    pub async fn disable(&self, name: &str) -> Result<(), PanelError> {
        let _guard = self.lifecycle.lock().await;
        if self.db.get_plugin(name).await?.is_none() {
            return Err(PanelError::not_found(format!("plugin {name:?}")));
        }
        match self.unload_locked(name).await {
            Ok(()) | Err(PanelError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }
        self.db.set_plugin_enabled(name, false).await
    }

    async fn drop_hooks(&self, plugin: &str) {
        let mut hooks = self.hooks.write().await;
        for handlers in hooks.values_mut() {
            handlers.retain(|h| h.plugin != plugin);
        }
        hooks.retain(|_, handlers| !handlers.is_empty());
    }

    /// Runs every handler for `hook_name` in registration order and collects the results.
    pub async fn call_hook(&self, hook_name: &str, payload: Value) -> Vec<Value> {
        let handlers = match self.hooks.read().await.get(hook_name) {
            Some(handlers) => handlers.clone(),
            None => return Vec::new(),
        };

        let mut results = Vec::with_capacity(handlers.len());
        for registered in handlers {
            match (registered.handler)(payload.clone()).await {
                Ok(value) => results.push(value),
                Err(e) => warn!(
                    hook = hook_name,
                    plugin = %registered.plugin,
                    error = %e,
                    "hook handler failed"
                ),
            }
        }
        results
    }

    pub async fn list(&self) -> Vec<PluginInfo> {
        let loaded = self.loaded.read().await;
        let configs = self.configs.read().await;
        let mut list: Vec<PluginInfo> = loaded
            .iter()
            .map(|(name, p)| PluginInfo {
                name: name.clone(),
                version: p.manifest.version.to_string(),
                description: p.manifest.description.clone(),
                author: p.manifest.author.clone(),
                entry: p.manifest.entry.clone(),
                status: "loaded",
                loaded_at: p.loaded_at,
                config: configs.get(name).cloned().unwrap_or(Value::Null),
            })
            .collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        list
    }

    pub async fn status(&self, name: &str) -> Result<PluginStatusView, PanelError> {
        let row: Option<DbPlugin> = self.db.get_plugin(name).await?;
        let hooks: Vec<String> = {
            let table = self.hooks.read().await;
            let mut names: Vec<String> = table
                .iter()
                .filter(|(_, handlers)| handlers.iter().any(|h| h.plugin == name))
                .map(|(hook, _)| hook.clone())
                .collect();
            names.sort();
            names
        };
        let loaded = self.loaded.read().await;
        let live = loaded.get(name);
        if row.is_none() && live.is_none() {
            return Err(PanelError::not_found(format!("plugin {name:?}")));
        }

        Ok(PluginStatusView {
            name: name.to_string(),
            installed: row.is_some(),
            enabled: row.as_ref().is_some_and(|r| r.enabled),
            loaded: live.is_some(),
            version: live
                .map(|p| p.manifest.version.to_string())
                .or_else(|| row.as_ref().map(|r| r.version.clone())),
            loaded_at: live.map(|p| p.loaded_at),
            hooks,
            config: self.config(name).await?,
        })
    }

    /// Hook name -> number of handlers.
    pub async fn registered_hooks(&self) -> BTreeMap<String, usize> {
        self.hooks
            .read()
            .await
            .iter()
            .map(|(name, handlers)| (name.clone(), handlers.len()))
            .collect()
    }

    pub async fn stats(&self) -> PluginStats {
        let hooks = self.hooks.read().await;
        let loaded = self.loaded.read().await.len();
        PluginStats {
            total_plugins: loaded,
            loaded_plugins: loaded,
            registered_hooks: hooks.len(),
            total_hook_callbacks: hooks.values().map(Vec::len).sum(),
        }
    }

    /// Live config for a loaded plugin, else the stored one.
    pub async fn config(&self, name: &str) -> Result<Value, PanelError> {
        if let Some(config) = self.configs.read().await.get(name) {
            return Ok(config.clone());
        }
        let row = self
            .db
            .get_plugin(name)
            .await?
            .ok_or_else(|| PanelError::not_found(format!("plugin {name:?}")))?;
        Ok(serde_json::from_str(&row.config)?)
    }

    pub async fn set_config(&self, name: &str, config: Value) -> Result<(), PanelError> {
        if !config.is_object() {
            return Err(PanelError::validation("plugin config must be a JSON object"));
        }
        self.db
            .set_plugin_config(name, serde_json::to_string(&config)?)
            .await?;
        let mut configs = self.configs.write().await;
        if configs.contains_key(name) {
            configs.insert(name.to_string(), config);
        }
        Ok(())
    }

    async fn audit(&self, level: &str, message: String) {
        let entry = LogCreate::new(level, message).context("plugin_system");
        if let Err(e) = self.db.insert_log(entry).await {
            warn!(error = %e, "failed to persist plugin audit log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn shallow_merge_overlays_top_level_keys() {
        let merged = shallow_merge(
            &json!({ "a": 1, "nested": { "x": 1 } }),
            &json!({ "nested": { "y": 2 }, "b": 2 }),
        );
        assert_eq!(merged, json!({ "a": 1, "b": 2, "nested": { "y": 2 } }));
        assert_eq!(shallow_merge(&json!({ "a": 1 }), &Value::Null), json!({ "a": 1 }));
    }
}
