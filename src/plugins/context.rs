//! The capability object handed to each plugin at load time.

use ahash::AHashMap;
use futures::future::BoxFuture;
use serde_json::Value;
use std::{future::Future, sync::Arc};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::db::{DbActorHandle, LogCreate};
use crate::error::PanelError;

pub type HookFuture = BoxFuture<'static, Result<Value, PanelError>>;
pub type HookHandler = Arc<dyn Fn(Value) -> HookFuture + Send + Sync>;

/// Wraps an async closure as a [`HookHandler`].
pub fn hook<F, Fut>(f: F) -> HookHandler
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, PanelError>> + Send + 'static,
{
    Arc::new(move |payload| Box::pin(f(payload)))
}

#[derive(Clone)]
pub(crate) struct RegisteredHook {
    pub(crate) plugin: String,
    pub(crate) handler: HookHandler,
}

pub(crate) type HookTable = Arc<RwLock<AHashMap<String, Vec<RegisteredHook>>>>;
pub(crate) type ConfigTable = Arc<RwLock<AHashMap<String, Value>>>;

#[derive(Clone)]
pub struct PluginContext {
    name: String,
    db: DbActorHandle,
    hooks: HookTable,
    configs: ConfigTable,
}

impl PluginContext {
    pub(crate) fn new(name: &str, db: DbActorHandle, hooks: HookTable, configs: ConfigTable) -> Self {
        Self {
            name: name.to_string(),
            db,
            hooks,
            configs,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn register_hook(&self, hook_name: &str, handler: HookHandler) {
        self.hooks
            .write()
            .await
            .entry(hook_name.to_string())
            .or_default()
            .push(RegisteredHook {
                plugin: self.name.clone(),
                handler,
            });
        debug!(plugin = %self.name, hook = hook_name, "hook registered");
    }

    pub async fn config(&self) -> Value {
        self.configs
            .read()
            .await
            .get(&self.name)
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default()))
    }

    /// Replaces this plugin's config and persists it.
    pub async fn set_config(&self, config: Value) -> Result<(), PanelError> {
        let text = serde_json::to_string(&config)?;
        self.db.set_plugin_config(&self.name, text).await?;
        self.configs.write().await.insert(self.name.clone(), config);
        Ok(())
    }

    /// Writes to tracing and to `system_logs` with a `[plugin:<name>]` prefix.
    pub async fn log(&self, level: &str, message: &str) {
        match level {
            "error" => error!(plugin = %self.name, "{message}"),
            "warn" | "warning" => warn!(plugin = %self.name, "{message}"),
            "debug" => debug!(plugin = %self.name, "{message}"),
            _ => info!(plugin = %self.name, "{message}"),
        }
        let entry = LogCreate::new(level, format!("[plugin:{}] {message}", self.name))
            .context("plugin_system");
        if let Err(e) = self.db.insert_log(entry).await {
            warn!(plugin = %self.name, error = %e, "failed to persist plugin log");
        }
    }

    pub fn store(&self) -> PluginStore {
        PluginStore {
            plugin: self.name.clone(),
            db: self.db.clone(),
        }
    }
}

/// Key/value storage visible only to one plugin.
#[derive(Clone)]
pub struct PluginStore {
    plugin: String,
    db: DbActorHandle,
}

impl PluginStore {
    pub async fn get(&self, key: &str) -> Result<Option<Value>, PanelError> {
        match self.db.get_plugin_data(&self.plugin, key).await? {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    pub async fn put(&self, key: &str, value: &Value) -> Result<(), PanelError> {
        let text = serde_json::to_string(value)?;
        self.db.put_plugin_data(&self.plugin, key, text).await
    }

    pub async fn delete(&self, key: &str) -> Result<bool, PanelError> {
        self.db.delete_plugin_data(&self.plugin, key).await
    }

    pub async fn entries(&self) -> Result<Vec<(String, Value)>, PanelError> {
        self.db
            .list_plugin_data(&self.plugin)
            .await?
            .into_iter()
            .map(|row| {
                let value: Value = serde_json::from_str(&row.value)?;
                Ok((row.key, value))
            })
            .collect()
    }
}
