use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PluginsConfig {
    /// One sub-directory per plugin, each holding a `plugin.json`.
    /// TOML: `plugins.dir`. Default: `plugins`.
    #[serde(default = "default_dir")]
    pub dir: PathBuf,

    /// Load every enabled plugin at startup.
    /// TOML: `plugins.autoload`. Default: `true`.
    #[serde(default = "default_autoload")]
    pub autoload: bool,
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            dir: default_dir(),
            autoload: default_autoload(),
        }
    }
}

fn default_dir() -> PathBuf {
    PathBuf::from("plugins")
}

fn default_autoload() -> bool {
    true
}
