use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use crate::error::PanelError;

pub const MANIFEST_FILE: &str = "plugin.json";

/// Contents of `<plugins.dir>/<name>/plugin.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PluginManifest {
    pub name: String,
    pub version: Version,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    /// Factory name in the plugin registry.
    pub entry: String,
    #[serde(default)]
    pub aquapanel: HostRequirements,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HostRequirements {
    /// Minimum host `major.minor`; absent means any host.
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "empty_object")]
    pub config: Value,
}

impl Default for HostRequirements {
    fn default() -> Self {
        Self {
            version: None,
            enabled: false,
            config: empty_object(),
        }
    }
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

impl PluginManifest {
    pub async fn read(plugin_dir: &Path) -> Result<Self, PanelError> {
        let path = plugin_dir.join(MANIFEST_FILE);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PanelError::not_found(format!("{}", path.display())));
            }
            Err(e) => return Err(e.into()),
        };
        let manifest: PluginManifest = serde_json::from_str(&raw)
            .map_err(|e| PanelError::Plugin(format!("invalid {}: {e}", path.display())))?;
        if !manifest.aquapanel.config.is_object() {
            return Err(PanelError::Plugin(format!(
                "{}: aquapanel.config must be an object",
                manifest.name
            )));
        }
        Ok(manifest)
    }
}

/// Lower bound `(major, minor)` of a semver requirement such as `1.2`, `^1.1` or `>=1.0.3`.
///
/// `*` yields `None`. A leading `v` is accepted.
fn major_minor(requirement: &str) -> Result<Option<(u64, u64)>, semver::Error> {
    let req = VersionReq::parse(requirement.trim().trim_start_matches('v'))?;
    Ok(req
        .comparators
        .first()
        .map(|c| (c.major, c.minor.unwrap_or(0))))
}

/// Same major, and the host's minor is at least the requirement's minor.
pub fn is_compatible(requirement: Option<&str>, host: &Version) -> Result<bool, PanelError> {
    let Some(requirement) = requirement.filter(|r| !r.trim().is_empty()) else {
        return Ok(true);
    };
    let bound = major_minor(requirement).map_err(|e| {
        PanelError::Plugin(format!("unparseable host version requirement {requirement:?}: {e}"))
    })?;
    Ok(bound.is_none_or(|(major, minor)| host.major == major && host.minor >= minor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn host() -> Version {
        Version::new(1, 2, 0)
    }

    #[test]
    fn compatibility_rules() {
        assert!(is_compatible(None, &host()).unwrap());
        assert!(is_compatible(Some("1.0.0"), &host()).unwrap());
        assert!(is_compatible(Some("1.2"), &host()).unwrap());
        assert!(is_compatible(Some("^1.1"), &host()).unwrap());
        assert!(!is_compatible(Some("1.3.0"), &host()).unwrap());
        assert!(!is_compatible(Some("2.0.0"), &host()).unwrap());
        assert!(!is_compatible(Some("0.9"), &host()).unwrap());
        assert!(is_compatible(Some("v1.1"), &host()).unwrap());
        assert!(is_compatible(Some(">=1.2.5"), &host()).unwrap());
        assert!(is_compatible(Some("*"), &host()).unwrap());
        assert!(!is_compatible(Some("~1.3"), &host()).unwrap());
        assert!(is_compatible(Some("one.two"), &host()).is_err());
        assert!(is_compatible(Some("1.2.x.y"), &host()).is_err());
    }

    #[test]
    fn manifest_defaults() {
        let m: PluginManifest = serde_json::from_value(json!({
            "name": "demo",
            "version": "0.1.0",
            "entry": "audit-trail"
        }))
        .expect("manifest must parse");
        assert!(!m.aquapanel.enabled);
        assert_eq!(m.aquapanel.config, json!({}));
        assert_eq!(m.version, Version::new(0, 1, 0));
    }
}
