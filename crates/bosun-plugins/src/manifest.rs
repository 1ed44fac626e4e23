//! Plugin manifests.
//!
//! Every plugin directory carries a `plugin.yaml` describing the extension:
//! identity, the commands and index keys it contributes, its permission
//! requirements and resource limits.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PluginError, PluginResult};

/// Permission block of a manifest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PluginPermissions {
    /// Coarse permission class, e.g. `user` or `admin`.
    #[serde(default)]
    pub base_permission: String,
    /// When `true`, the plugin refuses to load if the bot itself runs
    /// inside a container.
    #[serde(default)]
    pub need_running_on_host_machine: bool,
}

/// Resource limits a plugin declares for itself.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Upper bound on plugin memory use, MiB.
    #[serde(default)]
    pub max_memory_mb: Option<u64>,
    /// Upper bound on handlers the plugin may register.
    #[serde(default)]
    pub max_handlers: Option<u32>,
}

/// A parsed `plugin.yaml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Plugin name; must equal the directory name and match `^[a-z_]+$`.
    pub name: String,
    /// Plugin version string.
    #[serde(default)]
    pub version: String,
    /// One-line description shown on the help screen.
    #[serde(default)]
    pub description: String,
    /// Commands contributed by the plugin: trigger → description.
    #[serde(default)]
    pub commands: BTreeMap<String, String>,
    /// Index keys for keyboard placement: key → label.
    #[serde(default)]
    pub index_key: BTreeMap<String, String>,
    /// Permission requirements.
    #[serde(default)]
    pub permissions: PluginPermissions,
    /// Declared resource limits.
    #[serde(default)]
    pub resource_limits: ResourceLimits,
}

impl PluginManifest {
    /// Load and validate the manifest for `name` from `dir/plugin.yaml`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::ManifestMissing`] when the file does not
    /// exist and [`PluginError::ManifestInvalid`] for parse or consistency
    /// failures.
    pub fn load(name: &str, dir: &Path) -> PluginResult<Self> {
        let path = dir.join("plugin.yaml");
        let content = std::fs::read_to_string(&path).map_err(|_| PluginError::ManifestMissing {
            name: name.to_owned(),
            path: path.display().to_string(),
        })?;

        let manifest: Self =
            serde_yaml::from_str(&content).map_err(|e| PluginError::ManifestInvalid {
                name: name.to_owned(),
                reason: e.to_string(),
            })?;

        if manifest.name != name {
            return Err(PluginError::ManifestInvalid {
                name: name.to_owned(),
                reason: format!("manifest names '{}', directory is '{name}'", manifest.name),
            });
        }
        if manifest.version.is_empty() {
            return Err(PluginError::ManifestInvalid {
                name: name.to_owned(),
                reason: "version is required".to_owned(),
            });
        }
        Ok(manifest)
    }
}
