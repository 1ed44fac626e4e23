//! The plugin manager: discovery, gates and the owning handle table.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::builtin;
use crate::error::{PluginError, PluginResult};
use crate::manifest::PluginManifest;
use crate::naming;
use crate::plugin::{BotPlugin, PluginHandler};

/// Factory signature for compiled-in plugins.
type PluginFactory = fn(&serde_yaml::Value) -> PluginResult<Arc<dyn BotPlugin>>;

/// The compiled-in extension table. New plugins register here.
fn factory_for(name: &str) -> Option<PluginFactory> {
    match name {
        "monitor" => Some(builtin::monitor::build),
        _ => None,
    }
}

struct LoadedPlugin {
    manifest: PluginManifest,
    plugin: Arc<dyn BotPlugin>,
}

/// Owns every loaded plugin for the lifetime of the process.
///
/// Replaces the original's weak references with an explicit handle table:
/// the manager is the single owner, exposes plugins by name, and drops them
/// deliberately at shutdown.
pub struct PluginManager {
    base_dir: PathBuf,
    in_container: bool,
    loaded: Mutex<BTreeMap<String, LoadedPlugin>>,
}

impl PluginManager {
    /// Create a manager rooted at the plugins base directory.
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            in_container: bosun_core::running_in_container(),
            loaded: Mutex::new(BTreeMap::new()),
        }
    }

    /// Test constructor with a forced environment.
    #[cfg(test)]
    fn with_environment(base_dir: impl Into<PathBuf>, in_container: bool) -> Self {
        Self {
            base_dir: base_dir.into(),
            in_container,
            loaded: Mutex::new(BTreeMap::new()),
        }
    }

    /// Load the selected plugins, one at a time.
    ///
    /// A failing plugin is logged and skipped; it never prevents the others
    /// from loading. Returns how many plugins are loaded afterwards.
    pub async fn load_selected(
        &self,
        names: &[String],
        configs: &BTreeMap<String, serde_yaml::Value>,
    ) -> usize {
        for name in names {
            let config = configs.get(name).cloned().unwrap_or(serde_yaml::Value::Null);
            match self.load_one(name, &config).await {
                Ok(true) => info!(plugin = %name, "plugin loaded"),
                Ok(false) => info!(plugin = %name, "plugin already loaded, registration skipped"),
                Err(e) => warn!(plugin = %name, error = %e, "plugin failed to load"),
            }
        }
        self.loaded.lock().await.len()
    }

    /// Load a single plugin. `Ok(false)` means it was already loaded.
    async fn load_one(&self, name: &str, config: &serde_yaml::Value) -> PluginResult<bool> {
        let dir = naming::resolve_plugin_dir(&self.base_dir, name)?;
        let manifest = PluginManifest::load(name, &dir)?;

        if manifest.permissions.need_running_on_host_machine && self.in_container {
            return Err(PluginError::PermissionRefused {
                name: name.to_owned(),
                reason: "requires the host machine, bot is containerised",
            });
        }

        let factory = factory_for(name).ok_or_else(|| PluginError::UnknownPlugin {
            name: name.to_owned(),
        })?;

        let mut loaded = self.loaded.lock().await;
        if loaded.contains_key(name) {
            return Ok(false);
        }

        let plugin = factory(config)?;
        loaded.insert(
            name.to_owned(),
            LoadedPlugin { manifest, plugin },
        );
        Ok(true)
    }

    /// All handlers contributed by loaded plugins, tagged with the plugin
    /// name for logging.
    pub async fn handlers(&self) -> Vec<(String, PluginHandler)> {
        let loaded = self.loaded.lock().await;
        loaded
            .iter()
            .flat_map(|(name, entry)| {
                let cap = entry
                    .manifest
                    .resource_limits
                    .max_handlers
                    .map_or(usize::MAX, |n| n as usize);
                entry
                    .plugin
                    .handlers()
                    .into_iter()
                    .take(cap)
                    .map(move |h| (name.clone(), h))
            })
            .collect()
    }

    /// Manifest of a loaded plugin.
    pub async fn manifest(&self, name: &str) -> Option<PluginManifest> {
        let loaded = self.loaded.lock().await;
        loaded.get(name).map(|entry| entry.manifest.clone())
    }

    /// Names of the loaded plugins.
    pub async fn loaded_names(&self) -> Vec<String> {
        self.loaded.lock().await.keys().cloned().collect()
    }

    /// Clean up and forget one plugin. Returns whether it existed.
    pub async fn drop_plugin(&self, name: &str) -> bool {
        let removed = self.loaded.lock().await.remove(name);
        match removed {
            Some(entry) => {
                entry.plugin.cleanup().await;
                info!(plugin = %name, "plugin dropped");
                true
            },
            None => false,
        }
    }

    /// Clean up every plugin and clear the table.
    pub async fn shutdown(&self) {
        let mut loaded = self.loaded.lock().await;
        for (name, entry) in loaded.iter() {
            entry.plugin.cleanup().await;
            info!(plugin = %name, "plugin cleaned up");
        }
        loaded.clear();
    }
}

impl std::fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginManager")
            .field("base_dir", &self.base_dir)
            .field("in_container", &self.in_container)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MONITOR_MANIFEST: &str = "name: monitor\nversion: \"1.0\"\ndescription: thresholds\n";

    fn write_monitor_manifest(base: &Path, extra: &str) {
        let dir = base.join("monitor");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("plugin.yaml"),
            format!("{MONITOR_MANIFEST}{extra}"),
        )
        .unwrap();
    }

    #[tokio::test]
    async fn loads_known_plugin() {
        let base = tempfile::tempdir().unwrap();
        write_monitor_manifest(base.path(), "");

        let manager = PluginManager::with_environment(base.path(), false);
        let count = manager
            .load_selected(&["monitor".to_owned()], &BTreeMap::new())
            .await;

        assert_eq!(count, 1);
        assert_eq!(manager.loaded_names().await, vec!["monitor"]);
        assert!(!manager.handlers().await.is_empty());
    }

    #[tokio::test]
    async fn registration_is_idempotent() {
        let base = tempfile::tempdir().unwrap();
        write_monitor_manifest(base.path(), "");

        let manager = PluginManager::with_environment(base.path(), false);
        let names = vec!["monitor".to_owned(), "monitor".to_owned()];
        let count = manager.load_selected(&names, &BTreeMap::new()).await;
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn unknown_plugin_is_skipped_not_fatal() {
        let base = tempfile::tempdir().unwrap();
        write_monitor_manifest(base.path(), "");
        let other = base.path().join("mystery");
        std::fs::create_dir_all(&other).unwrap();
        std::fs::write(other.join("plugin.yaml"), "name: mystery\nversion: \"1\"\n").unwrap();

        let manager = PluginManager::with_environment(base.path(), false);
        let names = vec!["mystery".to_owned(), "monitor".to_owned()];
        let count = manager.load_selected(&names, &BTreeMap::new()).await;

        // The unknown plugin fails alone; monitor still loads.
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn host_machine_gate_refuses_in_container() {
        let base = tempfile::tempdir().unwrap();
        write_monitor_manifest(
            base.path(),
            "permissions:\n  need_running_on_host_machine: true\n",
        );

        let manager = PluginManager::with_environment(base.path(), true);
        let count = manager
            .load_selected(&["monitor".to_owned()], &BTreeMap::new())
            .await;
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn traversal_name_is_refused() {
        let base = tempfile::tempdir().unwrap();
        let manager = PluginManager::with_environment(base.path(), false);
        let count = manager
            .load_selected(&["../monitor".to_owned()], &BTreeMap::new())
            .await;
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn drop_plugin_cleans_up() {
        let base = tempfile::tempdir().unwrap();
        write_monitor_manifest(base.path(), "");

        let manager = PluginManager::with_environment(base.path(), false);
        manager
            .load_selected(&["monitor".to_owned()], &BTreeMap::new())
            .await;

        assert!(manager.drop_plugin("monitor").await);
        assert!(!manager.drop_plugin("monitor").await);
        assert!(manager.loaded_names().await.is_empty());
    }

    #[tokio::test]
    async fn shutdown_clears_the_table() {
        let base = tempfile::tempdir().unwrap();
        write_monitor_manifest(base.path(), "");

        let manager = PluginManager::with_environment(base.path(), false);
        manager
            .load_selected(&["monitor".to_owned()], &BTreeMap::new())
            .await;
        manager.shutdown().await;
        assert!(manager.loaded_names().await.is_empty());
    }

    #[tokio::test]
    async fn handler_cap_is_applied() {
        let base = tempfile::tempdir().unwrap();
        write_monitor_manifest(base.path(), "resource_limits:\n  max_handlers: 1\n");

        let manager = PluginManager::with_environment(base.path(), false);
        manager
            .load_selected(&["monitor".to_owned()], &BTreeMap::new())
            .await;
        assert_eq!(manager.handlers().await.len(), 1);
    }
}
