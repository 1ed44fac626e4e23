//! Plugin error types.

use thiserror::Error;

/// Result alias for plugin operations.
pub type PluginResult<T> = Result<T, PluginError>;

/// Errors raised while validating, loading or running plugins.
#[derive(Debug, Error)]
pub enum PluginError {
    /// The plugin name failed the allow-pattern or blacklist.
    #[error("plugin name '{name}' rejected: {reason}")]
    InvalidName {
        /// The offending name.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// The resolved plugin path escapes the plugins base directory.
    #[error("plugin '{name}' resolves outside the plugins directory")]
    PathEscape {
        /// The offending name.
        name: String,
    },

    /// No manifest was found for the plugin.
    #[error("plugin '{name}' has no manifest at '{path}'")]
    ManifestMissing {
        /// The plugin.
        name: String,
        /// Where the manifest was expected.
        path: String,
    },

    /// The manifest could not be parsed or is inconsistent.
    #[error("plugin '{name}' manifest invalid: {reason}")]
    ManifestInvalid {
        /// The plugin.
        name: String,
        /// What is wrong.
        reason: String,
    },

    /// No compiled-in factory matches the plugin name.
    #[error("plugin '{name}' is not a known extension")]
    UnknownPlugin {
        /// The plugin.
        name: String,
    },

    /// The plugin's permissions forbid loading in this environment.
    #[error("plugin '{name}' skipped: {reason}")]
    PermissionRefused {
        /// The plugin.
        name: String,
        /// Which gate refused it.
        reason: &'static str,
    },

    /// The plugin failed at runtime.
    #[error("plugin '{name}' failed: {reason}")]
    Runtime {
        /// The plugin.
        name: String,
        /// Sanitised failure text.
        reason: String,
    },
}
