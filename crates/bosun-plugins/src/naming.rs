//! Plugin name validation and path containment.

use std::path::{Component, Path, PathBuf};

use crate::error::{PluginError, PluginResult};

/// Validate a plugin name against the allow-pattern `^[a-z_]+$` and the
/// traversal/injection blacklist.
pub(crate) fn validate_name(name: &str) -> PluginResult<()> {
    let reject = |reason: &'static str| {
        Err(PluginError::InvalidName {
            name: name.to_owned(),
            reason,
        })
    };

    if name.is_empty() {
        return reject("empty");
    }
    // Explicit blacklist first, so the log line names the actual problem
    // instead of a generic pattern miss.
    if name.contains("..") {
        return reject("path traversal");
    }
    if name.contains('/') || name.contains('\\') {
        return reject("path separator");
    }
    if name.starts_with('.') {
        return reject("hidden entry");
    }
    if name.contains('.') {
        return reject("file target, not a plugin name");
    }
    if !name.chars().all(|c| c.is_ascii_lowercase() || c == '_') {
        return reject("must match ^[a-z_]+$");
    }
    Ok(())
}

/// Resolve the directory of a validated plugin name, guaranteeing it stays
/// inside `base`.
pub(crate) fn resolve_plugin_dir(base: &Path, name: &str) -> PluginResult<PathBuf> {
    validate_name(name)?;

    let joined = base.join(name);
    // A validated name is a single normal component, but verify anyway:
    // containment must hold by construction, not by trust in the filter.
    let escapes = joined
        .strip_prefix(base)
        .map(|rest| {
            rest.components()
                .any(|c| !matches!(c, Component::Normal(_)))
        })
        .unwrap_or(true);
    if escapes {
        return Err(PluginError::PathEscape {
            name: name.to_owned(),
        });
    }
    Ok(joined)
}
