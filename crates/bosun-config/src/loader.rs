//! Config file discovery and loading.
//!
//! Search order when no explicit path is given:
//! 1. `./bosun.yaml`
//! 2. `~/.bosun/config.yaml`
//! 3. `/etc/bosun/config.yaml`
//!
//! The first existing file wins; there is no layering — the file is the
//! single source of truth.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult};
use crate::types::BotConfig;
use crate::validate;

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: usize = 1_048_576;

/// Locate the configuration file.
///
/// # Errors
///
/// Returns [`ConfigError::NotFound`] when none of the candidate locations
/// exist, or [`ConfigError::NoHomeDir`] when the home directory cannot be
/// resolved while building the candidate list.
pub fn discover(explicit: Option<&Path>) -> ConfigResult<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    let mut candidates = vec![PathBuf::from("bosun.yaml")];
    if let Some(dirs) = directories::BaseDirs::new() {
        candidates.push(dirs.home_dir().join(".bosun").join("config.yaml"));
    }
    candidates.push(PathBuf::from("/etc/bosun/config.yaml"));

    for candidate in &candidates {
        if candidate.is_file() {
            debug!(path = %candidate.display(), "configuration file located");
            return Ok(candidate.clone());
        }
    }

    Err(ConfigError::NotFound {
        searched: candidates
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", "),
    })
}

/// Discover, read, parse and validate the configuration.
///
/// # Errors
///
/// Returns a [`ConfigError`] for a missing file, unreadable file, malformed
/// YAML or failed validation.
pub fn load(explicit: Option<&Path>) -> ConfigResult<BotConfig> {
    let path = discover(explicit)?;
    let config = load_file(&path)?;
    info!(path = %path.display(), "configuration loaded");
    Ok(config)
}

/// Load a config from a specific file path.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, exceeds the size
/// cap, fails to parse, or fails validation.
pub fn load_file(path: &Path) -> ConfigResult<BotConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    // Size is checked after the read so there is no stat/read race.
    if content.len() > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit",
                content.len()
            ),
        });
    }

    let config: BotConfig = serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;

    validate::validate(&config)?;
    Ok(config)
}
