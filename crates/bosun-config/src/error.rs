//! Configuration error types.

use thiserror::Error;

/// Result alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while locating, reading or validating the config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No config file was found in any of the search locations.
    #[error("no configuration file found (searched: {searched})")]
    NotFound {
        /// The locations that were tried, joined for display.
        searched: String,
    },

    /// The file could not be read.
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        /// Path of the offending file.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid YAML or does not match the schema.
    #[error("failed to parse config file '{path}': {source}")]
    ParseError {
        /// Path of the offending file.
        path: String,
        /// Underlying YAML error.
        #[source]
        source: serde_yaml::Error,
    },

    /// A field failed semantic validation.
    #[error("invalid config field '{field}': {message}")]
    ValidationError {
        /// Dotted path of the field.
        field: String,
        /// Human-readable reason.
        message: String,
    },

    /// The user's home directory could not be determined.
    #[error("could not determine home directory")]
    NoHomeDir,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_names_the_field() {
        let err = ConfigError::ValidationError {
            field: "access_control.auth_salt".to_owned(),
            message: "must not be empty".to_owned(),
        };
        let text = err.to_string();
        assert!(text.contains("access_control.auth_salt"));
        assert!(text.contains("must not be empty"));
    }
}
