//! Semantic validation of a parsed configuration.

use crate::error::{ConfigError, ConfigResult};
use crate::types::BotConfig;

/// Validate a parsed config.
///
/// # Errors
///
/// Returns the first [`ConfigError::ValidationError`] encountered.
pub(crate) fn validate(config: &BotConfig) -> ConfigResult<()> {
    if config.bot_token.prod_token.is_empty() && config.bot_token.dev_bot_token.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "bot_token".to_owned(),
            message: "at least one of prod_token / dev_bot_token must be set".to_owned(),
        });
    }

    if config.access_control.auth_salt.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "access_control.auth_salt".to_owned(),
            message: "must not be empty (TOTP secrets are derived from it)".to_owned(),
        });
    }

    if config.access_control.allowed_user_ids.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "access_control.allowed_user_ids".to_owned(),
            message: "must list at least one user id".to_owned(),
        });
    }

    if config.docker.host.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "docker.host".to_owned(),
            message: "must not be empty".to_owned(),
        });
    }

    let scheme_ok = ["unix://", "tcp://", "http://", "https://", "npipe://"]
        .iter()
        .any(|scheme| config.docker.host.starts_with(scheme));
    if !scheme_ok {
        return Err(ConfigError::ValidationError {
            field: "docker.host".to_owned(),
            message: format!("unsupported endpoint '{}'", config.docker.host),
        });
    }

    if let Some(webhook) = &config.webhook_config {
        if webhook.cert.is_some() != webhook.cert_key.is_some() {
            return Err(ConfigError::ValidationError {
                field: "webhook_config".to_owned(),
                message: "cert and cert_key must be configured together".to_owned(),
            });
        }
    }

    Ok(())
}
