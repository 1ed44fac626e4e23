//! Configuration schema.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::secret::SecretBox;

/// Which bot token the runtime uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BotMode {
    /// Production token.
    #[default]
    Prod,
    /// Development token.
    Dev,
}

impl std::fmt::Display for BotMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Prod => f.write_str("prod"),
            Self::Dev => f.write_str("dev"),
        }
    }
}

/// `bot_token` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenSection {
    /// Token used in production mode.
    #[serde(default)]
    pub prod_token: SecretBox,
    /// Token used in development mode.
    #[serde(default)]
    pub dev_bot_token: SecretBox,
}

/// `access_control` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessControlSection {
    /// Users permitted to interact with the bot at all.
    #[serde(default)]
    pub allowed_user_ids: Vec<u64>,
    /// Users additionally permitted to run mutating container actions.
    #[serde(default)]
    pub allowed_admins_ids: Vec<u64>,
    /// Salt for deterministic TOTP secret derivation.
    #[serde(default)]
    pub auth_salt: SecretBox,
}

/// `docker` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DockerSection {
    /// Container engine endpoint, e.g. `unix:///var/run/docker.sock`.
    #[serde(default = "default_docker_host", deserialize_with = "string_or_singleton")]
    pub host: String,
}

impl Default for DockerSection {
    fn default() -> Self {
        Self {
            host: default_docker_host(),
        }
    }
}

fn default_docker_host() -> String {
    "unix:///var/run/docker.sock".to_owned()
}

/// `webhook_config` section (optional).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookSection {
    /// TLS certificate path.
    #[serde(default, deserialize_with = "opt_path_or_singleton")]
    pub cert: Option<PathBuf>,
    /// TLS private key path.
    #[serde(default, deserialize_with = "opt_path_or_singleton")]
    pub cert_key: Option<PathBuf>,
}

/// The whole configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BotConfig {
    /// Bot tokens.
    #[serde(default)]
    pub bot_token: TokenSection,
    /// Allow-lists and the auth salt.
    #[serde(default)]
    pub access_control: AccessControlSection,
    /// Container engine endpoint.
    #[serde(default)]
    pub docker: DockerSection,
    /// Per-plugin configuration blocks, keyed by plugin name.
    #[serde(default)]
    pub plugins_config: BTreeMap<String, serde_yaml::Value>,
    /// Webhook TLS material.
    #[serde(default)]
    pub webhook_config: Option<WebhookSection>,
}

impl BotConfig {
    /// The token selected by `mode`.
    #[must_use]
    pub fn token_for(&self, mode: BotMode) -> &SecretBox {
        match mode {
            BotMode::Prod => &self.bot_token.prod_token,
            BotMode::Dev => &self.bot_token.dev_bot_token,
        }
    }

    /// Whether `user_id` is on the interaction allow-list.
    #[must_use]
    pub fn is_user_allowed(&self, user_id: u64) -> bool {
        self.access_control.allowed_user_ids.contains(&user_id)
    }

    /// Whether `user_id` is on the admin allow-list.
    ///
    /// Admins are checked independently of the user allow-list; the two sets
    /// may be disjoint.
    #[must_use]
    pub fn is_admin(&self, user_id: u64) -> bool {
        self.access_control.allowed_admins_ids.contains(&user_id)
    }

    /// All secret values that must never appear in logs.
    #[must_use]
    pub fn secret_values(&self) -> Vec<String> {
        let mut secrets = vec![
            self.bot_token.prod_token.expose_secret().to_owned(),
            self.bot_token.dev_bot_token.expose_secret().to_owned(),
            self.access_control.auth_salt.expose_secret().to_owned(),
        ];
        if let Some(webhook) = &self.webhook_config {
            for path in [webhook.cert.as_ref(), webhook.cert_key.as_ref()]
                .into_iter()
                .flatten()
            {
                secrets.push(path.display().to_string());
            }
        }
        secrets.retain(|s| !s.is_empty());
        secrets
    }
}

/// Accept either a bare string or a one-element list (historical template
/// style) for plain string fields such as `docker.host`.
fn string_or_singleton<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Repr::deserialize(deserializer)? {
        Repr::One(s) => s,
        Repr::Many(list) => list.into_iter().next().unwrap_or_default(),
    })
}

/// Same list-or-scalar tolerance for optional path fields.
fn opt_path_or_singleton<'de, D>(deserializer: D) -> Result<Option<PathBuf>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        One(PathBuf),
        Many(Vec<PathBuf>),
    }

    Ok(match Option::<Repr>::deserialize(deserializer)? {
        None => None,
        Some(Repr::One(path)) => Some(path),
        Some(Repr::Many(list)) => list.into_iter().next(),
    })
}
