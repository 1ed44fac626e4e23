//! Shared bot state.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use teloxide::Bot;
use teloxide::types::ChatId;
use tokio::sync::Mutex;

use bosun_config::BotConfig;
use bosun_core::Redactor;
use bosun_crypto::{CallbackCodec, TotpAuthenticator};
use bosun_docker::DockerFacade;
use bosun_plugins::PluginManager;
use bosun_session::{AccessLedger, RateLimiter, SessionStore};
use bosun_system::SystemFacade;

use crate::health::HealthState;

/// Updates admitted per user within [`RATE_PERIOD`].
const RATE_LIMIT: usize = 10;

/// Rate-limit window.
const RATE_PERIOD: Duration = Duration::from_secs(60);

/// Everything a handler can reach, cloned into each worker.
///
/// All fields are cheap handles; the coordinators behind them serialise
/// their own state, so handlers stay re-entrant.
#[derive(Clone)]
pub struct BotState {
    /// The messaging client.
    pub bot: Bot,
    /// Immutable configuration.
    pub config: Arc<BotConfig>,
    /// Secret scrubber for logs and engine output.
    pub redactor: Redactor,
    /// Two-factor session store.
    pub sessions: SessionStore,
    /// Allow-list failure ledger.
    pub access: AccessLedger,
    /// Per-user throttle.
    pub rate: RateLimiter,
    /// Signed-callback codec.
    pub codec: Arc<CallbackCodec>,
    /// TOTP derivation and verification.
    pub totp: Arc<TotpAuthenticator>,
    /// Container engine facade.
    pub docker: DockerFacade,
    /// Host metrics facade.
    pub system: Arc<SystemFacade>,
    /// Plugin handle table.
    pub plugins: Arc<PluginManager>,
    /// Runtime health flags and snapshot.
    pub health: Arc<HealthState>,
    /// Containers awaiting a rename reply, keyed by chat.
    pub pending_renames: Arc<Mutex<HashMap<ChatId, String>>>,
    /// The token the bot runs with; the webhook route embeds it.
    pub selected_token: bosun_config::SecretBox,
}

impl BotState {
    /// Assemble the state from configuration.
    ///
    /// `selected_token` is the token `bot` was built with (prod or dev per
    /// the CLI mode).
    #[must_use]
    pub fn new(
        bot: Bot,
        config: BotConfig,
        plugins_dir: PathBuf,
        selected_token: bosun_config::SecretBox,
    ) -> Self {
        let redactor = Redactor::new(config.secret_values());
        let sessions = SessionStore::new();
        let salt = config.access_control.auth_salt.expose_secret().to_owned();
        let admins = config
            .access_control
            .allowed_admins_ids
            .iter()
            .copied()
            .collect();
        let docker = DockerFacade::new(
            &config.docker.host,
            admins,
            sessions.clone(),
            redactor.clone(),
        );

        Self {
            bot,
            config: Arc::new(config),
            redactor,
            sessions,
            access: AccessLedger::new(),
            rate: RateLimiter::new(RATE_LIMIT, RATE_PERIOD),
            codec: Arc::new(CallbackCodec::from_secret(salt.as_bytes())),
            totp: Arc::new(TotpAuthenticator::new(&salt)),
            docker,
            system: Arc::new(SystemFacade::new()),
            plugins: Arc::new(PluginManager::new(plugins_dir)),
            health: Arc::new(HealthState::new(HealthState::default_snapshot_path())),
            pending_renames: Arc::new(Mutex::new(HashMap::new())),
            selected_token,
        }
    }
}
