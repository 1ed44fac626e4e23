//! The runtime supervisor.
//!
//! Owns ingress (long polling or webhook), fans each update out to its own
//! worker, runs the background loops (health, access sweeper) and performs
//! bounded graceful shutdown.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use futures::StreamExt;
use teloxide::prelude::*;
use teloxide::types::UpdateKind;
use teloxide::update_listeners::{AsUpdateStream, Polling};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::dispatch::{Event, HandlerRegistry};
use crate::error::{BotError, BotResult};
use crate::handlers;
use crate::health;
use crate::middleware;
use crate::state::BotState;
use crate::webhook;

/// Long-poll timeout sent to the platform.
const POLL_TIMEOUT: Duration = Duration::from_secs(30);

/// Workers get this long to drain at shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Ingress restarts tolerated before the runtime gives up.
const MAX_RECOVERY_ATTEMPTS: u32 = 3;

/// Access-control sweep cadence.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// How updates reach the runtime.
#[derive(Debug, Clone)]
pub enum IngressMode {
    /// Long polling (the default).
    Polling,
    /// Webhook server on the given address, with optional TLS material.
    Webhook {
        /// Listen address.
        addr: SocketAddr,
    },
}

/// The supervisor.
pub struct BotRuntime {
    state: BotState,
    registry: Arc<HandlerRegistry>,
    mode: IngressMode,
    cancel: CancellationToken,
    tracker: TaskTracker,
    launched: AtomicBool,
    recovery_attempts: AtomicU32,
}

impl BotRuntime {
    /// Assemble the runtime: load plugins, then build the dispatch table
    /// (plugin handlers included, fallback echo last).
    pub async fn new(state: BotState, plugin_names: &[String], mode: IngressMode) -> Self {
        if !plugin_names.is_empty() {
            let loaded = state
                .plugins
                .load_selected(plugin_names, &state.config.plugins_config)
                .await;
            info!(requested = plugin_names.len(), loaded, "plugins initialised");
        }

        let registry = Arc::new(handlers::build_registry(&state).await);
        info!(handlers = registry.len(), "handler registry built");

        Self {
            state,
            registry,
            mode,
            cancel: CancellationToken::new(),
            tracker: TaskTracker::new(),
            launched: AtomicBool::new(false),
            recovery_attempts: AtomicU32::new(0),
        }
    }

    /// The shared state, for the entry point and tests.
    #[must_use]
    pub fn state(&self) -> &BotState {
        &self.state
    }

    /// Start serving updates. Idempotent: a second call returns at once.
    ///
    /// Blocks until shutdown is requested or ingress fails beyond recovery.
    ///
    /// # Errors
    ///
    /// Returns [`BotError::Ingress`] or [`BotError::Webhook`] when the
    /// ingress loop dies and recovery is exhausted.
    pub async fn launch(&self) -> BotResult<()> {
        if self.launched.swap(true, Ordering::SeqCst) {
            debug!("launch called twice, ignoring");
            return Ok(());
        }

        // Background loops. Both are daemons: cancelled at shutdown, never
        // waited for.
        let _health = health::spawn_health_loop(
            Arc::clone(&self.state.health),
            Arc::clone(&self.state.system),
            self.cancel.clone(),
        );
        self.spawn_sweeper();

        info!(mode = ?self.mode, "bosun runtime launched");
        match self.mode.clone() {
            IngressMode::Polling => self.run_polling().await,
            IngressMode::Webhook { addr } => self.run_webhook(addr).await,
        }
    }

    /// Graceful shutdown: stop ingress, unload plugins, wait for workers.
    ///
    /// # Errors
    ///
    /// Returns [`BotError::ShutdownTimeout`] when in-flight workers do not
    /// drain within the grace period.
    pub async fn shutdown(&self, reason: &str) -> BotResult<()> {
        info!(reason, "shutting down");
        self.cancel.cancel();
        self.state.health.set_ingress_running(false);

        if matches!(self.mode, IngressMode::Webhook { .. }) {
            let _ = self
                .state
                .bot
                .delete_webhook()
                .drop_pending_updates(true)
                .await;
        }

        self.state.plugins.shutdown().await;

        self.tracker.close();
        if tokio::time::timeout(SHUTDOWN_GRACE, self.tracker.wait())
            .await
            .is_err()
        {
            error!("in-flight workers did not drain, abandoning them");
            return Err(BotError::ShutdownTimeout);
        }
        info!("shutdown complete");
        Ok(())
    }

    /// Whether the runtime currently reports healthy.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.state.health.is_healthy()
    }

    /// Account one ingress failure; `false` once the budget is spent.
    fn recovery(&self) -> bool {
        let attempt = self
            .recovery_attempts
            .fetch_add(1, Ordering::SeqCst)
            .saturating_add(1);
        if attempt > MAX_RECOVERY_ATTEMPTS {
            return false;
        }
        warn!(attempt, max = MAX_RECOVERY_ATTEMPTS, "ingress recovery");
        true
    }

    async fn run_polling(&self) -> BotResult<()> {
        loop {
            let mut listener = Polling::builder(self.state.bot.clone())
                .timeout(POLL_TIMEOUT)
                .delete_webhook()
                .await
                .build();

            self.state.health.set_ingress_running(true);
            info!("long-polling session started");

            {
                let stream = listener.as_stream();
                futures::pin_mut!(stream);
                loop {
                    tokio::select! {
                        () = self.cancel.cancelled() => return Ok(()),
                        update = stream.next() => match update {
                            Some(Ok(update)) => self.dispatch_update(update),
                            Some(Err(e)) => {
                                // The listener retries transient transport
                                // failures itself; just record them.
                                warn!(
                                    error = %self.state.redactor.scrub_error(&e.to_string()),
                                    "polling error"
                                );
                            },
                            None => break,
                        },
                    }
                }
            }

            self.state.health.set_ingress_running(false);
            if self.cancel.is_cancelled() {
                return Ok(());
            }
            if !self.recovery() {
                let reason = "polling stream ended beyond recovery budget";
                self.state.health.record_fatal(reason);
                return Err(BotError::Ingress(reason.to_owned()));
            }
            // Backoff grows with each attempt, as the original did.
            let attempt = u64::from(self.recovery_attempts.load(Ordering::SeqCst));
            tokio::time::sleep(Duration::from_secs(5 * attempt)).await;
        }
    }

    async fn run_webhook(&self, addr: SocketAddr) -> BotResult<()> {
        let tls = self.state.config.webhook_config.as_ref().and_then(|w| {
            w.cert
                .as_deref()
                .zip(w.cert_key.as_deref())
        });

        let (server, mut updates) =
            webhook::build(self.state.selected_token.expose_secret(), addr, tls)?;

        let cancel = self.cancel.clone();
        let server_task = tokio::spawn(server.serve(cancel));

        self.state.health.set_ingress_running(true);
        info!(addr = %addr, "webhook session started");

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => break,
                update = updates.recv() => match update {
                    Some(update) => self.dispatch_update(update),
                    None => break,
                },
            }
        }

        self.state.health.set_ingress_running(false);
        match server_task.await {
            Ok(result) => result,
            Err(e) => Err(BotError::Webhook(format!("server task failed: {e}"))),
        }
    }

    /// Fan one update out to its own worker.
    fn dispatch_update(&self, update: Update) {
        let event = match update.kind {
            UpdateKind::Message(message) => Event::Message(message),
            UpdateKind::CallbackQuery(query) => Event::Callback(query),
            other => {
                debug!(kind = ?other, "unknown-kind update dropped");
                return;
            },
        };

        let state = self.state.clone();
        let registry = Arc::clone(&self.registry);
        self.tracker.spawn(async move {
            if middleware::run_pipeline(&event, &state).await {
                registry.dispatch(event, state).await;
            }
        });
    }

    /// The hourly access-control sweeper; also prunes idle rate windows.
    fn spawn_sweeper(&self) {
        let access = self.state.access.clone();
        let rate = self.state.rate.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        access.sweep().await;
                        rate.prune_idle().await;
                    },
                }
            }
        });
    }
}

