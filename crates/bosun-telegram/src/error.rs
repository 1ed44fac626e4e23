//! Runtime error types.

use thiserror::Error;

/// Result alias for runtime operations.
pub type BotResult<T> = Result<T, BotError>;

/// Errors raised by the runtime supervisor and its ingress loops.
#[derive(Debug, Error)]
pub enum BotError {
    /// The runtime could not start.
    #[error("launch failed: {0}")]
    Launch(String),

    /// Workers did not drain within the shutdown deadline.
    #[error("graceful shutdown deadline exceeded")]
    ShutdownTimeout,

    /// The ingress loop failed beyond recovery.
    #[error("ingress failed: {0}")]
    Ingress(String),

    /// Webhook transport could not be set up.
    #[error("webhook setup failed: {0}")]
    Webhook(String),

    /// TLS material could not be loaded.
    #[error("TLS setup failed: {0}")]
    Tls(String),

    /// The health snapshot could not be written or read.
    #[error("health snapshot error: {0}")]
    Health(String),
}
