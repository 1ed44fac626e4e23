//! Crypto error types.

use thiserror::Error;

/// Result alias for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors raised by the callback codec and the TOTP authenticator.
///
/// Handlers collapse every variant into a generic "invalid" reply; the
/// variants exist for logging and for tests.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// The payload could not be parsed into the wire layout.
    #[error("malformed callback payload")]
    BadFormat,

    /// The signature did not match the body.
    #[error("callback signature mismatch")]
    BadSignature,

    /// The payload's creation time is outside the accepted window.
    #[error("callback payload expired")]
    Expired,

    /// The nonce was already consumed.
    #[error("callback nonce already consumed")]
    NonceConsumed,

    /// The payload is bound to a different user.
    #[error("callback user mismatch")]
    UserMismatch,

    /// A field violates its character-class whitelist or length bound.
    #[error("callback field rejected: {field}")]
    BadCharacterSet {
        /// Which field failed.
        field: &'static str,
    },

    /// The encoded payload would not fit the platform limit.
    #[error("encoded callback payload is {len} bytes, limit is {limit}")]
    Oversize {
        /// Actual encoded length.
        len: usize,
        /// Platform limit.
        limit: usize,
    },

    /// TOTP setup failed (bad secret material or URI parameters).
    #[error("TOTP initialisation failed: {0}")]
    TotpSetup(String),

    /// The QR code image could not be generated.
    #[error("QR code generation failed: {0}")]
    QrGeneration(String),

    /// The system clock is unusable for TOTP verification.
    #[error("system clock error during TOTP verification")]
    Clock,
}
