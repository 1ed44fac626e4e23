//! Cryptographic primitives for the bosun operations bot.
//!
//! Two concerns live here: the callback-data codec that packs a signed,
//! replay-protected payload into Telegram's 64-byte callback limit, and the
//! TOTP second factor whose per-user secrets are derived deterministically
//! from the configured salt.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod callback;
mod error;
mod totp;

pub use callback::{CALLBACK_MAX_LEN, CallbackCodec, CallbackPayload};
pub use error::{CryptoError, CryptoResult};
pub use totp::TotpAuthenticator;
