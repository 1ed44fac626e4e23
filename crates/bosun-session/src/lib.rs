//! Per-user runtime state for the bosun operations bot.
//!
//! Three coordinators live here, each owning its map outright and
//! serialising access internally:
//!
//! - [`SessionStore`] — the two-factor authentication state machine,
//!   including the referer that resumes an interrupted privileged action;
//! - [`AccessLedger`] — allow-list failures and escalating blocks for the
//!   first middleware;
//! - [`RateLimiter`] — the sliding-window throttle for the second.
//!
//! Nothing is persisted; all state dies with the process.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod access;
mod rate;
mod store;

pub use access::{AccessLedger, AccessVerdict};
pub use rate::RateLimiter;
pub use store::{AttemptOutcome, AuthState, Referer, RefererKind, SessionStore};
