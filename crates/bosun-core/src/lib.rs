//! Shared building blocks for the bosun operations bot.
//!
//! Everything here is dependency-light on purpose: identifier types used
//! across the facade crates, the output redactor that keeps secrets and
//! caller identity out of logs, and host-environment detection.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod environment;
mod redact;
mod types;
pub mod units;

pub use environment::running_in_container;
pub use redact::{CallerIdentity, Redactor, strip_ansi};
pub use types::UserId;
