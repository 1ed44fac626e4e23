//! Configuration for the bosun operations bot.
//!
//! A single YAML file is the source of truth. It is discovered at startup,
//! read once with a size cap, deserialised into [`BotConfig`] and validated;
//! the resulting value is immutable for the lifetime of the process.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
mod loader;
mod secret;
mod types;
mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{discover, load, load_file};
pub use secret::SecretBox;
pub use types::{
    AccessControlSection, BotConfig, BotMode, DockerSection, TokenSection, WebhookSection,
};
