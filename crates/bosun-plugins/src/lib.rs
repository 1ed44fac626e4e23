//! Plugin management for the bosun operations bot.
//!
//! Plugins are compiled-in extensions selected by name at startup. Each
//! selected plugin must have a manifest directory under the plugins base
//! path; the manager validates the name against a strict allow-pattern and a
//! traversal blacklist, loads manifest + config, enforces the permission
//! gates, and owns the running plugin in a handle table until shutdown.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod builtin;
mod error;
mod manifest;
mod naming;
mod plugin;
mod registry;

pub use error::{PluginError, PluginResult};
pub use manifest::{PluginManifest, PluginPermissions, ResourceLimits};
pub use plugin::{BotPlugin, PluginContext, PluginHandler, PluginReplyFn, PluginTrigger};
pub use registry::PluginManager;
