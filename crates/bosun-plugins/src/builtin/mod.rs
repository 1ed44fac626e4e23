//! Compiled-in plugins.

pub(crate) mod monitor;
