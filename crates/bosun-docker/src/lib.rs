//! Container engine facade for the bosun operations bot.
//!
//! Handlers never touch the engine client directly: everything flows through
//! [`DockerFacade`], which acquires a client per request (scoped
//! acquisition), parallelises read fan-outs, sanitises log output and gates
//! every mutating action behind the admin + authenticated check.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod client;
mod error;
mod facade;
mod types;

pub use error::{DockerError, DockerResult};
pub use facade::DockerFacade;
pub use types::{
    ContainerAction, ContainerAttrs, ContainerFullStats, ContainerSummary, CpuStats, DockerCounters,
    ImageRecord, MemoryStats, NetworkStats,
};
