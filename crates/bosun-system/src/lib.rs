//! Host metrics facade for the bosun operations bot.
//!
//! Wraps `sysinfo` behind typed snapshots so handlers render screens without
//! touching the metrics library directly. Every snapshot is computed on
//! demand; nothing is cached beyond the `System` value that `sysinfo` itself
//! needs for CPU usage deltas.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod facade;

pub use facade::{
    DiskSnapshot, LoadAverage, MemorySnapshot, NetworkSnapshot, ProcessCounts, SelfSnapshot,
    SensorReading, SwapSnapshot, SystemFacade,
};
