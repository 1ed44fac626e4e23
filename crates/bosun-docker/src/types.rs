//! Typed views over engine responses.

use std::fmt;

/// One row of the containers screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSummary {
    /// Truncated engine id.
    pub short_id: String,
    /// Container name, slash-stripped and title-cased for display.
    pub name: String,
    /// Image reference.
    pub image: String,
    /// Creation date and time, `YYYY-MM-DD, HH:MM:SS`.
    pub created: String,
    /// When the container was last started, as a relative phrase.
    pub run_at: String,
    /// Engine-reported status string.
    pub status: String,
}

/// Memory block of the full-stats screen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryStats {
    /// Usage, human-readable.
    pub usage: String,
    /// Limit, human-readable.
    pub limit: String,
    /// usage/limit as a percentage with two decimals; zero without a limit.
    pub percent: f64,
}

/// CPU throttling block of the full-stats screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuStats {
    /// Scheduler periods seen.
    pub periods: u64,
    /// Periods in which the container was throttled.
    pub throttled_periods: u64,
    /// Total time throttled, nanoseconds.
    pub throttled_time: u64,
}

/// Primary-interface network block of the full-stats screen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetworkStats {
    /// Bytes received, human-readable.
    pub rx_bytes: String,
    /// Bytes transmitted, human-readable.
    pub tx_bytes: String,
    /// Inbound packets dropped.
    pub rx_dropped: u64,
    /// Outbound packets dropped.
    pub tx_dropped: u64,
    /// Inbound errors.
    pub rx_errors: u64,
    /// Outbound errors.
    pub tx_errors: u64,
}

/// State and config attributes of the full-stats screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerAttrs {
    /// Whether the container is running.
    pub running: bool,
    /// Whether it is paused.
    pub paused: bool,
    /// Whether it is restarting.
    pub restarting: bool,
    /// Engine restart count.
    pub restart_count: i64,
    /// Whether the engine marked it dead.
    pub dead: bool,
    /// Last exit code, when one exists.
    pub exit_code: Option<i64>,
    /// Configured environment entries.
    pub env: Vec<String>,
    /// Configured command.
    pub cmd: Vec<String>,
    /// Invocation arguments.
    pub args: Vec<String>,
}

/// Everything the full-stats screen renders for one container.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerFullStats {
    /// Memory block.
    pub memory: MemoryStats,
    /// CPU throttling block.
    pub cpu: CpuStats,
    /// Primary-interface network block.
    pub network: NetworkStats,
    /// State/config attributes.
    pub attrs: ContainerAttrs,
}

/// One row of the images screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageRecord {
    /// Truncated engine id.
    pub short_id: String,
    /// Primary repo tag, or `<none>`.
    pub name: String,
    /// All repo tags.
    pub tags: Vec<String>,
    /// Image architecture.
    pub architecture: String,
    /// Image operating system.
    pub os: String,
    /// Size, human-readable.
    pub size: String,
    /// Creation as a relative phrase.
    pub created: String,
    /// Author field, when present.
    pub author: String,
    /// Image labels, `key=value`.
    pub labels: Vec<String>,
    /// Exposed ports.
    pub exposed_ports: Vec<String>,
    /// Configured environment entries.
    pub env: Vec<String>,
    /// Entrypoint.
    pub entrypoint: Vec<String>,
    /// Default command.
    pub cmd: Vec<String>,
}

/// Counters shown on the `/docker` overview screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DockerCounters {
    /// Number of images known to the engine.
    pub images_count: usize,
    /// Number of containers (running or not).
    pub containers_count: usize,
}

/// Mutating actions the facade can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerAction {
    /// Start a stopped container.
    Start,
    /// Stop a running container.
    Stop,
    /// Restart and poll for the running state.
    Restart,
    /// Rename; the target name travels separately.
    Rename,
}

impl ContainerAction {
    /// Stable lowercase name used in logs and error text.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
            Self::Rename => "rename",
        }
    }
}

impl fmt::Display for ContainerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
