//! The `sysinfo`-backed metrics facade.

use std::sync::Mutex;

use sysinfo::{Components, Disks, Networks, ProcessStatus, ProcessesToUpdate, System};
use tracing::debug;

use bosun_core::units::{format_binary_size, format_uptime, percent_of};

/// System load averages over 1, 5 and 15 minutes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadAverage {
    /// One-minute average.
    pub one: f64,
    /// Five-minute average.
    pub five: f64,
    /// Fifteen-minute average.
    pub fifteen: f64,
}

/// Virtual memory usage, sizes preformatted for display.
#[derive(Debug, Clone)]
pub struct MemorySnapshot {
    /// Total installed memory.
    pub total: String,
    /// Memory available to new allocations.
    pub available: String,
    /// Memory in use.
    pub used: String,
    /// Completely free memory.
    pub free: String,
    /// Used percentage (two decimals).
    pub percent: f64,
}

/// Swap usage.
#[derive(Debug, Clone)]
pub struct SwapSnapshot {
    /// Total swap.
    pub total: String,
    /// Swap in use.
    pub used: String,
    /// Free swap.
    pub free: String,
    /// Used percentage (two decimals).
    pub percent: f64,
}

/// One mounted file system.
#[derive(Debug, Clone)]
pub struct DiskSnapshot {
    /// Device name.
    pub device: String,
    /// File system type.
    pub fs_type: String,
    /// Mount point.
    pub mount_point: String,
    /// Total size.
    pub size: String,
    /// Used space.
    pub used: String,
    /// Free space.
    pub free: String,
    /// Used percentage (two decimals).
    pub percent: f64,
}

/// One temperature sensor.
#[derive(Debug, Clone)]
pub struct SensorReading {
    /// Sensor label as reported by the hardware.
    pub label: String,
    /// Degrees Celsius; absent when the sensor exposes no reading.
    pub degrees: Option<f32>,
}

/// Process counts bucketed by scheduler state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessCounts {
    /// Currently running.
    pub running: usize,
    /// Sleeping.
    pub sleeping: usize,
    /// Idle.
    pub idle: usize,
    /// Every process visible to the bot.
    pub total: usize,
}

/// Cumulative traffic counters for one interface.
#[derive(Debug, Clone)]
pub struct NetworkSnapshot {
    /// Interface name.
    pub interface: String,
    /// Bytes sent since boot, preformatted.
    pub bytes_sent: String,
    /// Bytes received since boot, preformatted.
    pub bytes_received: String,
    /// Packets sent.
    pub packets_sent: u64,
    /// Packets received.
    pub packets_received: u64,
    /// Receive-side errors.
    pub errors_in: u64,
    /// Transmit-side errors.
    pub errors_out: u64,
}

/// Resource usage of the bot process itself, for the health loop.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelfSnapshot {
    /// Host-wide CPU usage percentage.
    pub cpu_percent: f32,
    /// Resident set size of this process, bytes.
    pub rss_bytes: u64,
    /// Host memory usage percentage.
    pub memory_percent: f64,
}

/// Facade over the host metrics source.
///
/// The inner `System` is kept so CPU usage has a previous sample to diff
/// against; everything else is refreshed per call.
pub struct SystemFacade {
    system: Mutex<System>,
}

impl Default for SystemFacade {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemFacade {
    /// Create the facade with a primed `System`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new_all()),
        }
    }

    /// Load averages over 1/5/15 minutes.
    #[must_use]
    pub fn load_average(&self) -> LoadAverage {
        let load = System::load_average();
        LoadAverage {
            one: load.one,
            five: load.five,
            fifteen: load.fifteen,
        }
    }

    /// Virtual memory usage.
    #[must_use]
    pub fn memory(&self) -> MemorySnapshot {
        let mut system = self.lock_system();
        system.refresh_memory();
        MemorySnapshot {
            total: format_binary_size(system.total_memory()),
            available: format_binary_size(system.available_memory()),
            used: format_binary_size(system.used_memory()),
            free: format_binary_size(system.free_memory()),
            percent: percent_of(system.used_memory(), system.total_memory()),
        }
    }

    /// Swap usage, for the swap drill-down.
    #[must_use]
    pub fn swap(&self) -> SwapSnapshot {
        let mut system = self.lock_system();
        system.refresh_memory();
        SwapSnapshot {
            total: format_binary_size(system.total_swap()),
            used: format_binary_size(system.used_swap()),
            free: format_binary_size(system.free_swap()),
            percent: percent_of(system.used_swap(), system.total_swap()),
        }
    }

    /// Mounted file systems.
    #[must_use]
    pub fn disks(&self) -> Vec<DiskSnapshot> {
        let disks = Disks::new_with_refreshed_list();
        disks
            .iter()
            .map(|disk| {
                let total = disk.total_space();
                let available = disk.available_space();
                let used = total.saturating_sub(available);
                DiskSnapshot {
                    device: disk.name().to_string_lossy().into_owned(),
                    fs_type: disk.file_system().to_string_lossy().into_owned(),
                    mount_point: disk.mount_point().display().to_string(),
                    size: format_binary_size(total),
                    used: format_binary_size(used),
                    free: format_binary_size(available),
                    percent: percent_of(used, total),
                }
            })
            .collect()
    }

    /// Temperature sensors. Empty on hosts without exposed sensors.
    #[must_use]
    pub fn sensors(&self) -> Vec<SensorReading> {
        let components = Components::new_with_refreshed_list();
        let readings: Vec<SensorReading> = components
            .iter()
            .map(|component| SensorReading {
                label: component.label().to_owned(),
                degrees: component.temperature(),
            })
            .collect();
        if readings.is_empty() {
            debug!("no temperature sensors exposed by this host");
        }
        readings
    }

    /// Process counts bucketed by state.
    #[must_use]
    pub fn processes(&self) -> ProcessCounts {
        let mut system = self.lock_system();
        system.refresh_processes(ProcessesToUpdate::All, true);

        let mut counts = ProcessCounts::default();
        for process in system.processes().values() {
            match process.status() {
                ProcessStatus::Run => counts.running = counts.running.saturating_add(1),
                ProcessStatus::Sleep => counts.sleeping = counts.sleeping.saturating_add(1),
                ProcessStatus::Idle => counts.idle = counts.idle.saturating_add(1),
                _ => {}
            }
            counts.total = counts.total.saturating_add(1);
        }
        counts
    }

    /// Uptime as `N days, HH:MM:SS`.
    #[must_use]
    pub fn uptime(&self) -> String {
        format_uptime(System::uptime())
    }

    /// Cumulative per-interface traffic counters.
    ///
    /// The metrics source exposes no dropped-packet counters, so the screen
    /// reports bytes, packets and errors.
    #[must_use]
    pub fn network(&self) -> Vec<NetworkSnapshot> {
        let networks = Networks::new_with_refreshed_list();
        let mut snapshots: Vec<NetworkSnapshot> = networks
            .iter()
            .map(|(name, data)| NetworkSnapshot {
                interface: name.clone(),
                bytes_sent: format_binary_size(data.total_transmitted()),
                bytes_received: format_binary_size(data.total_received()),
                packets_sent: data.total_packets_transmitted(),
                packets_received: data.total_packets_received(),
                errors_in: data.total_errors_on_received(),
                errors_out: data.total_errors_on_transmitted(),
            })
            .collect();
        snapshots.sort_by(|a, b| a.interface.cmp(&b.interface));
        snapshots
    }

    /// CPU/RSS/memory snapshot of this process and host, for the health loop.
    #[must_use]
    pub fn self_snapshot(&self) -> SelfSnapshot {
        let mut system = self.lock_system();
        system.refresh_cpu_usage();
        system.refresh_memory();

        let rss_bytes = sysinfo::get_current_pid()
            .ok()
            .and_then(|pid| {
                system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
                system.process(pid).map(sysinfo::Process::memory)
            })
            .unwrap_or(0);

        SelfSnapshot {
            cpu_percent: system.global_cpu_usage(),
            rss_bytes,
            memory_percent: percent_of(system.used_memory(), system.total_memory()),
        }
    }

    fn lock_system(&self) -> std::sync::MutexGuard<'_, System> {
        self.system
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SystemFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemFacade").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_snapshot_is_consistent() {
        let facade = SystemFacade::new();
        let memory = facade.memory();
        assert!(!memory.total.is_empty());
        assert!((0.0..=100.0).contains(&memory.percent));
    }

    #[test]
    fn load_average_has_three_figures() {
        let facade = SystemFacade::new();
        let load = facade.load_average();
        assert!(load.one >= 0.0 && load.five >= 0.0 && load.fifteen >= 0.0);
    }

    #[test]
    fn process_counts_total_covers_buckets() {
        let facade = SystemFacade::new();
        let counts = facade.processes();
        assert!(counts.total >= counts.running + counts.sleeping + counts.idle);
        assert!(counts.total > 0);
    }

    #[test]
    fn uptime_renders() {
        let facade = SystemFacade::new();
        let uptime = facade.uptime();
        assert!(uptime.contains(':'));
    }

    #[test]
    fn self_snapshot_has_rss() {
        let facade = SystemFacade::new();
        let snapshot = facade.self_snapshot();
        assert!(snapshot.rss_bytes > 0);
        assert!((0.0..=100.0).contains(&snapshot.memory_percent));
    }
}
