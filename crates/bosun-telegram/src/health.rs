//! Runtime health: in-process flags, the background loop and the snapshot
//! file read by `--health_check`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use bosun_system::SystemFacade;

use crate::error::{BotError, BotResult};

/// How often the health loop wakes.
pub const HEALTH_INTERVAL: Duration = Duration::from_secs(60);

/// CPU warning threshold, percent.
const CPU_WARN_PERCENT: f32 = 90.0;

/// Memory warning threshold, percent.
const MEMORY_WARN_PERCENT: f64 = 80.0;

/// In-process health flags.
#[derive(Debug)]
pub struct HealthState {
    started_at: Instant,
    ingress_running: AtomicBool,
    updates_handled: AtomicU64,
    last_update: std::sync::Mutex<Option<Instant>>,
    fatal: std::sync::Mutex<Option<String>>,
    snapshot_path: PathBuf,
}

/// What the health loop persists for the out-of-process check.
#[derive(Debug, Serialize, Deserialize)]
struct HealthSnapshot {
    healthy: bool,
    checked_at: u64,
    uptime_secs: u64,
    updates_handled: u64,
    cpu_percent: f32,
    rss_bytes: u64,
    memory_percent: f64,
}

/// Result of the out-of-process health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthVerdict {
    /// Fresh snapshot, healthy.
    Healthy,
    /// Fresh snapshot, unhealthy.
    Unhealthy,
    /// Snapshot missing, unreadable or stale.
    Unknown,
}

impl HealthState {
    /// Create the flags with the given snapshot path.
    #[must_use]
    pub fn new(snapshot_path: PathBuf) -> Self {
        Self {
            started_at: Instant::now(),
            ingress_running: AtomicBool::new(false),
            updates_handled: AtomicU64::new(0),
            last_update: std::sync::Mutex::new(None),
            fatal: std::sync::Mutex::new(None),
            snapshot_path,
        }
    }

    /// Where the snapshot lives by default.
    #[must_use]
    pub fn default_snapshot_path() -> PathBuf {
        std::env::temp_dir().join("bosun-health.json")
    }

    /// Mark the ingress loop up or down.
    pub fn set_ingress_running(&self, running: bool) {
        self.ingress_running.store(running, Ordering::Relaxed);
    }

    /// Record one handled update.
    pub fn record_update(&self) {
        self.updates_handled.fetch_add(1, Ordering::Relaxed);
        *self.lock_last_update() = Some(Instant::now());
    }

    /// Record an unrecoverable failure; the runtime stays up for diagnosis
    /// but reports unhealthy from here on.
    pub fn record_fatal(&self, reason: &str) {
        warn!(reason, "fatal error recorded");
        *self
            .fatal
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(reason.to_owned());
    }

    /// Updates handled so far.
    #[must_use]
    pub fn updates_handled(&self) -> u64 {
        self.updates_handled.load(Ordering::Relaxed)
    }

    /// The health predicate: ingress up, updates flowing (or none received
    /// yet), no fatal error.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        if !self.ingress_running.load(Ordering::Relaxed) {
            return false;
        }
        if self
            .fatal
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .is_some()
        {
            return false;
        }
        let last = *self.lock_last_update();
        match last {
            None => true,
            Some(at) => at.elapsed() < HEALTH_INTERVAL.saturating_mul(2),
        }
    }

    /// Write the snapshot file for the out-of-process check.
    ///
    /// # Errors
    ///
    /// Returns [`BotError::Health`] when the file cannot be written.
    pub fn write_snapshot(&self, system: &SystemFacade) -> BotResult<bool> {
        let healthy = self.is_healthy();
        let resources = system.self_snapshot();
        let snapshot = HealthSnapshot {
            healthy,
            checked_at: unix_now(),
            uptime_secs: self.started_at.elapsed().as_secs(),
            updates_handled: self.updates_handled(),
            cpu_percent: resources.cpu_percent,
            rss_bytes: resources.rss_bytes,
            memory_percent: resources.memory_percent,
        };
        let body = serde_json::to_string(&snapshot)
            .map_err(|e| BotError::Health(e.to_string()))?;
        std::fs::write(&self.snapshot_path, body).map_err(|e| BotError::Health(e.to_string()))?;

        info!(
            healthy,
            cpu_percent = resources.cpu_percent,
            rss_bytes = resources.rss_bytes,
            memory_percent = resources.memory_percent,
            updates = snapshot.updates_handled,
            "health tick"
        );
        if resources.cpu_percent > CPU_WARN_PERCENT {
            warn!(cpu_percent = resources.cpu_percent, "host CPU usage is high");
        }
        if resources.memory_percent > MEMORY_WARN_PERCENT {
            warn!(memory_percent = resources.memory_percent, "host memory usage is high");
        }
        Ok(healthy)
    }

    fn lock_last_update(&self) -> std::sync::MutexGuard<'_, Option<Instant>> {
        self.last_update
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Read the snapshot file and classify it for the CLI check.
#[must_use]
pub fn check_snapshot(path: &Path) -> HealthVerdict {
    let Ok(body) = std::fs::read_to_string(path) else {
        return HealthVerdict::Unknown;
    };
    let Ok(snapshot) = serde_json::from_str::<HealthSnapshot>(&body) else {
        return HealthVerdict::Unknown;
    };

    let age = unix_now().saturating_sub(snapshot.checked_at);
    if age > HEALTH_INTERVAL.saturating_mul(2).as_secs() {
        return HealthVerdict::Unknown;
    }
    if snapshot.healthy {
        HealthVerdict::Healthy
    } else {
        HealthVerdict::Unhealthy
    }
}

/// Spawn the health loop: wake every [`HEALTH_INTERVAL`], evaluate and
/// persist. The task ends when `cancel` fires; it must never block shutdown.
pub fn spawn_health_loop(
    health: Arc<HealthState>,
    system: Arc<SystemFacade>,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(HEALTH_INTERVAL);
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = health.write_snapshot(&system) {
                        warn!(error = %e, "health snapshot write failed");
                    }
                },
            }
        }
    })
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_at(dir: &tempfile::TempDir) -> HealthState {
        HealthState::new(dir.path().join("health.json"))
    }

    #[test]
    fn fresh_state_without_ingress_is_unhealthy() {
        let dir = tempfile::tempdir().unwrap();
        let health = state_at(&dir);
        assert!(!health.is_healthy());
    }

    #[test]
    fn running_ingress_with_no_updates_is_healthy() {
        let dir = tempfile::tempdir().unwrap();
        let health = state_at(&dir);
        health.set_ingress_running(true);
        assert!(health.is_healthy());
    }

    #[test]
    fn recent_update_keeps_healthy() {
        let dir = tempfile::tempdir().unwrap();
        let health = state_at(&dir);
        health.set_ingress_running(true);
        health.record_update();
        assert!(health.is_healthy());
        assert_eq!(health.updates_handled(), 1);
    }

    #[test]
    fn fatal_error_flips_unhealthy() {
        let dir = tempfile::tempdir().unwrap();
        let health = state_at(&dir);
        health.set_ingress_running(true);
        health.record_fatal("boom");
        assert!(!health.is_healthy());
    }

    #[test]
    fn snapshot_roundtrip_classifies() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("health.json");
        let health = HealthState::new(path.clone());
        health.set_ingress_running(true);

        let system = SystemFacade::new();
        assert!(health.write_snapshot(&system).unwrap());
        assert_eq!(check_snapshot(&path), HealthVerdict::Healthy);
    }

    #[test]
    fn unhealthy_snapshot_classifies() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("health.json");
        let health = HealthState::new(path.clone());
        // Ingress never started: unhealthy but fresh.
        let system = SystemFacade::new();
        assert!(!health.write_snapshot(&system).unwrap());
        assert_eq!(check_snapshot(&path), HealthVerdict::Unhealthy);
    }

    #[test]
    fn missing_snapshot_is_unknown() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            check_snapshot(&dir.path().join("nope.json")),
            HealthVerdict::Unknown
        );
    }

    #[test]
    fn stale_snapshot_is_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("health.json");
        let stale = HealthSnapshot {
            healthy: true,
            checked_at: unix_now().saturating_sub(10_000),
            uptime_secs: 1,
            updates_handled: 0,
            cpu_percent: 0.0,
            rss_bytes: 0,
            memory_percent: 0.0,
        };
        std::fs::write(&path, serde_json::to_string(&stale).unwrap()).unwrap();
        assert_eq!(check_snapshot(&path), HealthVerdict::Unknown);
    }

    #[test]
    fn garbage_snapshot_is_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("health.json");
        std::fs::write(&path, "not json").unwrap();
        assert_eq!(check_snapshot(&path), HealthVerdict::Unknown);
    }
}
