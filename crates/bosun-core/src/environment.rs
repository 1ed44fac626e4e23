//! Host-environment detection.

use std::path::Path;

/// Whether this process itself appears to run inside a container.
///
/// Checks the conventional `/.dockerenv` marker first and falls back to
/// scanning `/proc/1/cgroup` for container runtime paths. Used by the
/// plugin manager to skip plugins that require the host machine.
#[must_use]
pub fn running_in_container() -> bool {
    if Path::new("/.dockerenv").exists() || Path::new("/run/.containerenv").exists() {
        return true;
    }

    match std::fs::read_to_string("/proc/1/cgroup") {
        Ok(cgroups) => cgroups
            .lines()
            .any(|line| line.contains("/docker/") || line.contains("/podman/") || line.contains("/lxc/")),
        Err(_) => false,
    }
}
