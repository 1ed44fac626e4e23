//! The container facade.

use std::collections::HashSet;
use std::time::Duration;

use bollard::Docker;
use bollard::container::{
    InspectContainerOptions, ListContainersOptions, LogsOptions, RenameContainerOptions,
    RestartContainerOptions, StartContainerOptions, StatsOptions, StopContainerOptions,
};
use bollard::image::ListImagesOptions;
use bollard::models::ContainerInspectResponse;
use bosun_core::units::{format_binary_size, format_relative, percent_of};
use bosun_core::{CallerIdentity, Redactor, UserId};
use chrono::{DateTime, Utc};
use futures::StreamExt;
use tracing::{error, info, warn};

use crate::client::EngineConnector;
use crate::error::{DockerError, DockerResult};
use crate::types::{
    ContainerAction, ContainerAttrs, ContainerFullStats, ContainerSummary, CpuStats, DockerCounters,
    ImageRecord, MemoryStats, NetworkStats,
};

/// Parallel inspect fan-out width for listings.
const INSPECT_POOL: usize = 8;

/// Log tail length requested from the engine.
const LOG_TAIL_LINES: &str = "50";

/// Returned log text is cut to this many trailing characters.
const LOG_MAX_CHARS: usize = 3_800;

/// Restart success is polled this many times...
const RESTART_POLL_ATTEMPTS: u32 = 3;

/// ...at this interval.
const RESTART_POLL_INTERVAL: Duration = Duration::from_millis(1_500);

/// Bounds on a rename target.
const NAME_MAX_LEN: usize = 64;

/// Safe facade over the container engine.
#[derive(Debug, Clone)]
pub struct DockerFacade {
    connector: EngineConnector,
    admins: HashSet<u64>,
    sessions: bosun_session::SessionStore,
    redactor: Redactor,
}

impl DockerFacade {
    /// Build the facade.
    ///
    /// `admins` is the mutating-action allow-list; `sessions` supplies the
    /// authenticated check; `redactor` scrubs engine output and errors.
    #[must_use]
    pub fn new(
        host: &str,
        admins: HashSet<u64>,
        sessions: bosun_session::SessionStore,
        redactor: Redactor,
    ) -> Self {
        Self {
            connector: EngineConnector::new(host),
            admins,
            sessions,
            redactor,
        }
    }

    /// Whether the engine answers a ping.
    pub async fn is_available(&self) -> bool {
        self.connector.acquire_checked().await.is_ok()
    }

    /// Summaries of all containers, running or not.
    ///
    /// Inspects run in a bounded parallel pool; a container that fails to
    /// inspect is logged and skipped rather than failing the listing.
    ///
    /// # Errors
    ///
    /// Returns a [`DockerError`] when the engine is unreachable or the
    /// listing call itself fails.
    pub async fn list_containers(&self) -> DockerResult<Vec<ContainerSummary>> {
        let docker = self.connector.acquire_checked().await?;
        let listed = docker
            .list_containers(Some(ListContainersOptions::<String> {
                all: true,
                ..Default::default()
            }))
            .await
            .map_err(|e| self.api_error(&e))?;

        let ids: Vec<String> = listed.into_iter().filter_map(|c| c.id).collect();

        let mut summaries: Vec<ContainerSummary> = futures::stream::iter(ids)
            .map(|id| {
                let docker = docker.clone();
                async move {
                    match docker
                        .inspect_container(&id, None::<InspectContainerOptions>)
                        .await
                    {
                        Ok(inspect) => Some(summary_from_inspect(&id, &inspect, Utc::now())),
                        Err(e) => {
                            warn!(container = %id, error = %e, "inspect failed, container skipped");
                            None
                        },
                    }
                }
            })
            .buffer_unordered(INSPECT_POOL)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .flatten()
            .collect();

        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(summaries)
    }

    /// One-shot full stats for a container.
    ///
    /// # Errors
    ///
    /// Returns [`DockerError::NotFound`] for an unknown container and a
    /// typed engine error otherwise.
    pub async fn container_stats(&self, container: &str) -> DockerResult<ContainerFullStats> {
        let docker = self.connector.acquire()?;

        let inspect = docker
            .inspect_container(container, None::<InspectContainerOptions>)
            .await
            .map_err(|e| self.engine_error(container, &e))?;

        let mut stream = docker.stats(
            container,
            Some(StatsOptions {
                stream: false,
                one_shot: true,
            }),
        );
        let stats = match stream.next().await {
            Some(Ok(stats)) => stats,
            Some(Err(e)) => return Err(self.engine_error(container, &e)),
            None => {
                return Err(DockerError::Api {
                    message: "engine returned no stats sample".to_owned(),
                });
            },
        };

        Ok(ContainerFullStats {
            memory: memory_from_stats(&stats),
            cpu: cpu_from_stats(&stats),
            network: network_from_stats(&stats),
            attrs: attrs_from_inspect(&inspect),
        })
    }

    /// Tail of a container's stdout+stderr, sanitised for the given caller.
    ///
    /// # Errors
    ///
    /// Returns [`DockerError::NotFound`] for an unknown container and a
    /// typed engine error otherwise.
    pub async fn fetch_logs(&self, container: &str, caller: &CallerIdentity) -> DockerResult<String> {
        let docker = self.connector.acquire()?;

        let mut stream = docker.logs(
            container,
            Some(LogsOptions::<String> {
                stdout: true,
                stderr: true,
                tail: LOG_TAIL_LINES.to_owned(),
                ..Default::default()
            }),
        );

        let mut raw = Vec::new();
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(output) => raw.extend_from_slice(&output.into_bytes()),
                Err(e) => return Err(self.engine_error(container, &e)),
            }
        }

        let text = String::from_utf8_lossy(&raw);
        let tail = tail_chars(&text, LOG_MAX_CHARS);
        Ok(self.redactor.scrub_container_logs(&tail, caller))
    }

    /// Records for every image the engine knows.
    ///
    /// # Errors
    ///
    /// Returns a typed engine error when the listing fails; individual
    /// inspect failures are logged and degrade that record to summary data.
    pub async fn list_images(&self) -> DockerResult<Vec<ImageRecord>> {
        let docker = self.connector.acquire_checked().await?;
        let listed = docker
            .list_images(Some(ListImagesOptions::<String> {
                all: true,
                ..Default::default()
            }))
            .await
            .map_err(|e| self.api_error(&e))?;

        let records: Vec<ImageRecord> = futures::stream::iter(listed)
            .map(|summary| {
                let docker = docker.clone();
                async move {
                    let mut record = ImageRecord {
                        short_id: short_image_id(&summary.id),
                        name: summary
                            .repo_tags
                            .first()
                            .cloned()
                            .unwrap_or_else(|| "<none>".to_owned()),
                        tags: summary.repo_tags.clone(),
                        size: format_binary_size(u64::try_from(summary.size).unwrap_or(0)),
                        created: format_relative(
                            Utc::now().timestamp().saturating_sub(summary.created),
                        ),
                        labels: summary
                            .labels
                            .iter()
                            .map(|(k, v)| format!("{k}={v}"))
                            .collect(),
                        ..Default::default()
                    };

                    match docker.inspect_image(&summary.id).await {
                        Ok(inspect) => {
                            record.architecture = inspect.architecture.unwrap_or_default();
                            record.os = inspect.os.unwrap_or_default();
                            record.author = inspect.author.unwrap_or_default();
                            if let Some(config) = inspect.config {
                                record.env = config.env.unwrap_or_default();
                                record.cmd = config.cmd.unwrap_or_default();
                                record.entrypoint = config.entrypoint.unwrap_or_default();
                                record.exposed_ports = config
                                    .exposed_ports
                                    .map(|ports| ports.into_keys().collect())
                                    .unwrap_or_default();
                            }
                        },
                        Err(e) => {
                            warn!(image = %record.short_id, error = %e, "image inspect failed");
                        },
                    }
                    record
                }
            })
            .buffer_unordered(INSPECT_POOL)
            .collect()
            .await;

        Ok(records)
    }

    /// Image and running-container counts for the overview screen.
    ///
    /// # Errors
    ///
    /// Returns a typed engine error when either listing fails.
    pub async fn docker_counters(&self) -> DockerResult<DockerCounters> {
        let docker = self.connector.acquire_checked().await?;
        let images = docker
            .list_images(None::<ListImagesOptions<String>>)
            .await
            .map_err(|e| self.api_error(&e))?;
        let containers = docker
            .list_containers(None::<ListContainersOptions<String>>)
            .await
            .map_err(|e| self.api_error(&e))?;
        Ok(DockerCounters {
            images_count: images.len(),
            containers_count: containers.len(),
        })
    }

    /// Apply a mutating action to a container.
    ///
    /// Every invocation first checks that the caller is an admin **and**
    /// holds a live authenticated session; a failed check never reaches the
    /// engine and leaves a `DENIED` log line.
    ///
    /// # Errors
    ///
    /// Returns [`DockerError::PermissionDenied`] on a failed gate,
    /// [`DockerError::InvalidRename`] for a bad rename target, and typed
    /// engine errors otherwise.
    pub async fn manage(
        &self,
        user: UserId,
        container: &str,
        action: ContainerAction,
        new_name: Option<&str>,
    ) -> DockerResult<()> {
        self.authorize(user, action).await?;

        let docker = self.connector.acquire()?;
        match action {
            ContainerAction::Start => docker
                .start_container(container, None::<StartContainerOptions<String>>)
                .await
                .map_err(|e| self.engine_error(container, &e))?,
            ContainerAction::Stop => docker
                .stop_container(container, None::<StopContainerOptions>)
                .await
                .map_err(|e| self.engine_error(container, &e))?,
            ContainerAction::Restart => {
                docker
                    .restart_container(container, None::<RestartContainerOptions>)
                    .await
                    .map_err(|e| self.engine_error(container, &e))?;
                self.await_running(&docker, container).await?;
            },
            ContainerAction::Rename => {
                let name = validate_new_name(new_name)?;
                docker
                    .rename_container(container, RenameContainerOptions { name })
                    .await
                    .map_err(|e| self.engine_error(container, &e))?;
            },
        }

        info!(user_id = %user, container, action = %action, "container action applied");
        Ok(())
    }

    /// The admin + authenticated gate for mutating actions.
    async fn authorize(&self, user: UserId, action: ContainerAction) -> DockerResult<()> {
        let is_admin = self.admins.contains(&user.get());
        let is_authenticated = is_admin && self.sessions.is_authenticated(user).await;

        if !is_admin || !is_authenticated {
            error!(
                user_id = %user,
                action = %action,
                is_admin,
                "DENIED: unauthorised container mutation attempt"
            );
            return Err(DockerError::PermissionDenied {
                user_id: user.get(),
                action: action.as_str(),
            });
        }
        Ok(())
    }

    /// Poll a restarted container until it reports `running`.
    async fn await_running(&self, docker: &Docker, container: &str) -> DockerResult<()> {
        for attempt in 1..=RESTART_POLL_ATTEMPTS {
            tokio::time::sleep(RESTART_POLL_INTERVAL).await;
            let inspect = docker
                .inspect_container(container, None::<InspectContainerOptions>)
                .await
                .map_err(|e| self.engine_error(container, &e))?;
            let running = inspect
                .state
                .as_ref()
                .and_then(|s| s.running)
                .unwrap_or(false);
            if running {
                info!(container, attempt, "container reached running state after restart");
                return Ok(());
            }
        }
        Err(DockerError::RestartTimeout {
            container: container.to_owned(),
        })
    }

    fn engine_error(&self, container: &str, err: &bollard::errors::Error) -> DockerError {
        let mapped = DockerError::from_engine(container, err);
        if let DockerError::Api { message } = &mapped {
            error!(
                container,
                error = %self.redactor.scrub_error(message),
                "engine operation failed"
            );
        }
        mapped
    }

    fn api_error(&self, err: &bollard::errors::Error) -> DockerError {
        let message = self.redactor.scrub_error(&err.to_string());
        error!(error = %message, "engine request failed");
        DockerError::Api { message }
    }
}

/// Last `max` characters of `text`.
fn tail_chars(text: &str, max: usize) -> String {
    let count = text.chars().count();
    if count <= max {
        return text.to_owned();
    }
    text.chars().skip(count.saturating_sub(max)).collect()
}

/// Validate a rename target: 1..=64 characters, not whitespace-only.
fn validate_new_name(new_name: Option<&str>) -> DockerResult<&str> {
    let name = new_name.ok_or_else(|| DockerError::InvalidRename {
        reason: "no new name given".to_owned(),
    })?;
    if name.trim().is_empty() {
        return Err(DockerError::InvalidRename {
            reason: "name is empty or whitespace-only".to_owned(),
        });
    }
    if name.len() > NAME_MAX_LEN {
        return Err(DockerError::InvalidRename {
            reason: format!("name exceeds {NAME_MAX_LEN} characters"),
        });
    }
    Ok(name)
}

/// `sha256:abcdef…` → first 12 hex characters.
fn short_image_id(id: &str) -> String {
    let bare = id.strip_prefix("sha256:").unwrap_or(id);
    bare.chars().take(12).collect()
}

/// Title-case a container name the way the original screens render it.
fn title_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut at_word_start = true;
    for c in name.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.push(c);
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

fn summary_from_inspect(
    id: &str,
    inspect: &ContainerInspectResponse,
    now: DateTime<Utc>,
) -> ContainerSummary {
    let name = inspect
        .name
        .as_deref()
        .map(|n| title_case(n.trim_start_matches('/')))
        .unwrap_or_else(|| id.to_owned());

    let created = inspect
        .created
        .as_deref()
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|dt| dt.format("%Y-%m-%d, %H:%M:%S").to_string())
        .unwrap_or_else(|| "N/A".to_owned());

    let run_at = inspect
        .state
        .as_ref()
        .and_then(|s| s.started_at.as_deref())
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|dt| format_relative(now.signed_duration_since(dt.with_timezone(&Utc)).num_seconds()))
        .unwrap_or_else(|| "N/A".to_owned());

    let status = inspect
        .state
        .as_ref()
        .and_then(|s| s.status)
        .map_or_else(|| "N/A".to_owned(), |s| s.to_string());

    ContainerSummary {
        short_id: id.chars().take(12).collect(),
        name,
        image: inspect
            .config
            .as_ref()
            .and_then(|c| c.image.clone())
            .unwrap_or_else(|| "N/A".to_owned()),
        created,
        run_at,
        status,
    }
}

fn memory_from_stats(stats: &bollard::container::Stats) -> MemoryStats {
    let usage = stats.memory_stats.usage.unwrap_or(0);
    let limit = stats.memory_stats.limit.unwrap_or(0);
    MemoryStats {
        usage: format_binary_size(usage),
        limit: format_binary_size(limit),
        percent: percent_of(usage, limit),
    }
}

fn cpu_from_stats(stats: &bollard::container::Stats) -> CpuStats {
    let throttling = &stats.precpu_stats.throttling_data;
    CpuStats {
        periods: throttling.periods,
        throttled_periods: throttling.throttled_periods,
        throttled_time: throttling.throttled_time,
    }
}

fn network_from_stats(stats: &bollard::container::Stats) -> NetworkStats {
    // Only the primary interface is shown; eth0 when present.
    let primary = stats.networks.as_ref().and_then(|n| n.get("eth0"));
    primary.map_or_else(NetworkStats::default, |net| NetworkStats {
        rx_bytes: format_binary_size(net.rx_bytes),
        tx_bytes: format_binary_size(net.tx_bytes),
        rx_dropped: net.rx_dropped,
        tx_dropped: net.tx_dropped,
        rx_errors: net.rx_errors,
        tx_errors: net.tx_errors,
    })
}

fn attrs_from_inspect(inspect: &ContainerInspectResponse) -> ContainerAttrs {
    let state = inspect.state.as_ref();
    let config = inspect.config.as_ref();
    ContainerAttrs {
        running: state.and_then(|s| s.running).unwrap_or(false),
        paused: state.and_then(|s| s.paused).unwrap_or(false),
        restarting: state.and_then(|s| s.restarting).unwrap_or(false),
        restart_count: inspect.restart_count.unwrap_or(0),
        dead: state.and_then(|s| s.dead).unwrap_or(false),
        exit_code: state.and_then(|s| s.exit_code),
        env: config.and_then(|c| c.env.clone()).unwrap_or_default(),
        cmd: config.and_then(|c| c.cmd.clone()).unwrap_or_default(),
        args: inspect.args.clone().unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn facade_with(admins: &[u64]) -> (DockerFacade, bosun_session::SessionStore) {
        let sessions = bosun_session::SessionStore::new();
        let facade = DockerFacade::new(
            "unix:///var/run/docker.sock",
            admins.iter().copied().collect(),
            sessions.clone(),
            Redactor::default(),
        );
        (facade, sessions)
    }

    // --- gate ---

    #[tokio::test]
    async fn non_admin_is_denied_before_the_engine() {
        let (facade, _sessions) = facade_with(&[1]);
        let err = facade
            .manage(UserId(2), "web", ContainerAction::Start, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DockerError::PermissionDenied { user_id: 2, .. }));
    }

    #[tokio::test]
    async fn unauthenticated_admin_is_denied() {
        let (facade, _sessions) = facade_with(&[1]);
        let err = facade
            .manage(UserId(1), "web", ContainerAction::Stop, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DockerError::PermissionDenied { .. }));
    }

    #[tokio::test]
    async fn authenticated_admin_passes_the_gate() {
        let (facade, sessions) = facade_with(&[1]);
        sessions.mark_authenticated(UserId(1)).await;

        // The gate passes; whatever happens next is an engine-side error,
        // never a permission one.
        let err = facade
            .manage(UserId(1), "definitely-not-present", ContainerAction::Start, None)
            .await
            .unwrap_err();
        assert!(!matches!(err, DockerError::PermissionDenied { .. }));
    }

    #[tokio::test]
    async fn rename_validation_runs_after_the_gate() {
        let (facade, sessions) = facade_with(&[1]);
        sessions.mark_authenticated(UserId(1)).await;

        let err = facade
            .manage(UserId(1), "web", ContainerAction::Rename, Some("   "))
            .await
            .unwrap_err();
        assert!(matches!(err, DockerError::InvalidRename { .. }));
    }

    // --- pure helpers ---

    #[test]
    fn rename_target_bounds() {
        assert!(validate_new_name(None).is_err());
        assert!(validate_new_name(Some("")).is_err());
        assert!(validate_new_name(Some("  \t ")).is_err());
        assert!(validate_new_name(Some(&"x".repeat(65))).is_err());
        assert_eq!(validate_new_name(Some("web-2")).unwrap(), "web-2");
        assert!(validate_new_name(Some(&"x".repeat(64))).is_ok());
    }

    #[test]
    fn title_case_matches_display_style() {
        assert_eq!(title_case("nginx"), "Nginx");
        assert_eq!(title_case("nginx-proxy"), "Nginx-Proxy");
        assert_eq!(title_case("db_main"), "Db_Main");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn tail_chars_keeps_the_end() {
        assert_eq!(tail_chars("abcdef", 3), "def");
        assert_eq!(tail_chars("abc", 10), "abc");
        // Multi-byte input is cut on character boundaries.
        assert_eq!(tail_chars("ηλεκτρον", 4), "τρον");
    }

    #[test]
    fn short_image_id_strips_digest_prefix() {
        assert_eq!(
            short_image_id("sha256:0123456789abcdef0123456789abcdef"),
            "0123456789ab"
        );
        assert_eq!(short_image_id("abcd"), "abcd");
    }

    #[test]
    fn summary_parses_engine_timestamps() {
        let inspect: ContainerInspectResponse = serde_json::from_value(serde_json::json!({
            "Name": "/nginx-proxy",
            "Created": "2024-05-01T10:20:30.000000000Z",
            "State": {
                "Status": "running",
                "Running": true,
                "StartedAt": "2024-05-02T10:20:30.000000000Z"
            },
            "Config": { "Image": "nginx:latest" }
        }))
        .unwrap();

        let now = Utc.with_ymd_and_hms(2024, 5, 4, 10, 20, 30).unwrap();
        let summary = summary_from_inspect("0123456789abcdef", &inspect, now);

        assert_eq!(summary.short_id, "0123456789ab");
        assert_eq!(summary.name, "Nginx-Proxy");
        assert_eq!(summary.image, "nginx:latest");
        assert_eq!(summary.created, "2024-05-01, 10:20:30");
        assert_eq!(summary.run_at, "2 days ago");
        assert_eq!(summary.status, "running");
    }

    #[test]
    fn summary_defaults_missing_fields() {
        let inspect: ContainerInspectResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        let summary = summary_from_inspect("deadbeef", &inspect, Utc::now());
        assert_eq!(summary.name, "deadbeef");
        assert_eq!(summary.image, "N/A");
        assert_eq!(summary.created, "N/A");
        assert_eq!(summary.run_at, "N/A");
        assert_eq!(summary.status, "N/A");
    }

    #[test]
    fn stats_blocks_parse_from_engine_payload() {
        let stats: bollard::container::Stats = serde_json::from_value(serde_json::json!({
            "read": "2024-05-01T00:00:00Z",
            "preread": "2024-05-01T00:00:00Z",
            "pids_stats": {},
            "blkio_stats": {},
            "num_procs": 0,
            "storage_stats": {},
            "cpu_stats": {
                "cpu_usage": { "total_usage": 0, "usage_in_kernelmode": 0, "usage_in_usermode": 0 },
                "throttling_data": { "periods": 0, "throttled_periods": 0, "throttled_time": 0 }
            },
            "precpu_stats": {
                "cpu_usage": { "total_usage": 0, "usage_in_kernelmode": 0, "usage_in_usermode": 0 },
                "throttling_data": { "periods": 100, "throttled_periods": 7, "throttled_time": 12345 }
            },
            "memory_stats": { "usage": 536870912u64, "limit": 1073741824u64 },
            "name": "/nginx",
            "id": "deadbeef",
            "networks": {
                "eth0": {
                    "rx_bytes": 1024, "tx_bytes": 2048,
                    "rx_dropped": 1, "tx_dropped": 2,
                    "rx_errors": 3, "tx_errors": 4,
                    "rx_packets": 10, "tx_packets": 20
                }
            }
        }))
        .unwrap();

        let memory = memory_from_stats(&stats);
        assert_eq!(memory.usage, "512.0 MiB");
        assert_eq!(memory.limit, "1.0 GiB");
        assert!((memory.percent - 50.0).abs() < f64::EPSILON);

        let cpu = cpu_from_stats(&stats);
        assert_eq!(cpu.periods, 100);
        assert_eq!(cpu.throttled_periods, 7);

        let network = network_from_stats(&stats);
        assert_eq!(network.rx_bytes, "1.0 KiB");
        assert_eq!(network.tx_dropped, 2);
        assert_eq!(network.tx_errors, 4);
    }

    #[test]
    fn missing_network_block_defaults_to_zero() {
        let stats: bollard::container::Stats = serde_json::from_value(serde_json::json!({
            "read": "2024-05-01T00:00:00Z",
            "preread": "2024-05-01T00:00:00Z",
            "pids_stats": {},
            "blkio_stats": {},
            "num_procs": 0,
            "storage_stats": {},
            "cpu_stats": {
                "cpu_usage": { "total_usage": 0, "usage_in_kernelmode": 0, "usage_in_usermode": 0 },
                "throttling_data": { "periods": 0, "throttled_periods": 0, "throttled_time": 0 }
            },
            "precpu_stats": {
                "cpu_usage": { "total_usage": 0, "usage_in_kernelmode": 0, "usage_in_usermode": 0 },
                "throttling_data": { "periods": 0, "throttled_periods": 0, "throttled_time": 0 }
            },
            "memory_stats": {},
            "name": "/nginx",
            "id": "deadbeef"
        }))
        .unwrap();

        let memory = memory_from_stats(&stats);
        assert!((memory.percent - 0.0).abs() < f64::EPSILON);

        let network = network_from_stats(&stats);
        assert_eq!(network, NetworkStats::default());
    }

    #[test]
    fn attrs_parse_state_and_config() {
        let inspect: ContainerInspectResponse = serde_json::from_value(serde_json::json!({
            "State": {
                "Running": true,
                "Paused": false,
                "Restarting": false,
                "Dead": false,
                "ExitCode": 0
            },
            "RestartCount": 3,
            "Args": ["--flag"],
            "Config": {
                "Env": ["A=1"],
                "Cmd": ["nginx", "-g", "daemon off;"]
            }
        }))
        .unwrap();

        let attrs = attrs_from_inspect(&inspect);
        assert!(attrs.running);
        assert_eq!(attrs.restart_count, 3);
        assert_eq!(attrs.exit_code, Some(0));
        assert_eq!(attrs.env, vec!["A=1"]);
        assert_eq!(attrs.cmd.len(), 3);
        assert_eq!(attrs.args, vec!["--flag"]);
    }
}
