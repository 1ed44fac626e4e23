//! Scoped acquisition of the engine client.
//!
//! The facade never keeps a connected client across requests: each public
//! operation acquires one here, uses it, and lets it drop on every exit
//! path. `bollard` clients are cheap handles over a connection pool, so the
//! per-request acquisition buys leak-freedom without a measurable cost.

use bollard::Docker;
use tracing::debug;

use crate::error::{DockerError, DockerResult};

/// Seconds before an engine request is abandoned.
const ENGINE_TIMEOUT_SECS: u64 = 10;

/// Factory for per-request engine clients.
#[derive(Debug, Clone)]
pub(crate) struct EngineConnector {
    host: String,
}

impl EngineConnector {
    pub(crate) fn new(host: &str) -> Self {
        Self {
            host: host.to_owned(),
        }
    }

    /// Acquire a client for one request.
    pub(crate) fn acquire(&self) -> DockerResult<Docker> {
        let result = if let Some(path) = self.host.strip_prefix("unix://") {
            Docker::connect_with_unix(path, ENGINE_TIMEOUT_SECS, bollard::API_DEFAULT_VERSION)
        } else if self.host.starts_with("tcp://")
            || self.host.starts_with("http://")
            || self.host.starts_with("https://")
        {
            Docker::connect_with_http(&self.host, ENGINE_TIMEOUT_SECS, bollard::API_DEFAULT_VERSION)
        } else {
            Docker::connect_with_local_defaults()
        };

        result.map_err(|e| DockerError::Connect {
            host: self.host.clone(),
            message: e.to_string(),
        })
    }

    /// Acquire and ping, confirming the engine is reachable.
    pub(crate) async fn acquire_checked(&self) -> DockerResult<Docker> {
        let docker = self.acquire()?;
        docker.ping().await.map_err(|e| {
            debug!(host = %self.host, "engine ping failed");
            DockerError::Connect {
                host: self.host.clone(),
                message: e.to_string(),
            }
        })?;
        Ok(docker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unix_prefix_is_accepted() {
        // Connector construction never touches the socket; only requests do.
        let connector = EngineConnector::new("unix:///var/run/docker.sock");
        assert!(connector.acquire().is_ok());
    }

    #[test]
    fn http_endpoint_is_accepted() {
        let connector = EngineConnector::new("tcp://127.0.0.1:2375");
        assert!(connector.acquire().is_ok());
    }
}
