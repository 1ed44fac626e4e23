//! Container facade error types.

use thiserror::Error;

/// Result alias for container operations.
pub type DockerResult<T> = Result<T, DockerError>;

/// Errors raised by the container facade.
#[derive(Debug, Error)]
pub enum DockerError {
    /// The engine endpoint could not be reached.
    #[error("container engine unreachable at '{host}': {message}")]
    Connect {
        /// Configured endpoint.
        host: String,
        /// Sanitised engine message.
        message: String,
    },

    /// The referenced container does not exist.
    #[error("container '{container}' not found")]
    NotFound {
        /// Container id or name as given by the caller.
        container: String,
    },

    /// The engine rejected the request.
    #[error("container engine error: {message}")]
    Api {
        /// Sanitised engine message.
        message: String,
    },

    /// The caller may not perform the requested mutation.
    #[error("user {user_id} denied for action '{action}'")]
    PermissionDenied {
        /// The caller.
        user_id: u64,
        /// The attempted action.
        action: &'static str,
    },

    /// The rename target is not acceptable.
    #[error("invalid container name: {reason}")]
    InvalidRename {
        /// Why the name was rejected.
        reason: String,
    },

    /// A restarted container did not reach `running` within the poll budget.
    #[error("container '{container}' did not reach running state after restart")]
    RestartTimeout {
        /// The container that stayed down.
        container: String,
    },
}

impl DockerError {
    /// Map an engine client error, folding 404s into [`DockerError::NotFound`].
    pub(crate) fn from_engine(container: &str, err: &bollard::errors::Error) -> Self {
        match err {
            bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            } => Self::NotFound {
                container: container.to_owned(),
            },
            other => Self::Api {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_404_becomes_not_found() {
        let err = bollard::errors::Error::DockerResponseServerError {
            status_code: 404,
            message: "no such container".to_owned(),
        };
        assert!(matches!(
            DockerError::from_engine("web", &err),
            DockerError::NotFound { container } if container == "web"
        ));
    }

    #[test]
    fn engine_500_becomes_api_error() {
        let err = bollard::errors::Error::DockerResponseServerError {
            status_code: 500,
            message: "boom".to_owned(),
        };
        assert!(matches!(
            DockerError::from_engine("web", &err),
            DockerError::Api { .. }
        ));
    }
}
