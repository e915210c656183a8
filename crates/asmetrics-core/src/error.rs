//! Error types for sampling, reading and probing.

use std::path::PathBuf;
use std::process::ExitStatus;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, MetricsError>;

/// Errors surfaced by the sampling pipeline.
///
/// Only [`MetricsError::NoData`] is transient. Everything else means the
/// caller should stop, report, or fix its configuration.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// No decodable record is on disk yet (file missing, empty, or both of
    /// the newest two segments torn).
    #[error("no complete sample in {}", path.display())]
    NoData { path: PathBuf },

    /// The sampler could not be started with the required privileges.
    #[error("powermetrics needs superuser privileges: {detail}")]
    PermissionDenied { detail: String },

    /// The sampler process terminated.
    #[error("sampler exited with {status}: {stderr}")]
    SamplerExited { status: ExitStatus, stderr: String },

    /// The sampler was stopped; start a new one.
    #[error("sampler is not running")]
    NotRunning,

    /// The sampler process could not be spawned for a reason other than
    /// permissions.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    /// A non-transient filesystem error.
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A required host property could not be determined.
    #[error("host probe failed: {detail}")]
    Probe { detail: String },

    /// A configuration file could not be parsed.
    #[error("invalid configuration in {}: {detail}", path.display())]
    Config { path: PathBuf, detail: String },
}

impl MetricsError {
    /// `true` when retrying on the next poll tick may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::NoData { .. })
    }

    /// `true` for privilege failures, which must never be retried silently.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_no_data_is_transient() {
        let no_data = MetricsError::NoData {
            path: PathBuf::from("/tmp/x"),
        };
        assert!(no_data.is_transient());

        let denied = MetricsError::PermissionDenied {
            detail: "not root".to_string(),
        };
        assert!(!denied.is_transient());
        assert!(denied.is_permission_denied());

        let io = MetricsError::Io {
            path: PathBuf::from("/tmp/x"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert!(!io.is_transient());
        assert!(!io.is_permission_denied());
    }

    #[test]
    fn messages_name_the_path() {
        let err = MetricsError::NoData {
            path: PathBuf::from("/tmp/asitop_powermetrics0"),
        };
        assert!(err.to_string().contains("/tmp/asitop_powermetrics0"));
    }
}
