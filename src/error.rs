//! Error handling module
//!
//! Provides unified error types for the host, the probes and the database layer.

use thiserror::Error;

/// Default message for failed assertions
pub const DEFAULT_ASSERTION_MESSAGE: &str = "Assertion Failed";

/// Errors raised by the database handle
#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Query(#[from] tokio_postgres::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    #[error("Pool creation error: {0}")]
    CreatePool(#[from] deadpool_postgres::CreatePoolError),

    #[error("Unexpected result: {0}")]
    Unexpected(String),
}

/// Errors raised inside an individual probe
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error(transparent)]
    Database(#[from] DbError),

    #[error("Malformed payload: {0}")]
    Payload(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Host-wide error type
#[derive(Error, Debug)]
pub enum HawkeyeError {
    #[error("Could not load plugin {candidate}: {reason}")]
    PluginLoad { candidate: String, reason: String },

    #[error("Could not find snapshots to diff (requested {requested}, available {available})")]
    NoValidSnapshots { requested: usize, available: usize },

    #[error("Snapshot not found: {0}")]
    SnapshotNotFound(String),

    #[error("No payload for probe {probe} in {subject}")]
    MissingPayload { probe: String, subject: String },

    #[error("Probe {probe} failed: {source}")]
    Probe {
        probe: String,
        #[source]
        source: ProbeError,
    },

    #[error(transparent)]
    Database(#[from] DbError),

    #[error("{0}")]
    Assertion(String),
}

impl HawkeyeError {
    /// True for the errors a caller resolves by capturing more snapshots
    pub fn is_snapshot_not_found(&self) -> bool {
        matches!(
            self,
            HawkeyeError::NoValidSnapshots { .. } | HawkeyeError::SnapshotNotFound(_)
        )
    }
}

/// Result type alias for host operations
pub type HawkeyeResult<T> = Result<T, HawkeyeError>;

/// Fail with [`HawkeyeError::Assertion`] unless `condition` holds
pub fn assert(condition: bool, message: Option<&str>) -> HawkeyeResult<()> {
    assert_or(
        condition,
        message.unwrap_or(DEFAULT_ASSERTION_MESSAGE),
        HawkeyeError::Assertion,
    )
}

/// Fail with the caller's error kind unless `condition` holds
pub fn assert_or<E>(
    condition: bool,
    message: impl Into<String>,
    kind: impl FnOnce(String) -> E,
) -> Result<(), E> {
    if condition {
        return Ok(());
    }
    Err(kind(message.into()))
}

/// Helper function to create a plugin load error
pub fn load_error(candidate: impl Into<String>, reason: impl Into<String>) -> HawkeyeError {
    HawkeyeError::PluginLoad {
        candidate: candidate.into(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assert_true_condition() {
        assert!(assert(true, None).is_ok());
    }

    #[test]
    fn test_assert_false_condition_uses_default_message() {
        let err = assert(false, None).unwrap_err();
        assert!(matches!(err, HawkeyeError::Assertion(ref m) if m == "Assertion Failed"));
    }

    #[test]
    fn test_assert_or_custom_kind() {
        let err = assert_or(false, "broken", |m| load_error("Count", m)).unwrap_err();
        match err {
            HawkeyeError::PluginLoad { candidate, reason } => {
                assert_eq!(candidate, "Count");
                assert_eq!(reason, "broken");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_no_valid_snapshots_message() {
        let err = HawkeyeError::NoValidSnapshots { requested: 2, available: 1 };
        assert_eq!(
            err.to_string(),
            "Could not find snapshots to diff (requested 2, available 1)"
        );
        assert!(err.is_snapshot_not_found());
    }
}
