//! Escalation of pipeline-scoped failures to the owning supervisor.

use std::fmt;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Fatal failure of a publisher, reported to its owner at most once.
///
/// The owner decides how to react (restart, backoff, alert); the publisher is
/// presumed dead afterwards and must be rebuilt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionFailure {
    /// Component that failed, e.g. `http-publisher:<connection id>`.
    pub origin: String,
    /// Human-readable cause.
    pub cause: String,
    /// Underlying error, if the failure was not a plain termination.
    pub error: Option<String>,
}

impl ConnectionFailure {
    #[must_use]
    pub fn new(origin: impl Into<String>, cause: impl Into<String>, error: Option<String>) -> Self {
        Self {
            origin: origin.into(),
            cause: cause.into(),
            error,
        }
    }
}

impl fmt::Display for ConnectionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.origin, self.cause)?;
        if let Some(error) = &self.error {
            write!(f, " ({error})")?;
        }
        Ok(())
    }
}

/// Single-assignment channel to the supervisor. The first report wins.
#[derive(Debug)]
pub struct FailureReporter {
    connection_id: String,
    tx: Mutex<Option<oneshot::Sender<ConnectionFailure>>>,
}

impl FailureReporter {
    /// Creates a reporter and the receiving side handed to the owner.
    #[must_use]
    pub fn channel(connection_id: impl Into<String>) -> (Self, oneshot::Receiver<ConnectionFailure>) {
        let (tx, rx) = oneshot::channel();
        let reporter = Self {
            connection_id: connection_id.into(),
            tx: Mutex::new(Some(tx)),
        };
        (reporter, rx)
    }

    /// Reports `failure` unless another failure was reported before.
    ///
    /// Returns `true` if this call delivered the report.
    pub fn report(&self, failure: ConnectionFailure) -> bool {
        let Some(tx) = self.tx.lock().take() else {
            debug!(
                connection_id = %self.connection_id,
                failure = %failure,
                "Dropping connection failure, a failure was already reported"
            );
            return false;
        };
        warn!(connection_id = %self.connection_id, failure = %failure, "Escalating connection failure");
        // Owner may already be gone
        let _ = tx.send(failure);
        true
    }

    #[must_use]
    pub fn has_reported(&self) -> bool {
        self.tx.lock().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_report_wins() {
        let (reporter, rx) = FailureReporter::channel("conn-1");
        assert!(!reporter.has_reported());
        assert!(reporter.report(ConnectionFailure::new("a", "first", None)));
        assert!(!reporter.report(ConnectionFailure::new("b", "second", None)));
        assert!(reporter.has_reported());
        let failure = rx.await.unwrap();
        assert_eq!(failure.cause, "first");
    }

    #[test]
    fn report_survives_dropped_owner() {
        let (reporter, rx) = FailureReporter::channel("conn-1");
        drop(rx);
        assert!(reporter.report(ConnectionFailure::new("a", "gone", Some("boom".to_string()))));
    }

    #[test]
    fn display_includes_error() {
        let failure = ConnectionFailure::new("origin", "cause", Some("err".to_string()));
        assert_eq!(failure.to_string(), "origin: cause (err)");
    }
}
