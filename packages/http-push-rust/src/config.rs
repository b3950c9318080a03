//! Configuration types for the HTTP push publisher.

use std::time::Duration;

/// Upper bound for materializing a response body.
pub const READ_BODY_TIMEOUT: Duration = Duration::from_secs(10);

/// Added to the request timeout to bound the request-duration measurement.
pub const REQUEST_TIMER_GRACE: Duration = Duration::from_secs(5);

/// Default cap for responses to live commands (250 KiB).
pub const DEFAULT_MAX_TOTAL_MESSAGE_SIZE: usize = 256_000;

/// Default cap for responses read as acknowledgements (100 KiB).
pub const DEFAULT_ACK_SIZE_QUOTA: usize = 102_400;

/// Per-connection HTTP push settings controlling admission and timeouts.
///
/// Fixed once a publisher is built; changing it requires a new publisher.
#[derive(Debug, Clone)]
pub struct HttpPushConfig {
    /// Capacity of the dispatch queue. Publishes beyond it are rejected.
    pub max_queue_size: usize,
    /// Maximum time for a single HTTP exchange, excluding body materialization.
    pub request_timeout: Duration,
    /// Concurrent requests per client.
    pub parallelism: usize,
    /// Number of clients of the connection.
    pub client_count: usize,
}

impl HttpPushConfig {
    /// Number of requests the pipeline executes concurrently. At least 1.
    #[must_use]
    pub fn effective_parallelism(&self) -> usize {
        self.parallelism.saturating_mul(self.client_count).max(1)
    }

    /// Upper bound of the request-duration measurement.
    #[must_use]
    pub fn timer_max_duration(&self) -> Duration {
        self.request_timeout + REQUEST_TIMER_GRACE
    }
}

impl Default for HttpPushConfig {
    fn default() -> Self {
        Self {
            max_queue_size: 10,
            request_timeout: Duration::from_secs(60),
            parallelism: 1,
            client_count: 1,
        }
    }
}

/// Everything a publisher needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Identifier of the owning connection, used for logs and metrics.
    pub connection_id: String,
    pub http_push: HttpPushConfig,
}

impl PublisherConfig {
    #[must_use]
    pub fn new(connection_id: impl Into<String>) -> Self {
        Self {
            connection_id: connection_id.into(),
            http_push: HttpPushConfig::default(),
        }
    }
}
