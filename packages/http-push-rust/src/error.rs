//! Error taxonomy of the publishing pipeline.

use bridge_core::{Headers, HttpStatus};
use serde_json::Value;

/// Message of the admission-control rejection.
pub const TOO_MANY_IN_FLIGHT_MESSAGE: &str =
    "Outgoing HTTP request aborted: There are too many in-flight requests.";

/// Remediation hint attached to admission-control rejections.
pub const TOO_MANY_IN_FLIGHT_DESCRIPTION: &str = "This can have the following reasons:\n\
    a) The HTTP endpoint does not consume the messages fast enough.\n\
    b) The client count and/or the parallelism of this connection is not configured high enough.";

/// Failure of a single HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("network error: {0}")]
    Network(String),
    /// The pipeline was shut down before the request completed.
    #[error("connection closed")]
    Closed,
    #[error("request signing failed: {0}")]
    Signing(String),
}

/// Failure while materializing a response body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BodyError {
    #[error("response entity exceeded size limit of {limit} bytes")]
    TooLarge { limit: usize },
    #[error("reading response entity timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("reading response entity failed: {0}")]
    Read(String),
}

/// Failure while turning a publish target and message into a request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("invalid publish target <{0}>: expected <VERB:path>")]
    InvalidTarget(String),
    #[error("invalid request URI: {0}")]
    InvalidUri(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Failure delivered through a publish call's pending result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PublishError {
    /// Admission control: the dispatch queue is full.
    #[error("{message}")]
    Rejected {
        message: String,
        description: String,
        correlation_id: Option<String>,
    },
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("Remote server delivered unknown HTTP status code <{code}>!")]
    UnknownStatus { code: u16 },
    #[error(transparent)]
    Body(#[from] BodyError),
    /// The dispatch queue itself failed; escalated to the supervisor as well.
    #[error("Source queue failure: {0}")]
    QueueFault(String),
    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl PublishError {
    #[must_use]
    pub fn too_many_in_flight(correlation_id: Option<String>) -> Self {
        Self::Rejected {
            message: TOO_MANY_IN_FLIGHT_MESSAGE.to_string(),
            description: TOO_MANY_IN_FLIGHT_DESCRIPTION.to_string(),
            correlation_id,
        }
    }

    #[must_use]
    pub fn closed() -> Self {
        Self::Transport(TransportError::Closed)
    }

    /// Remediation hint, if the error carries one.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        match self {
            Self::Rejected { description, .. } => Some(description),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

/// The endpoint answered with a non-success status.
///
/// Carried next to any derived command response in a `SendResult`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct SendFailure {
    pub status: HttpStatus,
    pub body: Value,
    pub message: String,
    pub headers: Headers,
}

impl SendFailure {
    #[must_use]
    pub fn non_success(status: HttpStatus, body: Value, headers: Headers) -> Self {
        let rendered = match &body {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        Self {
            message: format!(
                "Got non success status code: <{}> and body: <{rendered}>",
                status.code()
            ),
            status,
            body,
            headers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_carries_remediation_hint() {
        let err = PublishError::too_many_in_flight(Some("c-1".to_string()));
        assert!(err.is_rejected());
        assert_eq!(err.to_string(), TOO_MANY_IN_FLIGHT_MESSAGE);
        let description = err.description().unwrap();
        assert!(description.contains("does not consume the messages fast enough"));
        assert!(description.contains("parallelism"));
    }

    #[test]
    fn send_failure_renders_text_body_verbatim() {
        let failure = SendFailure::non_success(
            HttpStatus::SERVICE_UNAVAILABLE,
            Value::from("overloaded"),
            Headers::new(),
        );
        assert_eq!(
            failure.message,
            "Got non success status code: <503> and body: <overloaded>"
        );
    }

    #[test]
    fn send_failure_renders_json_body() {
        let failure = SendFailure::non_success(
            HttpStatus::BAD_REQUEST,
            serde_json::json!({"error": "bad"}),
            Headers::new(),
        );
        assert!(failure.message.contains(r#"{"error":"bad"}"#));
    }

    #[test]
    fn closed_is_transport_error() {
        assert_eq!(PublishError::closed(), PublishError::Transport(TransportError::Closed));
        assert!(PublishError::closed().description().is_none());
    }
}
