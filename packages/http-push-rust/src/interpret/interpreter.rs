//! Maps HTTP responses to send results.

use std::fmt;
use std::sync::Arc;

use bridge_core::headers::names;
use bridge_core::{
    Acknowledgement, AcknowledgementLabel, CommandResponse, Headers, HttpStatus, ProtocolAdapter,
    Signal,
};
use serde_json::Value;
use tracing::{debug, info};

use super::{CommandResponseValidator, SendResult};
use crate::codec::classify_body;
use crate::config::READ_BODY_TIMEOUT;
use crate::error::{PublishError, SendFailure};
use crate::outbound::AutoAckTarget;
use crate::transport::WireResponse;

/// Turns the response to a delivered signal into a [`SendResult`].
///
/// Safe to share between concurrently running exchanges.
pub struct ResponseInterpreter {
    pub(super) connection_id: String,
    pub(super) adapter: Arc<dyn ProtocolAdapter>,
    validator: CommandResponseValidator,
}

impl ResponseInterpreter {
    #[must_use]
    pub fn new(
        connection_id: impl Into<String>,
        adapter: Arc<dyn ProtocolAdapter>,
        validator: CommandResponseValidator,
    ) -> Self {
        Self {
            connection_id: connection_id.into(),
            adapter,
            validator,
        }
    }

    /// Interprets `response` to `signal`.
    ///
    /// The body is read with `max_total_message_size` as cap if `signal` is a
    /// live command, with `ack_size_quota` otherwise.
    ///
    /// # Errors
    ///
    /// Returns `PublishError::UnknownStatus` for status codes outside `100..=599`
    /// (the body is discarded) and `PublishError::Body` if the body cannot be read
    /// within its cap and `READ_BODY_TIMEOUT`.
    pub async fn interpret(
        &self,
        signal: &Signal,
        auto_ack_target: Option<&AutoAckTarget>,
        mut response: WireResponse,
        max_total_message_size: usize,
        ack_size_quota: usize,
    ) -> Result<SendResult, PublishError> {
        let code = response.status();
        debug!(connection_id = %self.connection_id, response = ?response, "Got response");

        let Ok(status) = HttpStatus::new(code) else {
            response.discard(READ_BODY_TIMEOUT).await;
            return Err(PublishError::UnknownStatus { code });
        };

        let max_bytes = if signal.is_live_command() {
            max_total_message_size
        } else {
            ack_size_quota
        };
        let bytes = response.read_limited(max_bytes, READ_BODY_TIMEOUT).await?;
        let content_type = response.content_type();
        let body = classify_body(&bytes, content_type);

        // Content type comes from the entity, not from the header list
        let merged_headers = signal
            .headers()
            .merged_with(&response.domain_headers())
            .with(names::CONTENT_TYPE, content_type.as_str());

        let label = auto_ack_target.and_then(|target| target.issued_acknowledgement_label.as_ref());
        let command_response = self.derive_response(signal, label, status, &merged_headers, &body);

        if let (Some(command), Some(derived)) = (signal.as_live_command(), &command_response) {
            if derived.is_live_command_response() {
                // Diagnostic only: a mismatch is logged, the response is kept
                let _ = self.validator.validate(command, derived);
            }
        }

        match &command_response {
            Some(derived) => info!(
                connection_id = %self.connection_id,
                "CommandResponse <{}> created from HTTP response with Status <{status}> and body <{}>.",
                derived.type_tag(),
                BodyDisplay(&body)
            ),
            None => info!(
                connection_id = %self.connection_id,
                "No CommandResponse created from HTTP response with status <{status}> and body <{}>.",
                BodyDisplay(&body)
            ),
        }

        let send_failure = (!status.is_success())
            .then(|| SendFailure::non_success(status, body, merged_headers.clone()));
        Ok(SendResult {
            command_response,
            send_failure,
            merged_headers,
        })
    }

    fn derive_response(
        &self,
        signal: &Signal,
        label: Option<&AcknowledgementLabel>,
        status: HttpStatus,
        headers: &Headers,
        body: &Value,
    ) -> Option<CommandResponse> {
        match (label, signal.entity_id()) {
            (Some(label), Some(_)) if label.is_live_response() => match signal {
                Signal::MessageCommand(command) => {
                    self.message_command_response(command, headers, body.clone(), status)
                }
                Signal::ThingCommand(_) if signal.is_channel_live() => {
                    self.live_thing_command_response(headers, body)
                }
                _ => None,
            },
            // Any other issued label acknowledges regardless of status
            (Some(label), Some(entity_id)) => Some(CommandResponse::Acknowledgement(
                Acknowledgement::new(
                    label.clone(),
                    entity_id,
                    status,
                    headers.clone(),
                    Some(body.clone()),
                ),
            )),
            _ => {
                if !(headers.is_ditto_protocol() && body.is_object()) {
                    return None;
                }
                self.parse_command_response(body).filter(|parsed| {
                    parsed.is_acknowledgement() || parsed.is_live_command_response()
                })
            }
        }
    }
}

impl fmt::Debug for ResponseInterpreter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseInterpreter")
            .field("connection_id", &self.connection_id)
            .field("validator", &self.validator)
            .finish_non_exhaustive()
    }
}

/// Renders string bodies without JSON quoting.
struct BodyDisplay<'a>(&'a Value);

impl fmt::Display for BodyDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Value::String(text) => f.write_str(text),
            other => write!(f, "{other}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
