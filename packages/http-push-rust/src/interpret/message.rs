//! Live responses derived from the body of an HTTP response.

use bridge_core::headers::names;
use bridge_core::{
    CommandResponse, Headers, HttpStatus, Message, MessageCommand, MessageCommandResponse,
    MessageKind, Signal,
};
use serde_json::Value;
use tracing::warn;

use super::ResponseInterpreter;

impl ResponseInterpreter {
    /// Parses `body` as a protocol envelope that must carry a command response.
    pub(super) fn parse_command_response(&self, body: &Value) -> Option<CommandResponse> {
        match self.adapter.from_envelope(body) {
            Ok(Signal::CommandResponse(response)) => Some(response),
            Ok(other) => {
                warn!(
                    connection_id = %self.connection_id,
                    "Expected <{body}> to be of type <CommandResponse> but was of type <{}>.",
                    other.type_tag()
                );
                None
            }
            Err(e) => {
                warn!(
                    connection_id = %self.connection_id,
                    error = %e,
                    "Response body <{body}> is not a valid protocol envelope."
                );
                None
            }
        }
    }

    /// Response to a message command.
    ///
    /// A protocol envelope body must contain a message response. Any other body
    /// becomes the payload of a response built after the command's message kind.
    pub(super) fn message_command_response(
        &self,
        command: &MessageCommand,
        headers: &Headers,
        body: Value,
        status: HttpStatus,
    ) -> Option<CommandResponse> {
        if headers.is_ditto_protocol() && body.is_object() {
            return match self.parse_command_response(&body)? {
                response @ CommandResponse::Message(_) => Some(response),
                other => {
                    warn!(
                        connection_id = %self.connection_id,
                        "Expected <{body}> to be of type <MessageCommandResponse> but was of type <{}>.",
                        other.type_tag()
                    );
                    None
                }
            };
        }

        let Some(kind) = MessageKind::of_command(command) else {
            warn!(
                connection_id = %self.connection_id,
                "Initial message command type <{}> is unknown.",
                command.type_tag
            );
            return None;
        };
        let message_headers = command
            .message
            .headers
            .clone()
            .with(names::STATUS, status.code().to_string())
            .merged_with(headers);
        let message = Message {
            subject: command.message.subject.clone(),
            direction: command.message.direction,
            headers: message_headers,
            payload: Some(body),
        };
        Some(CommandResponse::Message(MessageCommandResponse {
            kind,
            thing_id: command.thing_id.clone(),
            message,
            status,
            headers: headers.clone(),
        }))
    }

    /// Response to a thing command on the live channel. Only protocol envelopes
    /// carrying a live thing response qualify.
    pub(super) fn live_thing_command_response(
        &self,
        headers: &Headers,
        body: &Value,
    ) -> Option<CommandResponse> {
        if !(headers.is_ditto_protocol() && body.is_object()) {
            return None;
        }
        match self.parse_command_response(body)? {
            response @ CommandResponse::Thing(_) if response.is_live_command_response() => {
                Some(response)
            }
            other => {
                warn!(
                    connection_id = %self.connection_id,
                    "Expected a live <ThingCommandResponse> but was of type <{}>.",
                    other.type_tag()
                );
                None
            }
        }
    }
}
