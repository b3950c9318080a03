//! Consistency check between a live command and the response derived for it.

use bridge_core::{CommandResponse, EntityId, LiveCommand};
use tracing::warn;

/// A way in which a live response does not answer its command.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResponseMismatch {
    #[error("correlation-id of response <{actual:?}> does not match command <{expected}>")]
    CorrelationId {
        expected: String,
        actual: Option<String>,
    },
    #[error("entity of response <{actual}> does not match command <{expected}>")]
    EntityId { expected: EntityId, actual: EntityId },
    #[error("response type <{actual}> does not answer command type <{expected}>")]
    Kind { expected: String, actual: String },
}

/// Checks that a live response belongs to the live command it answers.
///
/// Only reports: mismatches are logged and returned, the derived response is
/// delivered unchanged.
#[derive(Debug, Clone, Default)]
pub struct CommandResponseValidator {
    connection_id: String,
}

impl CommandResponseValidator {
    #[must_use]
    pub fn new(connection_id: impl Into<String>) -> Self {
        Self {
            connection_id: connection_id.into(),
        }
    }

    /// # Errors
    ///
    /// Returns the first `ResponseMismatch` found.
    pub fn validate(
        &self,
        command: LiveCommand<'_>,
        response: &CommandResponse,
    ) -> Result<(), ResponseMismatch> {
        let result = check(command, response);
        if let Err(mismatch) = &result {
            warn!(
                connection_id = %self.connection_id,
                command_type = %command.type_tag(),
                response_type = %response.type_tag(),
                "Live response does not match its command: {mismatch}"
            );
        }
        result
    }
}

fn check(command: LiveCommand<'_>, response: &CommandResponse) -> Result<(), ResponseMismatch> {
    if let Some(expected) = command.headers().correlation_id() {
        let actual = response.headers().correlation_id();
        if actual != Some(expected) {
            return Err(ResponseMismatch::CorrelationId {
                expected: expected.to_string(),
                actual: actual.map(str::to_string),
            });
        }
    }

    let expected = EntityId::from(command.thing_id());
    let actual = response.entity_id();
    if actual != expected {
        return Err(ResponseMismatch::EntityId { expected, actual });
    }

    let answers = match (command, response) {
        (LiveCommand::Message(cmd), CommandResponse::Message(resp)) => {
            resp.kind.command_type_tag() == cmd.type_tag
        }
        (LiveCommand::Thing(cmd), CommandResponse::Thing(resp)) => resp.action == cmd.action,
        _ => false,
    };
    if answers {
        Ok(())
    } else {
        Err(ResponseMismatch::Kind {
            expected: command.type_tag(),
            actual: response.type_tag(),
        })
    }
}
