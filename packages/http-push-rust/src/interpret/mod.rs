//! Response interpretation: turning an HTTP response into a [`SendResult`].
//!
//! - [`interpreter`]: status validation, body materialization, outcome selection
//! - [`message`]: live responses derived from message and thing commands
//! - [`validator`]: consistency check between live commands and their responses

pub mod interpreter;
pub mod message;
pub mod validator;

use bridge_core::{CommandResponse, Headers};

use crate::error::SendFailure;

pub use interpreter::ResponseInterpreter;
pub use validator::{CommandResponseValidator, ResponseMismatch};

/// Outcome of one delivered request.
///
/// A non-success status always populates `send_failure`, whether or not a
/// command response was derived as well.
#[derive(Debug, Clone, PartialEq)]
pub struct SendResult {
    pub command_response: Option<CommandResponse>,
    pub send_failure: Option<SendFailure>,
    /// The signal's headers overlaid with the response headers and entity content type.
    pub merged_headers: Headers,
}

impl SendResult {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.send_failure.is_none()
    }
}
