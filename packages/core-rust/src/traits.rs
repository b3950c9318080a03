use serde_json::Value;

use crate::protocol::ProtocolError;
use crate::signal::Signal;

/// Converts signals to and from their JSON protocol envelope.
/// Implementations: `DittoProtocolAdapter` (default), fakes in tests.
pub trait ProtocolAdapter: Send + Sync {
    /// Serialize a signal into its envelope.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::Unsupported` for signals without an envelope form.
    fn to_envelope(&self, signal: &Signal) -> Result<Value, ProtocolError>;

    /// Parse an envelope back into a signal.
    ///
    /// # Errors
    ///
    /// Returns a `ProtocolError` when the envelope is malformed or its topic is unknown.
    fn from_envelope(&self, envelope: &Value) -> Result<Signal, ProtocolError>;
}
