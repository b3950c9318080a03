//! Messages in their external (wire-facing) representation.

use std::collections::BTreeMap;

/// Payload of an external message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Payload {
    Text(String),
    Binary(Vec<u8>),
    #[default]
    Empty,
}

/// A signal after it was mapped for an external system.
///
/// Header names keep the casing the mapping produced; consumers that need
/// case-insensitive semantics compare with `eq_ignore_ascii_case`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExternalMessage {
    pub headers: BTreeMap<String, String>,
    pub payload: Payload,
    /// Headers that stay inside the gateway (e.g. correlation id for logging).
    pub internal_headers: BTreeMap<String, String>,
}

impl ExternalMessage {
    #[must_use]
    pub fn text(payload: impl Into<String>) -> Self {
        Self {
            payload: Payload::Text(payload.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn binary(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: Payload::Binary(payload.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_internal_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.internal_headers.insert(name.into(), value.into());
        self
    }

    /// Case-insensitive header lookup.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn is_text_message(&self) -> bool {
        matches!(self.payload, Payload::Text(_))
    }

    #[must_use]
    pub fn text_payload(&self) -> &str {
        match &self.payload {
            Payload::Text(text) => text,
            _ => "",
        }
    }

    #[must_use]
    pub fn byte_payload(&self) -> &[u8] {
        match &self.payload {
            Payload::Binary(bytes) => bytes,
            _ => &[],
        }
    }

    /// Raw payload bytes: UTF-8 for text, as-is for binary.
    #[must_use]
    pub fn payload_bytes(&self) -> Vec<u8> {
        match &self.payload {
            Payload::Text(text) => text.as_bytes().to_vec(),
            Payload::Binary(bytes) => bytes.clone(),
            Payload::Empty => Vec::new(),
        }
    }

    #[must_use]
    pub fn correlation_id(&self) -> Option<&str> {
        self.internal_headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("correlation-id"))
            .map(|(_, v)| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_ignores_case() {
        let message = ExternalMessage::text("hi").with_header("Content-Type", "text/plain");
        assert_eq!(message.header("content-type"), Some("text/plain"));
        assert!(message.is_text_message());
    }

    #[test]
    fn payload_bytes() {
        assert_eq!(ExternalMessage::text("ab").payload_bytes(), b"ab".to_vec());
        assert_eq!(ExternalMessage::binary(vec![1, 2]).payload_bytes(), vec![1, 2]);
        assert!(ExternalMessage::default().payload_bytes().is_empty());
        assert_eq!(ExternalMessage::binary(vec![1]).text_payload(), "");
    }
}
