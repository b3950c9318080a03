//! Acknowledgement labels and acknowledgements.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entity::EntityId;
use crate::headers::Headers;
use crate::status::HttpStatus;

/// Returned for labels that are empty or contain characters outside `[A-Za-z0-9:_-]`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("acknowledgement label <{0}> is invalid")]
pub struct InvalidLabel(pub String);

/// Label identifying which acknowledgement a publisher is expected to issue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AcknowledgementLabel(String);

impl AcknowledgementLabel {
    /// Label of the acknowledgement fulfilled by a live command response.
    pub const LIVE_RESPONSE: &'static str = "live-response";
    /// Label of the acknowledgement issued once a twin change is persisted.
    pub const TWIN_PERSISTED: &'static str = "twin-persisted";

    /// # Errors
    ///
    /// Returns `InvalidLabel` for empty labels or labels with disallowed characters.
    pub fn new(label: &str) -> Result<Self, InvalidLabel> {
        let valid = !label.is_empty()
            && label
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':'));
        if valid {
            Ok(Self(label.to_string()))
        } else {
            Err(InvalidLabel(label.to_string()))
        }
    }

    #[must_use]
    pub fn live_response() -> Self {
        Self(Self::LIVE_RESPONSE.to_string())
    }

    #[must_use]
    pub fn twin_persisted() -> Self {
        Self(Self::TWIN_PERSISTED.to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_live_response(&self) -> bool {
        self.0 == Self::LIVE_RESPONSE
    }
}

impl fmt::Display for AcknowledgementLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for AcknowledgementLabel {
    type Error = InvalidLabel;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<AcknowledgementLabel> for String {
    fn from(label: AcknowledgementLabel) -> Self {
        label.0
    }
}

/// A (possibly negative) acknowledgement for one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Acknowledgement {
    pub label: AcknowledgementLabel,
    pub entity_id: EntityId,
    pub status: HttpStatus,
    pub headers: Headers,
    pub payload: Option<Value>,
}

impl Acknowledgement {
    #[must_use]
    pub fn new(
        label: AcknowledgementLabel,
        entity_id: EntityId,
        status: HttpStatus,
        headers: Headers,
        payload: Option<Value>,
    ) -> Self {
        Self {
            label,
            entity_id,
            status,
            headers,
            payload,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}
