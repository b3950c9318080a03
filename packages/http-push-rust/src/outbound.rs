//! What a caller hands to the publisher for one delivery.

use bridge_core::{AcknowledgementLabel, ExternalMessage, Signal};

use crate::codec::HttpPublishTarget;
use crate::config::{DEFAULT_ACK_SIZE_QUOTA, DEFAULT_MAX_TOTAL_MESSAGE_SIZE};

/// The target whose delivery may fulfil an acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoAckTarget {
    /// Address of the target, for diagnostics.
    pub address: String,
    /// Label this target issues, if any.
    pub issued_acknowledgement_label: Option<AcknowledgementLabel>,
}

impl AutoAckTarget {
    #[must_use]
    pub fn new(address: impl Into<String>, label: Option<AcknowledgementLabel>) -> Self {
        Self {
            address: address.into(),
            issued_acknowledgement_label: label,
        }
    }
}

/// A signal mapped for one HTTP target, together with its response quotas.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub signal: Signal,
    pub auto_ack_target: Option<AutoAckTarget>,
    pub target: HttpPublishTarget,
    pub message: ExternalMessage,
    /// Response size cap when `signal` is a live command.
    pub max_total_message_size: usize,
    /// Response size cap otherwise.
    pub ack_size_quota: usize,
}

impl OutboundMessage {
    #[must_use]
    pub fn new(signal: Signal, target: HttpPublishTarget, message: ExternalMessage) -> Self {
        Self {
            signal,
            auto_ack_target: None,
            target,
            message,
            max_total_message_size: DEFAULT_MAX_TOTAL_MESSAGE_SIZE,
            ack_size_quota: DEFAULT_ACK_SIZE_QUOTA,
        }
    }

    #[must_use]
    pub fn with_auto_ack_target(mut self, target: AutoAckTarget) -> Self {
        self.auto_ack_target = Some(target);
        self
    }

    #[must_use]
    pub fn with_quotas(mut self, max_total_message_size: usize, ack_size_quota: usize) -> Self {
        self.max_total_message_size = max_total_message_size;
        self.ack_size_quota = ack_size_quota;
        self
    }

    /// Correlation id for logging: internal headers first, then the signal.
    #[must_use]
    pub fn correlation_id(&self) -> Option<&str> {
        self.message
            .correlation_id()
            .or_else(|| self.signal.headers().correlation_id())
    }
}
