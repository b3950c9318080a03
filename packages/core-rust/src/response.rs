//! Command responses, including acknowledgements.

use serde_json::Value;

use crate::ack::Acknowledgement;
use crate::entity::{EntityId, ThingId};
use crate::headers::Headers;
use crate::signal::{type_tags, Message, MessageCommand};
use crate::status::HttpStatus;

/// Which message command a message response answers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Claim,
    Thing,
    Feature { feature_id: String },
}

impl MessageKind {
    /// Derives the kind from the command's type tag. Returns `None` for unknown
    /// tags and for feature messages without a feature id.
    #[must_use]
    pub fn of_command(command: &MessageCommand) -> Option<Self> {
        match command.type_tag.as_str() {
            type_tags::SEND_CLAIM_MESSAGE => Some(Self::Claim),
            type_tags::SEND_THING_MESSAGE => Some(Self::Thing),
            type_tags::SEND_FEATURE_MESSAGE => command
                .feature_id
                .clone()
                .map(|feature_id| Self::Feature { feature_id }),
            _ => None,
        }
    }

    #[must_use]
    pub fn response_type_tag(&self) -> &'static str {
        match self {
            Self::Claim => type_tags::SEND_CLAIM_MESSAGE_RESPONSE,
            Self::Thing => type_tags::SEND_THING_MESSAGE_RESPONSE,
            Self::Feature { .. } => type_tags::SEND_FEATURE_MESSAGE_RESPONSE,
        }
    }

    #[must_use]
    pub fn command_type_tag(&self) -> &'static str {
        match self {
            Self::Claim => type_tags::SEND_CLAIM_MESSAGE,
            Self::Thing => type_tags::SEND_THING_MESSAGE,
            Self::Feature { .. } => type_tags::SEND_FEATURE_MESSAGE,
        }
    }
}

/// Response to a claim, thing or feature message.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageCommandResponse {
    pub kind: MessageKind,
    pub thing_id: ThingId,
    pub message: Message,
    pub status: HttpStatus,
    pub headers: Headers,
}

/// Response to a thing command.
#[derive(Debug, Clone, PartialEq)]
pub struct ThingCommandResponse {
    pub action: String,
    pub thing_id: ThingId,
    pub path: String,
    pub value: Option<Value>,
    pub status: HttpStatus,
    pub headers: Headers,
}

impl ThingCommandResponse {
    #[must_use]
    pub fn type_tag(&self) -> String {
        format!("{}{}", type_tags::THING_RESPONSE_PREFIX, self.action)
    }
}

/// Tagged union of every response kind a publisher may derive from an HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandResponse {
    Acknowledgement(Acknowledgement),
    Message(MessageCommandResponse),
    Thing(ThingCommandResponse),
}

impl CommandResponse {
    #[must_use]
    pub fn headers(&self) -> &Headers {
        match self {
            Self::Acknowledgement(ack) => &ack.headers,
            Self::Message(response) => &response.headers,
            Self::Thing(response) => &response.headers,
        }
    }

    #[must_use]
    pub fn status(&self) -> HttpStatus {
        match self {
            Self::Acknowledgement(ack) => ack.status,
            Self::Message(response) => response.status,
            Self::Thing(response) => response.status,
        }
    }

    #[must_use]
    pub fn entity_id(&self) -> EntityId {
        match self {
            Self::Acknowledgement(ack) => ack.entity_id.clone(),
            Self::Message(response) => EntityId::from(&response.thing_id),
            Self::Thing(response) => EntityId::from(&response.thing_id),
        }
    }

    #[must_use]
    pub fn type_tag(&self) -> String {
        match self {
            Self::Acknowledgement(_) => type_tags::ACKNOWLEDGEMENT.to_string(),
            Self::Message(response) => response.kind.response_type_tag().to_string(),
            Self::Thing(response) => response.type_tag(),
        }
    }

    /// Message responses are always live; thing responses only on the live channel.
    #[must_use]
    pub fn is_live_command_response(&self) -> bool {
        match self {
            Self::Acknowledgement(_) => false,
            Self::Message(_) => true,
            Self::Thing(response) => response.headers.is_channel_live(),
        }
    }

    #[must_use]
    pub fn is_acknowledgement(&self) -> bool {
        matches!(self, Self::Acknowledgement(_))
    }
}
