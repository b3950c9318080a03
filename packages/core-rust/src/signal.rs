//! Signals exchanged between the internal domain and connectivity.
//!
//! `Signal` is a tagged union over the signal kinds the publishing pipeline
//! has to tell apart. Everything it does not model in detail is carried as
//! `Signal::Generic`.

use serde_json::Value;

use crate::entity::{EntityId, ThingId};
use crate::headers::Headers;
use crate::response::CommandResponse;

/// Type tags of message commands.
pub mod type_tags {
    pub const SEND_CLAIM_MESSAGE: &str = "messages.commands:claimMessage";
    pub const SEND_THING_MESSAGE: &str = "messages.commands:thingMessage";
    pub const SEND_FEATURE_MESSAGE: &str = "messages.commands:featureMessage";
    pub const SEND_CLAIM_MESSAGE_RESPONSE: &str = "messages.responses:claimMessage";
    pub const SEND_THING_MESSAGE_RESPONSE: &str = "messages.responses:thingMessage";
    pub const SEND_FEATURE_MESSAGE_RESPONSE: &str = "messages.responses:featureMessage";
    pub const ACKNOWLEDGEMENT: &str = "acknowledgement";
    pub const THING_COMMAND_PREFIX: &str = "things.commands:";
    pub const THING_RESPONSE_PREFIX: &str = "things.responses:";
    pub const THING_EVENT_PREFIX: &str = "things.events:";
}

/// Whether a message is addressed to a thing or sent by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageDirection {
    /// `inbox`
    To,
    /// `outbox`
    From,
}

impl MessageDirection {
    #[must_use]
    pub fn path_segment(self) -> &'static str {
        match self {
            Self::To => "inbox",
            Self::From => "outbox",
        }
    }

    #[must_use]
    pub fn from_path_segment(segment: &str) -> Option<Self> {
        match segment {
            "inbox" => Some(Self::To),
            "outbox" => Some(Self::From),
            _ => None,
        }
    }
}

/// The message carried by a message command or its response.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub subject: String,
    pub direction: MessageDirection,
    pub headers: Headers,
    pub payload: Option<Value>,
}

impl Message {
    #[must_use]
    pub fn new(subject: impl Into<String>, direction: MessageDirection) -> Self {
        Self {
            subject: subject.into(),
            direction,
            headers: Headers::new(),
            payload: None,
        }
    }

    #[must_use]
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// Command modifying or retrieving a thing.
#[derive(Debug, Clone, PartialEq)]
pub struct ThingCommand {
    /// `create`, `modify`, `merge`, `retrieve`, `delete`.
    pub action: String,
    pub thing_id: ThingId,
    pub path: String,
    pub value: Option<Value>,
    pub headers: Headers,
}

impl ThingCommand {
    #[must_use]
    pub fn type_tag(&self) -> String {
        format!("{}{}", type_tags::THING_COMMAND_PREFIX, self.action)
    }
}

/// A message sent to (or from) a thing, a feature, or a claim request.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageCommand {
    /// One of the `SEND_*_MESSAGE` tags; other values are carried but not answerable.
    pub type_tag: String,
    pub thing_id: ThingId,
    pub feature_id: Option<String>,
    pub message: Message,
    pub headers: Headers,
}

/// Event emitted after a thing changed.
#[derive(Debug, Clone, PartialEq)]
pub struct ThingEvent {
    pub action: String,
    pub thing_id: ThingId,
    pub path: String,
    pub value: Option<Value>,
    pub revision: Option<u64>,
    pub headers: Headers,
}

/// Signal of a type not modelled explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct GenericSignal {
    pub type_tag: String,
    pub entity_id: Option<EntityId>,
    pub headers: Headers,
    pub value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    ThingCommand(ThingCommand),
    MessageCommand(MessageCommand),
    ThingEvent(ThingEvent),
    CommandResponse(CommandResponse),
    Generic(GenericSignal),
}

/// Borrowed view of a signal that expects a live response.
#[derive(Debug, Clone, Copy)]
pub enum LiveCommand<'a> {
    Thing(&'a ThingCommand),
    Message(&'a MessageCommand),
}

impl LiveCommand<'_> {
    #[must_use]
    pub fn headers(&self) -> &Headers {
        match self {
            Self::Thing(cmd) => &cmd.headers,
            Self::Message(cmd) => &cmd.headers,
        }
    }

    #[must_use]
    pub fn thing_id(&self) -> &ThingId {
        match self {
            Self::Thing(cmd) => &cmd.thing_id,
            Self::Message(cmd) => &cmd.thing_id,
        }
    }

    #[must_use]
    pub fn type_tag(&self) -> String {
        match self {
            Self::Thing(cmd) => cmd.type_tag(),
            Self::Message(cmd) => cmd.type_tag.clone(),
        }
    }
}

impl Signal {
    #[must_use]
    pub fn headers(&self) -> &Headers {
        match self {
            Self::ThingCommand(cmd) => &cmd.headers,
            Self::MessageCommand(cmd) => &cmd.headers,
            Self::ThingEvent(event) => &event.headers,
            Self::CommandResponse(response) => response.headers(),
            Self::Generic(signal) => &signal.headers,
        }
    }

    #[must_use]
    pub fn type_tag(&self) -> String {
        match self {
            Self::ThingCommand(cmd) => cmd.type_tag(),
            Self::MessageCommand(cmd) => cmd.type_tag.clone(),
            Self::ThingEvent(event) => format!("{}{}", type_tags::THING_EVENT_PREFIX, event.action),
            Self::CommandResponse(response) => response.type_tag(),
            Self::Generic(signal) => signal.type_tag.clone(),
        }
    }

    /// The entity this signal is about, if it addresses one.
    #[must_use]
    pub fn entity_id(&self) -> Option<EntityId> {
        match self {
            Self::ThingCommand(cmd) => Some(EntityId::from(&cmd.thing_id)),
            Self::MessageCommand(cmd) => Some(EntityId::from(&cmd.thing_id)),
            Self::ThingEvent(event) => Some(EntityId::from(&event.thing_id)),
            Self::CommandResponse(response) => Some(response.entity_id()),
            Self::Generic(signal) => signal.entity_id.clone(),
        }
    }

    /// Message commands are always live; thing commands only on the live channel.
    #[must_use]
    pub fn as_live_command(&self) -> Option<LiveCommand<'_>> {
        match self {
            Self::MessageCommand(cmd) => Some(LiveCommand::Message(cmd)),
            Self::ThingCommand(cmd) if cmd.headers.is_channel_live() => {
                Some(LiveCommand::Thing(cmd))
            }
            _ => None,
        }
    }

    #[must_use]
    pub fn is_live_command(&self) -> bool {
        self.as_live_command().is_some()
    }

    #[must_use]
    pub fn is_channel_live(&self) -> bool {
        self.headers().is_channel_live()
    }
}
