//! Ditto protocol envelopes.
//!
//! An envelope is a JSON object of the form
//!
//! ```json
//! { "topic": "org.example/sensor-1/things/live/messages/hello",
//!   "headers": { "correlation-id": "c-1" },
//!   "path": "/inbox/messages/hello",
//!   "value": "hi",
//!   "status": 200 }
//! ```
//!
//! Topics follow `<namespace>/<name>/things/<twin|live>/<criterion>/<action-or-subject>`.
//! The presence of `status` turns a command into its response.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ack::{Acknowledgement, AcknowledgementLabel, InvalidLabel};
use crate::entity::{EntityType, InvalidEntityId, ThingId};
use crate::headers::{names, Channel, Headers};
use crate::response::{CommandResponse, MessageCommandResponse, MessageKind, ThingCommandResponse};
use crate::signal::{
    GenericSignal, Message, MessageCommand, MessageDirection, Signal, ThingCommand, ThingEvent,
};
use crate::status::{HttpStatus, StatusCodeOutOfRange};
use crate::traits::ProtocolAdapter;

const GROUP_THINGS: &str = "things";
const CRITERION_COMMANDS: &str = "commands";
const CRITERION_EVENTS: &str = "events";
const CRITERION_MESSAGES: &str = "messages";
const CRITERION_CLAIM: &str = "claim";
const CRITERION_ACKS: &str = "acks";
const CLAIM_SUBJECT: &str = "claim";

/// Errors from converting between signals and envelopes.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("invalid envelope: {0}")]
    InvalidEnvelope(String),
    #[error("invalid topic <{0}>")]
    InvalidTopic(String),
    #[error("unsupported signal: {0}")]
    Unsupported(String),
    #[error("envelope with topic <{topic}> requires a status")]
    MissingStatus { topic: String },
    #[error(transparent)]
    Status(#[from] StatusCodeOutOfRange),
    #[error(transparent)]
    EntityId(#[from] InvalidEntityId),
    #[error(transparent)]
    Label(#[from] InvalidLabel),
}

/// Serde shape of an envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub topic: String,
    #[serde(default)]
    pub headers: Headers,
    #[serde(default = "root_path")]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<u64>,
}

fn root_path() -> String {
    "/".to_string()
}

/// Parsed form of a topic string.
struct Topic<'a> {
    thing_id: ThingId,
    channel: Channel,
    criterion: &'a str,
    rest: Vec<&'a str>,
}

impl<'a> Topic<'a> {
    fn parse(topic: &'a str) -> Result<Self, ProtocolError> {
        let invalid = || ProtocolError::InvalidTopic(topic.to_string());
        let segments: Vec<&str> = topic.split('/').collect();
        let [namespace, name, group, channel, criterion, rest @ ..] = segments.as_slice() else {
            return Err(invalid());
        };
        if *group != GROUP_THINGS {
            return Err(ProtocolError::Unsupported(format!("topic group <{group}>")));
        }
        let channel = Channel::parse(channel).ok_or_else(invalid)?;
        Ok(Self {
            thing_id: ThingId::new(namespace, name)?,
            channel,
            criterion: *criterion,
            rest: rest.to_vec(),
        })
    }
}

/// Location of a message inside a thing, as encoded in the envelope path.
struct MessagePath {
    feature_id: Option<String>,
    direction: MessageDirection,
}

impl MessagePath {
    /// Parses `/{inbox|outbox}/messages/..` or `/features/{id}/{inbox|outbox}/messages/..`.
    fn parse(path: &str) -> Self {
        let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
        let (feature_id, mailbox) = match segments.as_slice() {
            ["features", feature_id, mailbox, ..] => (Some((*feature_id).to_string()), *mailbox),
            [mailbox, ..] => (None, *mailbox),
            [] => (None, ""),
        };
        Self {
            feature_id,
            direction: MessageDirection::from_path_segment(mailbox).unwrap_or(MessageDirection::To),
        }
    }

    fn render(feature_id: Option<&str>, direction: MessageDirection, subject: &str) -> String {
        let mailbox = direction.path_segment();
        match feature_id {
            Some(feature_id) => format!("/features/{feature_id}/{mailbox}/messages/{subject}"),
            None => format!("/{mailbox}/messages/{subject}"),
        }
    }
}

/// The default envelope adapter.
#[derive(Debug, Clone, Copy, Default)]
pub struct DittoProtocolAdapter;

impl DittoProtocolAdapter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn topic_for(thing_id: &ThingId, channel: Channel, criterion: &str, tail: &str) -> String {
        format!(
            "{}/{}/{GROUP_THINGS}/{}/{criterion}/{tail}",
            thing_id.namespace(),
            thing_id.name(),
            channel.as_str()
        )
    }

    fn envelope_of(signal: &Signal) -> Result<Envelope, ProtocolError> {
        let envelope = match signal {
            Signal::ThingCommand(cmd) => Envelope {
                topic: Self::topic_for(&cmd.thing_id, cmd.headers.channel(), CRITERION_COMMANDS, &cmd.action),
                headers: cmd.headers.clone(),
                path: cmd.path.clone(),
                value: cmd.value.clone(),
                status: None,
                revision: None,
            },
            Signal::ThingEvent(event) => Envelope {
                topic: Self::topic_for(&event.thing_id, event.headers.channel(), CRITERION_EVENTS, &event.action),
                headers: event.headers.clone(),
                path: event.path.clone(),
                value: event.value.clone(),
                status: None,
                revision: event.revision,
            },
            Signal::MessageCommand(cmd) => {
                let kind = MessageKind::of_command(cmd).ok_or_else(|| {
                    ProtocolError::Unsupported(format!("message command type <{}>", cmd.type_tag))
                })?;
                message_envelope(&kind, &cmd.thing_id, &cmd.message, &cmd.headers, None)
            }
            Signal::CommandResponse(CommandResponse::Message(response)) => message_envelope(
                &response.kind,
                &response.thing_id,
                &response.message,
                &response.headers,
                Some(response.status),
            ),
            Signal::CommandResponse(CommandResponse::Thing(response)) => Envelope {
                topic: Self::topic_for(
                    &response.thing_id,
                    response.headers.channel(),
                    CRITERION_COMMANDS,
                    &response.action,
                ),
                headers: response.headers.clone(),
                path: response.path.clone(),
                value: response.value.clone(),
                status: Some(response.status.code()),
                revision: None,
            },
            Signal::CommandResponse(CommandResponse::Acknowledgement(ack)) => {
                if ack.entity_id.entity_type != EntityType::Thing {
                    return Err(ProtocolError::Unsupported(format!(
                        "acknowledgement for entity type {:?}",
                        ack.entity_id.entity_type
                    )));
                }
                let thing_id = ThingId::parse(&ack.entity_id.id)?;
                Envelope {
                    topic: Self::topic_for(&thing_id, Channel::Twin, CRITERION_ACKS, ack.label.as_str()),
                    headers: ack.headers.clone(),
                    path: root_path(),
                    value: ack.payload.clone(),
                    status: Some(ack.status.code()),
                    revision: None,
                }
            }
            Signal::Generic(GenericSignal { type_tag, .. }) => {
                return Err(ProtocolError::Unsupported(format!("signal type <{type_tag}>")));
            }
        };
        Ok(envelope)
    }

    fn signal_of(envelope: Envelope) -> Result<Signal, ProtocolError> {
        let topic = Topic::parse(&envelope.topic)?;
        let mut headers = envelope.headers.clone();
        if topic.channel == Channel::Live && !headers.contains(names::CHANNEL) {
            headers.insert(names::CHANNEL, Channel::Live.as_str());
        }
        let status = envelope.status.map(HttpStatus::new).transpose()?;
        let require_status = || ProtocolError::MissingStatus {
            topic: envelope.topic.clone(),
        };

        match topic.criterion {
            CRITERION_COMMANDS => {
                let action = topic
                    .rest
                    .first()
                    .filter(|a| !a.is_empty())
                    .map(|a| (*a).to_string())
                    .ok_or_else(|| ProtocolError::InvalidTopic(envelope.topic.clone()))?;
                Ok(match status {
                    Some(status) => Signal::CommandResponse(CommandResponse::Thing(ThingCommandResponse {
                        action,
                        thing_id: topic.thing_id,
                        path: envelope.path,
                        value: envelope.value,
                        status,
                        headers,
                    })),
                    None => Signal::ThingCommand(ThingCommand {
                        action,
                        thing_id: topic.thing_id,
                        path: envelope.path,
                        value: envelope.value,
                        headers,
                    }),
                })
            }
            CRITERION_EVENTS => {
                let action = topic.rest.first().copied().unwrap_or_default().to_string();
                Ok(Signal::ThingEvent(ThingEvent {
                    action,
                    thing_id: topic.thing_id,
                    path: envelope.path,
                    value: envelope.value,
                    revision: envelope.revision,
                    headers,
                }))
            }
            CRITERION_MESSAGES | CRITERION_CLAIM => {
                let message_path = MessagePath::parse(&envelope.path);
                let (kind, subject) = if topic.criterion == CRITERION_CLAIM {
                    (MessageKind::Claim, CLAIM_SUBJECT.to_string())
                } else {
                    let subject = topic.rest.join("/");
                    match message_path.feature_id.clone() {
                        Some(feature_id) => (MessageKind::Feature { feature_id }, subject),
                        None => (MessageKind::Thing, subject),
                    }
                };
                let message = Message {
                    subject,
                    direction: message_path.direction,
                    headers: headers.clone(),
                    payload: envelope.value,
                };
                Ok(match status {
                    Some(status) => {
                        Signal::CommandResponse(CommandResponse::Message(MessageCommandResponse {
                            kind,
                            thing_id: topic.thing_id,
                            message,
                            status,
                            headers,
                        }))
                    }
                    None => Signal::MessageCommand(MessageCommand {
                        type_tag: kind.command_type_tag().to_string(),
                        thing_id: topic.thing_id,
                        feature_id: message_path.feature_id,
                        message,
                        headers,
                    }),
                })
            }
            CRITERION_ACKS => {
                let label = topic
                    .rest
                    .first()
                    .ok_or_else(|| ProtocolError::InvalidTopic(envelope.topic.clone()))?;
                let status = status.ok_or_else(require_status)?;
                Ok(Signal::CommandResponse(CommandResponse::Acknowledgement(
                    Acknowledgement::new(
                        AcknowledgementLabel::new(label)?,
                        (&topic.thing_id).into(),
                        status,
                        headers,
                        envelope.value,
                    ),
                )))
            }
            other => Err(ProtocolError::Unsupported(format!("topic criterion <{other}>"))),
        }
    }
}

fn message_envelope(
    kind: &MessageKind,
    thing_id: &ThingId,
    message: &Message,
    headers: &Headers,
    status: Option<HttpStatus>,
) -> Envelope {
    let (criterion, tail, feature_id) = match kind {
        MessageKind::Claim => (CRITERION_CLAIM, "", None),
        MessageKind::Thing => (CRITERION_MESSAGES, message.subject.as_str(), None),
        MessageKind::Feature { feature_id } => {
            (CRITERION_MESSAGES, message.subject.as_str(), Some(feature_id.as_str()))
        }
    };
    let mut topic = DittoProtocolAdapter::topic_for(thing_id, Channel::Live, criterion, tail);
    if tail.is_empty() {
        topic.pop();
    }
    Envelope {
        topic,
        headers: headers.clone(),
        path: MessagePath::render(feature_id, message.direction, &message.subject),
        value: message.payload.clone(),
        status: status.map(HttpStatus::code),
        revision: None,
    }
}

impl ProtocolAdapter for DittoProtocolAdapter {
    fn to_envelope(&self, signal: &Signal) -> Result<Value, ProtocolError> {
        let envelope = Self::envelope_of(signal)?;
        serde_json::to_value(envelope).map_err(|e| ProtocolError::InvalidEnvelope(e.to_string()))
    }

    fn from_envelope(&self, envelope: &Value) -> Result<Signal, ProtocolError> {
        let envelope: Envelope = serde_json::from_value(envelope.clone())
            .map_err(|e| ProtocolError::InvalidEnvelope(e.to_string()))?;
        Self::signal_of(envelope)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn adapter() -> DittoProtocolAdapter {
        DittoProtocolAdapter::new()
    }

    #[test]
    fn parses_live_thing_message_response() {
        let envelope = json!({
            "topic": "org.example/sensor-1/things/live/messages/hello",
            "headers": { "correlation-id": "c-1" },
            "path": "/inbox/messages/hello",
            "value": "world",
            "status": 200
        });
        let Signal::CommandResponse(CommandResponse::Message(response)) =
            adapter().from_envelope(&envelope).unwrap()
        else {
            panic!("expected message response");
        };
        assert_eq!(response.kind, MessageKind::Thing);
        assert_eq!(response.status, HttpStatus::OK);
        assert_eq!(response.message.subject, "hello");
        assert_eq!(response.message.payload, Some(json!("world")));
        assert!(response.headers.is_channel_live());
        assert_eq!(response.headers.correlation_id(), Some("c-1"));
    }

    #[test]
    fn parses_feature_message_command() {
        let envelope = json!({
            "topic": "ns/t/things/live/messages/do/it",
            "path": "/features/lamp/inbox/messages/do/it",
            "value": 1
        });
        let Signal::MessageCommand(cmd) = adapter().from_envelope(&envelope).unwrap() else {
            panic!("expected message command");
        };
        assert_eq!(cmd.type_tag, crate::signal::type_tags::SEND_FEATURE_MESSAGE);
        assert_eq!(cmd.feature_id.as_deref(), Some("lamp"));
        assert_eq!(cmd.message.subject, "do/it");
    }

    #[test]
    fn parses_acknowledgement() {
        let envelope = json!({
            "topic": "ns/t/things/twin/acks/custom-ack",
            "path": "/",
            "value": {"ok": true},
            "status": 202
        });
        let Signal::CommandResponse(CommandResponse::Acknowledgement(ack)) =
            adapter().from_envelope(&envelope).unwrap()
        else {
            panic!("expected acknowledgement");
        };
        assert_eq!(ack.label.as_str(), "custom-ack");
        assert_eq!(ack.status.code(), 202);
        assert_eq!(ack.entity_id.id, "ns:t");
    }

    #[test]
    fn acknowledgement_requires_status() {
        let envelope = json!({ "topic": "ns/t/things/twin/acks/custom-ack" });
        assert!(matches!(
            adapter().from_envelope(&envelope),
            Err(ProtocolError::MissingStatus { .. })
        ));
    }

    #[test]
    fn twin_command_response_is_not_live() {
        let envelope = json!({
            "topic": "ns/t/things/twin/commands/modify",
            "path": "/attributes/a",
            "status": 204
        });
        let Signal::CommandResponse(response) = adapter().from_envelope(&envelope).unwrap() else {
            panic!("expected response");
        };
        assert!(!response.is_live_command_response());
    }

    #[test]
    fn rejects_malformed_envelopes() {
        assert!(matches!(
            adapter().from_envelope(&json!({"no": "topic"})),
            Err(ProtocolError::InvalidEnvelope(_))
        ));
        assert!(matches!(
            adapter().from_envelope(&json!({"topic": "too/short"})),
            Err(ProtocolError::InvalidTopic(_))
        ));
        assert!(matches!(
            adapter().from_envelope(&json!({"topic": "ns/t/policies/twin/commands/modify"})),
            Err(ProtocolError::Unsupported(_))
        ));
        assert!(matches!(
            adapter().from_envelope(&json!({"topic": "ns/t/things/live/commands/modify", "status": 42})),
            Err(ProtocolError::Status(_))
        ));
    }

    #[test]
    fn claim_message_envelope_shape() {
        let cmd = Signal::MessageCommand(MessageCommand {
            type_tag: crate::signal::type_tags::SEND_CLAIM_MESSAGE.to_string(),
            thing_id: ThingId::parse("ns:t").unwrap(),
            feature_id: None,
            message: Message::new(CLAIM_SUBJECT, MessageDirection::To),
            headers: Headers::new(),
        });
        let envelope = adapter().to_envelope(&cmd).unwrap();
        assert_eq!(envelope["topic"], "ns/t/things/live/claim");
        assert_eq!(envelope["path"], "/inbox/messages/claim");
        let Signal::MessageCommand(parsed) = adapter().from_envelope(&envelope).unwrap() else {
            panic!("expected message command");
        };
        assert_eq!(parsed.type_tag, crate::signal::type_tags::SEND_CLAIM_MESSAGE);
    }

    #[test]
    fn generic_signals_have_no_envelope() {
        let signal = Signal::Generic(GenericSignal {
            type_tag: "x".to_string(),
            entity_id: None,
            headers: Headers::new(),
            value: None,
        });
        assert!(matches!(adapter().to_envelope(&signal), Err(ProtocolError::Unsupported(_))));
    }
}
