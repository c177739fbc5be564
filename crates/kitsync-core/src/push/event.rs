// Push callback envelope.
//
// The cloud wraps events as `{"Document": {"Msg": ...}}` where `Msg` is a
// single object or, for batched monitors, an array.

use serde::Serialize;
use serde_json::Value;

use super::topic::{self, TopicKind, Unroutable};
use crate::error::CoreError;
use crate::model::DeviceId;

/// One pushed notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushEvent {
    pub topic: String,
    /// The whole message object, topic included. Handlers look inside it
    /// for the `DataPoint` or `DeviceCore` payload.
    pub body: Value,
}

impl PushEvent {
    pub fn new(topic: impl Into<String>, body: Value) -> Self {
        Self {
            topic: topic.into(),
            body,
        }
    }

    /// Read one message object. The topic must be a string.
    pub fn from_message(message: &Value) -> Result<Self, CoreError> {
        let topic = message
            .get("topic")
            .and_then(Value::as_str)
            .ok_or_else(|| CoreError::MalformedPush {
                message: "message has no topic".into(),
            })?;
        Ok(Self::new(topic, message.clone()))
    }

    /// Kind and decoded subtopic of this event.
    pub fn route(&self) -> Result<(TopicKind, String), Unroutable> {
        topic::route(&self.topic)
    }

    /// Device this event belongs to.
    pub fn device_id(&self) -> Result<DeviceId, Unroutable> {
        let (kind, subtopic) = self.route()?;
        topic::routing_key(&kind, &subtopic, &self.body)
    }
}

/// Unwrap a callback body into its events.
///
/// A missing envelope or any message without a topic rejects the whole
/// callback, before anything is dispatched.
pub fn parse_batch(body: &Value) -> Result<Vec<PushEvent>, CoreError> {
    let messages = body
        .get("Document")
        .and_then(|doc| doc.get("Msg"))
        .ok_or_else(|| CoreError::MalformedPush {
            message: "missing Document.Msg".into(),
        })?;

    match messages {
        Value::Array(items) => items.iter().map(PushEvent::from_message).collect(),
        single => Ok(vec![PushEvent::from_message(single)?]),
    }
}
