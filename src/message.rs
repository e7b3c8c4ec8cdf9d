//! Message base types.
//!
//! `Command` and `Event` are the two disjoint message variants handled by the
//! bus. Both are built on top of [`Envelope`], which carries the identity and
//! routing [`Metadata`] shared by every message, plus a typed payload defined
//! by the concrete message.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Routing and wire-identity attributes carried by every message.
///
/// `name` plus `schema_version` form the wire identity used by the
/// event-stream publisher (`"<name>_v<schema_version>"`). `published`
/// controls whether the message ever reaches the event-stream transport —
/// commands are always private; events opt in explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub name: String,
    pub schema_version: u32,
    #[serde(default)]
    pub published: bool,
    #[serde(flatten, default)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl Metadata {
    pub fn new(name: impl Into<String>, schema_version: u32) -> Self {
        Self {
            name: name.into(),
            schema_version,
            published: false,
            extra: HashMap::new(),
        }
    }

    /// Marks the message carrying this metadata as publishable to the
    /// event-stream transport on commit.
    pub fn published(mut self) -> Self {
        self.published = true;
        self
    }

    pub fn wire_type(&self) -> String {
        format!("{}_v{}", self.name, self.schema_version)
    }
}

/// Disjoint classification used by the dispatch loop to route a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Command,
    Event,
}

/// Identity and timestamp wrapper shared by every command and event.
///
/// `message_id` uses a time-sortable (UUIDv7) identifier so that a replayed
/// message store naturally orders by creation time. Equality of the
/// surrounding message excludes `message_id` and `created_at` — see
/// [`Message::eq_message`].
#[derive(Debug, Clone)]
pub struct Envelope<T> {
    pub message_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub metadata: Metadata,
    pub payload: T,
}

impl<T> Envelope<T> {
    pub fn new(metadata: Metadata, payload: T) -> Self {
        Self {
            message_id: Uuid::now_v7(),
            created_at: Utc::now(),
            metadata,
            payload,
        }
    }
}

/// Object-safe facet implemented by every concrete command and event type.
///
/// This is the type the dispatch loop actually moves through its FIFO queue
/// (`Box<dyn Message>`); concrete message types are recovered via
/// `TypeId`-keyed downcasting in the registry.
pub trait Message: Any + Send + Sync + fmt::Debug {
    fn message_id(&self) -> Uuid;
    fn created_at(&self) -> DateTime<Utc>;
    fn metadata(&self) -> &Metadata;
    fn kind(&self) -> MessageKind;

    /// The payload serialized to JSON, used both for wire records and for
    /// structural equality (metadata + payload, excluding identity fields).
    fn payload_json(&self) -> serde_json::Value;

    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
    fn clone_message(&self) -> Box<dyn Message>;

    /// Structural equality excluding `message_id` and `created_at`.
    fn eq_message(&self, other: &dyn Message) -> bool;
}

/// Commands represent intent to mutate domain state. At most one handler may
/// be registered per command type, and its return value is observed by the
/// caller — but only when the command is the root of dispatch (see
/// `MessageBus::handle`).
pub trait Command: Message + 'static {
    type Response: Send + 'static;
}

/// Events represent something that has already happened. Zero or more
/// handlers may be registered; return values are discarded.
pub trait Event: Message + 'static {}

/// Implements the [`Message`] object-safe facet for a concrete message type
/// wrapping an [`Envelope`] field named `envelope`.
///
/// Hand-writing this impl for every message type is pure boilerplate (it is
/// always the same five lines delegating to the envelope), so it is factored
/// into a macro, matching `$ty: Clone` so the dispatch loop can hand the same
/// event to several handlers.
#[macro_export]
macro_rules! impl_message {
    ($ty:ty, $kind:expr) => {
        impl $crate::message::Message for $ty {
            fn message_id(&self) -> uuid::Uuid {
                self.envelope.message_id
            }

            fn created_at(&self) -> chrono::DateTime<chrono::Utc> {
                self.envelope.created_at
            }

            fn metadata(&self) -> &$crate::message::Metadata {
                &self.envelope.metadata
            }

            fn kind(&self) -> $crate::message::MessageKind {
                $kind
            }

            fn payload_json(&self) -> serde_json::Value {
                serde_json::to_value(&self.envelope.payload)
                    .expect("message payload must serialize to JSON")
            }

            fn as_any(&self) -> &dyn std::any::Any {
                self
            }

            fn into_any(self: Box<Self>) -> Box<dyn std::any::Any + Send> {
                self
            }

            fn clone_message(&self) -> Box<dyn $crate::message::Message> {
                Box::new(self.clone())
            }

            fn eq_message(&self, other: &dyn $crate::message::Message) -> bool {
                match other.as_any().downcast_ref::<Self>() {
                    Some(o) => {
                        self.metadata() == o.metadata()
                            && self.payload_json() == o.payload_json()
                    }
                    None => false,
                }
            }
        }
    };
}

impl PartialEq for dyn Message {
    fn eq(&self, other: &Self) -> bool {
        self.eq_message(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Payload {
        id: String,
    }

    #[derive(Debug, Clone)]
    struct TestEvent {
        envelope: Envelope<Payload>,
    }
    impl_message!(TestEvent, MessageKind::Event);
    impl Event for TestEvent {}

    fn make(id: &str) -> TestEvent {
        TestEvent {
            envelope: Envelope::new(
                Metadata::new("test", 1),
                Payload { id: id.to_string() },
            ),
        }
    }

    #[test]
    fn equality_excludes_message_id_and_created_at() {
        let a = make("foo");
        let b = make("foo");
        assert_ne!(a.envelope.message_id, b.envelope.message_id);
        assert!((&a as &dyn Message).eq(&b));
    }

    #[test]
    fn inequality_on_payload() {
        let a = make("foo");
        let b = make("bar");
        assert!(!(&a as &dyn Message).eq(&b));
    }

    #[test]
    fn wire_type_combines_name_and_version() {
        let metadata = Metadata::new("dummied", 1);
        assert_eq!(metadata.wire_type(), "dummied_v1");
    }
}
