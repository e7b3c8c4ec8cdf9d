//! Event-stream publisher.
//!
//! Serializes messages into a wire record and forwards the ones marked
//! `published` to an external transport. The publisher imposes no retry —
//! transport failures propagate to the caller of
//! [`EventstreamPublisher::flush`], which is invoked exactly once per
//! successful commit.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::message::Message;

/// The wire record shipped to the event-stream transport.
///
/// `type` combines the message's metadata `name` and `schema_version`
/// (`"<name>_v<schema_version>"`); `payload` excludes `id`, `created_at` and
/// `metadata` — it is exactly the message's own payload fields.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WireRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: serde_json::Value,
}

/// Serializes a [`Message`] into its [`WireRecord`] representation.
pub trait MessageSerializer: Send + Sync {
    fn serialize(&self, message: &dyn Message) -> WireRecord;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMessageSerializer;

impl MessageSerializer for DefaultMessageSerializer {
    fn serialize(&self, message: &dyn Message) -> WireRecord {
        WireRecord {
            id: message.message_id().to_string(),
            created_at: message.created_at(),
            kind: message.metadata().wire_type(),
            payload: message.payload_json(),
        }
    }
}

/// Transport to which serialized records are handed for delivery.
///
/// `initialize` must be idempotent and is called before the first send. The
/// sinkhole transport below is the required default: published messages are
/// silently dropped unless a transport is explicitly wired.
#[async_trait]
pub trait EventstreamTransport: Send + Sync {
    async fn initialize(&self) -> anyhow::Result<()>;
    async fn send_message_serialized(&self, record: WireRecord) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SinkholeEventstreamTransport;

#[async_trait]
impl EventstreamTransport for SinkholeEventstreamTransport {
    async fn initialize(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn send_message_serialized(&self, _record: WireRecord) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Publishes messages to the event stream.
///
/// Messages whose `metadata.published` is false never reach the transport —
/// commands are always private, events opt in at construction.
pub struct EventstreamPublisher {
    transport: Arc<dyn EventstreamTransport>,
    serializer: Arc<dyn MessageSerializer>,
}

impl EventstreamPublisher {
    pub fn new(transport: Arc<dyn EventstreamTransport>) -> Self {
        Self {
            transport,
            serializer: Arc::new(DefaultMessageSerializer),
        }
    }

    pub fn with_serializer(
        transport: Arc<dyn EventstreamTransport>,
        serializer: Arc<dyn MessageSerializer>,
    ) -> Self {
        Self {
            transport,
            serializer,
        }
    }

    pub async fn initialize(&self) -> anyhow::Result<()> {
        self.transport.initialize().await
    }

    async fn send_message(&self, message: &dyn Message) -> anyhow::Result<()> {
        if !message.metadata().published {
            return Ok(());
        }
        let record = self.serializer.serialize(message);
        self.transport.send_message_serialized(record).await
    }

    /// Forwards every `published` message in `outbox`, in order, dropping
    /// the rest. Called exactly once per successful commit by
    /// [`crate::uow::Transaction::close`].
    pub async fn flush(&self, outbox: VecDeque<Box<dyn Message>>) -> anyhow::Result<()> {
        for message in outbox {
            self.send_message(message.as_ref()).await?;
        }
        Ok(())
    }
}

impl Default for EventstreamPublisher {
    fn default() -> Self {
        Self::new(Arc::new(SinkholeEventstreamTransport))
    }
}
