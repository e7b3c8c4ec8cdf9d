//! Message store with transactional outbox semantics.
//!
//! [`MessageStore`] is an append-only repository of every message dispatched
//! during a transaction. Each `append` writes through a backend hook
//! (`MessageStoreBackend::add`, persistence deferred to concrete
//! implementations) and buffers the message in an outbox. The outbox is only
//! ever drained by [`crate::uow::Transaction::close`] on a successful
//! commit — a rollback discards it outright.

use std::collections::VecDeque;

use async_trait::async_trait;

use crate::message::Message;

/// Write-through persistence hook for the message store.
///
/// The sinkhole implementation below is the default: messages are kept in
/// the in-memory outbox for the duration of the transaction but nothing is
/// durably persisted. Concrete deployments provide their own backend (SQL
/// table, append log, ...).
#[async_trait]
pub trait MessageStoreBackend: Send + Sync {
    async fn add(&self, message: &dyn Message) -> anyhow::Result<()>;
}

pub struct SinkholeMessageStoreBackend;

#[async_trait]
impl MessageStoreBackend for SinkholeMessageStoreBackend {
    async fn add(&self, _message: &dyn Message) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Object-safe facet of [`MessageStore`] used by [`crate::uow::UnitOfWork`]
/// so the unit-of-work trait does not need to be generic over the backend.
#[async_trait]
pub trait ErasedMessageStore: Send {
    async fn append(&mut self, message: Box<dyn Message>) -> anyhow::Result<()>;

    /// Atomically swaps the outbox buffer for an empty one and returns the
    /// previous contents, in append order.
    fn take_outbox(&mut self) -> VecDeque<Box<dyn Message>>;
}

/// Transactional append-only message log, backed by `B`.
pub struct MessageStore<B: MessageStoreBackend> {
    backend: B,
    outbox: VecDeque<Box<dyn Message>>,
}

impl<B: MessageStoreBackend> MessageStore<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            outbox: VecDeque::new(),
        }
    }
}

impl Default for MessageStore<SinkholeMessageStoreBackend> {
    fn default() -> Self {
        Self::new(SinkholeMessageStoreBackend)
    }
}

#[async_trait]
impl<B: MessageStoreBackend> ErasedMessageStore for MessageStore<B> {
    async fn append(&mut self, message: Box<dyn Message>) -> anyhow::Result<()> {
        self.backend.add(message.as_ref()).await?;
        self.outbox.push_back(message);
        Ok(())
    }

    fn take_outbox(&mut self) -> VecDeque<Box<dyn Message>> {
        std::mem::take(&mut self.outbox)
    }
}
