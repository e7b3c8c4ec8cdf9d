//! Unit-of-Work transaction state machine (§4.6).
//!
//! [`Transaction`] wraps a concrete [`UnitOfWork`] with an explicit
//! lifecycle: `running -> committed | rolled_back -> closed`. Rust has no
//! async scope-exit hook (no async `Drop`), so the Python original's
//! `with uow:` block becomes an explicit [`Transaction::close`] call — the
//! idiomatic translation used by e.g. `sqlx`'s transactions. A `Drop` impl
//! is kept as a safety net that logs when a transaction was dropped without
//! being closed, but the authoritative "must be explicitly closed" error
//! from §4.6 is raised by `close()` itself.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;

use crate::dependency::Dependency;
use crate::error::{BusError, TransactionError};
use crate::eventstream::EventstreamPublisher;
use crate::message::Message;
use crate::metrics::MetricsStore;
use crate::repository::RepositorySeen;
use crate::store::ErasedMessageStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    Running,
    Committed,
    RolledBack,
    Closed,
}

/// A transactional boundary for domain mutation.
///
/// Implementors own their repositories and message store and know how to
/// durably commit or roll back; [`collect_new_events`](Self::collect_new_events)
/// is provided and need not be reimplemented.
#[async_trait]
pub trait UnitOfWork: Send {
    type Store: ErasedMessageStore;

    fn message_store(&mut self) -> &mut Self::Store;

    /// Every repository owned by this unit of work, in the order they
    /// should be drained during collection (see §4.4 and S6).
    fn repositories(&mut self) -> Vec<&mut dyn RepositorySeen>;

    async fn commit(&mut self) -> anyhow::Result<()>;
    async fn rollback(&mut self) -> anyhow::Result<()>;

    /// Drains every owned repository's `seen` buffer and, for each
    /// aggregate, its `messages` buffer, in order. Both buffers are
    /// emptied as they are read, so a message is never re-emitted on a
    /// subsequent call.
    fn collect_new_events(&mut self) -> Vec<Box<dyn Message>> {
        let mut out = Vec::new();
        for repo in self.repositories() {
            out.extend(repo.drain_seen_messages());
        }
        out
    }
}

/// The scoped lifetime over a [`UnitOfWork`] instance.
pub struct Transaction<U: UnitOfWork> {
    uow: U,
    status: TransactionStatus,
    detached: bool,
    hooks: Vec<Arc<dyn Dependency>>,
    metrics: Option<Arc<dyn MetricsStore>>,
    publisher: Arc<EventstreamPublisher>,
}

impl<U: UnitOfWork> Transaction<U> {
    pub fn begin(
        uow: U,
        publisher: Arc<EventstreamPublisher>,
        metrics: Option<Arc<dyn MetricsStore>>,
    ) -> Self {
        if let Some(metrics) = &metrics {
            metrics.inc_transactions_started();
        }
        tracing::debug!("transaction started");
        Self {
            uow,
            status: TransactionStatus::Running,
            detached: false,
            hooks: Vec::new(),
            metrics,
            publisher,
        }
    }

    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    pub(crate) fn uow_mut(&mut self) -> &mut U {
        &mut self.uow
    }

    /// Attaches a dependency's commit/rollback hook. Idempotent within a
    /// single `handle()` call is the caller's responsibility — the bus
    /// attaches each resolved dependency exactly once per call (§4.3 step
    /// 1).
    pub(crate) fn attach_hook(&mut self, hook: Arc<dyn Dependency>) {
        self.hooks.push(hook);
    }

    pub(crate) fn drain_new_events(&mut self) -> Vec<Box<dyn Message>> {
        self.uow.collect_new_events()
    }

    pub(crate) fn message_store(&mut self) -> &mut U::Store {
        self.uow.message_store()
    }

    /// Suppresses the "must be explicitly closed" diagnostic this
    /// transaction would otherwise log on drop, for callers streaming a
    /// lazy query past the syntactic scope that opened the transaction.
    /// The caller remains responsible for an eventual explicit `close()`.
    pub fn detach(&mut self) {
        self.detached = true;
    }

    #[tracing::instrument(skip_all)]
    pub async fn commit(&mut self) -> Result<(), BusError> {
        if self.status != TransactionStatus::Running {
            return Err(TransactionError::AlreadyActedOn(self.status).into());
        }
        self.uow.commit().await?;
        self.status = TransactionStatus::Committed;
        for hook in &self.hooks {
            hook.on_after_commit().await;
        }
        tracing::debug!("transaction committed");
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    pub async fn rollback(&mut self) -> Result<(), BusError> {
        if self.status != TransactionStatus::Running {
            return Err(TransactionError::AlreadyActedOn(self.status).into());
        }
        self.uow.rollback().await?;
        self.status = TransactionStatus::RolledBack;
        if let Some(metrics) = &self.metrics {
            metrics.inc_transactions_failed();
        }
        for hook in &self.hooks {
            hook.on_after_rollback().await;
        }
        tracing::debug!("transaction rolled back");
        Ok(())
    }

    /// Closes the transaction's scope. On a committed transaction, flushes
    /// the message store's outbox to the event-stream publisher — exactly
    /// once, per §4.5 — and surfaces any flush error to the caller (Open
    /// Question 1: the transaction remains logically committed; the
    /// outbox contents already handed to `flush` that failed to send are
    /// not retried). On a rolled-back transaction, the outbox is discarded
    /// without flushing. Calling `close` on a `running` or already-`closed`
    /// transaction is an error.
    #[tracing::instrument(skip_all)]
    pub async fn close(mut self) -> Result<(), BusError> {
        match self.status {
            TransactionStatus::Running => Err(TransactionError::NotClosed.into()),
            TransactionStatus::Closed => Err(TransactionError::Closed.into()),
            TransactionStatus::Committed => {
                let outbox = self.uow.message_store().take_outbox();
                self.record_closed(TransactionStatus::Committed);
                self.status = TransactionStatus::Closed;
                self.publisher.flush(outbox).await.map_err(BusError::from)
            }
            TransactionStatus::RolledBack => {
                self.record_closed(TransactionStatus::RolledBack);
                self.status = TransactionStatus::Closed;
                Ok(())
            }
        }
    }

    fn record_closed(&self, terminal: TransactionStatus) {
        if let Some(metrics) = &self.metrics {
            metrics.inc_transactions_closed(terminal);
        }
        tracing::debug!(status = ?terminal, "transaction closed");
    }
}

impl<U: UnitOfWork> Drop for Transaction<U> {
    fn drop(&mut self) {
        if !self.detached && self.status == TransactionStatus::Running {
            tracing::error!(
                "transaction dropped while running: must be explicitly closed \
                 (missing commit/rollback + close call)"
            );
        }
    }
}
