//! Observability hooks (§6, optional collaborator).
//!
//! A `MetricsStore` is entirely optional: the bus and transaction run
//! identically without one. When present it must be safe to increment
//! concurrently across transactions (§5), which is why the in-memory default
//! below is backed by `dashmap` rather than a plain `HashMap` behind a
//! mutex.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::OnceCell;

use crate::message::Metadata;
use crate::uow::TransactionStatus;

pub trait MetricsStore: Send + Sync {
    fn inc_transactions_started(&self);
    fn inc_transactions_failed(&self);
    fn inc_transactions_closed(&self, status: TransactionStatus);
    fn inc_messages_processed(&self, metadata: &Metadata);
}

/// Process-local default implementation of [`MetricsStore`].
///
/// The Python original keys a process-wide singleton by Prometheus
/// `CollectorRegistry` identity to dodge duplicate-timeseries panics across
/// its generated sync/async variants; this crate has only one concurrency
/// model, so that indirection collapses to a single, explicitly constructed
/// instance (see [`global`] for the optional process-wide convenience
/// accessor recommended in the spec's Design Notes §9).
#[derive(Default)]
pub struct InMemoryMetricsStore {
    transactions_started_total: AtomicU64,
    transactions_failed_total: AtomicU64,
    transactions_in_progress: AtomicU64,
    transactions_committed_total: AtomicU64,
    transactions_rolled_back_total: AtomicU64,
    messages_processed_total: DashMap<(String, u32), u64>,
}

impl MetricsStore for InMemoryMetricsStore {
    fn inc_transactions_started(&self) {
        self.transactions_started_total.fetch_add(1, Ordering::Relaxed);
        self.transactions_in_progress.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_transactions_failed(&self) {
        self.transactions_failed_total.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_transactions_closed(&self, status: TransactionStatus) {
        match status {
            TransactionStatus::Committed => {
                self.transactions_committed_total.fetch_add(1, Ordering::Relaxed);
            }
            TransactionStatus::RolledBack => {
                self.transactions_rolled_back_total.fetch_add(1, Ordering::Relaxed);
            }
            other => unreachable!("transactions_closed_total reported for {other:?}"),
        }
        self.transactions_in_progress.fetch_sub(1, Ordering::Relaxed);
    }

    fn inc_messages_processed(&self, metadata: &Metadata) {
        *self
            .messages_processed_total
            .entry((metadata.name.clone(), metadata.schema_version))
            .or_insert(0) += 1;
    }
}

impl InMemoryMetricsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transactions_started_total(&self) -> u64 {
        self.transactions_started_total.load(Ordering::Relaxed)
    }

    pub fn transactions_in_progress(&self) -> u64 {
        self.transactions_in_progress.load(Ordering::Relaxed)
    }

    pub fn transactions_failed_total(&self) -> u64 {
        self.transactions_failed_total.load(Ordering::Relaxed)
    }

    pub fn messages_processed_total(&self, name: &str, schema_version: u32) -> u64 {
        self.messages_processed_total
            .get(&(name.to_string(), schema_version))
            .map(|entry| *entry)
            .unwrap_or(0)
    }
}

static GLOBAL: OnceCell<Arc<InMemoryMetricsStore>> = OnceCell::new();

/// Lazily-initialized process-wide convenience accessor.
///
/// Prefer injecting an explicit `Arc<dyn MetricsStore>` into the bus; this
/// exists only for call sites (e.g. a quick binary) that have no natural
/// place to thread one through, per Design Notes §9's recommendation to
/// "keep a convenience process-global only if unavoidable, and make its
/// lifecycle explicit".
pub fn global() -> Arc<InMemoryMetricsStore> {
    GLOBAL.get_or_init(|| Arc::new(InMemoryMetricsStore::new())).clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_transaction_lifecycle() {
        let store = InMemoryMetricsStore::new();
        store.inc_transactions_started();
        assert_eq!(store.transactions_started_total(), 1);
        assert_eq!(store.transactions_in_progress(), 1);

        store.inc_transactions_closed(TransactionStatus::Committed);
        assert_eq!(store.transactions_in_progress(), 0);
    }

    #[test]
    fn counts_messages_by_name_and_version() {
        let store = InMemoryMetricsStore::new();
        let metadata = Metadata::new("dummied", 1);
        store.inc_messages_processed(&metadata);
        store.inc_messages_processed(&metadata);
        assert_eq!(store.messages_processed_total("dummied", 1), 2);
    }
}
