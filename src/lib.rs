//! # transactbus
//!
//! A transactional message bus for domain-driven applications: commands and
//! events dispatched through a single FIFO loop, scoped by a unit-of-work
//! with transactional outbox semantics.
//!
//! ## Core pieces
//! - [`Message`](message::Message), [`Command`](message::Command) and
//!   [`Event`](message::Event) — the two disjoint message kinds a
//!   [`MessageBus`](registry::MessageBus) routes.
//! - [`MessageBus`](registry::MessageBus) — registers handlers and drains
//!   the dispatch queue breadth-first, enqueuing every follow-up message a
//!   handler's aggregates emit until the queue is empty.
//! - [`Transaction`](uow::Transaction) — the explicit `running -> committed |
//!   rolled_back -> closed` lifecycle around a [`UnitOfWork`](uow::UnitOfWork).
//!   Rust has no async `Drop`, so `close()` is the authoritative scope-exit
//!   call; a synchronous `Drop` impl only logs a diagnostic if a transaction
//!   is dropped while still running.
//! - [`MessageStore`](store::MessageStore) — the transactional outbox,
//!   flushed to an [`EventstreamPublisher`](eventstream::EventstreamPublisher)
//!   only on a successful commit.
//! - [`DependencyBag`](dependency::DependencyBag) — named dependencies,
//!   registered at bus construction or supplied transiently per call.
//!
//! ## Example
//! ```ignore
//! use transactbus::prelude::*;
//!
//! let mut bus = MessageBus::<MyUnitOfWork>::new();
//! bus.register::<CreateOrder, _>(CreateOrderHandler)?;
//! bus.register_event::<OrderCreated, _>(SendConfirmationEmail);
//!
//! let mut tx = Transaction::begin(MyUnitOfWork::new(), publisher, None);
//! let order = bus.handle(CreateOrder { sku: "ABC-123".into() }, &mut tx, Overrides::new()).await?;
//! tx.commit().await?;
//! tx.close().await?;
//! # Ok::<(), BusError>(())
//! ```

pub mod dependency;
pub mod discovery;
pub mod error;
pub mod eventstream;
pub mod handler;
pub mod message;
pub mod metrics;
pub mod model;
pub mod prelude;
pub mod registry;
pub mod repository;
pub mod store;
pub mod uow;
