//! Common imports for applications built on this bus.
//!
//! `use transactbus::prelude::*;` pulls in the traits and types most call
//! sites need: the message/command/event base traits, the handler traits,
//! the unit-of-work and transaction types, the registry, and the error
//! taxonomy.

pub use crate::dependency::{
    Dependency, DependencyBag, Overrides, ResolvedDependency, Singleton, Transient,
};
pub use crate::discovery::{HandlerScanner, NullScanner};
pub use crate::error::{BusError, ConfigurationError, TransactionError};
pub use crate::eventstream::{
    EventstreamPublisher, EventstreamTransport, MessageSerializer, SinkholeEventstreamTransport,
};
pub use crate::handler::{CommandHandler, EventHandler};
pub use crate::message::{Command, Envelope, Event, Message, MessageKind, Metadata};
pub use crate::metrics::{InMemoryMetricsStore, MetricsStore};
pub use crate::model::{Aggregate, SeenBuffer};
pub use crate::registry::{EventHandlerId, MessageBus};
pub use crate::repository::{RepoError, RepoResult, Repository, RepositorySeen};
pub use crate::store::{ErasedMessageStore, MessageStore, MessageStoreBackend, SinkholeMessageStoreBackend};
pub use crate::uow::{Transaction, TransactionStatus, UnitOfWork};
pub use crate::impl_message;
