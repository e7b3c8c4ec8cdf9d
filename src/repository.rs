//! Repository contract.
//!
//! A repository is a capability object over storage of one aggregate type.
//! Concrete repositories own the domain-specific CRUD; this module only
//! specifies the `seen` tracking every repository must provide so the
//! unit-of-work can collect newly emitted messages across all of them.

use crate::message::Message;
use crate::model::{Aggregate, SeenBuffer};

/// Closed set of repository failure kinds.
///
/// Repository operations return `Result<T, RepoError>` rather than raising —
/// handlers consume the sum type directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RepoError {
    #[error("integrity error")]
    IntegrityError,
    #[error("not found")]
    NotFound,
}

pub type RepoResult<T> = Result<T, RepoError>;

/// Storage of one aggregate type, tracking aggregates touched in the current
/// transaction via a [`SeenBuffer`].
///
/// Concrete repositories implement their own `add`/lookup methods and call
/// `self.seen_buffer().track(aggregate)` whenever an aggregate is created or
/// mutated, matching the Python original's `self.seen.append(model)`.
pub trait Repository: Send {
    type Aggregate: Aggregate;

    fn seen_buffer(&mut self) -> &mut SeenBuffer<Self::Aggregate>;
}

/// Object-safe facet used by [`crate::uow::UnitOfWork::collect_new_events`]
/// to drain every owned repository without knowing its aggregate type.
pub trait RepositorySeen: Send {
    fn drain_seen_messages(&mut self) -> Vec<Box<dyn Message>>;
}

impl<R: Repository> RepositorySeen for R {
    fn drain_seen_messages(&mut self) -> Vec<Box<dyn Message>> {
        self.seen_buffer().drain_messages()
    }
}
