//! Aggregate model base.
//!
//! An aggregate is a domain entity that accumulates emitted messages in an
//! ordered buffer. The buffer is drained — not copied — when the
//! unit-of-work collects new events, so any emitted message is dispatched at
//! most once.

use std::collections::{HashSet, VecDeque};
use std::hash::Hash;

use crate::message::Message;

/// A domain entity capable of emitting follow-up messages.
///
/// Implementors own, in addition to their domain fields, a `messages` buffer
/// populated by domain operations (e.g. `order.messages().push_back(...)`)
/// and drained by the owning repository's [`crate::repository::Repository`]
/// during collection.
pub trait Aggregate: Send + 'static {
    type Id: Eq + Hash + Clone + Send + Sync;

    fn aggregate_id(&self) -> &Self::Id;
    fn messages(&mut self) -> &mut VecDeque<Box<dyn Message>>;
}

/// Ordered, deduplicated buffer of aggregates touched during a transaction.
///
/// Repeated `track` calls for the same aggregate identity do not duplicate
/// the entry — the invariant required of `Repository::seen` in §3 of the
/// spec. Draining pops aggregates in the order they were first tracked, and
/// empties each aggregate's own message buffer as it goes, satisfying the
/// idempotent-collection invariant (a second `drain_messages` call yields
/// nothing unless new aggregates were tracked in between).
pub struct SeenBuffer<A: Aggregate> {
    order: VecDeque<A>,
    ids: HashSet<A::Id>,
}

impl<A: Aggregate> Default for SeenBuffer<A> {
    fn default() -> Self {
        Self {
            order: VecDeque::new(),
            ids: HashSet::new(),
        }
    }
}

impl<A: Aggregate> SeenBuffer<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracks `aggregate` as seen in the current transaction, unless an
    /// aggregate with the same identity is already tracked.
    pub fn track(&mut self, aggregate: A) {
        if self.ids.insert(aggregate.aggregate_id().clone()) {
            self.order.push_back(aggregate);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Drains every tracked aggregate's message buffer, in tracking order.
    pub fn drain_messages(&mut self) -> Vec<Box<dyn Message>> {
        let mut out = Vec::new();
        while let Some(mut aggregate) = self.order.pop_front() {
            self.ids.remove(aggregate.aggregate_id());
            out.extend(aggregate.messages().drain(..));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impl_message;
    use crate::message::{Envelope, Event, Message, MessageKind, Metadata};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Bumped;

    #[derive(Debug, Clone)]
    struct BumpedEvent {
        envelope: Envelope<Bumped>,
    }
    impl_message!(BumpedEvent, MessageKind::Event);
    impl Event for BumpedEvent {}

    struct Counter {
        id: String,
        messages: VecDeque<Box<dyn Message>>,
    }

    impl Aggregate for Counter {
        type Id = String;

        fn aggregate_id(&self) -> &Self::Id {
            &self.id
        }

        fn messages(&mut self) -> &mut VecDeque<Box<dyn Message>> {
            &mut self.messages
        }
    }

    fn bumped() -> Box<dyn Message> {
        Box::new(BumpedEvent {
            envelope: Envelope::new(Metadata::new("bumped", 1), Bumped),
        })
    }

    #[test]
    fn dedupes_same_identity() {
        let mut seen = SeenBuffer::new();
        seen.track(Counter {
            id: "a".into(),
            messages: VecDeque::new(),
        });
        seen.track(Counter {
            id: "a".into(),
            messages: VecDeque::new(),
        });
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn drains_in_tracking_order_and_is_idempotent() {
        let mut first = Counter {
            id: "a".into(),
            messages: VecDeque::new(),
        };
        first.messages.push_back(bumped());
        let mut second = Counter {
            id: "b".into(),
            messages: VecDeque::new(),
        };
        second.messages.push_back(bumped());

        let mut seen = SeenBuffer::new();
        seen.track(first);
        seen.track(second);

        let drained = seen.drain_messages();
        assert_eq!(drained.len(), 2);
        assert!(seen.is_empty());
        assert!(seen.drain_messages().is_empty());
    }
}
