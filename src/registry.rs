//! Dispatch registry and FIFO drain loop (§4.2, §4.3).
//!
//! [`MessageBus`] owns the command/event handler registries and the bus's
//! registered dependency constructors. Registration and dispatch must not
//! interleave (§5) — in Rust terms, registration takes `&mut self` and
//! dispatch takes `&self`, so the borrow checker enforces that no dispatch
//! is in flight while the registries are mutated, and multiple dispatches
//! may run concurrently against a shared `&MessageBus`.

use std::any::{Any, TypeId};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::dependency::{build_bag, DependencyConstructor, Overrides};
use crate::discovery::{reject_relative_path, HandlerScanner};
use crate::error::{BusError, ConfigurationError};
use crate::handler::{
    CommandHandler, CommandHandlerSlot, ErasedCommandHandler, ErasedEventHandler, EventHandler,
    EventHandlerSlot,
};
use crate::message::{Command, Event, Message, MessageKind};
use crate::metrics::MetricsStore;
use crate::uow::{Transaction, UnitOfWork};

/// Opaque handle to a single registered event handler, returned by
/// [`MessageBus::register_event`] and required by
/// [`MessageBus::unregister_event`] — the Rust stand-in for the original's
/// "pass the same callback back" removal convention, since closures and
/// trait objects have no useful identity to compare by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventHandlerId(u64);

struct EventSlot<U: UnitOfWork> {
    id: EventHandlerId,
    handler: Box<dyn ErasedEventHandler<U>>,
}

pub struct MessageBus<U: UnitOfWork> {
    commands: HashMap<TypeId, Box<dyn ErasedCommandHandler<U>>>,
    command_names: HashMap<TypeId, &'static str>,
    events: HashMap<TypeId, Vec<EventSlot<U>>>,
    event_names: HashMap<TypeId, &'static str>,
    dependencies: HashMap<&'static str, Arc<dyn DependencyConstructor>>,
    metrics: Option<Arc<dyn MetricsStore>>,
    next_event_handler_id: u64,
}

impl<U: UnitOfWork> Default for MessageBus<U> {
    fn default() -> Self {
        Self {
            commands: HashMap::new(),
            command_names: HashMap::new(),
            events: HashMap::new(),
            event_names: HashMap::new(),
            dependencies: HashMap::new(),
            metrics: None,
            next_event_handler_id: 0,
        }
    }
}

impl<U: UnitOfWork> MessageBus<U> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsStore>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Registers a dependency constructor under `name`, available to every
    /// `handle()` call unless overridden transiently for that call.
    pub fn register_dependency(
        &mut self,
        name: &'static str,
        constructor: Arc<dyn DependencyConstructor>,
    ) {
        self.dependencies.insert(name, constructor);
    }

    /// Registers the sole handler for command type `C`. Fails if a handler
    /// is already registered for `C`.
    pub fn register<C, H>(&mut self, handler: H) -> Result<(), BusError>
    where
        C: Command,
        H: CommandHandler<C, U> + 'static,
    {
        let type_id = TypeId::of::<C>();
        if self.commands.contains_key(&type_id) {
            return Err(ConfigurationError::DuplicateCommandHandler(std::any::type_name::<C>()).into());
        }
        self.commands.insert(type_id, Box::new(CommandHandlerSlot::<C, H>::new(handler)));
        self.command_names.insert(type_id, std::any::type_name::<C>());
        Ok(())
    }

    /// Removes the registered handler for command type `C`. Fails if none
    /// is registered.
    pub fn unregister<C: Command>(&mut self) -> Result<(), BusError> {
        let type_id = TypeId::of::<C>();
        if self.commands.remove(&type_id).is_none() {
            return Err(ConfigurationError::CommandNotRegistered(std::any::type_name::<C>()).into());
        }
        self.command_names.remove(&type_id);
        Ok(())
    }

    /// Registers a handler for event type `E`. Handlers accumulate in
    /// registration order; all run on dispatch.
    pub fn register_event<E, H>(&mut self, handler: H) -> EventHandlerId
    where
        E: Event,
        H: EventHandler<E, U> + 'static,
    {
        let type_id = TypeId::of::<E>();
        let id = EventHandlerId(self.next_event_handler_id);
        self.next_event_handler_id += 1;
        self.event_names.insert(type_id, std::any::type_name::<E>());
        self.events.entry(type_id).or_default().push(EventSlot {
            id,
            handler: Box::new(EventHandlerSlot::<E, H>::new(handler)),
        });
        id
    }

    /// Removes the event handler identified by `id` for event type `E`.
    /// Fails if no handler with that id is registered for `E`.
    pub fn unregister_event<E: Event>(&mut self, id: EventHandlerId) -> Result<(), BusError> {
        let type_id = TypeId::of::<E>();
        let Some(slots) = self.events.get_mut(&type_id) else {
            return Err(ConfigurationError::EventNotRegistered(std::any::type_name::<E>()).into());
        };
        let before = slots.len();
        slots.retain(|slot| slot.id != id);
        if slots.len() == before {
            return Err(ConfigurationError::EventNotRegistered(std::any::type_name::<E>()).into());
        }
        Ok(())
    }

    /// Invokes the external handler-discovery collaborator to register all
    /// handlers found under `package_path`. Relative paths are rejected
    /// before the scanner runs.
    pub fn scan(
        &mut self,
        package_path: &str,
        scanner: &dyn HandlerScanner<U>,
    ) -> Result<(), BusError> {
        reject_relative_path(package_path)?;
        scanner.scan(package_path, self)
    }

    /// Dispatches `cmd` through the bus: resolves dependencies, drains the
    /// FIFO follow-up queue to completion, and returns the root command's
    /// result (`None` only if no handler is registered for `C`).
    ///
    /// See §4.3 for the full contract. Ordering is breadth-first: a handler
    /// invoked earlier in the queue has its follow-up messages enqueued
    /// before a handler invoked later gets to run.
    pub async fn handle<C: Command>(
        &self,
        cmd: C,
        tx: &mut Transaction<U>,
        overrides: Overrides,
    ) -> Result<Option<C::Response>, BusError> {
        let bag = build_bag(&self.dependencies, overrides).await;
        for hook in bag.hooks() {
            tx.attach_hook(hook);
        }

        let mut queue: VecDeque<Box<dyn Message>> = VecDeque::new();
        queue.push_back(Box::new(cmd));
        let mut index = 0usize;
        let mut result: Option<Box<dyn Any + Send>> = None;

        while let Some(msg) = queue.pop_front() {
            let type_id = msg.as_any().type_id();
            let kind = msg.kind();
            let stored = msg.clone_message();

            match kind {
                MessageKind::Command => {
                    if let Some(handler) = self.commands.get(&type_id) {
                        let res = handler.call(msg.into_any(), tx, &bag).await?;
                        if index == 0 {
                            result = Some(res);
                        }
                    }
                }
                MessageKind::Event => {
                    if let Some(slots) = self.events.get(&type_id) {
                        for slot in slots {
                            slot.handler
                                .call(msg.clone_message().into_any(), tx, &bag)
                                .await?;
                        }
                    }
                }
            }

            if let Some(metrics) = &self.metrics {
                metrics.inc_messages_processed(stored.metadata());
            }
            tx.message_store().append(stored).await.map_err(BusError::from)?;
            queue.extend(tx.drain_new_events());
            index += 1;
        }

        Ok(result.map(|boxed| {
            *boxed
                .downcast::<C::Response>()
                .expect("command response type mismatch: registry invariant violated")
        }))
    }
}
