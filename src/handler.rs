//! Handler traits and the type-erased shims the registry stores them behind.
//!
//! `CommandHandler`/`EventHandler` are the user-facing, fully-typed traits
//! implementations provide. The registry needs to hold handlers for many
//! different concrete message types in one map, so each registration is
//! wrapped in an `Erased*Handler` adapter that downcasts the type-erased
//! `Box<dyn Any + Send>` back to the concrete message type before calling
//! through.

use std::any::Any;
use std::marker::PhantomData;

use async_trait::async_trait;

use crate::dependency::DependencyBag;
use crate::error::BusError;
use crate::message::{Command, Event};
use crate::uow::{Transaction, UnitOfWork};

/// Handles exactly one command type within the transaction it is given.
///
/// Dependencies are resolved at the call site via [`DependencyBag::require`]
/// / [`DependencyBag::optional`] rather than declared up front.
#[async_trait]
pub trait CommandHandler<C: Command, U: UnitOfWork>: Send + Sync {
    async fn handle(
        &self,
        cmd: C,
        tx: &mut Transaction<U>,
        deps: &DependencyBag,
    ) -> Result<C::Response, BusError>;
}

/// Handles one event type. Multiple event handlers may be registered for the
/// same event type; all run, in registration order, with return values
/// discarded.
#[async_trait]
pub trait EventHandler<E: Event, U: UnitOfWork>: Send + Sync {
    async fn handle(
        &self,
        event: E,
        tx: &mut Transaction<U>,
        deps: &DependencyBag,
    ) -> Result<(), BusError>;
}

#[async_trait]
pub(crate) trait ErasedCommandHandler<U: UnitOfWork>: Send + Sync {
    async fn call(
        &self,
        cmd: Box<dyn Any + Send>,
        tx: &mut Transaction<U>,
        deps: &DependencyBag,
    ) -> Result<Box<dyn Any + Send>, BusError>;
}

pub(crate) struct CommandHandlerSlot<C, H> {
    handler: H,
    _marker: PhantomData<fn() -> C>,
}

impl<C, H> CommandHandlerSlot<C, H> {
    pub(crate) fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<C, H, U> ErasedCommandHandler<U> for CommandHandlerSlot<C, H>
where
    C: Command,
    U: UnitOfWork,
    H: CommandHandler<C, U>,
{
    async fn call(
        &self,
        cmd: Box<dyn Any + Send>,
        tx: &mut Transaction<U>,
        deps: &DependencyBag,
    ) -> Result<Box<dyn Any + Send>, BusError> {
        let cmd = *cmd
            .downcast::<C>()
            .expect("command type mismatch: registry invariant violated");
        let response = self.handler.handle(cmd, tx, deps).await?;
        Ok(Box::new(response))
    }
}

#[async_trait]
pub(crate) trait ErasedEventHandler<U: UnitOfWork>: Send + Sync {
    async fn call(
        &self,
        event: Box<dyn Any + Send>,
        tx: &mut Transaction<U>,
        deps: &DependencyBag,
    ) -> Result<(), BusError>;
}

pub(crate) struct EventHandlerSlot<E, H> {
    handler: H,
    _marker: PhantomData<fn() -> E>,
}

impl<E, H> EventHandlerSlot<E, H> {
    pub(crate) fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<E, H, U> ErasedEventHandler<U> for EventHandlerSlot<E, H>
where
    E: Event,
    U: UnitOfWork,
    H: EventHandler<E, U>,
{
    async fn call(
        &self,
        event: Box<dyn Any + Send>,
        tx: &mut Transaction<U>,
        deps: &DependencyBag,
    ) -> Result<(), BusError> {
        let event = *event
            .downcast::<E>()
            .expect("event type mismatch: registry invariant violated");
        self.handler.handle(event, tx, deps).await
    }
}
