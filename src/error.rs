//! Error taxonomy (§7).
//!
//! `ConfigurationError` and `TransactionError` are fatal lifecycle/registry
//! misuse; `MissingDependency` aborts a single `handle()` call without
//! forcing a rollback (the caller's transaction scope decides); `Runtime`
//! covers a non-message object submitted to `handle`; `Backend` carries
//! through exceptions raised by repositories, the message store, or the
//! transport, unchanged, for the surrounding scope to roll back on.

use crate::uow::TransactionStatus;

#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("{0} command has been registered twice")]
    DuplicateCommandHandler(&'static str),

    #[error("{0} command has not been registered")]
    CommandNotRegistered(&'static str),

    #[error("{0} event has not been registered")]
    EventNotRegistered(&'static str),

    #[error("scan error: relative package unsupported for {0}")]
    RelativePackagePath(String),
}

#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    #[error("Transaction already closed ({0:?}).")]
    AlreadyActedOn(TransactionStatus),

    #[error("Transaction must be explicitly closed. Missing commit/rollback call.")]
    NotClosed,

    #[error("Transaction is closed.")]
    Closed,
}

#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Transaction(#[from] TransactionError),

    #[error("Missing messagebus dependency '{0}'")]
    MissingDependency(String),

    #[error("{0} was not a Command or an Event")]
    Runtime(String),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}
