//! Handler discovery contract (§4.2 `scan`, §9 Design Notes).
//!
//! The original scans a Python package for functions decorated with a
//! registration marker. Only the *contract* of that collaborator is in
//! scope here (per §1's Non-goals): a scanner is handed a package path, and
//! is responsible for registering whatever handlers it finds under that
//! path onto the bus. Relative paths are rejected before the scanner ever
//! runs.
//!
//! This crate ships no filesystem/module introspection — concrete
//! applications either implement [`HandlerScanner`] themselves against an
//! explicit, build-time-generated registration table (Design Notes §9,
//! option (b)), or simply call `MessageBus::register` directly at startup
//! (option (a)) and never call `scan` at all.

use crate::error::{BusError, ConfigurationError};
use crate::registry::MessageBus;
use crate::uow::UnitOfWork;

/// Registers every handler found under `package_path` onto `bus`.
pub trait HandlerScanner<U: UnitOfWork>: Send + Sync {
    fn scan(&self, package_path: &str, bus: &mut MessageBus<U>) -> Result<(), BusError>;
}

/// The scanner used when no discovery mechanism is wired: registers nothing.
/// Equivalent to never calling `scan()`, provided so callers that always
/// invoke `scan()` for uniformity do not need to special-case its absence.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullScanner;

impl<U: UnitOfWork> HandlerScanner<U> for NullScanner {
    fn scan(&self, _package_path: &str, _bus: &mut MessageBus<U>) -> Result<(), BusError> {
        Ok(())
    }
}

pub(crate) fn reject_relative_path(package_path: &str) -> Result<(), BusError> {
    if package_path.starts_with('.') {
        return Err(ConfigurationError::RelativePackagePath(package_path.to_string()).into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_package_path_is_rejected() {
        let err = reject_relative_path(".handlers").unwrap_err();
        assert_eq!(
            err.to_string(),
            "scan error: relative package unsupported for .handlers"
        );
    }

    #[test]
    fn absolute_package_path_is_accepted() {
        assert!(reject_relative_path("myapp.handlers").is_ok());
    }
}
