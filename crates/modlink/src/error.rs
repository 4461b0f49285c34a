//! Runtime error types.

use thiserror::Error;

use crate::module::ModuleId;

/// Errors raised while linking and instantiating modules.
///
/// There is no retry channel: a lookup failure means delivery bookkeeping
/// upstream is broken, and a body failure aborts whatever triggered the
/// instantiation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LinkError {
    /// A module id was requested that no delivery ever registered.
    #[error("module not found in table: {0}")]
    ModuleNotFound(ModuleId),

    /// A property write reached an export container or namespace that was
    /// already sealed.
    #[error("cannot write property `{0}` to a sealed object")]
    Sealed(String),

    /// A whole-value export replacement reached a module whose
    /// instantiation already finished.
    #[error("exports of module {0} are frozen")]
    Frozen(ModuleId),

    /// A property export reached a module whose export value is not an
    /// object.
    #[error("exports of module {0} cannot hold properties")]
    NotAContainer(ModuleId),

    /// Namespace interop was asked to resolve a value that is not a
    /// module id.
    #[error("expected a module id, found {0}")]
    NotAModuleId(String),

    /// A module body reported a failure of its own.
    #[error("module {module} failed: {reason}")]
    Body {
        /// The module whose body failed.
        module: ModuleId,
        /// Body-provided description of the failure.
        reason: String,
    },
}
