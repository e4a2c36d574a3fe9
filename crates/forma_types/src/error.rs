//! Engine errors.
//!
//! Every error is raised synchronously at the point of detection and never
//! downgraded to a best-effort fallback; dispatch correctness depends on
//! these being hard failures. The only soft outcomes in the engine are
//! `func_from` and `matches` reporting "no relationship found" through
//! `None`/`false`.

use forma_ir::RegistryError;

/// Errors raised by the type engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeError {
    /// A candidate used where a type-like expression was required is not
    /// one.
    #[error("not a usable type: {got}")]
    InvalidType {
        /// Rendering of the offending candidate.
        got: String,
    },

    /// A produced value's runtime type is a strict ancestor of the wanted
    /// type.
    #[error("`{produced}` is a strict ancestor of the wanted type `{wanted}`")]
    SubtypeConflict {
        /// The produced value's class.
        produced: String,
        /// The wanted type.
        wanted: String,
    },

    /// More ancestors were requested than bound parameters exist.
    #[error("the type has fewer bound parameters ({bound}) than wanted ({wanted})")]
    GenericArityMismatch {
        /// How many parameters are bound.
        bound: usize,
        /// How many were requested.
        wanted: usize,
    },

    /// A bound parameter does not descend from the requested ancestor.
    #[error("bound parameter `{found}` is not a subtype of `{wanted}`")]
    GenericSubtypeMismatch {
        /// The bound parameter.
        found: String,
        /// The requested ancestor.
        wanted: String,
    },

    /// Attempted construction through a union-shaped or none-valued proxy.
    #[error("cannot construct a value through `{display}`")]
    UnionConstruction {
        /// Rendering of the proxy.
        display: String,
    },

    /// An error from the class universe.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}
