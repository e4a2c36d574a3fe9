//! Runtime type descriptors and structural matching for forma.
//!
//! Given an arbitrary type expression — concrete class, optional, union,
//! parameterized generic, nominal alias, or an annotated wrapper — this
//! crate produces a canonical [`Type`] descriptor, computes a
//! deterministic specificity [`Score`] over descriptors, resolves generic
//! parameter bindings across multi-level inheritance, and implements the
//! structural `is_instance` / `is_subtype` / `matches` predicates that
//! drive handler dispatch.
//!
//! # Entry points
//!
//! - [`TypeCache::disassemble`] turns an expression into its canonical
//!   descriptor, memoized per cache
//! - [`Type::func_from`] ranks handler options by specificity and picks
//!   the best structural match
//! - [`Comparer`] holds the matching predicates the structuring layer
//!   uses to decide whether a nested value needs recursive construction
//! - [`Checkable`] is the proxy handed to code that expects an ordinary
//!   type
//!
//! Everything is synchronous and in-memory; recursive algorithms carry
//! explicit visited chains because self-referential hierarchies are
//! expected input.

mod cache;
mod checkable;
mod comparer;
mod descriptor;
mod error;
mod extract;
mod fields;
mod hierarchy;
mod score;

pub use cache::TypeCache;
pub use checkable::{CheckTarget, Checkable, CheckableMeta};
pub use comparer::{Comparer, Distilled, DistilledForm, TypeLike};
pub use descriptor::{Origin, Type};
pub use error::TypeError;
pub use extract::{extract_annotation, extract_optional};
pub use fields::{Field, FieldDefault};
pub use hierarchy::{Binding, BindingKey, Hierarchy, Referral, VarKey, VarValue};
pub use score::{Score, ScoreOrigin};

#[cfg(test)]
pub(crate) mod testing;
