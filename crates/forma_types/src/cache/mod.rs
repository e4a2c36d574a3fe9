//! Descriptor cache.
//!
//! Descriptor creation is deterministic, so descriptors are memoized in an
//! identity-keyed map from expression to descriptor. The cache is the
//! entry point for everything else: it owns the registry handle, hands out
//! the comparer, and is the unit of invalidation after the
//! forward-reference resolution pass.
//!
//! Entries are populated on first access without locking; the cache is not
//! safe for unsynchronized concurrent mutation. Callers that need
//! concurrency use per-scope caches or synchronize externally.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use tracing::debug;

use forma_ir::{Registry, TypeExpr};

use crate::comparer::Comparer;
use crate::descriptor::Type;
use crate::error::TypeError;

/// Memo store for descriptors, keyed by expression.
pub struct TypeCache {
    registry: Rc<Registry>,
    entries: RefCell<FxHashMap<TypeExpr, Rc<Type>>>,
}

impl TypeCache {
    /// Create an empty cache over a class universe.
    pub fn new(registry: Rc<Registry>) -> TypeCache {
        TypeCache {
            registry,
            entries: RefCell::new(FxHashMap::default()),
        }
    }

    /// The class universe this cache resolves against.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Disassemble an expression into its canonical descriptor.
    /// Idempotent per cache: the same expression returns the identical
    /// descriptor.
    pub fn disassemble(&self, expr: &TypeExpr) -> Rc<Type> {
        Type::create(self, expr)
    }

    /// The comparer over this cache.
    pub fn comparer(&self) -> Comparer<'_> {
        Comparer::new(self)
    }

    // ========================================
    // Map surface
    // ========================================

    /// Look up a cached descriptor.
    pub fn get(&self, expr: &TypeExpr) -> Option<Rc<Type>> {
        self.entries.borrow().get(expr).cloned()
    }

    /// Record a descriptor for an expression.
    pub(crate) fn insert(&self, expr: TypeExpr, descriptor: Rc<Type>) {
        self.entries.borrow_mut().insert(expr, descriptor);
    }

    /// Whether an expression has a cached descriptor.
    pub fn contains(&self, expr: &TypeExpr) -> bool {
        self.entries.borrow().contains_key(expr)
    }

    /// Drop one cached descriptor.
    pub fn remove(&self, expr: &TypeExpr) -> Option<Rc<Type>> {
        self.entries.borrow_mut().remove(expr)
    }

    /// Drop every cached descriptor.
    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    /// Number of cached descriptors.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    // ========================================
    // Forward references
    // ========================================

    /// Run the one-shot forward-reference resolution pass over the
    /// registry's field declarations, then clear this cache: previously
    /// cached descriptors may reference the now-stale declarations.
    pub fn resolve_forward_references(&self) -> Result<usize, TypeError> {
        let rewritten = self.registry.resolve_forward_references()?;
        let dropped = self.len();
        self.clear();
        debug!(rewritten, dropped, "resolved forward references and cleared cache");
        Ok(rewritten)
    }
}
