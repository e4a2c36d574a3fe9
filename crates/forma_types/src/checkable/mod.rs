//! Checkable stand-ins.
//!
//! A [`Checkable`] is the synthesized object a descriptor hands to code
//! that expects an ordinary type: it answers instance and subtype checks
//! through the comparer (so unions, optionals, generics, and aliases all
//! agree with the engine), renders a deterministic text form, and can
//! construct values for single concrete types. Construction through a
//! union-shaped or none-valued proxy fails explicitly rather than
//! guessing a member.
//!
//! The proxy carries a metadata record consumed directly by the comparer
//! and field reflection rather than recomputed; it resolves its backing
//! descriptor through the cache instead of holding one.

use std::rc::Rc;

use forma_ir::{AliasId, ClassId, TypeExpr, Value};

use crate::cache::TypeCache;
use crate::comparer::TypeLike;
use crate::descriptor::{Origin, Type};
use crate::error::TypeError;

/// What a proxy stands in for when checked or called.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckTarget {
    /// A union of member proxies; never constructible.
    Union,
    /// The none type; never constructible.
    None,
    /// A nominal alias.
    Alias(AliasId),
    /// A single concrete class.
    Class(ClassId),
}

/// Metadata record carried by every proxy.
#[derive(Clone, Debug)]
pub struct CheckableMeta {
    /// The backing descriptor's origin.
    pub origin: Origin,
    /// The original wrapped expression.
    pub original: TypeExpr,
    /// The annotation-stripped form.
    pub extracted: TypeExpr,
    /// Whether the wrapped expression is optional.
    pub optional: bool,
    /// Member proxies when the stripped form is a union, none
    /// otherwise.
    pub union_members: Option<Vec<Rc<Checkable>>>,
    /// The original expression without its optional layers.
    pub without_optional: TypeExpr,
    /// The original expression without its annotation.
    pub without_annotation: TypeExpr,
}

/// A synthesized stand-in usable wherever an ordinary type is expected.
#[derive(Clone, Debug)]
pub struct Checkable {
    meta: CheckableMeta,
    target: CheckTarget,
}

impl Checkable {
    pub(crate) fn create(cache: &TypeCache, typ: &Type) -> Checkable {
        let without_annotation = typ.without_annotation();
        let without_optional = typ.without_optional();

        let (target, union_members) = match &without_annotation {
            TypeExpr::Union(members) => {
                let proxies: Vec<Rc<Checkable>> = members
                    .iter()
                    .map(|m| cache.disassemble(m).checkable(cache))
                    .collect();
                (CheckTarget::Union, Some(proxies))
            }
            _ => {
                // A none-valued proxy stays none even when reached
                // through an alias, so construction can refuse it.
                let target = if typ.extracted().is_none_type() {
                    CheckTarget::None
                } else if let Some(alias) = typ.alias() {
                    CheckTarget::Alias(alias)
                } else {
                    CheckTarget::Class(typ.origin_class(cache))
                };
                (target, None)
            }
        };

        Checkable {
            meta: CheckableMeta {
                origin: typ.origin(),
                original: typ.original().clone(),
                extracted: without_annotation.clone(),
                optional: typ.optional(),
                union_members,
                without_optional,
                without_annotation,
            },
            target,
        }
    }

    /// The metadata record.
    pub fn meta(&self) -> &CheckableMeta {
        &self.meta
    }

    /// What the proxy stands in for.
    pub fn target(&self) -> &CheckTarget {
        &self.target
    }

    /// The backing descriptor, resolved through the cache.
    pub fn descriptor(&self, cache: &TypeCache) -> Rc<Type> {
        cache.disassemble(&self.meta.original)
    }

    // ========================================
    // Checks
    // ========================================

    /// The host-facing instance check; agrees with the comparer for
    /// unions, optionals, generics, and aliases.
    pub fn is_instance(&self, cache: &TypeCache, value: &Value) -> bool {
        cache
            .comparer()
            .is_instance(value, &TypeLike::Expr(self.meta.original.clone()))
    }

    /// The host-facing subtype check: whether `candidate` descends from
    /// the wrapped type. Works proxy-to-proxy.
    pub fn accepts_subclass(&self, cache: &TypeCache, candidate: &TypeLike) -> bool {
        cache
            .comparer()
            .is_subtype(candidate, &TypeLike::Expr(self.meta.original.clone()))
    }

    /// Rich equality against any comparison candidate, consistent with
    /// the backing descriptor's equality.
    pub fn equivalent(&self, cache: &TypeCache, other: &TypeLike) -> bool {
        self.descriptor(cache).equivalent(cache, other)
    }

    // ========================================
    // Display
    // ========================================

    /// Deterministic text form: pipe-joined member representations for
    /// unions, the origin representation with a filled-parameter
    /// signature suffix otherwise.
    pub fn display(&self, cache: &TypeCache) -> String {
        let registry = cache.registry();
        match &self.target {
            CheckTarget::Union => {
                let members = self.meta.union_members.as_deref().unwrap_or_default();
                let parts: Vec<String> = members.iter().map(|m| m.display(cache)).collect();
                parts.join(" | ")
            }
            CheckTarget::None => "None".to_owned(),
            CheckTarget::Alias(alias) => {
                registry.lookup(registry.alias_def(*alias).name).to_owned()
            }
            CheckTarget::Class(class) => {
                let name = registry.lookup(registry.class_name(*class)).to_owned();
                let descriptor = self.descriptor(cache);
                let signature = descriptor.hierarchy(cache).signature_display(cache);
                if signature.is_empty() {
                    name
                } else {
                    format!("{name}[{signature}]")
                }
            }
        }
    }

    // ========================================
    // Construction
    // ========================================

    /// Construct a value of the wrapped type from positional arguments.
    ///
    /// Delegates to the class behind a single concrete type; a
    /// union-shaped or none-valued proxy fails explicitly rather than
    /// guessing a member.
    pub fn construct(&self, cache: &TypeCache, args: Vec<Value>) -> Result<Value, TypeError> {
        let class = match &self.target {
            CheckTarget::Union | CheckTarget::None => {
                return Err(TypeError::UnionConstruction {
                    display: self.display(cache),
                });
            }
            CheckTarget::Alias(_) => self.descriptor(cache).origin_class(cache),
            CheckTarget::Class(class) => *class,
        };

        if class.is_builtin() {
            return Ok(construct_builtin(class, args));
        }

        let descriptor = self.descriptor(cache);
        let fields = descriptor.fields(cache);
        let pairs = fields
            .iter()
            .zip(args)
            .map(|(field, value)| (field.name, value))
            .collect();
        Ok(Value::instance(class, pairs))
    }
}

/// Builtin constructors: the first argument when given, the canonical
/// empty value otherwise.
fn construct_builtin(class: ClassId, args: Vec<Value>) -> Value {
    if let Some(first) = args.into_iter().next() {
        return first;
    }
    match class {
        ClassId::BOOL => Value::Bool(false),
        ClassId::INT => Value::Int(0),
        ClassId::FLOAT => Value::Float(0.0),
        ClassId::STR => Value::Str(String::new()),
        ClassId::BYTES => Value::Bytes(Vec::new()),
        ClassId::LIST => Value::List(Vec::new()),
        ClassId::SET => Value::Set(Vec::new()),
        ClassId::DICT => Value::Dict(Vec::new()),
        ClassId::TUPLE => Value::Tuple(Vec::new()),
        _ => Value::None,
    }
}

#[cfg(test)]
mod tests;
