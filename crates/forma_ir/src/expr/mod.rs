//! Type expressions: the algebra every type shape normalizes into.
//!
//! A [`TypeExpr`] is the raw, structural form of a type annotation —
//! concrete class, parameterized application, union, annotated wrapper,
//! nominal alias, unbound parameter, or unresolved forward reference. The
//! engine's descriptor layer decomposes these into canonical descriptors;
//! this module only defines the shapes and the smart constructors that keep
//! unions flat and deduplicated.

use std::fmt;

use smallvec::SmallVec;

use crate::{ClassId, Name};

/// Identifier of a registered type variable.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct TypeVarId(u32);

impl TypeVarId {
    /// Create from a raw index.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw index.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for TypeVarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeVarId({})", self.0)
    }
}

/// Identifier of a registered nominal type alias.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct AliasId(u32);

impl AliasId {
    /// Create from a raw index.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw index.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for AliasId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AliasId({})", self.0)
    }
}

/// Out-of-band annotation metadata attached to a type expression.
///
/// Compared structurally and in order.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Annotation {
    /// A string marker.
    Str(String),
    /// An integer marker.
    Int(i64),
    /// A boolean marker.
    Bool(bool),
    /// A named marker object.
    Label(Name),
}

/// A type expression.
///
/// Optionals have no dedicated shape: an optional is a [`TypeExpr::Union`]
/// containing [`TypeExpr::NONE`]. The descriptor layer strips and records
/// the optional layers.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum TypeExpr {
    /// A bare class.
    Class(ClassId),
    /// A parameterized application `Class[args...]`.
    Apply(ClassId, Vec<TypeExpr>),
    /// A union of members.
    Union(Vec<TypeExpr>),
    /// An expression carrying annotation metadata.
    Annotated(Box<TypeExpr>, Vec<Annotation>),
    /// A nominal type alias.
    Alias(AliasId),
    /// An unbound type parameter.
    Var(TypeVarId),
    /// An unresolved forward reference by name.
    Forward(Name),
}

impl TypeExpr {
    /// The none type.
    pub const NONE: TypeExpr = TypeExpr::Class(ClassId::NONE_TYPE);

    /// The unconstrained root type.
    pub const OBJECT: TypeExpr = TypeExpr::Class(ClassId::OBJECT);

    /// Build a union, flattening nested unions, deduplicating members in
    /// first-encounter order, and collapsing a single-member union to the
    /// member itself.
    pub fn union_of(members: impl IntoIterator<Item = TypeExpr>) -> TypeExpr {
        let mut flat: Vec<TypeExpr> = Vec::new();
        fn push(flat: &mut Vec<TypeExpr>, expr: TypeExpr) {
            match expr {
                TypeExpr::Union(members) => {
                    for member in members {
                        push(flat, member);
                    }
                }
                other => {
                    if !flat.contains(&other) {
                        flat.push(other);
                    }
                }
            }
        }
        for member in members {
            push(&mut flat, member);
        }
        if flat.len() == 1 {
            flat.swap_remove(0)
        } else {
            TypeExpr::Union(flat)
        }
    }

    /// Build an optional of the given expression: `expr | None`.
    pub fn optional(inner: TypeExpr) -> TypeExpr {
        TypeExpr::union_of([inner, TypeExpr::NONE])
    }

    /// Attach annotation metadata to an expression.
    pub fn annotated(
        inner: TypeExpr,
        annotations: impl IntoIterator<Item = Annotation>,
    ) -> TypeExpr {
        TypeExpr::Annotated(Box::new(inner), annotations.into_iter().collect())
    }

    /// Check whether this is the none type.
    #[inline]
    pub fn is_none_type(&self) -> bool {
        matches!(self, TypeExpr::Class(ClassId::NONE_TYPE))
    }

    /// Check whether this is a union shape.
    #[inline]
    pub fn is_union(&self) -> bool {
        matches!(self, TypeExpr::Union(_))
    }

    /// The applied class of a `Class` or `Apply` shape.
    pub fn applied_class(&self) -> Option<ClassId> {
        match self {
            TypeExpr::Class(id) | TypeExpr::Apply(id, _) => Some(*id),
            _ => None,
        }
    }

    /// The argument list of an `Apply` shape, empty otherwise.
    pub fn applied_args(&self) -> &[TypeExpr] {
        match self {
            TypeExpr::Apply(_, args) => args,
            _ => &[],
        }
    }

    /// Union members, or a one-element view of self for non-unions.
    pub fn union_members(&self) -> SmallVec<[&TypeExpr; 4]> {
        match self {
            TypeExpr::Union(members) => members.iter().collect(),
            other => SmallVec::from_iter([other]),
        }
    }

    /// Walk the expression, rewriting every node with `f` bottom-up.
    ///
    /// Used by the forward-reference resolution pass to substitute
    /// `Forward` nodes wherever they are nested.
    pub fn map(&self, f: &mut impl FnMut(TypeExpr) -> TypeExpr) -> TypeExpr {
        let rebuilt = match self {
            TypeExpr::Apply(id, args) => {
                TypeExpr::Apply(*id, args.iter().map(|a| a.map(f)).collect())
            }
            TypeExpr::Union(members) => {
                TypeExpr::Union(members.iter().map(|m| m.map(f)).collect())
            }
            TypeExpr::Annotated(inner, annotations) => {
                TypeExpr::Annotated(Box::new(inner.map(f)), annotations.clone())
            }
            other => other.clone(),
        };
        f(rebuilt)
    }

    /// Check whether any node in the expression satisfies `pred`.
    pub fn any(&self, pred: &mut impl FnMut(&TypeExpr) -> bool) -> bool {
        if pred(self) {
            return true;
        }
        match self {
            TypeExpr::Apply(_, args) => args.iter().any(|a| a.any(pred)),
            TypeExpr::Union(members) => members.iter().any(|m| m.any(pred)),
            TypeExpr::Annotated(inner, _) => inner.any(pred),
            _ => false,
        }
    }
}

/// Definition of a nominal type alias.
#[derive(Clone, Debug)]
pub struct AliasDef {
    /// Alias name.
    pub name: Name,
    /// The aliased expression.
    pub target: TypeExpr,
}

/// Definition of a type variable.
#[derive(Clone, Debug)]
pub struct TypeVarDef {
    /// Variable name, e.g. `T`.
    pub name: Name,
}

#[cfg(test)]
mod tests;
