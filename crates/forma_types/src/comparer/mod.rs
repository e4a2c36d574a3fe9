//! Distillation and structural matching.
//!
//! The comparer normalizes comparison candidates of any supported shape —
//! raw expressions, descriptors, checkable proxies, aliases, tuples,
//! values — into a distilled form (one concrete class, a tuple of
//! concrete classes, or invalid), and implements the three structural
//! predicates over it: `is_instance`, `is_subtype`, and the
//! dispatch-time `matches`.
//!
//! Distillation tracks an accumulated optionality flag, the chain of
//! aliases traversed, and a parallel "as-generic" form preserving the
//! richest parameterization seen. A visited chain makes self-referential
//! candidates distill to invalid instead of looping.

use std::rc::Rc;

use smallvec::SmallVec;
use tracing::trace;

use forma_ir::{AliasId, ClassId, TypeExpr, Value};

use crate::cache::TypeCache;
use crate::checkable::Checkable;
use crate::descriptor::Type;
use crate::error::TypeError;
use crate::hierarchy::VarValue;

/// A comparison candidate of any supported shape.
#[derive(Clone, Debug)]
pub enum TypeLike {
    /// The missing-parameter sentinel.
    Missing,
    /// A raw type expression.
    Expr(TypeExpr),
    /// A canonical descriptor.
    Type(Rc<Type>),
    /// A checkable proxy.
    Proxy(Rc<Checkable>),
    /// A tuple of candidates.
    Many(Vec<TypeLike>),
    /// An actual runtime value.
    Value(Value),
}

impl TypeLike {
    /// The candidate as a plain expression, when it has one.
    pub fn as_expr(&self) -> Option<TypeExpr> {
        match self {
            TypeLike::Expr(expr) => Some(expr.clone()),
            TypeLike::Type(typ) => Some(typ.original().clone()),
            TypeLike::Proxy(proxy) => Some(proxy.meta().original.clone()),
            _ => None,
        }
    }
}

/// The concrete shape a candidate distilled to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DistilledForm {
    /// Not usable as a type. Carries the irreducible expression when
    /// there was one, so two invalid candidates still compare
    /// structurally.
    Invalid(Option<TypeExpr>),
    /// A single concrete class.
    Single(ClassId),
    /// A tuple of concrete classes, deduplicated in first-encounter
    /// order; the none type sits last when the candidate was optional.
    Many(Vec<ClassId>),
}

/// A normalized comparison target.
#[derive(Clone, Debug, PartialEq)]
pub struct Distilled {
    /// The concrete form.
    pub form: DistilledForm,
    /// The richest parameterization seen while reducing to the form.
    pub as_generic: Option<TypeExpr>,
    /// Nominal aliases traversed on the way down, outermost first.
    pub alias_chain: Vec<AliasId>,
    /// Whether any layer on the way down was optional.
    pub optional: bool,
}

impl Distilled {
    fn invalid(residue: Option<TypeExpr>, optional: bool) -> Distilled {
        Distilled {
            form: DistilledForm::Invalid(residue),
            as_generic: None,
            alias_chain: Vec::new(),
            optional,
        }
    }

    /// Whether the candidate was usable as a type.
    pub fn is_valid(&self) -> bool {
        !matches!(self.form, DistilledForm::Invalid(_))
    }

    /// The concrete classes of the form.
    pub fn classes(&self) -> SmallVec<[ClassId; 4]> {
        match &self.form {
            DistilledForm::Invalid(_) => SmallVec::new(),
            DistilledForm::Single(class) => SmallVec::from_iter([*class]),
            DistilledForm::Many(classes) => classes.iter().copied().collect(),
        }
    }
}

enum Peeled {
    Expr(TypeExpr),
    NoneValue,
    Opaque,
    Missing,
    Many(Vec<TypeLike>),
}

/// Structural comparison over one cache.
pub struct Comparer<'c> {
    cache: &'c TypeCache,
}

impl<'c> Comparer<'c> {
    pub(crate) fn new(cache: &'c TypeCache) -> Comparer<'c> {
        Comparer { cache }
    }

    // ========================================
    // Distillation
    // ========================================

    /// Normalize a candidate into its distilled form.
    pub fn distill(&self, candidate: &TypeLike) -> Distilled {
        self.distill_guarded(candidate, &mut Vec::new())
    }

    /// Distill, raising `InvalidType` when the candidate is not usable
    /// as a type.
    pub fn require_type(&self, candidate: &TypeLike) -> Result<Distilled, TypeError> {
        let distilled = self.distill(candidate);
        if distilled.is_valid() {
            Ok(distilled)
        } else {
            Err(TypeError::InvalidType {
                got: match candidate.as_expr() {
                    Some(expr) => self.cache.registry().render_expr(&expr),
                    None => format!("{candidate:?}"),
                },
            })
        }
    }

    fn distill_guarded(&self, candidate: &TypeLike, chain: &mut Vec<TypeExpr>) -> Distilled {
        let mut optional = false;

        let expr = match self.peel(candidate, &mut optional) {
            Peeled::Expr(expr) => expr,
            Peeled::NoneValue => {
                // A literal none distills to the none type, never to
                // invalid.
                return Distilled {
                    form: DistilledForm::Single(ClassId::NONE_TYPE),
                    as_generic: None,
                    alias_chain: Vec::new(),
                    optional,
                };
            }
            Peeled::Opaque | Peeled::Missing => return Distilled::invalid(None, optional),
            Peeled::Many(parts) => return self.distill_parts(&parts, optional, chain),
        };

        if chain.contains(&expr) {
            trace!(?expr, "distill cycle");
            return Distilled::invalid(Some(expr), optional);
        }
        chain.push(expr.clone());

        let mut descriptor = self.cache.disassemble(&expr);
        optional |= descriptor.optional();

        // Follow nominal alias indirection, recording the chain; the
        // descriptor constructor unwraps one layer per step.
        let mut alias_chain: Vec<AliasId> = Vec::new();
        loop {
            if let Some(alias) = descriptor.alias() {
                alias_chain.push(alias);
            }
            let next = match descriptor.extracted() {
                TypeExpr::Alias(_) => descriptor.extracted().clone(),
                _ => break,
            };
            if chain.contains(&next) {
                return Distilled::invalid(Some(next), optional);
            }
            chain.push(next.clone());
            descriptor = self.cache.disassemble(&next);
            optional |= descriptor.optional();
        }

        if descriptor.is_union() {
            // A none member only survives to here through an alias
            // target; it still marks the whole candidate optional.
            if let TypeExpr::Union(members) = descriptor.extracted() {
                optional |= members.iter().any(TypeExpr::is_none_type);
            }
            let members: Vec<TypeLike> = descriptor
                .union_members(self.cache)
                .iter()
                .map(|m| TypeLike::Type(m.clone()))
                .collect();
            let mut inner = self.distill_parts(&members, optional, chain);
            if inner.alias_chain.is_empty() {
                inner.alias_chain = alias_chain;
            }
            return inner;
        }

        if !descriptor.hierarchy(self.cache).all_vars(self.cache).is_empty() {
            let as_generic = Some(descriptor.extracted().clone());
            let origin = descriptor.origin_class(self.cache);
            return Self::finalize(
                DistilledForm::Single(origin),
                as_generic,
                alias_chain,
                optional,
            );
        }

        match descriptor.extracted() {
            TypeExpr::Class(class) | TypeExpr::Apply(class, _) => Self::finalize(
                DistilledForm::Single(*class),
                None,
                alias_chain,
                optional,
            ),
            other => Distilled::invalid(Some(other.clone()), optional),
        }
    }

    fn distill_parts(
        &self,
        parts: &[TypeLike],
        mut optional: bool,
        chain: &mut Vec<TypeExpr>,
    ) -> Distilled {
        let mut flat: Vec<ClassId> = Vec::new();
        let mut valid = true;

        for part in parts {
            // Each branch explores its own copy of the visited chain, so
            // repeated members do not read as cycles.
            let distilled = self.distill_guarded(part, &mut chain.clone());
            optional |= distilled.optional;
            valid &= distilled.is_valid();
            for class in distilled.classes() {
                if !flat.contains(&class) {
                    flat.push(class);
                }
            }
        }

        if !valid {
            return Distilled::invalid(None, optional);
        }
        let form = if flat.len() == 1 {
            DistilledForm::Single(flat[0])
        } else {
            DistilledForm::Many(flat)
        };
        Self::finalize(form, None, Vec::new(), optional)
    }

    fn peel(&self, candidate: &TypeLike, optional: &mut bool) -> Peeled {
        match candidate {
            TypeLike::Missing => Peeled::Missing,
            TypeLike::Value(value) if value.is_none() => Peeled::NoneValue,
            TypeLike::Value(_) => Peeled::Opaque,
            TypeLike::Many(parts) => Peeled::Many(parts.clone()),
            TypeLike::Proxy(proxy) => {
                *optional = *optional || proxy.meta().optional;
                self.peel(&TypeLike::Expr(proxy.meta().original.clone()), optional)
            }
            TypeLike::Type(typ) => {
                *optional = *optional || typ.optional();
                self.peel(&TypeLike::Expr(typ.extracted().clone()), optional)
            }
            TypeLike::Expr(expr) => {
                let mut expr = expr.clone();
                while let TypeExpr::Annotated(inner, _) = expr {
                    expr = *inner;
                }
                Peeled::Expr(expr)
            }
        }
    }

    /// Fold accumulated optionality into the form: the none type joins
    /// the tuple, last.
    fn finalize(
        form: DistilledForm,
        as_generic: Option<TypeExpr>,
        alias_chain: Vec<AliasId>,
        mut optional: bool,
    ) -> Distilled {
        if let DistilledForm::Many(classes) = &form {
            if classes.contains(&ClassId::NONE_TYPE) {
                optional = true;
            }
        }

        let form = if optional {
            match form {
                DistilledForm::Single(ClassId::NONE_TYPE) => {
                    DistilledForm::Single(ClassId::NONE_TYPE)
                }
                DistilledForm::Single(class) => {
                    DistilledForm::Many(vec![class, ClassId::NONE_TYPE])
                }
                DistilledForm::Many(classes) => {
                    let mut classes: Vec<ClassId> = classes
                        .into_iter()
                        .filter(|c| *c != ClassId::NONE_TYPE)
                        .collect();
                    classes.push(ClassId::NONE_TYPE);
                    DistilledForm::Many(classes)
                }
                invalid @ DistilledForm::Invalid(_) => invalid,
            }
        } else {
            form
        };

        Distilled {
            form,
            as_generic,
            alias_chain,
            optional,
        }
    }

    // ========================================
    // Predicates
    // ========================================

    /// Whether a value is an instance of the candidate. A none value is
    /// an instance of any optional candidate.
    pub fn is_instance(&self, value: &Value, candidate: &TypeLike) -> bool {
        let distilled = self.distill(candidate);
        if !distilled.is_valid() {
            return false;
        }
        if value.is_none() && distilled.optional {
            return true;
        }
        let registry = self.cache.registry();
        let class = value.class_of();
        distilled
            .classes()
            .iter()
            .any(|c| registry.descends_from(class, *c))
    }

    /// Whether `comparing` structurally descends from `comparing_to`.
    ///
    /// The right-hand side must distill to something valid; the left's
    /// distilled class must descend from one of the right's; alias
    /// chains must match suffix-for-suffix (a bare underlying type is
    /// not accepted where the alias is wanted); and bound parameters
    /// must pairwise satisfy the same rule, positions unbound on either
    /// side being skipped.
    pub fn is_subtype(&self, comparing: &TypeLike, comparing_to: &TypeLike) -> bool {
        let to = self.distill(comparing_to);
        if !to.is_valid() {
            return false;
        }
        let from = self.distill(comparing);

        let from_class = match &from.form {
            DistilledForm::Single(class) => *class,
            DistilledForm::Many(classes) => {
                let non_none: SmallVec<[ClassId; 4]> = classes
                    .iter()
                    .copied()
                    .filter(|c| *c != ClassId::NONE_TYPE)
                    .collect();
                match non_none.as_slice() {
                    [class] => *class,
                    _ => return false,
                }
            }
            DistilledForm::Invalid(_) => return false,
        };

        let registry = self.cache.registry();
        if !to
            .classes()
            .iter()
            .any(|tc| registry.descends_from(from_class, *tc))
        {
            return false;
        }

        if !from.alias_chain.ends_with(&to.alias_chain) {
            return false;
        }

        let from_vars = self.all_vars_of(comparing);
        let to_vars = self.all_vars_of(comparing_to);
        for (wanted, got) in to_vars.iter().zip(from_vars.iter()) {
            if let (VarValue::Bound(wanted), VarValue::Bound(got)) = (wanted, got) {
                if !self.is_subtype(
                    &TypeLike::Type(got.clone()),
                    &TypeLike::Type(wanted.clone()),
                ) {
                    return false;
                }
            }
        }

        true
    }

    fn all_vars_of(&self, candidate: &TypeLike) -> Rc<Vec<VarValue>> {
        let descriptor = match candidate {
            TypeLike::Expr(expr) => self.cache.disassemble(expr),
            TypeLike::Type(typ) => typ.clone(),
            TypeLike::Proxy(proxy) => self.cache.disassemble(&proxy.meta().original),
            _ => return Rc::new(Vec::new()),
        };
        descriptor.hierarchy(self.cache).all_vars(self.cache)
    }

    // ========================================
    // Matching
    // ========================================

    /// The dispatch-time compatibility predicate, distinct from plain
    /// subclassing.
    ///
    /// With `subclasses` false a handler only matches when both sides
    /// declare their fields from the same type, so a handler for an
    /// unrelated sibling sharing an ancestor never matches. Subclass
    /// tolerance is strictly opt-in. An unbound parameter fails unless
    /// `allow_missing_typevars`.
    pub fn matches(
        &self,
        checking: &TypeLike,
        check_against: &TypeLike,
        subclasses: bool,
        allow_missing_typevars: bool,
    ) -> bool {
        let dc = self.distill(checking);
        let da = self.distill(check_against);

        if da.is_valid() && !dc.is_valid() {
            // A concrete target checked against an actual value decides
            // by the host instance check, or exact type identity when
            // subclasses are not tolerated.
            if let TypeLike::Value(value) = checking {
                if subclasses {
                    return self.is_instance(value, check_against);
                }
                return da.classes().contains(&value.class_of());
            }
            return dc == da;
        }
        if !dc.is_valid() {
            return dc == da;
        }

        let c = self.cache.disassemble(&Self::rebuild(&dc));
        let a = self.cache.disassemble(&Self::rebuild(&da));

        if a.is_union() || c.is_union() || a.optional() || c.optional() {
            if a.optional() && c.extracted().is_none_type() {
                return true;
            }
            if c.optional() && !a.optional() {
                return false;
            }

            let c_members: Vec<Rc<Type>> = if c.is_union() {
                c.union_members(self.cache).as_ref().clone()
            } else {
                vec![c.clone()]
            };
            let a_members: Vec<Rc<Type>> = if a.is_union() {
                a.union_members(self.cache).as_ref().clone()
            } else {
                vec![a.clone()]
            };

            let covered = c_members.iter().all(|cm| {
                a_members
                    .iter()
                    .any(|am| self.matches_single(cm, am, subclasses, allow_missing_typevars))
            });
            if !covered {
                return false;
            }
            // Equal arity requires containment both ways: full
            // equivalence, not mere coverage.
            if c_members.len() == a_members.len() {
                return a_members.iter().all(|am| {
                    c_members
                        .iter()
                        .any(|cm| self.matches_single(am, cm, subclasses, allow_missing_typevars))
                });
            }
            true
        } else {
            self.matches_single(&c, &a, subclasses, allow_missing_typevars)
        }
    }

    /// Rebuild a distilled side into its best concrete-or-as-generic
    /// expression.
    fn rebuild(distilled: &Distilled) -> TypeExpr {
        match &distilled.form {
            DistilledForm::Single(class) => {
                let expr = distilled
                    .as_generic
                    .clone()
                    .unwrap_or(TypeExpr::Class(*class));
                if distilled.optional && !expr.is_none_type() {
                    TypeExpr::optional(expr)
                } else {
                    expr
                }
            }
            DistilledForm::Many(classes) => {
                TypeExpr::union_of(classes.iter().map(|c| TypeExpr::Class(*c)))
            }
            DistilledForm::Invalid(residue) => {
                residue.clone().unwrap_or(TypeExpr::OBJECT)
            }
        }
    }

    fn matches_single(
        &self,
        checking: &Rc<Type>,
        against: &Rc<Type>,
        subclasses: bool,
        allow_missing_typevars: bool,
    ) -> bool {
        if subclasses {
            if !self.is_subtype(
                &TypeLike::Type(checking.clone()),
                &TypeLike::Type(against.clone()),
            ) {
                return false;
            }
        } else {
            let checking_source = checking.fields_source();
            let against_source = against.fields_source();
            if checking_source != against_source {
                let dc = self.distill(&TypeLike::Expr(checking_source));
                let da = self.distill(&TypeLike::Expr(against_source));
                if !(dc.is_valid() && dc.form == da.form) {
                    return false;
                }
            }
        }

        let checking_vars = checking.hierarchy(self.cache).all_vars(self.cache);
        let against_vars = against.hierarchy(self.cache).all_vars(self.cache);
        for (cv, av) in checking_vars.iter().zip(against_vars.iter()) {
            match (cv, av) {
                (VarValue::Bound(cv), VarValue::Bound(av)) => {
                    if !self.matches(
                        &TypeLike::Type(cv.clone()),
                        &TypeLike::Type(av.clone()),
                        subclasses,
                        false,
                    ) {
                        return false;
                    }
                }
                _ => {
                    if !allow_missing_typevars {
                        return false;
                    }
                }
            }
        }

        true
    }

    // ========================================
    // Produced-value verification
    // ========================================

    /// Reject a produced value whose runtime type is a strict ancestor
    /// of the wanted type. A descendant or the type itself is fine; an
    /// ancestor never is.
    pub fn ensure_not_supertype(&self, produced: &Value, wanted: &Type) -> Result<(), TypeError> {
        let registry = self.cache.registry();
        let produced_class = produced.class_of();
        let wanted_class = wanted.origin_class(self.cache);

        let strict_ancestor = produced_class != wanted_class
            && registry.descends_from(wanted_class, produced_class);
        if strict_ancestor {
            return Err(TypeError::SubtypeConflict {
                produced: registry.lookup(registry.class_name(produced_class)).to_owned(),
                wanted: wanted.display(self.cache),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
