//! Canonical type descriptors.
//!
//! A [`Type`] is the canonical decomposition of one type expression: the
//! original expression, the extracted core, the optional layers it was
//! wrapped in, any annotation metadata, and the alias it was referenced
//! through. Exactly one descriptor exists per expression in a given cache;
//! derived data (score, hierarchy, proxy, union members) is computed
//! lazily and memoized on the descriptor.
//!
//! Descriptors hold no back-pointer to their cache: methods that need
//! derived data take the cache explicitly, and a descriptor must only ever
//! be used with the cache that created it.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use once_cell::unsync::OnceCell;
use rustc_hash::FxHashSet;
use tracing::trace;

use forma_ir::{AliasId, Annotation, ClassId, FieldConvention, TypeExpr, Value};

use crate::cache::TypeCache;
use crate::checkable::Checkable;
use crate::comparer::TypeLike;
use crate::error::TypeError;
use crate::extract::{extract_annotation, extract_optional};
use crate::fields::{reflect, Field};
use crate::hierarchy::Hierarchy;
use crate::score::Score;

/// What a descriptor's expression reduces to before any argument is
/// considered: the alias it was referenced through, or a class.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Origin {
    /// Referenced through a nominal alias.
    Alias(AliasId),
    /// A plain class origin.
    Class(ClassId),
}

/// Canonical decomposition of one type expression.
pub struct Type {
    original: TypeExpr,
    extracted: TypeExpr,
    type_alias: Option<AliasId>,
    optional_inner: bool,
    optional_outer: bool,
    annotations: Option<Vec<Annotation>>,

    score: OnceCell<Rc<Score>>,
    hierarchy: OnceCell<Rc<Hierarchy>>,
    checkable: OnceCell<Rc<Checkable>>,
    union_members: OnceCell<Rc<Vec<Rc<Type>>>>,
    raw_fields: OnceCell<Rc<Vec<Field>>>,
}

impl Type {
    /// Decompose an expression into a canonical descriptor, memoized by
    /// the cache. Calling twice with the same cache returns the identical
    /// descriptor.
    pub fn create(cache: &TypeCache, expr: &TypeExpr) -> Rc<Type> {
        if let Some(hit) = cache.get(expr) {
            return hit;
        }

        let original = expr.clone();

        // Strip one outer optional layer, then one layer of annotation
        // metadata; metadata may itself wrap an optional. When an outer
        // optional was stripped but no metadata found, retry annotation
        // extraction on the unwrapped form so "optional-of-annotated" and
        // "annotated-of-optional" decompose the same way.
        let (optional_outer, peeled) = extract_optional(expr);
        let (mut extracted, mut annotations) = extract_annotation(&peeled);
        let mut optional_inner = false;
        if annotations.is_some() {
            let (inner, stripped) = extract_optional(&extracted);
            optional_inner = inner;
            extracted = stripped;
        }
        if annotations.is_none() && optional_outer {
            let (again, retried) = extract_annotation(&peeled);
            extracted = again;
            annotations = retried;
        }

        let mut type_alias = None;
        if let TypeExpr::Alias(id) = extracted {
            type_alias = Some(id);
            extracted = cache.registry().alias_def(id).target;
        }

        let made = Rc::new(Type {
            original: original.clone(),
            extracted,
            type_alias,
            optional_inner,
            optional_outer,
            annotations,
            score: OnceCell::new(),
            hierarchy: OnceCell::new(),
            checkable: OnceCell::new(),
            union_members: OnceCell::new(),
            raw_fields: OnceCell::new(),
        });

        trace!(expr = ?original, "created descriptor");
        cache.insert(original, made.clone());
        made
    }

    // ========================================
    // Decomposition accessors
    // ========================================

    /// The original expression being wrapped.
    pub fn original(&self) -> &TypeExpr {
        &self.original
    }

    /// The extracted core, with optional, annotation, and alias layers
    /// removed.
    pub fn extracted(&self) -> &TypeExpr {
        &self.extracted
    }

    /// The alias the expression was referenced through, if any.
    pub fn alias(&self) -> Option<AliasId> {
        self.type_alias
    }

    /// True when the expression was referenced through an alias.
    pub fn is_type_alias(&self) -> bool {
        self.type_alias.is_some()
    }

    /// True when an optional was found nested inside the annotation.
    pub fn optional_inner(&self) -> bool {
        self.optional_inner
    }

    /// True when the expression carried an outer optional.
    pub fn optional_outer(&self) -> bool {
        self.optional_outer
    }

    /// True when either optional layer is present.
    pub fn optional(&self) -> bool {
        self.optional_inner || self.optional_outer
    }

    /// The annotation metadata, if the expression was annotated.
    pub fn annotations(&self) -> Option<&[Annotation]> {
        self.annotations.as_deref()
    }

    /// True when the expression was annotated.
    pub fn is_annotated(&self) -> bool {
        self.annotations.is_some()
    }

    /// True when the extracted core is a union.
    pub fn is_union(&self) -> bool {
        self.extracted.is_union()
    }

    /// The origin: the alias the expression was referenced through, or
    /// the class behind the extracted core.
    pub fn origin(&self) -> Origin {
        if let Some(id) = self.type_alias {
            return Origin::Alias(id);
        }
        match &self.extracted {
            TypeExpr::Class(id) | TypeExpr::Apply(id, _) => Origin::Class(*id),
            TypeExpr::Union(_) => Origin::Class(ClassId::UNION_KIND),
            TypeExpr::Var(_) => Origin::Class(ClassId::TYPE_VAR_KIND),
            TypeExpr::Alias(id) => Origin::Alias(*id),
            TypeExpr::Annotated(..) | TypeExpr::Forward(_) => Origin::Class(ClassId::OBJECT),
        }
    }

    /// The origin as an expression, for structural comparison.
    pub fn origin_expr(&self) -> TypeExpr {
        match self.origin() {
            Origin::Alias(id) => TypeExpr::Alias(id),
            Origin::Class(id) => TypeExpr::Class(id),
        }
    }

    /// The class behind the origin, chasing alias indirection. A cyclic
    /// alias chain lands on the root class rather than looping.
    pub fn origin_class(&self, cache: &TypeCache) -> ClassId {
        let registry = cache.registry();
        let mut seen: FxHashSet<AliasId> = FxHashSet::default();
        let mut expr = self.extracted.clone();
        loop {
            match expr {
                TypeExpr::Class(id) | TypeExpr::Apply(id, _) => return id,
                TypeExpr::Union(_) => return ClassId::UNION_KIND,
                TypeExpr::Var(_) => return ClassId::TYPE_VAR_KIND,
                TypeExpr::Annotated(inner, _) => expr = *inner,
                TypeExpr::Alias(id) => {
                    if !seen.insert(id) {
                        return ClassId::OBJECT;
                    }
                    expr = registry.alias_def(id).target;
                }
                TypeExpr::Forward(_) => return ClassId::OBJECT,
            }
        }
    }

    // ========================================
    // Reassembly and projections
    // ========================================

    /// Re-wrap an expression under this descriptor's optional and
    /// annotation envelope, each layer included on request.
    pub fn reassemble(
        &self,
        resolved: TypeExpr,
        with_annotation: bool,
        with_optional: bool,
    ) -> TypeExpr {
        let mut resolved = resolved;
        if self.optional_inner && with_optional {
            resolved = TypeExpr::optional(resolved);
        }
        if with_annotation {
            if let Some(annotations) = &self.annotations {
                resolved = TypeExpr::annotated(resolved, annotations.clone());
            }
        }
        if self.optional_outer && with_optional && (with_annotation || !self.optional_inner) {
            resolved = TypeExpr::optional(resolved);
        }
        resolved
    }

    fn alias_or_extracted(&self) -> TypeExpr {
        self.type_alias
            .map(TypeExpr::Alias)
            .unwrap_or_else(|| self.extracted.clone())
    }

    /// This expression without its optional layers.
    pub fn without_optional(&self) -> TypeExpr {
        self.reassemble(self.alias_or_extracted(), true, false)
    }

    /// This expression without its annotation.
    pub fn without_annotation(&self) -> TypeExpr {
        self.reassemble(self.alias_or_extracted(), false, true)
    }

    /// The expressions relevant to this descriptor: the none type when
    /// optional, the members when a union, or the bare extracted class.
    pub fn relevant_exprs(&self) -> Vec<TypeExpr> {
        let mut relevant = Vec::new();
        if self.optional() {
            relevant.push(TypeExpr::NONE);
        }
        match &self.extracted {
            TypeExpr::Union(members) => relevant.extend(members.iter().cloned()),
            class @ TypeExpr::Class(_) => relevant.push(class.clone()),
            _ => {}
        }
        relevant
    }

    // ========================================
    // Derived data
    // ========================================

    /// Non-optional union members, sorted most specific first. Empty when
    /// this is not a union.
    pub fn union_members(&self, cache: &TypeCache) -> Rc<Vec<Rc<Type>>> {
        self.union_members
            .get_or_init(|| {
                let mut members: Vec<Rc<Type>> = match &self.extracted {
                    TypeExpr::Union(members) => members
                        .iter()
                        .filter(|m| !m.is_none_type())
                        .map(|m| cache.disassemble(m))
                        .collect(),
                    _ => Vec::new(),
                };
                members.sort_by(|a, b| b.score(cache).cmp(&a.score(cache)));
                Rc::new(members)
            })
            .clone()
    }

    /// The specificity score. Computed once per descriptor.
    pub fn score(&self, cache: &TypeCache) -> Rc<Score> {
        self.score
            .get_or_init(|| Rc::new(Score::create(cache, self)))
            .clone()
    }

    /// The generic hierarchy of the extracted core.
    pub fn hierarchy(&self, cache: &TypeCache) -> Rc<Hierarchy> {
        self.hierarchy
            .get_or_init(|| Rc::new(Hierarchy::create(cache, &self.extracted)))
            .clone()
    }

    /// The checkable stand-in for this descriptor.
    pub fn checkable(&self, cache: &TypeCache) -> Rc<Checkable> {
        self.checkable
            .get_or_init(|| Rc::new(Checkable::create(cache, self)))
            .clone()
    }

    /// Specificity ordering against another descriptor. Delegates
    /// entirely to score comparison; the signature makes ordering against
    /// a non-descriptor unrepresentable.
    pub fn cmp_specificity(&self, cache: &TypeCache, other: &Type) -> std::cmp::Ordering {
        self.score(cache).cmp(&other.score(cache))
    }

    // ========================================
    // Fields
    // ========================================

    /// The source to reflect fields from: the union itself, or the
    /// origin.
    pub fn fields_source(&self) -> TypeExpr {
        if self.is_union() {
            self.extracted.clone()
        } else {
            self.origin_expr()
        }
    }

    /// The reflection strategy for this descriptor, if it has one.
    ///
    /// Unions, builtins, the unspecified marker, and aliases yield none.
    /// Declarative conventions apply through a parameterized application;
    /// the signature convention only to a bare class.
    fn reflector(&self, cache: &TypeCache) -> Option<(FieldConvention, ClassId)> {
        let TypeExpr::Class(class) = self.fields_source() else {
            return None;
        };
        if class.is_builtin() {
            return None;
        }
        match cache.registry().class_convention(class) {
            FieldConvention::Declared => Some((FieldConvention::Declared, class)),
            FieldConvention::Record => Some((FieldConvention::Record, class)),
            FieldConvention::Signature => match self.extracted {
                TypeExpr::Class(_) => Some((FieldConvention::Signature, class)),
                _ => None,
            },
        }
    }

    /// Whether this descriptor represents a class with fields.
    pub fn has_fields(&self, cache: &TypeCache) -> bool {
        self.reflector(cache).is_some()
    }

    /// The fields declared directly on this descriptor's class, without
    /// resolving type variables. Empty when there is no strategy.
    pub fn raw_fields(&self, cache: &TypeCache) -> Rc<Vec<Field>> {
        self.raw_fields
            .get_or_init(|| match self.reflector(cache) {
                Some((convention, class)) => Rc::new(reflect(cache, convention, class)),
                None => Rc::new(Vec::new()),
            })
            .clone()
    }

    /// The fields over the whole hierarchy, with type variables resolved
    /// to their bound values. Empty for unions.
    pub fn fields(&self, cache: &TypeCache) -> Rc<Vec<Field>> {
        if self.is_union() {
            return Rc::new(Vec::new());
        }
        self.hierarchy(cache).fields(cache)
    }

    /// Alias of [`Type::fields`] for callers that distinguish the raw
    /// declaration list from the resolved one.
    pub fn typed_fields(&self, cache: &TypeCache) -> Rc<Vec<Field>> {
        self.fields(cache)
    }

    /// Match the filled type parameters against expected ancestors.
    pub fn find_generic_subtype(
        &self,
        cache: &TypeCache,
        want: &[TypeExpr],
    ) -> Result<Vec<Rc<Type>>, TypeError> {
        self.hierarchy(cache).find_subtypes(cache, want)
    }

    // ========================================
    // Dispatch
    // ========================================

    /// Choose the most appropriate handler to create this type from.
    ///
    /// Options are ranked most specific first. The first pass requires an
    /// exact structural match; only if nothing matched is a second pass
    /// run with subclass tolerance, so an exact or union match is never
    /// shadowed by a looser ancestor match.
    pub fn func_from<'a, H>(
        &self,
        cache: &TypeCache,
        options: &'a [(Rc<Type>, H)],
    ) -> Option<&'a H> {
        let mut ranked: Vec<&(Rc<Type>, H)> = options.iter().collect();
        ranked.sort_by(|a, b| b.0.score(cache).cmp(&a.0.score(cache)));

        let comparer = cache.comparer();
        let checking = TypeLike::Expr(self.original.clone());

        for pair in &ranked {
            if comparer.matches(&checking, &TypeLike::Type(pair.0.clone()), false, false) {
                return Some(&pair.1);
            }
        }
        for pair in &ranked {
            if comparer.matches(&checking, &TypeLike::Type(pair.0.clone()), true, false) {
                return Some(&pair.1);
            }
        }
        None
    }

    /// Whether this type represents the type of the given value.
    pub fn is_type_for(&self, cache: &TypeCache, value: &Value) -> bool {
        cache
            .comparer()
            .is_instance(value, &TypeLike::Expr(self.original.clone()))
    }

    /// Whether this type is the type of the value, or the value's class
    /// structurally descends from it.
    pub fn is_equivalent_type_for(&self, cache: &TypeCache, value: &Value) -> bool {
        self.is_type_for(cache, value)
            || cache.comparer().is_subtype(
                &TypeLike::Expr(TypeExpr::Class(value.class_of())),
                &TypeLike::Expr(self.original.clone()),
            )
    }

    // ========================================
    // Equality
    // ========================================

    /// The rich equality predicate over comparison candidates.
    ///
    /// True when the candidate is the missing sentinel; a proxy or
    /// descriptor backing the same expression; the expression itself or
    /// its extracted core when annotated; the none value when optional;
    /// the bare origin when parameters are unbound; one of a union's
    /// members; a union whose member set is covered by the relevant
    /// expressions; or a member of the relevant expressions itself.
    pub fn equivalent(&self, cache: &TypeCache, other: &TypeLike) -> bool {
        match other {
            TypeLike::Missing => true,
            TypeLike::Proxy(proxy) => {
                self.equivalent(cache, &TypeLike::Expr(proxy.meta().original.clone()))
            }
            TypeLike::Type(other) => {
                self.equivalent(cache, &TypeLike::Expr(other.original.clone()))
            }
            TypeLike::Value(value) => value.is_none() && self.optional(),
            TypeLike::Many(parts) => {
                let relevant = self.relevant_exprs();
                parts.iter().all(|part| match part.as_expr() {
                    Some(expr) => relevant.contains(&expr),
                    None => false,
                })
            }
            TypeLike::Expr(expr) => self.equivalent_expr(cache, expr),
        }
    }

    fn equivalent_expr(&self, cache: &TypeCache, expr: &TypeExpr) -> bool {
        let registry = cache.registry();

        // Unwrap one alias layer on the right-hand side; two aliased
        // expressions are equal only when the alias identity matches.
        let mut other_alias = None;
        let mut expr = expr.clone();
        if let TypeExpr::Alias(id) = expr {
            other_alias = Some(id);
            expr = registry.alias_def(id).target;
        }
        if self.is_type_alias() && other_alias.is_some() {
            return self.type_alias == other_alias;
        }

        if expr == self.original
            || (self.is_annotated() && expr == self.extracted)
            || (self.optional() && expr.is_none_type())
            || (!self.hierarchy(cache).all_vars(cache).is_empty() && expr == self.origin_expr())
        {
            return true;
        }
        if self.is_union()
            && self
                .union_members(cache)
                .iter()
                .any(|m| m.equivalent(cache, &TypeLike::Expr(expr.clone())))
        {
            return true;
        }

        if let TypeExpr::Union(members) = &expr {
            let relevant = self.relevant_exprs();
            return members.iter().all(|m| relevant.contains(m));
        }

        for part in self.relevant_exprs() {
            if part == expr {
                return true;
            }
            let part = cache.disassemble(&part);
            if (part.is_annotated() && expr == part.extracted)
                || (!part.hierarchy(cache).all_vars(cache).is_empty()
                    && expr == part.origin_expr())
                || (part.is_union()
                    && part
                        .union_members(cache)
                        .iter()
                        .any(|m| m.equivalent(cache, &TypeLike::Expr(expr.clone()))))
            {
                return true;
            }
        }

        false
    }

    // ========================================
    // Display
    // ========================================

    /// A string close to how the developer writes the original
    /// expression.
    pub fn display(&self, cache: &TypeCache) -> String {
        let registry = cache.registry();

        let mut result = if self.is_union() {
            let parts: Vec<String> = self
                .union_members(cache)
                .iter()
                .map(|m| m.display(cache))
                .collect();
            parts.join(" | ")
        } else if !self.hierarchy(cache).typevars(cache).is_empty() {
            let name = match self.extracted.applied_class() {
                Some(class) => registry.lookup(registry.class_name(class)).to_owned(),
                None => registry.render_expr(&self.extracted),
            };
            let signature = self.hierarchy(cache).signature_display(cache);
            if signature.is_empty() {
                name
            } else {
                format!("{name}[{signature}]")
            }
        } else if let Some(alias) = self.type_alias {
            registry.lookup(registry.alias_def(alias).name).to_owned()
        } else {
            let want = if self.is_annotated() || self.optional() {
                &self.extracted
            } else {
                &self.original
            };
            registry.render_expr(want)
        };

        if self.optional_inner {
            result = format!("{result} | None");
        }
        if let Some(annotations) = &self.annotations {
            if !annotations.is_empty() {
                let rendered: Vec<String> = annotations
                    .iter()
                    .map(|a| match a {
                        Annotation::Str(s) => format!("{s:?}"),
                        Annotation::Int(i) => i.to_string(),
                        Annotation::Bool(b) => b.to_string(),
                        Annotation::Label(name) => registry.lookup(*name).to_owned(),
                    })
                    .collect();
                result = format!("Annotated[{result}, {}]", rendered.join(", "));
            }
        }
        if self.optional_outer {
            result = format!("{result} | None");
        }

        result
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        self.original == other.original
    }
}

impl Eq for Type {}

impl Hash for Type {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.original.hash(state);
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Type")
            .field("original", &self.original)
            .field("extracted", &self.extracted)
            .field("type_alias", &self.type_alias)
            .field("optional_inner", &self.optional_inner)
            .field("optional_outer", &self.optional_outer)
            .field("annotations", &self.annotations)
            .finish_non_exhaustive()
    }
}
