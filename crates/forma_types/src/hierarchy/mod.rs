//! Generic hierarchy resolution.
//!
//! A [`Hierarchy`] records how a descriptor's type parameters are bound
//! across multi-level inheritance: the origin class, the supplied
//! arguments, the raw ancestor chain, the immediate declared bases, and an
//! ordered binding map from `(owning class, parameter)` to a value.
//!
//! When a base's parameter is expressed in terms of one of the origin's own
//! parameters, the binding is an explicit [`Referral`] record rather than a
//! raw value; a second pass chases every referral to its terminal value
//! with a visited-set guard, so no unresolved indirection survives
//! construction. Self-referential hierarchies are expected input, not an
//! error.

use std::rc::Rc;

use indexmap::IndexMap;
use once_cell::unsync::OnceCell;
use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use tracing::trace;

use forma_ir::{ClassId, TypeExpr, TypeVarId};

use crate::cache::TypeCache;
use crate::comparer::TypeLike;
use crate::descriptor::Type;
use crate::error::TypeError;
use crate::fields::Field;

/// Key of one parameter slot: a declared named parameter, or a 1-based
/// position for plain parameterized containers that declare none.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum VarKey {
    /// A declared type variable.
    Named(TypeVarId),
    /// A positional slot (1-based) on a container without declared
    /// parameters.
    Position(usize),
}

/// Full key of a binding: the owning class and the parameter slot.
pub type BindingKey = (ClassId, VarKey);

/// An indirection record: this ancestor's parameter takes whatever the
/// descendant bound for its own corresponding parameter.
#[derive(Clone, Debug, PartialEq)]
pub struct Referral {
    /// The descendant class owning the referred-to parameter.
    pub owner: ClassId,
    /// The descendant's parameter.
    pub var: VarKey,
    /// Terminal value after the chase pass; `Bound` or `Missing`, never
    /// another referral.
    pub resolved: Box<Binding>,
}

/// Value bound to one parameter slot.
#[derive(Clone, Debug, PartialEq)]
pub enum Binding {
    /// A concrete bound expression.
    Bound(TypeExpr),
    /// Nothing bound yet.
    Missing,
    /// Bound through the descendant's own parameter.
    Referral(Referral),
}

impl Binding {
    /// The terminal expression of this binding, chasing a referral's
    /// resolved value.
    pub fn terminal(&self) -> Option<&TypeExpr> {
        match self {
            Binding::Bound(expr) => Some(expr),
            Binding::Missing => None,
            Binding::Referral(referral) => match referral.resolved.as_ref() {
                Binding::Bound(expr) => Some(expr),
                _ => None,
            },
        }
    }
}

/// One entry of the flattened parameter tuple.
#[derive(Clone, Debug)]
pub enum VarValue {
    /// A bound parameter, as a descriptor.
    Bound(Rc<Type>),
    /// The missing-parameter sentinel.
    Missing,
}

impl VarValue {
    /// Whether a value is bound.
    pub fn is_bound(&self) -> bool {
        matches!(self, VarValue::Bound(_))
    }
}

/// The resolved generic hierarchy of one descriptor.
pub struct Hierarchy {
    start: TypeExpr,
    origin: Option<ClassId>,
    args: Vec<TypeExpr>,
    mro: Vec<ClassId>,
    bases: Vec<Rc<Type>>,
    typevars: OnceCell<Rc<IndexMap<BindingKey, Binding>>>,
    all_vars: OnceCell<Rc<Vec<VarValue>>>,
    raw_fields: OnceCell<Rc<Vec<Field>>>,
    fields: OnceCell<Rc<Vec<Field>>>,
}

impl Hierarchy {
    /// Build the hierarchy for a peeled expression.
    pub(crate) fn create(cache: &TypeCache, start: &TypeExpr) -> Hierarchy {
        let registry = cache.registry();

        let args: Vec<TypeExpr> = match start {
            TypeExpr::Apply(_, args) => args.clone(),
            TypeExpr::Union(members) => members.clone(),
            _ => Vec::new(),
        };

        let origin: Option<ClassId> = match start {
            TypeExpr::Class(id) | TypeExpr::Apply(id, _) => Some(*id),
            TypeExpr::Union(_) => Some(ClassId::UNION_KIND),
            _ => None,
        };

        let mro: Vec<ClassId> = origin.map(|id| registry.class_mro(id)).unwrap_or_default();

        // Prefer a class's own declared parameterized bases over the raw
        // chain, but only when a declared base is the chain's immediate
        // next entry; transitively inherited declarations do not count.
        let base_exprs: Vec<TypeExpr> = match origin {
            Some(id) => {
                let declared = registry.class_bases(id);
                let direct = mro.len() > 1
                    && declared
                        .iter()
                        .any(|base| base.applied_class() == Some(mro[1]));
                if direct {
                    declared
                } else {
                    mro.iter().skip(1).map(|c| TypeExpr::Class(*c)).collect()
                }
            }
            None => Vec::new(),
        };
        let bases: Vec<Rc<Type>> = base_exprs.iter().map(|b| cache.disassemble(b)).collect();

        Hierarchy {
            start: start.clone(),
            origin,
            args,
            mro,
            bases,
            typevars: OnceCell::new(),
            all_vars: OnceCell::new(),
            raw_fields: OnceCell::new(),
            fields: OnceCell::new(),
        }
    }

    /// The expression the hierarchy was built from.
    pub fn start(&self) -> &TypeExpr {
        &self.start
    }

    /// The origin class, when the expression has one.
    pub fn origin(&self) -> Option<ClassId> {
        self.origin
    }

    /// The supplied type arguments.
    pub fn args(&self) -> &[TypeExpr] {
        &self.args
    }

    /// The raw ancestor chain, starting with the origin.
    pub fn mro(&self) -> &[ClassId] {
        &self.mro
    }

    /// The immediate declared bases, as descriptors.
    pub fn bases(&self) -> &[Rc<Type>] {
        &self.bases
    }

    // ========================================
    // Parameter bindings
    // ========================================

    /// The ordered binding map over the whole hierarchy.
    ///
    /// First occurrence wins when the same slot would be inserted twice;
    /// every referral carries its terminal value after construction.
    pub fn typevars(&self, cache: &TypeCache) -> Rc<IndexMap<BindingKey, Binding>> {
        self.typevars
            .get_or_init(|| Rc::new(self.build_typevars(cache)))
            .clone()
    }

    fn build_typevars(&self, cache: &TypeCache) -> IndexMap<BindingKey, Binding> {
        let registry = cache.registry();
        let mut values: IndexMap<BindingKey, Binding> = IndexMap::new();

        let params: Vec<TypeVarId> = self
            .origin
            .map(|id| registry.class_params(id))
            .unwrap_or_default();

        if let Some(origin) = self.origin {
            // Zip the origin's own parameters against the supplied
            // arguments; positional slots stand in where no named
            // parameter exists.
            let slots = params.len().max(self.args.len());
            for index in 0..slots {
                match (params.get(index), self.args.get(index)) {
                    (Some(param), arg) => {
                        let binding = arg
                            .map(|a| Binding::Bound(a.clone()))
                            .unwrap_or(Binding::Missing);
                        values.insert((origin, VarKey::Named(*param)), binding);
                    }
                    (None, Some(arg)) => {
                        values.insert(
                            (origin, VarKey::Position(index + 1)),
                            Binding::Bound(arg.clone()),
                        );
                    }
                    (None, None) => {}
                }
            }

            // Merge each base's bindings; a base parameter expressed in
            // terms of one of the origin's own parameters becomes a
            // referral to be chased below.
            for base in &self.bases {
                let base_vars = base.hierarchy(cache).typevars(cache);
                for ((owner, var), value) in base_vars.iter() {
                    if values.contains_key(&(*owner, *var)) {
                        continue;
                    }
                    let value = match value {
                        Binding::Bound(TypeExpr::Var(tv)) if params.contains(tv) => {
                            Binding::Referral(Referral {
                                owner: origin,
                                var: VarKey::Named(*tv),
                                resolved: Box::new(Binding::Missing),
                            })
                        }
                        Binding::Bound(TypeExpr::Var(_)) => Binding::Missing,
                        other => other.clone(),
                    };
                    values.insert((*owner, *var), value);
                }
            }
        }

        // Chase every referral to its terminal value. The chase follows
        // the map, not the stored values, so chains through several bases
        // land on the same terminal; a visited set makes cycles resolve to
        // missing instead of looping.
        let mut terminals: Vec<(BindingKey, Binding)> = Vec::new();
        for (key, value) in &values {
            if let Binding::Referral(referral) = value {
                let mut seen: FxHashSet<BindingKey> = FxHashSet::default();
                let mut cursor = (referral.owner, referral.var);
                let terminal = loop {
                    if !seen.insert(cursor) {
                        break Binding::Missing;
                    }
                    match values.get(&cursor) {
                        Some(Binding::Referral(next)) => cursor = (next.owner, next.var),
                        Some(Binding::Bound(expr)) => break Binding::Bound(expr.clone()),
                        Some(Binding::Missing) | None => break Binding::Missing,
                    }
                };
                terminals.push((*key, terminal));
            }
        }
        for (key, terminal) in terminals {
            if let Some(Binding::Referral(referral)) = values.get_mut(&key) {
                trace!(?key, ?terminal, "resolved referral");
                referral.resolved = Box::new(terminal);
            }
        }

        values
    }

    /// The flattened, position-ordered parameter tuple, deduplicated by
    /// slot with the most-derived binding kept.
    pub fn all_vars(&self, cache: &TypeCache) -> Rc<Vec<VarValue>> {
        self.all_vars
            .get_or_init(|| Rc::new(self.build_all_vars(cache)))
            .clone()
    }

    fn build_all_vars(&self, cache: &TypeCache) -> Vec<VarValue> {
        if self.origin == Some(ClassId::UNION_KIND) {
            return Vec::new();
        }

        let typevars = self.typevars(cache);
        if !self.args.is_empty() && typevars.is_empty() {
            return self
                .args
                .iter()
                .map(|a| VarValue::Bound(cache.disassemble(a)))
                .collect();
        }

        let mut found: FxHashSet<BindingKey> = FxHashSet::default();
        let mut result: Vec<VarValue> = Vec::new();

        for (key, value) in typevars.iter().rev() {
            let (key, value) = match value {
                Binding::Referral(referral) => (
                    (referral.owner, referral.var),
                    referral.resolved.as_ref().clone(),
                ),
                other => (*key, other.clone()),
            };
            if !found.insert(key) {
                continue;
            }
            let var = match value {
                Binding::Bound(expr) => VarValue::Bound(cache.disassemble(&expr)),
                _ => VarValue::Missing,
            };
            result.insert(0, var);
        }

        result
    }

    /// Match the filled parameters against a list of wanted ancestors.
    ///
    /// Fails when fewer bound parameters than wanted exist, or when a
    /// bound parameter is not a structural descendant of the
    /// corresponding ancestor.
    pub fn find_subtypes(
        &self,
        cache: &TypeCache,
        want: &[TypeExpr],
    ) -> Result<Vec<Rc<Type>>, TypeError> {
        let typevars = self.typevars(cache);
        let mut result: Vec<Rc<Type>> = Vec::new();

        for (index, wanted) in want.iter().enumerate() {
            let Some((_, binding)) = typevars.get_index(index) else {
                return Err(TypeError::GenericArityMismatch {
                    bound: typevars.len(),
                    wanted: want.len(),
                });
            };

            let Some(expr) = binding.terminal() else {
                return Err(TypeError::GenericSubtypeMismatch {
                    found: "<missing>".to_owned(),
                    wanted: cache.registry().render_expr(wanted),
                });
            };

            let typ = cache.disassemble(expr);
            let fits = cache
                .comparer()
                .is_subtype(&TypeLike::Type(typ.clone()), &TypeLike::Expr(wanted.clone()));
            if !fits {
                return Err(TypeError::GenericSubtypeMismatch {
                    found: typ.display(cache),
                    wanted: cache.registry().render_expr(wanted),
                });
            }
            result.push(typ);
        }

        Ok(result)
    }

    // ========================================
    // Fields
    // ========================================

    /// All fields over the ancestor chain, oldest first, overlaid by
    /// name, without resolving type variables.
    ///
    /// A more derived declaration overwrites default, kind, type, and
    /// current owner; the original declaring owner is never overwritten.
    pub fn raw_fields(&self, cache: &TypeCache) -> Rc<Vec<Field>> {
        self.raw_fields
            .get_or_init(|| Rc::new(self.build_raw_fields(cache)))
            .clone()
    }

    fn build_raw_fields(&self, cache: &TypeCache) -> Vec<Field> {
        let mut result: Vec<Field> = Vec::new();

        for class in self.mro.iter().rev() {
            let descriptor = cache.disassemble(&TypeExpr::Class(*class));
            for field in descriptor.raw_fields(cache).iter() {
                if let Some(existing) = result.iter_mut().find(|f| f.name == field.name) {
                    existing.default = field.default.clone();
                    existing.kind = field.kind;
                    existing.ty = field.ty.clone();
                    existing.owner = *class;
                } else {
                    result.push(field.clone());
                }
            }
        }

        result
    }

    /// All fields over the ancestor chain, with fields declared as one of
    /// the hierarchy's own parameters replaced by the actual bound value,
    /// re-wrapped under the field's optional/annotation envelope.
    pub fn fields(&self, cache: &TypeCache) -> Rc<Vec<Field>> {
        self.fields
            .get_or_init(|| Rc::new(self.build_fields(cache)))
            .clone()
    }

    fn build_fields(&self, cache: &TypeCache) -> Vec<Field> {
        let typevars = self.typevars(cache);
        let mut result: Vec<Field> = Vec::new();

        for field in self.raw_fields(cache).iter() {
            let TypeExpr::Var(tv) = field.ty.extracted() else {
                result.push(field.clone());
                continue;
            };

            // The declaring owner's slot decides the replacement; fall
            // back to any owner binding the same variable, then to the
            // unconstrained type.
            let binding = typevars
                .get(&(field.original_owner, VarKey::Named(*tv)))
                .or_else(|| {
                    typevars
                        .iter()
                        .find(|((_, var), _)| *var == VarKey::Named(*tv))
                        .map(|(_, value)| value)
                });
            let replacement = binding
                .and_then(Binding::terminal)
                .cloned()
                .unwrap_or(TypeExpr::OBJECT);

            let rewrapped = field.ty.reassemble(replacement, true, true);
            result.push(field.with_type(cache.disassemble(&rewrapped)));
        }

        result
    }

    // ========================================
    // Display
    // ========================================

    /// The filled-parameter signature suffix used in display forms, empty
    /// when there is nothing to show.
    pub fn signature_display(&self, cache: &TypeCache) -> String {
        let registry = cache.registry();
        let typevars = self.typevars(cache);

        let mut found_with_missing: FxHashSet<ClassId> = FxHashSet::default();
        let mut signature: SmallVec<[(VarKey, Binding); 4]> = SmallVec::new();

        for ((owner, var), value) in typevars.iter() {
            let owner_is_base = self
                .bases
                .iter()
                .any(|b| b.extracted().applied_class() == Some(*owner));
            if matches!(value, Binding::Missing) && owner_is_base {
                found_with_missing.insert(*owner);
                if found_with_missing.len() > 1 {
                    continue;
                }
                signature.push((*var, value.clone()));
            } else if Some(*owner) == self.origin && !matches!(value, Binding::Referral(_)) {
                signature.push((*var, value.clone()));
            }
        }

        if signature.is_empty() {
            return String::new();
        }

        let rendered: Vec<String> = signature
            .iter()
            .map(|(var, value)| match value.terminal() {
                Some(expr) => cache.disassemble(expr).display(cache),
                None => match var {
                    VarKey::Named(tv) => format!("~{}", registry.lookup(registry.typevar_name(*tv))),
                    VarKey::Position(index) => format!("~{index}"),
                },
            })
            .collect();

        rendered.join(", ")
    }
}
