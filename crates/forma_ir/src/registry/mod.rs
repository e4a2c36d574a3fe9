//! Registry of the class universe.
//!
//! The registry stores every class, alias, and type variable the engine can
//! reason about, hands out the compact identifiers the rest of the engine
//! uses, and owns the string interner behind [`Name`].
//!
//! # Design
//!
//! - Append-only: identifiers stay valid for the registry's lifetime.
//! - The ancestor chain of a class is linearized (C3) and validated at
//!   registration, so bases must be registered before their subclasses.
//! - Interior mutability via `RefCell`; the registry is single-threaded and
//!   accessors copy out the small pieces callers need rather than holding
//!   borrows across calls.
//! - The one-shot forward-reference pass rewrites `Forward` nodes inside
//!   the per-class field declaration arenas in place. Callers that cache
//!   descriptors must invalidate them afterwards.

use std::cell::RefCell;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::{
    AliasDef, AliasId, Annotation, ClassDef, ClassId, FieldConvention, FieldDecl, Name,
    StringInterner, TypeExpr, TypeVarDef, TypeVarId,
};

/// Errors raised while building or mutating the class universe.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// A declared base is not a class shape or is not registered yet.
    #[error("base `{base}` of `{class}` is not a registered class")]
    UnknownBase {
        /// The class being registered.
        class: String,
        /// Rendering of the offending base expression.
        base: String,
    },

    /// The declared bases admit no consistent linearization.
    #[error("cannot linearize the bases of `{class}`")]
    InconsistentHierarchy {
        /// The class being registered.
        class: String,
    },

    /// A forward reference names nothing in the registry.
    #[error("forward reference `{name}` does not resolve to a class or alias")]
    UnknownForwardReference {
        /// The unresolved name.
        name: String,
    },
}

#[derive(Default)]
struct RegistryInner {
    classes: Vec<ClassDef>,
    class_by_name: FxHashMap<Name, ClassId>,
    aliases: Vec<AliasDef>,
    alias_by_name: FxHashMap<Name, AliasId>,
    typevars: Vec<TypeVarDef>,
}

/// The class universe.
pub struct Registry {
    interner: StringInterner,
    builtins_module: Name,
    inner: RefCell<RegistryInner>,
}

impl Registry {
    /// Create a registry with the builtin classes pre-registered.
    pub fn new() -> Self {
        let interner = StringInterner::new();
        let builtins_module = interner.intern(StringInterner::BUILTINS_MODULE);
        let registry = Self {
            interner,
            builtins_module,
            inner: RefCell::new(RegistryInner::default()),
        };
        registry.seed_builtins();
        registry
    }

    /// The string interner behind [`Name`].
    pub fn interner(&self) -> &StringInterner {
        &self.interner
    }

    /// Intern a string.
    pub fn intern(&self, s: &str) -> Name {
        self.interner.intern(s)
    }

    /// Look up the string for a name.
    pub fn lookup(&self, name: Name) -> &'static str {
        self.interner.lookup(name)
    }

    fn seed_builtins(&self) {
        // Index order must match the ClassId constants. Chains are spelled
        // out because bool's base (int) is seeded after it.
        let builtins: &[(&str, &str, &[ClassId], &[ClassId])] = &[
            ("object", StringInterner::BUILTINS_MODULE, &[], &[]),
            (
                "NoneType",
                StringInterner::BUILTINS_MODULE,
                &[ClassId::OBJECT],
                &[ClassId::OBJECT],
            ),
            (
                "bool",
                StringInterner::BUILTINS_MODULE,
                &[ClassId::INT],
                &[ClassId::INT, ClassId::OBJECT],
            ),
            (
                "int",
                StringInterner::BUILTINS_MODULE,
                &[ClassId::OBJECT],
                &[ClassId::OBJECT],
            ),
            (
                "float",
                StringInterner::BUILTINS_MODULE,
                &[ClassId::OBJECT],
                &[ClassId::OBJECT],
            ),
            (
                "str",
                StringInterner::BUILTINS_MODULE,
                &[ClassId::OBJECT],
                &[ClassId::OBJECT],
            ),
            (
                "bytes",
                StringInterner::BUILTINS_MODULE,
                &[ClassId::OBJECT],
                &[ClassId::OBJECT],
            ),
            (
                "list",
                StringInterner::BUILTINS_MODULE,
                &[ClassId::OBJECT],
                &[ClassId::OBJECT],
            ),
            (
                "set",
                StringInterner::BUILTINS_MODULE,
                &[ClassId::OBJECT],
                &[ClassId::OBJECT],
            ),
            (
                "dict",
                StringInterner::BUILTINS_MODULE,
                &[ClassId::OBJECT],
                &[ClassId::OBJECT],
            ),
            (
                "tuple",
                StringInterner::BUILTINS_MODULE,
                &[ClassId::OBJECT],
                &[ClassId::OBJECT],
            ),
            ("NotSpecified", "forma", &[ClassId::OBJECT], &[ClassId::OBJECT]),
            ("UnionType", "types", &[ClassId::OBJECT], &[ClassId::OBJECT]),
            ("TypeVar", "typing", &[ClassId::OBJECT], &[ClassId::OBJECT]),
        ];

        let mut inner = self.inner.borrow_mut();
        for (index, (name, module, bases, chain_tail)) in builtins.iter().enumerate() {
            let name = self.interner.intern(name);
            let module = self.interner.intern(module);
            let mut def = ClassDef::new(name, module, Name::EMPTY);
            def.bases = bases.iter().map(|b| TypeExpr::Class(*b)).collect();
            let mut mro = vec![ClassId::from_raw(index as u32)];
            mro.extend_from_slice(chain_tail);
            def.mro = mro;
            inner.class_by_name.insert(name, ClassId::from_raw(index as u32));
            inner.classes.push(def);
        }
        // User classes start at FIRST_USER; pad the gap with clones of
        // object so ClassId stays a plain index.
        while inner.classes.len() < ClassId::FIRST_USER as usize {
            let object_clone = inner.classes[0].clone();
            inner.classes.push(object_clone);
        }
        debug!(count = ClassId::BUILTIN_COUNT, "seeded builtin classes");
    }

    // ========================================
    // Registration
    // ========================================

    /// Register a class, computing and validating its ancestor chain.
    ///
    /// Declared bases must already be registered. An empty base list means
    /// the implicit root.
    pub fn register(&self, mut def: ClassDef) -> Result<ClassId, RegistryError> {
        let class_label = || self.lookup(def.name).to_owned();

        let mut base_ids: SmallVec<[ClassId; 4]> = SmallVec::new();
        for base in &def.bases {
            let Some(id) = base.applied_class() else {
                return Err(RegistryError::UnknownBase {
                    class: class_label(),
                    base: self.render_expr(base),
                });
            };
            if !self.is_registered(id) {
                return Err(RegistryError::UnknownBase {
                    class: class_label(),
                    base: self.render_expr(base),
                });
            }
            base_ids.push(id);
        }
        if base_ids.is_empty() {
            base_ids.push(ClassId::OBJECT);
        }

        let mut inner = self.inner.borrow_mut();
        let id = ClassId::from_raw(inner.classes.len() as u32);
        def.mro = linearize(id, &base_ids, &inner.classes).ok_or_else(|| {
            RegistryError::InconsistentHierarchy {
                class: self.lookup(def.name).to_owned(),
            }
        })?;

        trace!(class = self.lookup(def.name), id = id.raw(), "register class");
        inner.class_by_name.insert(def.name, id);
        inner.classes.push(def);
        Ok(id)
    }

    /// Register a nominal type alias.
    pub fn register_alias(&self, name: &str, target: TypeExpr) -> AliasId {
        let name = self.intern(name);
        let mut inner = self.inner.borrow_mut();
        let id = AliasId::from_raw(inner.aliases.len() as u32);
        inner.alias_by_name.insert(name, id);
        inner.aliases.push(AliasDef { name, target });
        id
    }

    /// Register a type variable.
    pub fn new_typevar(&self, name: &str) -> TypeVarId {
        let name = self.intern(name);
        let mut inner = self.inner.borrow_mut();
        let id = TypeVarId::from_raw(inner.typevars.len() as u32);
        inner.typevars.push(TypeVarDef { name });
        id
    }

    // ========================================
    // Lookup
    // ========================================

    fn is_registered(&self, id: ClassId) -> bool {
        let len = self.inner.borrow().classes.len();
        id.is_builtin() && id.raw() < ClassId::BUILTIN_COUNT
            || (id.raw() as usize) < len && id.raw() >= ClassId::FIRST_USER
    }

    /// Find a class by name.
    pub fn class_named(&self, name: Name) -> Option<ClassId> {
        self.inner.borrow().class_by_name.get(&name).copied()
    }

    /// Find an alias by name.
    pub fn alias_named(&self, name: Name) -> Option<AliasId> {
        self.inner.borrow().alias_by_name.get(&name).copied()
    }

    /// Name of a class.
    pub fn class_name(&self, id: ClassId) -> Name {
        self.inner.borrow().classes[id.raw() as usize].name
    }

    /// Module of a class.
    pub fn class_module(&self, id: ClassId) -> Name {
        self.inner.borrow().classes[id.raw() as usize].module
    }

    /// Package of a class.
    pub fn class_package(&self, id: ClassId) -> Name {
        self.inner.borrow().classes[id.raw() as usize].package
    }

    /// Whether the class is user-defined rather than from the builtin
    /// module. Decided by the declaring module, not the index range.
    pub fn is_custom(&self, id: ClassId) -> bool {
        self.class_module(id) != self.builtins_module
    }

    /// Declared type parameters of a class.
    pub fn class_params(&self, id: ClassId) -> Vec<TypeVarId> {
        self.inner.borrow().classes[id.raw() as usize].params.clone()
    }

    /// Declared bases of a class.
    pub fn class_bases(&self, id: ClassId) -> Vec<TypeExpr> {
        self.inner.borrow().classes[id.raw() as usize].bases.clone()
    }

    /// Field convention of a class.
    pub fn class_convention(&self, id: ClassId) -> FieldConvention {
        self.inner.borrow().classes[id.raw() as usize].convention
    }

    /// Snapshot of a class's field declarations.
    pub fn field_decls(&self, id: ClassId) -> Vec<FieldDecl> {
        self.inner.borrow().classes[id.raw() as usize]
            .fields
            .borrow()
            .clone()
    }

    /// Linearized ancestor chain of a class, starting with the class.
    pub fn class_mro(&self, id: ClassId) -> Vec<ClassId> {
        self.inner.borrow().classes[id.raw() as usize].mro.clone()
    }

    /// Whether `sub` structurally descends from `ancestor` (inclusive).
    pub fn descends_from(&self, sub: ClassId, ancestor: ClassId) -> bool {
        self.inner.borrow().classes[sub.raw() as usize]
            .mro
            .contains(&ancestor)
    }

    /// Definition of an alias.
    pub fn alias_def(&self, id: AliasId) -> AliasDef {
        self.inner.borrow().aliases[id.raw() as usize].clone()
    }

    /// Name of a type variable.
    pub fn typevar_name(&self, id: TypeVarId) -> Name {
        self.inner.borrow().typevars[id.raw() as usize].name
    }

    // ========================================
    // Forward references
    // ========================================

    /// Resolve every `Forward` node in every class's field declarations,
    /// in place, returning how many declarations were rewritten.
    ///
    /// Any descriptor cache built over this registry holds stale field
    /// types afterwards and must be cleared; callers normally reach this
    /// pass through the cache so that happens in one step.
    pub fn resolve_forward_references(&self) -> Result<usize, RegistryError> {
        let inner = self.inner.borrow();
        let mut rewritten = 0;

        for class in &inner.classes {
            let mut fields = class.fields.borrow_mut();
            for decl in fields.iter_mut() {
                if !decl.ty.any(&mut |e| matches!(e, TypeExpr::Forward(_))) {
                    continue;
                }
                let mut failure: Option<Name> = None;
                let resolved = decl.ty.map(&mut |expr| match expr {
                    TypeExpr::Forward(name) => {
                        if let Some(id) = inner.class_by_name.get(&name) {
                            TypeExpr::Class(*id)
                        } else if let Some(id) = inner.alias_by_name.get(&name) {
                            TypeExpr::Alias(*id)
                        } else {
                            failure = Some(name);
                            TypeExpr::Forward(name)
                        }
                    }
                    other => other,
                });
                if let Some(name) = failure {
                    return Err(RegistryError::UnknownForwardReference {
                        name: self.lookup(name).to_owned(),
                    });
                }
                trace!(
                    class = self.lookup(class.name),
                    field = self.lookup(decl.name),
                    "resolved forward reference"
                );
                decl.ty = resolved;
                rewritten += 1;
            }
        }

        debug!(rewritten, "forward reference pass complete");
        Ok(rewritten)
    }

    // ========================================
    // Rendering
    // ========================================

    /// Plain textual form of an expression, used in errors and reprs.
    pub fn render_expr(&self, expr: &TypeExpr) -> String {
        match expr {
            TypeExpr::Class(ClassId::NONE_TYPE) => "None".to_owned(),
            TypeExpr::Class(id) => self.lookup(self.class_name(*id)).to_owned(),
            TypeExpr::Apply(id, args) => {
                let args: Vec<String> = args.iter().map(|a| self.render_expr(a)).collect();
                format!("{}[{}]", self.lookup(self.class_name(*id)), args.join(", "))
            }
            TypeExpr::Union(members) => {
                let members: Vec<String> = members.iter().map(|m| self.render_expr(m)).collect();
                members.join(" | ")
            }
            TypeExpr::Annotated(inner, annotations) => {
                let rendered: Vec<String> = annotations
                    .iter()
                    .map(|a| match a {
                        Annotation::Str(s) => format!("{s:?}"),
                        Annotation::Int(i) => i.to_string(),
                        Annotation::Bool(b) => b.to_string(),
                        Annotation::Label(name) => self.lookup(*name).to_owned(),
                    })
                    .collect();
                format!(
                    "Annotated[{}, {}]",
                    self.render_expr(inner),
                    rendered.join(", ")
                )
            }
            TypeExpr::Alias(id) => self.lookup(self.alias_def(*id).name).to_owned(),
            TypeExpr::Var(id) => format!("~{}", self.lookup(self.typevar_name(*id))),
            TypeExpr::Forward(name) => format!("'{}'", self.lookup(*name)),
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// C3 linearization of a class over its declared bases.
///
/// Returns `None` when the bases admit no consistent order.
fn linearize(class: ClassId, bases: &[ClassId], classes: &[ClassDef]) -> Option<Vec<ClassId>> {
    let mut sequences: Vec<Vec<ClassId>> = bases
        .iter()
        .map(|b| classes[b.raw() as usize].mro.clone())
        .collect();
    sequences.push(bases.to_vec());

    let mut result = vec![class];
    loop {
        sequences.retain(|s| !s.is_empty());
        if sequences.is_empty() {
            return Some(result);
        }

        // Pick the first head that appears in no other sequence's tail.
        let mut chosen: Option<ClassId> = None;
        for sequence in &sequences {
            let head = sequence[0];
            let in_tail = sequences
                .iter()
                .any(|other| other.iter().skip(1).any(|c| *c == head));
            if !in_tail {
                chosen = Some(head);
                break;
            }
        }
        let head = chosen?;

        result.push(head);
        for sequence in &mut sequences {
            sequence.retain(|c| *c != head);
        }
    }
}
