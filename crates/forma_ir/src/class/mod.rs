//! Class universe: identifiers, definitions, and field declarations.
//!
//! The engine has no ambient runtime reflection to lean on, so the "host
//! runtime" is modeled as data: every class the engine can talk about is a
//! [`ClassDef`] registered in the [`Registry`](crate::Registry) and referred
//! to by a compact [`ClassId`].
//!
//! # Builtin classes
//!
//! Indices below [`ClassId::FIRST_USER`] are pre-registered at registry
//! creation (the same fixed-index trick the type pool uses for primitives):
//! scalar builtins, the plain container classes, the `NotSpecified` marker,
//! and the two pseudo-classes that stand in for the runtime kind of a union
//! expression and of an unbound type parameter.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::{Name, TypeExpr, TypeVarId, Value};

/// Identifier of a registered class.
///
/// Classes are compared by index; one index exists per registered class.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct ClassId(u32);

impl ClassId {
    // === Builtin classes (fixed indices) ===

    /// The root class every chain terminates in.
    pub const OBJECT: Self = Self(0);
    /// The class of the none value.
    pub const NONE_TYPE: Self = Self(1);
    /// Boolean scalar. Descends from `INT`, as in the host runtime.
    pub const BOOL: Self = Self(2);
    /// Integer scalar.
    pub const INT: Self = Self(3);
    /// Float scalar.
    pub const FLOAT: Self = Self(4);
    /// String scalar.
    pub const STR: Self = Self(5);
    /// Byte-string scalar.
    pub const BYTES: Self = Self(6);
    /// Plain list container (positional parameters only).
    pub const LIST: Self = Self(7);
    /// Plain set container.
    pub const SET: Self = Self(8);
    /// Plain dict container.
    pub const DICT: Self = Self(9);
    /// Plain tuple container.
    pub const TUPLE: Self = Self(10);
    /// The internal "unspecified" marker type. Never yields fields.
    pub const NOT_SPECIFIED: Self = Self(11);
    /// Runtime kind of a union expression (module `types`).
    pub const UNION_KIND: Self = Self(12);
    /// Runtime kind of an unbound type parameter (module `typing`).
    pub const TYPE_VAR_KIND: Self = Self(13);

    /// First index handed to user-registered classes.
    pub const FIRST_USER: u32 = 64;

    /// Number of pre-registered builtin classes.
    pub const BUILTIN_COUNT: u32 = 14;

    /// Create an identifier from a raw index.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw index.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Check if this is one of the pre-registered builtin classes.
    #[inline]
    pub const fn is_builtin(self) -> bool {
        self.0 < Self::FIRST_USER
    }
}

impl fmt::Debug for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::OBJECT => write!(f, "ClassId::OBJECT"),
            Self::NONE_TYPE => write!(f, "ClassId::NONE_TYPE"),
            Self::BOOL => write!(f, "ClassId::BOOL"),
            Self::INT => write!(f, "ClassId::INT"),
            Self::FLOAT => write!(f, "ClassId::FLOAT"),
            Self::STR => write!(f, "ClassId::STR"),
            Self::BYTES => write!(f, "ClassId::BYTES"),
            Self::LIST => write!(f, "ClassId::LIST"),
            Self::SET => write!(f, "ClassId::SET"),
            Self::DICT => write!(f, "ClassId::DICT"),
            Self::TUPLE => write!(f, "ClassId::TUPLE"),
            Self::NOT_SPECIFIED => write!(f, "ClassId::NOT_SPECIFIED"),
            Self::UNION_KIND => write!(f, "ClassId::UNION_KIND"),
            Self::TYPE_VAR_KIND => write!(f, "ClassId::TYPE_VAR_KIND"),
            _ => write!(f, "ClassId({})", self.0),
        }
    }
}

/// Which declaration convention a class's fields follow.
///
/// Resolved once per class; drives strategy selection in the field
/// reflector rather than shape-sniffing at call sites.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum FieldConvention {
    /// Fields are inferred from the construction signature. Undeclared
    /// parameter types default to `object`; variadic collectors are exposed
    /// under the empty name.
    Signature,
    /// Declarative convention with private-name unwrapping, owner-prefix
    /// shortening, explicit aliasing, and default factories.
    Declared,
    /// Declarative convention with defaults/factories/keyword-only
    /// detection but no name unwrapping.
    Record,
}

/// Parameter kind of a declared field.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ParamKind {
    /// Accepted by position only.
    PositionalOnly,
    /// Accepted by position or keyword. The default for declared fields.
    PositionalOrKeyword,
    /// Accepted by keyword only.
    KeywordOnly,
    /// Collects excess positional arguments.
    VariadicPositional,
    /// Collects excess keyword arguments.
    VariadicKeyword,
}

impl ParamKind {
    /// Human-readable description, used in reprs and errors.
    pub const fn describe(self) -> &'static str {
        match self {
            Self::PositionalOnly => "positional-only",
            Self::PositionalOrKeyword => "positional or keyword",
            Self::KeywordOnly => "keyword-only",
            Self::VariadicPositional => "variadic positional",
            Self::VariadicKeyword => "variadic keyword",
        }
    }

    /// Whether this kind collects excess arguments.
    pub const fn is_variadic(self) -> bool {
        matches!(self, Self::VariadicPositional | Self::VariadicKeyword)
    }
}

/// A zero-argument default factory attached to a field declaration.
///
/// Wraps the callable together with a flag saying whether it would read
/// instance state; such factories cannot run before construction and the
/// reflector drops them.
#[derive(Clone)]
pub struct Factory {
    func: Rc<dyn Fn() -> Value>,
    reads_instance: bool,
}

impl Factory {
    /// Wrap a plain zero-argument factory.
    pub fn new(func: impl Fn() -> Value + 'static) -> Self {
        Self {
            func: Rc::new(func),
            reads_instance: false,
        }
    }

    /// Wrap a factory that reads instance state.
    pub fn reading_instance(func: impl Fn() -> Value + 'static) -> Self {
        Self {
            func: Rc::new(func),
            reads_instance: true,
        }
    }

    /// Whether this factory reads instance state.
    pub fn reads_instance(&self) -> bool {
        self.reads_instance
    }

    /// Run the factory.
    pub fn produce(&self) -> Value {
        (self.func)()
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reads_instance {
            write!(f, "<factory reading instance>")
        } else {
            write!(f, "<factory>")
        }
    }
}

/// Declared default of a field.
#[derive(Clone, Debug, Default)]
pub enum DefaultDecl {
    /// No default declared.
    #[default]
    Absent,
    /// A static default value.
    Value(Value),
    /// A zero-argument default factory.
    Factory(Factory),
}

/// A single field declaration in a class definition.
///
/// Declarations are raw material: the field reflector interprets them
/// according to the owning class's [`FieldConvention`].
#[derive(Clone, Debug)]
pub struct FieldDecl {
    /// Declared field name.
    pub name: Name,
    /// Declared type expression; may be a `Forward` reference until the
    /// resolution pass runs.
    pub ty: TypeExpr,
    /// Parameter kind.
    pub kind: ParamKind,
    /// Declared default.
    pub default: DefaultDecl,
    /// Explicit external alias, exposed instead of the declared name.
    pub alias: Option<Name>,
    /// Whether the field participates in construction. Non-init fields are
    /// invisible to the reflector.
    pub init: bool,
}

impl FieldDecl {
    /// A plain positional-or-keyword declaration with no default.
    pub fn new(name: Name, ty: TypeExpr) -> Self {
        Self {
            name,
            ty,
            kind: ParamKind::PositionalOrKeyword,
            default: DefaultDecl::Absent,
            alias: None,
            init: true,
        }
    }

    /// Set the parameter kind.
    pub fn with_kind(mut self, kind: ParamKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the declared default.
    pub fn with_default(mut self, default: DefaultDecl) -> Self {
        self.default = default;
        self
    }

    /// Set an explicit external alias.
    pub fn with_alias(mut self, alias: Name) -> Self {
        self.alias = Some(alias);
        self
    }

    /// Exclude the field from construction.
    pub fn without_init(mut self) -> Self {
        self.init = false;
        self
    }
}

/// Definition of a class in the universe.
///
/// The field declarations sit behind a `RefCell`: the one-shot
/// forward-reference resolution pass rewrites them in place, everything
/// else is immutable after registration.
#[derive(Clone, Debug)]
pub struct ClassDef {
    /// Class name.
    pub name: Name,
    /// Module the class is declared in. `builtins` marks non-custom
    /// classes for scoring.
    pub module: Name,
    /// Package the module belongs to.
    pub package: Name,
    /// Declared type parameters, in declaration order.
    pub params: Vec<TypeVarId>,
    /// Declared bases, possibly parameterized with this class's own
    /// parameters. Empty means the implicit root.
    pub bases: Vec<TypeExpr>,
    /// Which declaration convention the fields follow.
    pub convention: FieldConvention,
    /// Field declaration arena; rewritten in place by the
    /// forward-reference resolution pass.
    pub fields: RefCell<Vec<FieldDecl>>,
    /// Linearized ancestor chain, starting with this class. Computed at
    /// registration.
    pub mro: Vec<ClassId>,
}

impl ClassDef {
    /// Start a definition with the given name, defaulting to a custom
    /// signature-convention class with no bases or fields.
    pub fn new(name: Name, module: Name, package: Name) -> Self {
        Self {
            name,
            module,
            package,
            params: Vec::new(),
            bases: Vec::new(),
            convention: FieldConvention::Signature,
            fields: RefCell::new(Vec::new()),
            mro: Vec::new(),
        }
    }

    /// Set the declared type parameters.
    pub fn with_params(mut self, params: Vec<TypeVarId>) -> Self {
        self.params = params;
        self
    }

    /// Set the declared bases.
    pub fn with_bases(mut self, bases: Vec<TypeExpr>) -> Self {
        self.bases = bases;
        self
    }

    /// Set the field convention.
    pub fn with_convention(mut self, convention: FieldConvention) -> Self {
        self.convention = convention;
        self
    }

    /// Set the field declarations.
    pub fn with_fields(self, fields: Vec<FieldDecl>) -> Self {
        *self.fields.borrow_mut() = fields;
        self
    }
}

#[cfg(test)]
mod tests;
