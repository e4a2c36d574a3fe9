//! Field reflection.
//!
//! Three declaration conventions are unified into one [`Field`] shape. The
//! strategy is selected once per descriptor from the owning class's
//! [`FieldConvention`] tag; call sites never sniff declaration shapes
//! themselves.

use std::rc::Rc;

use forma_ir::{ClassId, DefaultDecl, Factory, FieldConvention, Name, ParamKind};

use crate::cache::TypeCache;
use crate::descriptor::Type;

/// Default attached to a reflected field.
#[derive(Clone, Debug, Default)]
pub enum FieldDefault {
    /// No default.
    #[default]
    Missing,
    /// A wrapped static value.
    Value(forma_ir::Value),
    /// A zero-argument factory.
    Factory(Factory),
}

impl FieldDefault {
    /// Whether a default is present.
    pub fn is_present(&self) -> bool {
        !matches!(self, FieldDefault::Missing)
    }
}

/// A single reflected field.
#[derive(Clone, Debug)]
pub struct Field {
    /// Exposed field name. Variadic collectors use the empty name.
    pub name: Name,
    /// The class the field was reflected from.
    pub owner: ClassId,
    /// The class that originally declared the field.
    pub original_owner: ClassId,
    /// Declared type of the field.
    pub ty: Rc<Type>,
    /// Parameter kind.
    pub kind: ParamKind,
    /// Default value or factory.
    pub default: FieldDefault,
}

impl Field {
    /// Clone this field with a different declared type.
    pub fn with_type(&self, ty: Rc<Type>) -> Field {
        Field {
            name: self.name,
            owner: self.owner,
            original_owner: self.original_owner,
            ty,
            kind: self.kind,
            default: self.default.clone(),
        }
    }
}

/// Reflect the fields of `class` according to its declared convention.
///
/// Callers decide whether a strategy applies at all (unions, builtins, and
/// the unspecified marker never reach this point).
pub(crate) fn reflect(cache: &TypeCache, convention: FieldConvention, class: ClassId) -> Vec<Field> {
    match convention {
        FieldConvention::Signature => from_signature(cache, class),
        FieldConvention::Declared => from_declared(cache, class),
        FieldConvention::Record => from_record(cache, class),
    }
}

/// Derive fields from the construction signature.
///
/// Undeclared types have already defaulted to `object` at declaration
/// time; variadic collectors are exposed under the empty name.
fn from_signature(cache: &TypeCache, class: ClassId) -> Vec<Field> {
    let mut result = Vec::new();
    for decl in cache.registry().field_decls(class) {
        let name = if decl.kind.is_variadic() {
            Name::EMPTY
        } else {
            decl.name
        };
        let default = match decl.default {
            DefaultDecl::Absent => FieldDefault::Missing,
            DefaultDecl::Value(value) => FieldDefault::Value(value),
            DefaultDecl::Factory(factory) => FieldDefault::Factory(factory),
        };
        result.push(Field {
            name,
            owner: class,
            original_owner: class,
            ty: cache.disassemble(&decl.ty),
            kind: decl.kind,
            default,
        });
    }
    result
}

/// Reflect a declarative class with private-name unwrapping.
///
/// A leading underscore is stripped, a redundant owner-name prefix is
/// shortened, explicit aliases win over both, and factories that read
/// instance state are dropped (they cannot run before construction).
fn from_declared(cache: &TypeCache, class: ClassId) -> Vec<Field> {
    let registry = cache.registry();
    let class_prefix = format!("{}_", registry.lookup(registry.class_name(class)));

    let mut result = Vec::new();
    for decl in registry.field_decls(class) {
        if !decl.init {
            continue;
        }

        let kind = if decl.kind == ParamKind::KeywordOnly {
            ParamKind::KeywordOnly
        } else {
            ParamKind::PositionalOrKeyword
        };

        let default = match decl.default {
            DefaultDecl::Absent => FieldDefault::Missing,
            DefaultDecl::Value(value) => FieldDefault::Value(value),
            DefaultDecl::Factory(factory) => {
                if factory.reads_instance() {
                    FieldDefault::Missing
                } else {
                    FieldDefault::Factory(factory)
                }
            }
        };

        let name = match decl.alias {
            Some(alias) => alias,
            None => {
                let mut exposed = registry.lookup(decl.name);
                exposed = exposed.strip_prefix('_').unwrap_or(exposed);
                exposed = exposed.strip_prefix(&class_prefix).unwrap_or(exposed);
                registry.intern(exposed)
            }
        };

        result.push(Field {
            name,
            owner: class,
            original_owner: class,
            ty: cache.disassemble(&decl.ty),
            kind,
            default,
        });
    }
    result
}

/// Reflect a declarative class without name unwrapping.
fn from_record(cache: &TypeCache, class: ClassId) -> Vec<Field> {
    let mut result = Vec::new();
    for decl in cache.registry().field_decls(class) {
        if !decl.init {
            continue;
        }
        let kind = if decl.kind == ParamKind::KeywordOnly {
            ParamKind::KeywordOnly
        } else {
            ParamKind::PositionalOrKeyword
        };
        let default = match decl.default {
            DefaultDecl::Absent => FieldDefault::Missing,
            DefaultDecl::Value(value) => FieldDefault::Value(value),
            DefaultDecl::Factory(factory) => FieldDefault::Factory(factory),
        };
        result.push(Field {
            name: decl.name,
            owner: class,
            original_owner: class,
            ty: cache.disassemble(&decl.ty),
            kind,
            default,
        });
    }
    result
}
