#![allow(clippy::unwrap_used)]

use super::*;
use crate::Registry;

#[test]
fn builtin_indices_are_stable() {
    assert_eq!(ClassId::OBJECT.raw(), 0);
    assert_eq!(ClassId::NONE_TYPE.raw(), 1);
    assert_eq!(ClassId::BOOL.raw(), 2);
    assert_eq!(ClassId::INT.raw(), 3);
    assert_eq!(ClassId::NOT_SPECIFIED.raw(), 11);
    assert_eq!(ClassId::UNION_KIND.raw(), 12);
    assert_eq!(ClassId::TYPE_VAR_KIND.raw(), 13);
}

#[test]
fn builtin_check() {
    assert!(ClassId::OBJECT.is_builtin());
    assert!(ClassId::TYPE_VAR_KIND.is_builtin());
    assert!(!ClassId::from_raw(ClassId::FIRST_USER).is_builtin());
}

#[test]
fn param_kind_descriptions() {
    assert_eq!(ParamKind::KeywordOnly.describe(), "keyword-only");
    assert_eq!(
        ParamKind::VariadicPositional.describe(),
        "variadic positional"
    );
    assert!(ParamKind::VariadicKeyword.is_variadic());
    assert!(!ParamKind::PositionalOnly.is_variadic());
}

#[test]
fn factory_produces_and_tracks_instance_reads() {
    let plain = Factory::new(|| Value::Int(42));
    assert!(!plain.reads_instance());
    assert_eq!(plain.produce(), Value::Int(42));

    let reading = Factory::reading_instance(|| Value::None);
    assert!(reading.reads_instance());
}

#[test]
fn field_decl_builder() {
    let registry = Registry::new();
    let name = registry.intern("size");
    let alias = registry.intern("length");

    let decl = FieldDecl::new(name, TypeExpr::Class(ClassId::INT))
        .with_kind(ParamKind::KeywordOnly)
        .with_alias(alias)
        .with_default(DefaultDecl::Value(Value::Int(0)));

    assert_eq!(decl.name, name);
    assert_eq!(decl.kind, ParamKind::KeywordOnly);
    assert_eq!(decl.alias, Some(alias));
    assert!(decl.init);
    assert!(matches!(decl.default, DefaultDecl::Value(Value::Int(0))));
}

#[test]
fn class_def_builder_sets_fields() {
    let registry = Registry::new();
    let name = registry.intern("Thing");
    let module = registry.intern("app.things");

    let def = ClassDef::new(name, module, Name::EMPTY)
        .with_convention(FieldConvention::Declared)
        .with_fields(vec![FieldDecl::new(
            registry.intern("x"),
            TypeExpr::Class(ClassId::INT),
        )]);

    assert_eq!(def.convention, FieldConvention::Declared);
    assert_eq!(def.fields.borrow().len(), 1);
    assert!(def.bases.is_empty());
}
