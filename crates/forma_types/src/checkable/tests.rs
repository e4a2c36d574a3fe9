#![allow(clippy::unwrap_used)]

use forma_ir::{Annotation, ClassId, FieldConvention, TypeExpr, Value};
use pretty_assertions::assert_eq;

use super::*;
use crate::testing;

fn int() -> TypeExpr {
    TypeExpr::Class(ClassId::INT)
}

#[test]
fn single_type_proxy_checks_and_constructs() {
    let cache = testing::cache();
    let proxy = cache.disassemble(&int()).checkable(&cache);

    assert_eq!(*proxy.target(), CheckTarget::Class(ClassId::INT));
    assert!(proxy.is_instance(&cache, &Value::Int(3)));
    assert!(proxy.is_instance(&cache, &Value::Bool(true)));
    assert!(!proxy.is_instance(&cache, &Value::Str("x".into())));
    assert!(!proxy.is_instance(&cache, &Value::None));

    assert_eq!(proxy.display(&cache), "int");
    assert_eq!(
        proxy.construct(&cache, vec![Value::Int(7)]).unwrap(),
        Value::Int(7)
    );
}

#[test]
fn optional_proxy_accepts_none() {
    let cache = testing::cache();
    let proxy = cache
        .disassemble(&TypeExpr::optional(int()))
        .checkable(&cache);

    assert!(proxy.meta().optional);
    assert!(proxy.is_instance(&cache, &Value::None));
    assert!(proxy.is_instance(&cache, &Value::Int(1)));
    // The optional strips to a union shape, so construction refuses.
    assert!(matches!(
        proxy.construct(&cache, vec![]),
        Err(TypeError::UnionConstruction { .. })
    ));
}

#[test]
fn union_proxy_carries_member_proxies_and_refuses_construction() {
    let cache = testing::cache();
    let thing = testing::plain(&cache, "Thing", vec![]);
    let union = TypeExpr::union_of([TypeExpr::Class(thing), int()]);
    let proxy = cache.disassemble(&union).checkable(&cache);

    assert_eq!(*proxy.target(), CheckTarget::Union);
    let members = proxy.meta().union_members.as_ref().unwrap();
    assert_eq!(members.len(), 2);

    assert_eq!(proxy.display(&cache), "Thing | int");
    assert!(proxy.is_instance(&cache, &Value::Int(4)));
    assert!(proxy.is_instance(&cache, &Value::instance(thing, vec![])));
    assert!(!proxy.is_instance(&cache, &Value::Str("x".into())));

    assert!(matches!(
        proxy.construct(&cache, vec![]),
        Err(TypeError::UnionConstruction { .. })
    ));
}

#[test]
fn annotation_is_stripped_from_the_proxy_metadata() {
    let cache = testing::cache();
    let expr = TypeExpr::annotated(int(), [Annotation::Str("meta".into())]);
    let proxy = cache.disassemble(&expr).checkable(&cache);

    assert_eq!(proxy.meta().original, expr);
    assert_eq!(proxy.meta().without_annotation, int());
    assert_eq!(proxy.meta().extracted, int());
    assert!(proxy.is_instance(&cache, &Value::Int(1)));
}

#[test]
fn subtype_checks_work_proxy_to_proxy() {
    let cache = testing::cache();
    let parent = testing::plain(&cache, "Parent", vec![]);
    let child = testing::plain(&cache, "Child", vec![TypeExpr::Class(parent)]);

    let parent_proxy = cache.disassemble(&TypeExpr::Class(parent)).checkable(&cache);
    let child_proxy = cache.disassemble(&TypeExpr::Class(child)).checkable(&cache);

    assert!(parent_proxy.accepts_subclass(&cache, &crate::TypeLike::Proxy(child_proxy.clone())));
    assert!(!child_proxy.accepts_subclass(&cache, &crate::TypeLike::Proxy(parent_proxy.clone())));
    assert!(parent_proxy.accepts_subclass(&cache, &crate::TypeLike::Expr(TypeExpr::Class(child))));
}

#[test]
fn proxy_equality_agrees_with_the_descriptor() {
    let cache = testing::cache();
    let descriptor = cache.disassemble(&TypeExpr::optional(int()));
    let proxy = descriptor.checkable(&cache);

    assert!(proxy.equivalent(&cache, &crate::TypeLike::Value(Value::None)));
    assert!(proxy.equivalent(&cache, &crate::TypeLike::Type(descriptor.clone())));
    assert!(descriptor.equivalent(&cache, &crate::TypeLike::Proxy(proxy.clone())));
}

#[test]
fn generic_proxy_display_shows_the_signature() {
    let cache = testing::cache();
    let t = cache.registry().new_typevar("T");
    let container = testing::define(
        &cache,
        "Container",
        vec![t],
        vec![],
        FieldConvention::Signature,
        vec![],
    );

    let proxy = cache
        .disassemble(&TypeExpr::Apply(container, vec![int()]))
        .checkable(&cache);
    assert_eq!(proxy.display(&cache), "Container[int]");
}

#[test]
fn class_construction_zips_fields_positionally() {
    let cache = testing::cache();
    let thing = testing::define(
        &cache,
        "Thing",
        vec![],
        vec![],
        FieldConvention::Record,
        vec![
            testing::decl(&cache, "name", TypeExpr::Class(ClassId::STR)),
            testing::decl(&cache, "count", int()),
        ],
    );

    let proxy = cache.disassemble(&TypeExpr::Class(thing)).checkable(&cache);
    let value = proxy
        .construct(&cache, vec![Value::Str("x".into()), Value::Int(2)])
        .unwrap();

    assert_eq!(value.class_of(), thing);
    match value {
        Value::Instance(data) => {
            assert_eq!(data.fields.len(), 2);
            assert_eq!(cache.registry().lookup(data.fields[0].0), "name");
            assert_eq!(data.fields[1].1, Value::Int(2));
        }
        other => panic!("expected an instance, got {other}"),
    }
}

#[test]
fn alias_proxy_constructs_the_underlying_class() {
    let cache = testing::cache();
    let count = cache.registry().register_alias("Count", int());
    let proxy = cache.disassemble(&TypeExpr::Alias(count)).checkable(&cache);

    assert_eq!(*proxy.target(), CheckTarget::Alias(count));
    assert_eq!(proxy.display(&cache), "Count");
    assert_eq!(
        proxy.construct(&cache, vec![Value::Int(3)]).unwrap(),
        Value::Int(3)
    );
}

#[test]
fn none_proxy_refuses_construction() {
    let cache = testing::cache();
    let nothing = cache.registry().register_alias("Nothing", TypeExpr::NONE);
    let proxy = cache
        .disassemble(&TypeExpr::Alias(nothing))
        .checkable(&cache);

    assert_eq!(*proxy.target(), CheckTarget::None);
    assert!(matches!(
        proxy.construct(&cache, vec![]),
        Err(TypeError::UnionConstruction { .. })
    ));
}
