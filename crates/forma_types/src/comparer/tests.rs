#![allow(clippy::unwrap_used)]

use forma_ir::{Annotation, ClassId, FieldConvention, TypeExpr, Value};
use pretty_assertions::assert_eq;

use super::*;
use crate::testing;

fn int() -> TypeExpr {
    TypeExpr::Class(ClassId::INT)
}

fn string() -> TypeExpr {
    TypeExpr::Class(ClassId::STR)
}

#[test]
fn distill_concrete_and_annotated() {
    let cache = testing::cache();
    let comparer = cache.comparer();

    let plain = comparer.distill(&TypeLike::Expr(int()));
    assert_eq!(plain.form, DistilledForm::Single(ClassId::INT));
    assert!(plain.is_valid());
    assert!(!plain.optional);

    let annotated = comparer.distill(&TypeLike::Expr(TypeExpr::annotated(
        int(),
        [Annotation::Str("meta".into())],
    )));
    assert_eq!(annotated.form, DistilledForm::Single(ClassId::INT));
}

#[test]
fn distill_optional_folds_the_none_type_in_last() {
    let cache = testing::cache();
    let comparer = cache.comparer();

    let optional = comparer.distill(&TypeLike::Expr(TypeExpr::optional(int())));
    assert!(optional.optional);
    assert_eq!(
        optional.form,
        DistilledForm::Many(vec![ClassId::INT, ClassId::NONE_TYPE])
    );
}

#[test]
fn distill_unions_deduplicate_in_encounter_order() {
    let cache = testing::cache();
    let comparer = cache.comparer();

    let union = comparer.distill(&TypeLike::Expr(TypeExpr::union_of([
        int(),
        string(),
        int(),
    ])));
    match union.form {
        DistilledForm::Many(classes) => {
            assert_eq!(classes.len(), 2);
            assert!(classes.contains(&ClassId::INT));
            assert!(classes.contains(&ClassId::STR));
        }
        other => panic!("expected a tuple, got {other:?}"),
    }
}

#[test]
fn distill_reduces_generics_and_keeps_the_as_generic_form() {
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
    let comparer = cache.comparer();

    let expr = TypeExpr::Apply(container, vec![int()]);
    let distilled = comparer.distill(&TypeLike::Expr(expr.clone()));
    assert_eq!(distilled.form, DistilledForm::Single(container));
    assert_eq!(distilled.as_generic, Some(expr));
}

#[test]
fn distill_follows_aliases_and_records_the_chain() {
    let cache = testing::cache();
    let count = cache.registry().register_alias("Count", int());
    let comparer = cache.comparer();

    let distilled = comparer.distill(&TypeLike::Expr(TypeExpr::Alias(count)));
    assert_eq!(distilled.form, DistilledForm::Single(ClassId::INT));
    assert_eq!(distilled.alias_chain, vec![count]);
}

#[test]
fn distill_none_value_and_alias_to_none() {
    let cache = testing::cache();
    let comparer = cache.comparer();

    let none = comparer.distill(&TypeLike::Value(Value::None));
    assert_eq!(none.form, DistilledForm::Single(ClassId::NONE_TYPE));

    let alias = cache.registry().register_alias("Nothing", TypeExpr::NONE);
    let aliased = comparer.distill(&TypeLike::Expr(TypeExpr::Alias(alias)));
    assert_eq!(aliased.form, DistilledForm::Single(ClassId::NONE_TYPE));
}

#[test]
fn distill_invalid_shapes() {
    let cache = testing::cache();
    let comparer = cache.comparer();

    let t = cache.registry().new_typevar("T");
    assert!(!comparer.distill(&TypeLike::Expr(TypeExpr::Var(t))).is_valid());
    assert!(!comparer.distill(&TypeLike::Value(Value::Int(3))).is_valid());
    assert!(!comparer.distill(&TypeLike::Missing).is_valid());

    assert!(matches!(
        comparer.require_type(&TypeLike::Expr(TypeExpr::Var(t))),
        Err(TypeError::InvalidType { .. })
    ));
}

#[test]
fn distill_cycle_guard_returns_invalid() {
    let cache = testing::cache();
    let registry = cache.registry();
    // An alias that resolves to itself.
    let looped = registry.register_alias("Loop", TypeExpr::Alias(AliasId::from_raw(0)));
    let comparer = cache.comparer();

    let distilled = comparer.distill(&TypeLike::Expr(TypeExpr::Alias(looped)));
    assert!(!distilled.is_valid());
}

#[test]
fn is_instance_on_concrete_union_and_optional() {
    let cache = testing::cache();
    let comparer = cache.comparer();

    assert!(comparer.is_instance(&Value::Int(1), &TypeLike::Expr(int())));
    assert!(!comparer.is_instance(&Value::Str("x".into()), &TypeLike::Expr(int())));
    // bool is an int in the host runtime.
    assert!(comparer.is_instance(&Value::Bool(true), &TypeLike::Expr(int())));

    let union = TypeLike::Expr(TypeExpr::union_of([int(), string(), TypeExpr::NONE]));
    assert!(comparer.is_instance(&Value::None, &union));
    assert!(comparer.is_instance(&Value::Int(2), &union));
    assert!(comparer.is_instance(&Value::Str("x".into()), &union));
    assert!(!comparer.is_instance(&Value::Float(0.5), &union));

    assert!(!comparer.is_instance(&Value::None, &TypeLike::Expr(int())));
}

#[test]
fn is_subtype_structural() {
    let cache = testing::cache();
    let parent = testing::plain(&cache, "Parent", vec![]);
    let child = testing::plain(&cache, "Child", vec![TypeExpr::Class(parent)]);
    let comparer = cache.comparer();

    let parent_like = TypeLike::Expr(TypeExpr::Class(parent));
    let child_like = TypeLike::Expr(TypeExpr::Class(child));

    assert!(comparer.is_subtype(&child_like, &parent_like));
    assert!(comparer.is_subtype(&child_like, &child_like));
    assert!(!comparer.is_subtype(&parent_like, &child_like));
    assert!(comparer.is_subtype(&child_like, &TypeLike::Expr(TypeExpr::OBJECT)));
}

#[test]
fn is_subtype_with_bound_parameters() {
    let cache = testing::cache();
    let registry = cache.registry();
    let t = registry.new_typevar("T");
    let container = testing::define(
        &cache,
        "Container",
        vec![t],
        vec![],
        FieldConvention::Signature,
        vec![],
    );
    let parent = testing::plain(&cache, "Parent", vec![]);
    let child = testing::plain(&cache, "Child", vec![TypeExpr::Class(parent)]);
    let comparer = cache.comparer();

    let of_child = TypeLike::Expr(TypeExpr::Apply(container, vec![TypeExpr::Class(child)]));
    let of_parent = TypeLike::Expr(TypeExpr::Apply(container, vec![TypeExpr::Class(parent)]));
    let bare = TypeLike::Expr(TypeExpr::Class(container));

    assert!(comparer.is_subtype(&of_child, &of_parent));
    assert!(!comparer.is_subtype(&of_parent, &of_child));
    // Positions unbound on either side are skipped.
    assert!(comparer.is_subtype(&of_child, &bare));
    assert!(comparer.is_subtype(&bare, &of_parent));
}

#[test]
fn is_subtype_alias_chains_match_suffix_for_suffix() {
    let cache = testing::cache();
    let count = cache.registry().register_alias("Count", int());
    let comparer = cache.comparer();

    let aliased = TypeLike::Expr(TypeExpr::Alias(count));
    let bare = TypeLike::Expr(int());

    // The aliased form still descends from its bare underlying type.
    assert!(comparer.is_subtype(&aliased, &bare));
    // The bare underlying type is not accepted where the alias is
    // wanted.
    assert!(!comparer.is_subtype(&bare, &aliased));
    assert!(comparer.is_subtype(&aliased, &aliased));
}

#[test]
fn matches_exact_requires_the_same_declaring_source() {
    let cache = testing::cache();
    let thing = testing::plain(&cache, "Thing", vec![]);
    let other = testing::plain(&cache, "Other", vec![TypeExpr::Class(thing)]);
    let comparer = cache.comparer();

    let thing_like = TypeLike::Expr(TypeExpr::Class(thing));
    let other_like = TypeLike::Expr(TypeExpr::Class(other));

    assert!(comparer.matches(&thing_like, &thing_like, false, false));
    // A subclass does not match without subclass tolerance.
    assert!(!comparer.matches(&other_like, &thing_like, false, false));
    assert!(comparer.matches(&other_like, &thing_like, true, false));
    // And never the other way around.
    assert!(!comparer.matches(&thing_like, &other_like, true, false));

    // bool vs int: related, but not the same declaring source.
    assert!(!comparer.matches(
        &TypeLike::Expr(TypeExpr::Class(ClassId::BOOL)),
        &TypeLike::Expr(int()),
        false,
        false
    ));
    assert!(comparer.matches(
        &TypeLike::Expr(TypeExpr::Class(ClassId::BOOL)),
        &TypeLike::Expr(int()),
        true,
        false
    ));
}

#[test]
fn matches_values_use_identity_without_subclasses() {
    let cache = testing::cache();
    let comparer = cache.comparer();

    let against = TypeLike::Expr(int());
    assert!(comparer.matches(&TypeLike::Value(Value::Int(1)), &against, false, false));
    assert!(!comparer.matches(&TypeLike::Value(Value::Bool(true)), &against, false, false));
    // With subclasses, the host instance check applies.
    assert!(comparer.matches(&TypeLike::Value(Value::Bool(true)), &against, true, false));
    assert!(!comparer.matches(&TypeLike::Value(Value::Str("x".into())), &against, true, false));
}

#[test]
fn matches_unions_cover_members_both_ways_on_equal_arity() {
    let cache = testing::cache();
    let comparer = cache.comparer();

    let pair = TypeLike::Expr(TypeExpr::union_of([int(), string()]));
    let triple = TypeLike::Expr(TypeExpr::union_of([
        int(),
        string(),
        TypeExpr::Class(ClassId::BYTES),
    ]));

    // A member is covered by the union.
    assert!(comparer.matches(&TypeLike::Expr(int()), &pair, false, false));
    // Coverage holds into a wider union.
    assert!(comparer.matches(&pair, &triple, false, false));
    // The wider union does not collapse into the narrower one.
    assert!(!comparer.matches(&triple, &pair, false, false));
    // Equal arity requires full equivalence.
    let swapped = TypeLike::Expr(TypeExpr::union_of([string(), int()]));
    assert!(comparer.matches(&pair, &swapped, false, false));
    let different = TypeLike::Expr(TypeExpr::union_of([int(), TypeExpr::Class(ClassId::BYTES)]));
    assert!(!comparer.matches(&pair, &different, false, false));
}

#[test]
fn matches_optionals() {
    let cache = testing::cache();
    let comparer = cache.comparer();

    let optional = TypeLike::Expr(TypeExpr::optional(int()));
    let plain = TypeLike::Expr(int());

    assert!(comparer.matches(&TypeLike::Value(Value::None), &optional, false, false));
    assert!(comparer.matches(&plain, &optional, false, false));
    // An optional checking side needs an optional target.
    assert!(!comparer.matches(&optional, &plain, false, false));
    assert!(comparer.matches(&optional, &optional, false, false));
}

#[test]
fn matches_generics_recursively() {
    let cache = testing::cache();
    let registry = cache.registry();
    let t = registry.new_typevar("T");
    let container = testing::define(
        &cache,
        "Container",
        vec![t],
        vec![],
        FieldConvention::Signature,
        vec![],
    );
    let comparer = cache.comparer();

    let of_int = TypeLike::Expr(TypeExpr::Apply(container, vec![int()]));
    let of_str = TypeLike::Expr(TypeExpr::Apply(container, vec![string()]));
    let bare = TypeLike::Expr(TypeExpr::Class(container));

    assert!(comparer.matches(&of_int, &of_int, false, false));
    assert!(!comparer.matches(&of_int, &of_str, false, false));

    // Unbound parameters fail unless explicitly allowed.
    assert!(!comparer.matches(&of_int, &bare, false, false));
    assert!(comparer.matches(&of_int, &bare, false, true));
    assert!(!comparer.matches(&bare, &of_int, false, false));
    assert!(comparer.matches(&bare, &of_int, false, true));
}

#[test]
fn matches_distilled_equality_for_invalid_candidates() {
    let cache = testing::cache();
    let registry = cache.registry();
    let t = registry.new_typevar("T");
    let u = registry.new_typevar("U");
    let comparer = cache.comparer();

    let var_t = TypeLike::Expr(TypeExpr::Var(t));
    let var_u = TypeLike::Expr(TypeExpr::Var(u));

    assert!(comparer.matches(&var_t, &var_t, false, false));
    assert!(!comparer.matches(&var_t, &var_u, false, false));
}

#[test]
fn ensure_not_supertype_rejects_strict_ancestors() {
    let cache = testing::cache();
    let parent = testing::plain(&cache, "Parent", vec![]);
    let child = testing::plain(&cache, "Child", vec![TypeExpr::Class(parent)]);
    let comparer = cache.comparer();

    let wanted = cache.disassemble(&TypeExpr::Class(child));
    let produced_parent = Value::instance(parent, vec![]);
    let produced_child = Value::instance(child, vec![]);

    assert!(matches!(
        comparer.ensure_not_supertype(&produced_parent, &wanted),
        Err(TypeError::SubtypeConflict { .. })
    ));
    assert!(comparer.ensure_not_supertype(&produced_child, &wanted).is_ok());

    // A descendant of the wanted type is fine.
    let wanted_parent = cache.disassemble(&TypeExpr::Class(parent));
    assert!(comparer
        .ensure_not_supertype(&produced_child, &wanted_parent)
        .is_ok());
}
