use super::*;
use pretty_assertions::assert_eq;

#[test]
fn union_of_flattens_and_deduplicates() {
    let int = TypeExpr::Class(ClassId::INT);
    let s = TypeExpr::Class(ClassId::STR);

    let nested = TypeExpr::union_of([
        int.clone(),
        TypeExpr::Union(vec![s.clone(), int.clone()]),
        TypeExpr::NONE,
    ]);

    assert_eq!(
        nested,
        TypeExpr::Union(vec![int.clone(), s, TypeExpr::NONE])
    );

    // A single survivor collapses to the member itself.
    assert_eq!(TypeExpr::union_of([int.clone(), int.clone()]), int);
}

#[test]
fn optional_is_union_with_none() {
    let optional = TypeExpr::optional(TypeExpr::Class(ClassId::INT));
    assert!(optional.is_union());
    assert!(optional.union_members().iter().any(|m| m.is_none_type()));

    // Optional of optional does not double the none member.
    let doubled = TypeExpr::optional(optional.clone());
    assert_eq!(doubled, optional);
}

#[test]
fn applied_class_and_args() {
    let apply = TypeExpr::Apply(ClassId::LIST, vec![TypeExpr::Class(ClassId::INT)]);
    assert_eq!(apply.applied_class(), Some(ClassId::LIST));
    assert_eq!(apply.applied_args().len(), 1);

    let bare = TypeExpr::Class(ClassId::LIST);
    assert_eq!(bare.applied_class(), Some(ClassId::LIST));
    assert!(bare.applied_args().is_empty());

    assert_eq!(TypeExpr::Union(vec![]).applied_class(), None);
}

#[test]
fn map_rewrites_nested_nodes() {
    let forward = TypeExpr::Forward(Name::from_raw(7));
    let expr = TypeExpr::Apply(
        ClassId::LIST,
        vec![TypeExpr::union_of([forward.clone(), TypeExpr::NONE])],
    );

    let rewritten = expr.map(&mut |e| match e {
        TypeExpr::Forward(_) => TypeExpr::Class(ClassId::STR),
        other => other,
    });

    assert!(!rewritten.any(&mut |e| matches!(e, TypeExpr::Forward(_))));
    assert!(rewritten.any(&mut |e| *e == TypeExpr::Class(ClassId::STR)));
}

#[test]
fn annotated_wraps_in_order() {
    let expr = TypeExpr::annotated(
        TypeExpr::Class(ClassId::INT),
        [Annotation::Str("one".into()), Annotation::Int(2)],
    );
    match expr {
        TypeExpr::Annotated(inner, annotations) => {
            assert_eq!(*inner, TypeExpr::Class(ClassId::INT));
            assert_eq!(annotations.len(), 2);
            assert_eq!(annotations[0], Annotation::Str("one".into()));
        }
        other => panic!("expected annotated, got {other:?}"),
    }
}
