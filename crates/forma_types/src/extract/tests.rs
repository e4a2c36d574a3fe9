use super::*;
use forma_ir::ClassId;
use pretty_assertions::assert_eq;

fn int() -> TypeExpr {
    TypeExpr::Class(ClassId::INT)
}

fn string() -> TypeExpr {
    TypeExpr::Class(ClassId::STR)
}

#[test]
fn optional_strips_one_layer() {
    assert_eq!(extract_optional(&TypeExpr::optional(int())), (true, int()));
    assert_eq!(extract_optional(&int()), (false, int()));
}

#[test]
fn optional_of_union_keeps_the_union() {
    let both = TypeExpr::union_of([int(), string()]);
    let expr = TypeExpr::union_of([int(), string(), TypeExpr::NONE]);
    assert_eq!(extract_optional(&expr), (true, both.clone()));
    assert_eq!(extract_optional(&both), (false, both));
}

#[test]
fn optional_does_not_reach_inside_annotations() {
    let annotated = TypeExpr::annotated(
        TypeExpr::optional(int()),
        [Annotation::Str("one".into())],
    );
    assert_eq!(extract_optional(&annotated), (false, annotated.clone()));
}

#[test]
fn annotation_strips_one_layer() {
    let annotated = TypeExpr::annotated(int(), [Annotation::Str("one".into())]);
    assert_eq!(
        extract_annotation(&annotated),
        (int(), Some(vec![Annotation::Str("one".into())]))
    );
    assert_eq!(extract_annotation(&int()), (int(), None));
}

#[test]
fn annotation_of_optional_returns_the_optional() {
    let expr = TypeExpr::optional(int());
    assert_eq!(extract_annotation(&expr), (expr.clone(), None));
}
