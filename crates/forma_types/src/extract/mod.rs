//! Optional and annotation extraction.
//!
//! The descriptor constructor peels exactly one layer at a time with these
//! helpers: one outer optional, one layer of annotation metadata, and (when
//! metadata was present) one optional nested inside it. Everything else in
//! the engine works on the peeled form.

use forma_ir::{Annotation, TypeExpr};

/// Strip one optional layer from an expression.
///
/// Returns whether a none member was removed, and the expression without
/// it. A union that collapses to one member becomes that member.
pub fn extract_optional(expr: &TypeExpr) -> (bool, TypeExpr) {
    if let TypeExpr::Union(members) = expr {
        if members.iter().any(TypeExpr::is_none_type) {
            let remaining: Vec<TypeExpr> = members
                .iter()
                .filter(|m| !m.is_none_type())
                .cloned()
                .collect();
            let stripped = if remaining.len() == 1 {
                remaining.into_iter().next().unwrap_or(TypeExpr::NONE)
            } else {
                TypeExpr::Union(remaining)
            };
            return (true, stripped);
        }
    }
    (false, expr.clone())
}

/// Strip one layer of annotation metadata from an expression.
///
/// Returns the inner expression and the metadata sequence when the
/// expression was annotated.
pub fn extract_annotation(expr: &TypeExpr) -> (TypeExpr, Option<Vec<Annotation>>) {
    match expr {
        TypeExpr::Annotated(inner, annotations) => ((**inner).clone(), Some(annotations.clone())),
        other => (other.clone(), None),
    }
}

#[cfg(test)]
mod tests;
