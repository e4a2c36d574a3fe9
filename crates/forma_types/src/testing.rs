//! Shared fixtures for the engine's unit tests.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::rc::Rc;

use forma_ir::{
    ClassDef, ClassId, FieldConvention, FieldDecl, Registry, TypeExpr, TypeVarId,
};

use crate::TypeCache;

/// A fresh cache over a fresh class universe.
pub(crate) fn cache() -> TypeCache {
    TypeCache::new(Rc::new(Registry::new()))
}

/// Register a custom class under `app.models`.
pub(crate) fn define(
    cache: &TypeCache,
    name: &str,
    params: Vec<TypeVarId>,
    bases: Vec<TypeExpr>,
    convention: FieldConvention,
    fields: Vec<FieldDecl>,
) -> ClassId {
    let registry = cache.registry();
    let def = ClassDef::new(
        registry.intern(name),
        registry.intern("app.models"),
        registry.intern("app"),
    )
    .with_params(params)
    .with_bases(bases)
    .with_convention(convention)
    .with_fields(fields);
    registry.register(def).expect("test class registers")
}

/// A plain signature-convention class with no parameters or fields.
pub(crate) fn plain(cache: &TypeCache, name: &str, bases: Vec<TypeExpr>) -> ClassId {
    define(cache, name, vec![], bases, FieldConvention::Signature, vec![])
}

/// A field declaration with the given name and type.
pub(crate) fn decl(cache: &TypeCache, name: &str, ty: TypeExpr) -> FieldDecl {
    FieldDecl::new(cache.registry().intern(name), ty)
}

/// The diamond-override scenario: `One[T, U]`, `Two[T]` extending
/// `One[int, T]`, and `Three` extending `Two[str]`.
pub(crate) struct DiamondFixture {
    pub one: ClassId,
    pub two: ClassId,
    pub three: ClassId,
}

pub(crate) fn diamond(cache: &TypeCache) -> DiamondFixture {
    let registry = cache.registry();
    let t = registry.new_typevar("T");
    let u = registry.new_typevar("U");

    let one = define(
        cache,
        "One",
        vec![t, u],
        vec![],
        FieldConvention::Signature,
        vec![],
    );
    let two = define(
        cache,
        "Two",
        vec![t],
        vec![TypeExpr::Apply(
            one,
            vec![TypeExpr::Class(ClassId::INT), TypeExpr::Var(t)],
        )],
        FieldConvention::Signature,
        vec![],
    );
    let three = define(
        cache,
        "Three",
        vec![],
        vec![TypeExpr::Apply(two, vec![TypeExpr::Class(ClassId::STR)])],
        FieldConvention::Signature,
        vec![],
    );

    DiamondFixture { one, two, three }
}
