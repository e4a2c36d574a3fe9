//! Specificity scores.
//!
//! A [`Score`] is a deterministic multi-key total order over descriptors,
//! used to rank dispatch candidates from most to least specific. The more
//! data a score holds, the more specific the type.
//!
//! Field declaration order *is* comparison order: the derived `Ord` walks
//! the fields lexicographically, and `true`/longer/custom sorts after
//! `false`/shorter/builtin, so sorting descending puts the most specific
//! type first. The final ancestor identity tuple guarantees a strict total
//! order even between unrelated same-shaped types; its exact ordering is a
//! pinned convention.

use forma_ir::ClassId;

use crate::cache::TypeCache;
use crate::descriptor::Type;
use crate::hierarchy::VarValue;

/// Identity of one entry in a descriptor's ancestor chain.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScoreOrigin {
    /// Whether the class is user defined rather than from the builtin
    /// module.
    pub custom: bool,
    /// Declared class name.
    pub name: String,
    /// Declaring module.
    pub module: String,
    /// Declaring package.
    pub package: String,
}

impl ScoreOrigin {
    /// Build the identity entry for one ancestor.
    pub fn create(cache: &TypeCache, class: ClassId) -> ScoreOrigin {
        let registry = cache.registry();
        ScoreOrigin {
            custom: registry.is_custom(class),
            name: registry.lookup(registry.class_name(class)).to_owned(),
            module: registry.lookup(registry.class_module(class)).to_owned(),
            package: registry.lookup(registry.class_package(class)).to_owned(),
        }
    }

    fn render(&self, indent: &str) -> String {
        let lines = [
            format!("custom: {}", self.custom),
            format!("name: {}", self.name),
            format!("module: {}", self.module),
            format!("package: {}", self.package),
        ];
        lines
            .iter()
            .map(|line| format!("{indent}{line}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Specificity key of one descriptor. Computed once, immutable after.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Score {
    /// Name of the alias the type was referenced through, empty when
    /// none. An aliased type outranks the same shape unaliased.
    pub type_alias_name: String,
    /// Member scores when this is an annotated union; empty otherwise.
    /// Held apart from `union` so an annotated union outranks a plain one.
    pub annotated_union: Vec<Score>,
    /// Whether this is a union that also carries an optional.
    pub union_optional: bool,
    /// Union arity.
    pub union_length: usize,
    /// Member scores of a plain union.
    pub union: Vec<Score>,
    /// Whether the type carries annotation metadata.
    pub annotated: bool,
    /// Whether the origin class is user defined.
    pub custom: bool,
    /// Whether the type is optional.
    pub optional: bool,
    /// Length of the origin's ancestor chain.
    pub mro_length: usize,
    /// Number of generic parameters.
    pub typevars_length: usize,
    /// For each parameter, whether it is actually bound.
    pub typevars_filled: Vec<bool>,
    /// Recursive scores of the bound parameters.
    pub typevars: Vec<Score>,
    /// Identity of each ancestor-chain entry; the final deterministic
    /// tiebreak.
    pub origin_mro: Vec<ScoreOrigin>,
}

impl Score {
    /// The score of the missing-parameter sentinel: less specific than
    /// anything with an ancestor chain.
    pub fn missing() -> Score {
        Score {
            type_alias_name: String::new(),
            annotated_union: Vec::new(),
            union_optional: false,
            union_length: 0,
            union: Vec::new(),
            annotated: false,
            custom: false,
            optional: false,
            mro_length: 0,
            typevars_length: 0,
            typevars_filled: Vec::new(),
            typevars: Vec::new(),
            origin_mro: Vec::new(),
        }
    }

    /// Compute the score for a descriptor.
    pub fn create(cache: &TypeCache, typ: &Type) -> Score {
        let registry = cache.registry();

        let type_alias_name = typ
            .alias()
            .map(|id| registry.lookup(registry.alias_def(id).name).to_owned())
            .unwrap_or_default();

        let mut union: Vec<Score> = typ
            .union_members(cache)
            .iter()
            .map(|member| (*member.score(cache)).clone())
            .collect();

        let all_vars = typ.hierarchy(cache).all_vars(cache);
        let typevars_filled: Vec<bool> = all_vars
            .iter()
            .map(|v| matches!(v, VarValue::Bound(_)))
            .collect();
        let typevars: Vec<Score> = all_vars
            .iter()
            .map(|v| match v {
                VarValue::Bound(t) => (*t.score(cache)).clone(),
                VarValue::Missing => Score::missing(),
            })
            .collect();

        let origin_mro: Vec<ScoreOrigin> = registry
            .class_mro(typ.origin_class(cache))
            .into_iter()
            .map(|ancestor| ScoreOrigin::create(cache, ancestor))
            .collect();

        let annotated = typ.is_annotated();
        let optional = typ.optional();
        let custom = origin_mro.first().is_some_and(|o| o.custom);
        let union_length = union.len();
        let union_optional = !union.is_empty() && optional;
        let mro_length = origin_mro.len();
        let typevars_length = typevars.len();

        let annotated_union = if annotated && !union.is_empty() {
            std::mem::take(&mut union)
        } else {
            Vec::new()
        };

        Score {
            type_alias_name,
            annotated_union,
            union_optional,
            union_length,
            union,
            annotated,
            custom,
            optional,
            mro_length,
            typevars_length,
            typevars_filled,
            typevars,
            origin_mro,
        }
    }

    /// Human-readable multi-line breakdown, for debugging dispatch order.
    pub fn render(&self, indent: &str) -> String {
        let mut lines: Vec<String> = Vec::new();
        let check = |yes: bool| if yes { "+" } else { "-" };

        if !self.type_alias_name.is_empty() {
            lines.push(format!("+ type alias: {}", self.type_alias_name));
        }
        if !self.annotated_union.is_empty() {
            lines.push("+ annotated union:".to_owned());
            for score in &self.annotated_union {
                lines.push(score.render("    "));
            }
        }
        lines.push(format!("{} union optional", check(self.union_optional)));
        if self.union_length > 0 {
            lines.push(format!("{} union members", self.union_length));
        }
        if !self.union.is_empty() {
            lines.push("+ union:".to_owned());
            for score in &self.union {
                lines.push(score.render("    "));
            }
        }
        lines.push(format!("{} annotated", check(self.annotated)));
        lines.push(format!(
            "{} typevars {:?}",
            self.typevars_length, self.typevars_filled
        ));
        if !self.typevars.is_empty() {
            lines.push("+ typevars:".to_owned());
            for score in &self.typevars {
                lines.push(score.render("    "));
            }
        }
        lines.push(format!("{} optional", check(self.optional)));
        lines.push(format!("{} chain entries", self.mro_length));
        for origin in &self.origin_mro {
            lines.push(origin.render("  "));
        }

        lines
            .iter()
            .map(|line| format!("{indent}{line}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
