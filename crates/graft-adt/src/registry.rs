//! The per-unit ADT registry.
//!
//! Every concrete enum the unit knows about lives here: user
//! declarations and materialized generic instantiations alike. Lookup
//! by variant name is type-directed when a hint is available; without
//! one, a global scan that finds the variant in more than one enum is
//! an explicit ambiguity, never a first-match guess.

use rustc_hash::FxHashMap;

use graft_common::span::Span;
use graft_parse::ast::{EnumDecl, Variant};

use crate::error::{AdtError, AdtErrorKind};

/// Result of a variant lookup.
#[derive(Debug, PartialEq)]
pub enum Resolution<'a> {
    /// Exactly one enum defines the variant (or the hint selected one).
    Found(&'a EnumDecl, &'a Variant),
    /// No registered enum defines the variant.
    NotFound,
    /// Several enums define the variant and nothing disambiguates.
    /// Candidate enum names, sorted.
    Ambiguous(Vec<String>),
}

/// Registry of concrete enum declarations for one compilation unit.
#[derive(Debug, Default)]
pub struct AdtRegistry {
    decls: FxHashMap<String, EnumDecl>,
    /// Registration order, for deterministic iteration and emission.
    order: Vec<String>,
}

impl AdtRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a concrete enum. Duplicate enum names and duplicate
    /// variant names within the declaration are errors.
    pub fn register(&mut self, decl: EnumDecl) -> Result<(), AdtError> {
        debug_assert!(
            !decl.is_generic(),
            "generic declarations are templates, not registry entries"
        );
        if let Some(prev) = self.decls.get(&decl.name) {
            return Err(AdtError::new(
                AdtErrorKind::DuplicateEnum {
                    name: decl.name.clone(),
                    prev: prev.span,
                },
                decl.span,
            ));
        }
        for (i, v) in decl.variants.iter().enumerate() {
            if decl.variants[..i].iter().any(|p| p.name == v.name) {
                return Err(AdtError::new(
                    AdtErrorKind::DuplicateVariant {
                        enum_name: decl.name.clone(),
                        variant: v.name.clone(),
                    },
                    v.span,
                ));
            }
        }
        self.order.push(decl.name.clone());
        self.decls.insert(decl.name.clone(), decl);
        Ok(())
    }

    /// Look up an enum by name.
    pub fn get(&self, name: &str) -> Option<&EnumDecl> {
        self.decls.get(name)
    }

    /// Whether `name` is a registered enum.
    pub fn contains(&self, name: &str) -> bool {
        self.decls.contains_key(name)
    }

    /// Find the enum defining `variant`.
    ///
    /// With a `hint` (the scrutinee's resolved enum name) the search is
    /// restricted to that enum. Without one, all registered enums are
    /// scanned; more than one candidate is reported as
    /// [`Resolution::Ambiguous`].
    pub fn lookup_variant(&self, variant: &str, hint: Option<&str>) -> Resolution<'_> {
        if let Some(enum_name) = hint {
            return match self.decls.get(enum_name) {
                Some(decl) => match decl.variant(variant) {
                    Some(v) => Resolution::Found(decl, v),
                    None => Resolution::NotFound,
                },
                None => Resolution::NotFound,
            };
        }
        let mut candidates: Vec<&EnumDecl> = self
            .order
            .iter()
            .filter_map(|name| self.decls.get(name))
            .filter(|decl| decl.variant(variant).is_some())
            .collect();
        match candidates.len() {
            0 => Resolution::NotFound,
            1 => {
                let decl = candidates.remove(0);
                match decl.variant(variant) {
                    Some(v) => Resolution::Found(decl, v),
                    None => Resolution::NotFound,
                }
            }
            _ => {
                let mut names: Vec<String> =
                    candidates.iter().map(|d| d.name.clone()).collect();
                names.sort();
                Resolution::Ambiguous(names)
            }
        }
    }

    /// Registered declarations in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &EnumDecl> {
        self.order.iter().filter_map(|name| self.decls.get(name))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Strip the shapes a scrutinee type text can wear down to a bare enum
/// name usable as a lookup hint (`*Shape` and `Shape` both hint `Shape`).
pub fn hint_from_type(ty: &str) -> Option<&str> {
    let t = ty.trim();
    let t = t.strip_prefix('*').unwrap_or(t).trim();
    if graft_parse::scan::is_ident(t) {
        Some(t)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graft_parse::ast::VariantKind;

    fn decl(name: &str, variants: &[&str]) -> EnumDecl {
        EnumDecl {
            name: name.into(),
            type_params: vec![],
            variants: variants
                .iter()
                .enumerate()
                .map(|(i, v)| Variant {
                    name: (*v).into(),
                    kind: VariantKind::Unit,
                    span: Span::new(i as u32, i as u32 + 1),
                })
                .collect(),
            span: Span::new(0, 10),
        }
    }

    #[test]
    fn register_and_get() {
        let mut reg = AdtRegistry::new();
        reg.register(decl("Shape", &["Circle", "Point"])).unwrap();
        assert!(reg.contains("Shape"));
        assert_eq!(reg.get("Shape").unwrap().variants.len(), 2);
    }

    #[test]
    fn duplicate_enum_rejected() {
        let mut reg = AdtRegistry::new();
        reg.register(decl("Shape", &["Circle"])).unwrap();
        let err = reg.register(decl("Shape", &["Square"])).unwrap_err();
        assert!(matches!(err.kind, AdtErrorKind::DuplicateEnum { .. }));
        // The first registration stays authoritative.
        assert!(reg.get("Shape").unwrap().variant("Circle").is_some());
    }

    #[test]
    fn duplicate_variant_rejected() {
        let mut reg = AdtRegistry::new();
        let err = reg.register(decl("E", &["A", "B", "A"])).unwrap_err();
        assert!(matches!(
            err.kind,
            AdtErrorKind::DuplicateVariant { ref variant, .. } if variant == "A"
        ));
        assert!(!reg.contains("E"));
    }

    #[test]
    fn lookup_without_hint_single_owner() {
        let mut reg = AdtRegistry::new();
        reg.register(decl("Shape", &["Circle", "Point"])).unwrap();
        reg.register(decl("Color", &["Red"])).unwrap();
        match reg.lookup_variant("Circle", None) {
            Resolution::Found(d, v) => {
                assert_eq!(d.name, "Shape");
                assert_eq!(v.name, "Circle");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn lookup_ambiguous_without_hint() {
        let mut reg = AdtRegistry::new();
        reg.register(decl("NetResult", &["Ok", "Timeout"])).unwrap();
        reg.register(decl("FileResult", &["Ok", "Missing"])).unwrap();
        match reg.lookup_variant("Ok", None) {
            Resolution::Ambiguous(names) => {
                assert_eq!(names, vec!["FileResult".to_string(), "NetResult".to_string()]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn hint_resolves_ambiguity() {
        let mut reg = AdtRegistry::new();
        reg.register(decl("NetResult", &["Ok"])).unwrap();
        reg.register(decl("FileResult", &["Ok"])).unwrap();
        match reg.lookup_variant("Ok", Some("NetResult")) {
            Resolution::Found(d, _) => assert_eq!(d.name, "NetResult"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn hint_to_missing_variant_is_not_found() {
        let mut reg = AdtRegistry::new();
        reg.register(decl("Shape", &["Circle"])).unwrap();
        assert_eq!(reg.lookup_variant("Square", Some("Shape")), Resolution::NotFound);
    }

    #[test]
    fn unknown_variant_is_not_found() {
        let reg = AdtRegistry::new();
        assert_eq!(reg.lookup_variant("Circle", None), Resolution::NotFound);
    }

    #[test]
    fn hint_from_type_strips_pointers() {
        assert_eq!(hint_from_type("Shape"), Some("Shape"));
        assert_eq!(hint_from_type("*Shape"), Some("Shape"));
        assert_eq!(hint_from_type(" *Shape "), Some("Shape"));
        assert_eq!(hint_from_type("[]Shape"), None);
        assert_eq!(hint_from_type("map[string]int"), None);
    }
}
