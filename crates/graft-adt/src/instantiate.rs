//! Generic enum templates and the instantiation cache.
//!
//! Generic declarations (`enum Result<T, E>`) never reach the registry
//! themselves; they are templates here. Each distinct (template,
//! type-argument list) key materializes one concrete declaration with a
//! mangled name, exactly once. The cache is keyed by the tuple, never
//! by parsing generated names back apart.

use rustc_hash::FxHashMap;

use graft_parse::ast::{EnumDecl, Field, Variant, VariantKind};
use graft_parse::scan::{is_ident_continue, is_ident_start};

use crate::error::{AdtError, AdtErrorKind, InstError};

/// One instantiation result.
#[derive(Debug, PartialEq)]
pub struct Instantiation {
    /// Concrete enum name for this key, e.g. `Result_int_string`.
    pub name: String,
    /// The concrete declaration, present only the first time the key is
    /// materialized; the caller registers it and lowers its layout.
    /// Cache hits carry `None`.
    pub created: Option<EnumDecl>,
}

/// Template store and instantiation cache for one unit.
#[derive(Debug, Default)]
pub struct Instantiator {
    templates: FxHashMap<String, EnumDecl>,
    cache: FxHashMap<(String, Vec<String>), String>,
}

impl Instantiator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a generic declaration as a template.
    pub fn register_template(&mut self, decl: EnumDecl) -> Result<(), AdtError> {
        debug_assert!(decl.is_generic(), "concrete declarations go to the registry");
        if let Some(prev) = self.templates.get(&decl.name) {
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
        self.templates.insert(decl.name.clone(), decl);
        Ok(())
    }

    /// Whether `name` names a registered template.
    pub fn is_template(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    pub fn template(&self, name: &str) -> Option<&EnumDecl> {
        self.templates.get(name)
    }

    /// The concrete name already cached for a key, if any.
    pub fn cached(&self, template: &str, args: &[String]) -> Option<&str> {
        self.cache
            .get(&(template.to_string(), args.to_vec()))
            .map(String::as_str)
    }

    /// Materialize `template` with `args`, reusing the cache.
    pub fn instantiate(
        &mut self,
        template: &str,
        args: &[String],
    ) -> Result<Instantiation, InstError> {
        let decl = self
            .templates
            .get(template)
            .ok_or_else(|| InstError::UnknownTemplate { name: template.to_string() })?;
        if decl.type_params.len() != args.len() {
            return Err(InstError::ArityMismatch {
                template: template.to_string(),
                expected: decl.type_params.len(),
                got: args.len(),
            });
        }
        for arg in args {
            if arg.contains('<') {
                return Err(InstError::NestedGeneric { arg: arg.clone() });
            }
        }

        let key = (template.to_string(), args.to_vec());
        if let Some(name) = self.cache.get(&key) {
            return Ok(Instantiation { name: name.clone(), created: None });
        }

        let name = mangle(template, args);
        let subst: FxHashMap<&str, &str> = decl
            .type_params
            .iter()
            .map(String::as_str)
            .zip(args.iter().map(String::as_str))
            .collect();
        let variants = decl
            .variants
            .iter()
            .map(|v| Variant {
                name: v.name.clone(),
                kind: match &v.kind {
                    VariantKind::Unit => VariantKind::Unit,
                    VariantKind::Tuple(tys) => {
                        VariantKind::Tuple(tys.iter().map(|t| subst_type(t, &subst)).collect())
                    }
                    VariantKind::Struct(fields) => VariantKind::Struct(
                        fields
                            .iter()
                            .map(|f| Field {
                                name: f.name.clone(),
                                ty: subst_type(&f.ty, &subst),
                            })
                            .collect(),
                    ),
                },
                span: v.span,
            })
            .collect();
        let concrete = EnumDecl {
            name: name.clone(),
            type_params: Vec::new(),
            variants,
            span: decl.span,
        };
        self.cache.insert(key, name.clone());
        Ok(Instantiation { name, created: Some(concrete) })
    }
}

/// Mangled concrete name for a template and its argument list:
/// `Result` + (`int`, `string`) becomes `Result_int_string`.
pub fn mangle(template: &str, args: &[String]) -> String {
    let mut name = template.to_string();
    for arg in args {
        name.push('_');
        name.push_str(&type_suffix(arg));
    }
    name
}

/// Reduce a host type text to an identifier-safe suffix segment.
fn type_suffix(ty: &str) -> String {
    let t = ty.trim();
    if let Some(rest) = t.strip_prefix("[]") {
        return format!("Slice{}", type_suffix(rest));
    }
    if let Some(rest) = t.strip_prefix('*') {
        return format!("Ptr{}", type_suffix(rest));
    }
    if let Some(rest) = t.strip_prefix("map[") {
        if let Some(close) = rest.find(']') {
            return format!(
                "Map{}To{}",
                type_suffix(&rest[..close]),
                type_suffix(&rest[close + 1..])
            );
        }
    }
    t.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

/// Replace identifier-boundary occurrences of template parameters in a
/// field type text (`[]T` with T=int becomes `[]int`).
fn subst_type(ty: &str, map: &FxHashMap<&str, &str>) -> String {
    let mut out = String::with_capacity(ty.len());
    let mut rest = ty;
    while let Some(c) = rest.chars().next() {
        if is_ident_start(c) {
            let end = rest
                .find(|ch: char| !is_ident_continue(ch))
                .unwrap_or(rest.len());
            let word = &rest[..end];
            out.push_str(map.get(word).copied().unwrap_or(word));
            rest = &rest[end..];
        } else {
            out.push(c);
            rest = &rest[c.len_utf8()..];
        }
    }
    out
}
