//! The external type-knowledge seam.

use rustc_hash::FxHashMap;

/// Adapter for an external host type checker.
///
/// `resolve_type` answers with the host type of an expression text as
/// written in the unit, or `None` when the oracle has no answer. The
/// inference service queries its oracle before falling back to
/// structural heuristics, so a real checker always wins where it has
/// an opinion.
pub trait TypeOracle {
    fn resolve_type(&self, expr: &str) -> Option<String>;
}

/// An oracle with no knowledge; every lookup misses.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullOracle;

impl TypeOracle for NullOracle {
    fn resolve_type(&self, _expr: &str) -> Option<String> {
        None
    }
}

/// A table-backed oracle mapping expression texts to type texts.
/// Lookups trim surrounding whitespace but are otherwise exact.
#[derive(Debug, Default)]
pub struct StaticOracle {
    types: FxHashMap<String, String>,
}

impl StaticOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, expr: impl Into<String>, ty: impl Into<String>) {
        self.types.insert(expr.into(), ty.into());
    }
}

impl TypeOracle for StaticOracle {
    fn resolve_type(&self, expr: &str) -> Option<String> {
        self.types.get(expr.trim()).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_oracle_trims_queries() {
        let mut oracle = StaticOracle::new();
        oracle.insert("user.Name", "string");
        assert_eq!(oracle.resolve_type(" user.Name "), Some("string".to_string()));
        assert_eq!(oracle.resolve_type("user"), None);
    }

    #[test]
    fn null_oracle_always_misses() {
        assert_eq!(NullOracle.resolve_type("x"), None);
    }
}
