//! Oracle-first expression typing with structural fallbacks.
//!
//! The service is deliberately shallow: it never walks host expression
//! trees. It asks the oracle, then tries a handful of syntactic
//! shapes that are cheap to recognize and almost always right:
//!
//! - literals (`"s"`, `'r'`, `42`, `1.5`, `true`)
//! - parameters of the enclosing function
//! - calls to named unit-local functions with a single return value
//! - address-of over any of the above
//!
//! Everything else is `None`, which callers report as an
//! inference-incomplete diagnostic. Byte offsets passed in must index
//! the same text the [`SignatureIndex`] was scanned from.

use graft_parse::scan::{is_ident, matching_delim};
use graft_parse::SignatureIndex;

use crate::oracle::TypeOracle;

/// Expression typing for one unit.
pub struct InferenceService<'a> {
    oracle: &'a dyn TypeOracle,
    sigs: &'a SignatureIndex,
}

impl<'a> InferenceService<'a> {
    pub fn new(oracle: &'a dyn TypeOracle, sigs: &'a SignatureIndex) -> Self {
        Self { oracle, sigs }
    }

    /// Resolve the host type of `expr` as it appears at byte offset
    /// `at`. `None` means no source could determine it.
    pub fn expr_type(&self, expr: &str, at: u32) -> Option<String> {
        let expr = expr.trim();
        if expr.is_empty() {
            return None;
        }
        if let Some(ty) = self.oracle.resolve_type(expr) {
            return Some(ty);
        }
        if let Some(inner) = unwrap_parens(expr) {
            return self.expr_type(inner, at);
        }
        if let Some(ty) = literal_type(expr) {
            return Some(ty.to_string());
        }
        if is_ident(expr) {
            return self.param_type(expr, at);
        }
        if let Some(ty) = self.call_result(expr) {
            return Some(ty);
        }
        if let Some(rest) = expr.strip_prefix('&') {
            return self.expr_type(rest, at).map(|ty| format!("*{ty}"));
        }
        None
    }

    /// Declared return type of the function whose body contains `at`.
    pub fn enclosing_return(&self, at: u32) -> Option<&'a str> {
        self.sigs.enclosing(at)?.ret.as_deref()
    }

    fn param_type(&self, name: &str, at: u32) -> Option<String> {
        let sig = self.sigs.enclosing(at)?;
        sig.params
            .iter()
            .find(|p| p.name == name && !p.ty.is_empty())
            .map(|p| p.ty.clone())
    }

    /// `f(...)` where `f` names a unit-local function with exactly one
    /// declared return value.
    fn call_result(&self, expr: &str) -> Option<String> {
        if !expr.ends_with(')') {
            return None;
        }
        let open = expr.find('(')?;
        let name = &expr[..open];
        if !is_ident(name) || matching_delim(expr, open) != Some(expr.len() - 1) {
            return None;
        }
        let ret = self.sigs.by_name(name)?.ret.as_deref()?;
        if ret.starts_with('(') {
            return None;
        }
        Some(ret.to_string())
    }
}

/// The host type of a literal expression, or `None` when `expr` is not
/// a literal.
pub fn literal_type(expr: &str) -> Option<&'static str> {
    let e = expr.trim();
    if e.starts_with('"') || e.starts_with('`') {
        return Some("string");
    }
    if e.starts_with('\'') {
        return Some("rune");
    }
    if e == "true" || e == "false" {
        return Some("bool");
    }
    numeric_type(e)
}

fn numeric_type(e: &str) -> Option<&'static str> {
    let body = e.strip_prefix('-').map(str::trim_start).unwrap_or(e);
    let mut chars = body.chars();
    if !matches!(chars.next(), Some(c) if c.is_ascii_digit() || c == '.') {
        return None;
    }
    let lower = body.to_ascii_lowercase();
    if let Some(hex) = lower.strip_prefix("0x") {
        let ok = !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit() || c == '_');
        return ok.then_some("int");
    }
    let mut float = false;
    let bytes = lower.as_bytes();
    for (i, c) in lower.char_indices() {
        match c {
            '0'..='9' | '_' => {}
            '.' | 'e' => float = true,
            '+' | '-' if i > 0 && bytes[i - 1] == b'e' => {}
            _ => return None,
        }
    }
    Some(if float { "float64" } else { "int" })
}

/// Unwrap one full-width parenthesized group: `(x)` gives `x`, while
/// `(a)(b)` stays as is.
fn unwrap_parens(expr: &str) -> Option<&str> {
    if !expr.starts_with('(') || matching_delim(expr, 0) != Some(expr.len() - 1) {
        return None;
    }
    Some(expr[1..expr.len() - 1].trim())
}
