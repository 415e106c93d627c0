//! Parsing arm pattern text into [`Pattern`] trees.
//!
//! The grammar is deliberately small: wildcard, literal, bare
//! identifier, constructor call with nested sub-patterns, struct
//! destructuring, and tuple. Whether a bare identifier is a unit
//! variant or a binding is not decidable here; lowering classifies it
//! against the registry.

use graft_common::diag::{codes, Diagnostic};
use graft_common::span::Span;

use crate::ast::{FieldPattern, Pattern};
use crate::scan::{is_ident, matching_delim, split_ranges, top_level_positions};

/// Parse one pattern. Failures are semantic diagnostics carrying
/// `span`, so a bad arm poisons its construct without aborting the unit.
pub fn parse_pattern(text: &str, span: Span) -> Result<Pattern, Diagnostic> {
    let t = text.trim();
    if t.is_empty() {
        return Err(invalid(span, "empty pattern"));
    }
    if t == "_" {
        return Ok(Pattern::Wildcard);
    }
    if is_literal(t) {
        return Ok(Pattern::Literal(t.to_string()));
    }
    if is_ident(t) {
        return Ok(Pattern::Ident(t.to_string()));
    }

    if let Some(rest) = t.strip_prefix('(') {
        // Tuple or parenthesized pattern; the closer must end the text.
        let close = matching_delim(t, 0);
        if close != Some(t.len() - 1) {
            return Err(invalid(span, format!("unbalanced `(` in pattern `{t}`")));
        }
        let inner = &rest[..rest.len() - 1];
        let parts = split_ranges(inner, ",");
        if parts.len() == 1 {
            return parse_pattern(inner, span);
        }
        let mut elems = Vec::with_capacity(parts.len());
        for r in parts {
            elems.push(parse_pattern(&inner[r], span)?);
        }
        return Ok(Pattern::Tuple(elems));
    }

    // `Name(...)` constructor pattern.
    if let Some(open) = t.find('(') {
        let name = t[..open].trim();
        if is_ident(name) && matching_delim(t, open) == Some(t.len() - 1) {
            let inner = &t[open + 1..t.len() - 1];
            let args = if inner.trim().is_empty() {
                Vec::new()
            } else {
                let mut args = Vec::new();
                for r in split_ranges(inner, ",") {
                    args.push(parse_pattern(&inner[r], span)?);
                }
                args
            };
            return Ok(Pattern::Constructor {
                name: name.to_string(),
                args,
            });
        }
    }

    // `Name { field, field: binding }` struct pattern.
    if let Some(open) = t.find('{') {
        let name = t[..open].trim();
        if is_ident(name) && matching_delim(t, open) == Some(t.len() - 1) {
            let inner = &t[open + 1..t.len() - 1];
            return parse_struct_fields(name, inner, span);
        }
    }

    Err(invalid(span, format!("cannot parse pattern `{t}`")))
}

fn parse_struct_fields(name: &str, inner: &str, span: Span) -> Result<Pattern, Diagnostic> {
    let mut fields = Vec::new();
    for r in split_ranges(inner, ",") {
        let part = inner[r].trim();
        if part.is_empty() {
            // Trailing comma.
            continue;
        }
        let (field, binding) = match top_level_positions(part, ":").first() {
            Some(&colon) => (part[..colon].trim(), part[colon + 1..].trim()),
            None => (part, part),
        };
        if !is_ident(field) {
            return Err(invalid(span, format!("bad field name `{field}` in pattern")));
        }
        if binding != "_" && !is_ident(binding) {
            return Err(invalid(
                span,
                format!("bad field binding `{binding}` in pattern"),
            ));
        }
        fields.push(FieldPattern {
            field: field.to_string(),
            binding: binding.to_string(),
        });
    }
    if fields.is_empty() {
        return Err(invalid(span, format!("empty struct pattern `{name} {{}}`")));
    }
    Ok(Pattern::Struct {
        name: name.to_string(),
        fields,
    })
}

/// Literal patterns: numbers (with optional sign), interpreted/raw
/// strings, runes, `true`, `false`, `nil`.
fn is_literal(t: &str) -> bool {
    if matches!(t, "true" | "false" | "nil") {
        return true;
    }
    let mut chars = t.chars();
    match chars.next() {
        Some(c) if c.is_ascii_digit() => true,
        Some('-') => matches!(chars.next(), Some(c) if c.is_ascii_digit()),
        Some('"' | '\'' | '`') => true,
        _ => false,
    }
}

fn invalid(span: Span, message: impl Into<String>) -> Diagnostic {
    Diagnostic::error(codes::INVALID_PATTERN, message, span)
}
