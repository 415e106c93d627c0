//! Parsing `enum` declaration text.
//!
//! The header carries the name and optional generic parameter list; the
//! body is a comma-separated variant list. Field *types* are host text
//! and pass through unparsed (`*int`, `[]string`, `map[string]int` are
//! all fine); only the shape around them is checked.

use graft_common::diag::{codes, Diagnostic};
use graft_common::span::Span;

use crate::ast::{EnumDecl, Field, Variant, VariantKind};
use crate::construct::{ConstructKind, RawConstruct};
use crate::scan::{is_ident, matching_delim, split_top_level, top_level_positions};

/// Parse an extracted `enum` construct into a declaration.
///
/// Malformed declarations are semantic diagnostics: the construct's
/// lines are already claimed and will be dropped from the output, but
/// the rest of the unit keeps processing.
pub fn parse_enum_decl(raw: &RawConstruct) -> Result<EnumDecl, Diagnostic> {
    debug_assert_eq!(raw.kind, ConstructKind::Enum);

    let (name, type_params) = parse_header(&raw.header, raw.header_span)?;

    let mut variants = Vec::new();
    let mut cursor = 0u32;
    for part in split_top_level(&raw.body, ",") {
        let offset = raw.body_span.start + cursor;
        cursor += part.len() as u32 + 1;
        let t = part.trim();
        if t.is_empty() {
            continue;
        }
        let lead = (part.len() - part.trim_start().len()) as u32;
        let span = Span::new(offset + lead, offset + lead + t.len() as u32);
        variants.push(parse_variant(t, span)?);
    }

    if variants.is_empty() {
        return Err(malformed(
            raw.header_span,
            format!("enum `{name}` has no variants"),
        ));
    }

    Ok(EnumDecl {
        name,
        type_params,
        variants,
        span: raw.span,
    })
}

fn parse_header(header: &str, span: Span) -> Result<(String, Vec<String>), Diagnostic> {
    if header.is_empty() {
        return Err(malformed(span, "enum declaration is missing a name"));
    }
    let (name, params) = match header.find('<') {
        Some(open) => {
            if !header.ends_with('>') {
                return Err(malformed(
                    span,
                    format!("bad generic parameter list in `enum {header}`"),
                ));
            }
            let mut params = Vec::new();
            for p in split_top_level(&header[open + 1..header.len() - 1], ",") {
                let p = p.trim();
                if !is_ident(p) {
                    return Err(malformed(
                        span,
                        format!("bad generic parameter `{p}` in `enum {header}`"),
                    ));
                }
                params.push(p.to_string());
            }
            (header[..open].trim(), params)
        }
        None => (header, Vec::new()),
    };
    if !is_ident(name) {
        return Err(malformed(span, format!("bad enum name `{name}`")));
    }
    Ok((name.to_string(), params))
}

fn parse_variant(text: &str, span: Span) -> Result<Variant, Diagnostic> {
    if is_ident(text) {
        return Ok(Variant {
            name: text.to_string(),
            kind: VariantKind::Unit,
            span,
        });
    }

    if let Some(open) = text.find('(') {
        let name = text[..open].trim();
        if !is_ident(name) || matching_delim(text, open) != Some(text.len() - 1) {
            return Err(malformed(span, format!("bad variant `{text}`")));
        }
        let inner = &text[open + 1..text.len() - 1];
        let mut tys = Vec::new();
        for part in split_top_level(inner, ",") {
            let ty = part.trim();
            if ty.is_empty() {
                return Err(malformed(
                    span,
                    format!("empty field type in variant `{name}`"),
                ));
            }
            tys.push(ty.to_string());
        }
        if tys.is_empty() {
            return Err(malformed(
                span,
                format!("tuple variant `{name}` has no fields; write a bare `{name}` instead"),
            ));
        }
        return Ok(Variant {
            name: name.to_string(),
            kind: VariantKind::Tuple(tys),
            span,
        });
    }

    if let Some(open) = text.find('{') {
        let name = text[..open].trim();
        if !is_ident(name) || matching_delim(text, open) != Some(text.len() - 1) {
            return Err(malformed(span, format!("bad variant `{text}`")));
        }
        let inner = &text[open + 1..text.len() - 1];
        let mut fields: Vec<Field> = Vec::new();
        for part in split_top_level(inner, ",") {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let colon = top_level_positions(part, ":").first().copied().ok_or_else(|| {
                malformed(span, format!("field `{part}` of `{name}` needs `name: type`"))
            })?;
            let fname = part[..colon].trim();
            let ty = part[colon + 1..].trim();
            if !is_ident(fname) || ty.is_empty() {
                return Err(malformed(
                    span,
                    format!("bad field `{part}` in variant `{name}`"),
                ));
            }
            if fields.iter().any(|f| f.name == fname) {
                return Err(malformed(
                    span,
                    format!("duplicate field `{fname}` in variant `{name}`"),
                ));
            }
            fields.push(Field {
                name: fname.to_string(),
                ty: ty.to_string(),
            });
        }
        if fields.is_empty() {
            return Err(malformed(span, format!("struct variant `{name}` has no fields")));
        }
        return Ok(Variant {
            name: name.to_string(),
            kind: VariantKind::Struct(fields),
            span,
        });
    }

    Err(malformed(span, format!("bad variant `{text}`")))
}

fn malformed(span: Span, message: impl Into<String>) -> Diagnostic {
    Diagnostic::error(codes::MALFORMED_ENUM, message, span)
}
