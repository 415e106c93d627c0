//! Recognizing generic type references in host text.
//!
//! A generic reference is an identifier immediately followed by an
//! angle-bracketed argument list: `Result<int, string>`. The scanner
//! only reports identifiers the caller confirms as known templates,
//! which is what keeps ordinary comparisons like `a < b` from being
//! misread; as a second fence, anything between the angle brackets
//! that could not be a type (operators, quotes) disqualifies the hit.

use crate::scan::{code_chars, is_ident_continue, is_ident_start, ScannedChar};

/// One generic reference found in a text.
#[derive(Debug, Clone, PartialEq)]
pub struct GenericRef {
    pub name: String,
    pub args: Vec<String>,
    /// Byte range of the whole reference within the scanned text,
    /// `name` through the closing `>`.
    pub start: usize,
    pub end: usize,
}

/// Find every generic reference in `text` whose base name satisfies
/// `is_template`. Results are in source order and never overlap.
pub fn find_generic_refs(text: &str, is_template: &dyn Fn(&str) -> bool) -> Vec<GenericRef> {
    let scanned: Vec<ScannedChar> = code_chars(text).collect();
    let mut out = Vec::new();
    let mut i = 0;
    while i < scanned.len() {
        let sc = scanned[i];
        if !sc.is_code || !is_ident_start(sc.ch) {
            i += 1;
            continue;
        }
        let end = word_end(&scanned, i);
        let word: String = scanned[i..end].iter().map(|s| s.ch).collect();
        let word_after = scanned[end - 1].pos + scanned[end - 1].ch.len_utf8() as u32;
        if !is_template(&word)
            || end >= scanned.len()
            || !scanned[end].is_code
            || scanned[end].ch != '<'
            || scanned[end].pos != word_after
        {
            i = end;
            continue;
        }
        if let Some(r) = parse_angle_args(text, &scanned, i, end) {
            i = r.1;
            out.push(r.0);
            continue;
        }
        i = end;
    }
    out
}

/// Parse one reference's `<...>` once the opener at scanned index
/// `open_idx` is known. Returns the reference and the scanned index to
/// resume at, or `None` when the brackets do not close or the interior
/// is not type-shaped.
fn parse_angle_args(
    text: &str,
    scanned: &[ScannedChar],
    name_idx: usize,
    open_idx: usize,
) -> Option<(GenericRef, usize)> {
    let mut depth = 0i32;
    let mut close_idx = None;
    for (j, sc) in scanned.iter().enumerate().skip(open_idx) {
        if !sc.is_code {
            continue;
        }
        match sc.ch {
            '<' => depth += 1,
            '>' => {
                depth -= 1;
                if depth == 0 {
                    close_idx = Some(j);
                    break;
                }
            }
            '\n' | ';' => return None,
            _ => {}
        }
    }
    let close_idx = close_idx?;
    let open_pos = scanned[open_idx].pos as usize;
    let close_pos = scanned[close_idx].pos as usize;
    let inner = &text[open_pos + 1..close_pos];

    let mut args = Vec::new();
    for part in split_type_args(inner) {
        let arg = part.trim();
        if arg.is_empty() || !looks_like_type(arg) {
            return None;
        }
        args.push(arg.to_string());
    }
    if args.is_empty() {
        return None;
    }

    let name: String = scanned[name_idx..open_idx].iter().map(|s| s.ch).collect();
    Some((
        GenericRef {
            name,
            args,
            start: scanned[name_idx].pos as usize,
            end: close_pos + 1,
        },
        close_idx + 1,
    ))
}

/// Split a `<...>` interior on commas at angle and delimiter depth zero.
fn split_type_args(inner: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0usize;
    for sc in code_chars(inner) {
        if !sc.is_code {
            continue;
        }
        match sc.ch {
            '<' | '(' | '[' | '{' => depth += 1,
            '>' | ')' | ']' | '}' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(&inner[start..sc.pos as usize]);
                start = sc.pos as usize + 1;
            }
            _ => {}
        }
    }
    parts.push(&inner[start..]);
    parts
}

/// A cheap shape check: type texts never carry these operator
/// characters, while misread comparison expressions usually do.
fn looks_like_type(arg: &str) -> bool {
    !arg.contains(['&', '|', '=', '+', '!', '"', '\''])
}

fn word_end(scanned: &[ScannedChar], i: usize) -> usize {
    let mut j = i;
    let mut next_pos = scanned[i].pos;
    while j < scanned.len() {
        let sc = scanned[j];
        if !sc.is_code || !is_ident_continue(sc.ch) || sc.pos != next_pos {
            break;
        }
        next_pos = sc.pos + sc.ch.len_utf8() as u32;
        j += 1;
    }
    j
}

#[cfg(test)]
mod tests {
    use super::*;

    fn templates(names: &'static [&'static str]) -> impl Fn(&str) -> bool {
        move |n: &str| names.contains(&n)
    }

    fn refs(text: &str) -> Vec<GenericRef> {
        find_generic_refs(text, &templates(&["Result", "Option"]))
    }

    #[test]
    fn finds_return_annotation() {
        let text = "func parse(s string) Result<int, string> {";
        let got = refs(text);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].name, "Result");
        assert_eq!(got[0].args, vec!["int".to_string(), "string".to_string()]);
        assert_eq!(&text[got[0].start..got[0].end], "Result<int, string>");
    }

    #[test]
    fn finds_var_annotation() {
        let got = refs("var x Option<*User>");
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].args, vec!["*User".to_string()]);
    }

    #[test]
    fn nested_generic_is_one_reference_with_nested_arg() {
        let got = refs("var x Option<Option<int>>");
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].args, vec!["Option<int>".to_string()]);
    }

    #[test]
    fn unknown_base_name_is_ignored() {
        assert!(refs("var x List<int>").is_empty());
    }

    #[test]
    fn comparison_is_not_a_reference() {
        assert!(refs("ok := a < b && c > d").is_empty());
        assert!(refs("if Result < x && y > z {").is_empty());
    }

    #[test]
    fn string_contents_are_ignored() {
        assert!(refs("s := \"Result<int, string>\"").is_empty());
    }

    #[test]
    fn space_before_angle_is_not_a_reference() {
        assert!(refs("sum := Result < count").is_empty());
    }

    #[test]
    fn two_references_in_one_signature() {
        let text = "func f(a Option<int>, b Result<int, string>) {";
        let got = refs(text);
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].name, "Option");
        assert_eq!(got[1].name, "Result");
    }

    #[test]
    fn map_argument_brackets_do_not_split() {
        let got = refs("var x Result<map[string]int, string>");
        assert_eq!(got.len(), 1);
        assert_eq!(
            got[0].args,
            vec!["map[string]int".to_string(), "string".to_string()]
        );
    }
}
