//! Host function-signature scanning.
//!
//! A single pass over the unit records every `func` declaration: name,
//! parameters, declared return type text, and body span. The index is
//! best-effort host knowledge for the inference heuristics (what type a
//! parameter has, what the enclosing function returns, what a call to a
//! known function yields); anything it cannot parse it simply omits.
//!
//! Return types are recorded as written in the *original* source, so a
//! generic annotation like `Result<int, string>` is still visible here
//! after the annotation rewriter has replaced it in the output.

use graft_common::span::Span;

use crate::scan::{code_chars, is_ident_continue, is_ident_start, split_top_level, ScannedChar};

/// One host function parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    /// Parameter name; empty for unnamed (type-only) parameters.
    pub name: String,
    pub ty: String,
}

/// One scanned host function.
#[derive(Debug, Clone, PartialEq)]
pub struct FnSig {
    /// Function name; empty for anonymous `func(...)` literals.
    pub name: String,
    pub params: Vec<Param>,
    /// Declared return type text, `None` when the function returns
    /// nothing. Multi-value returns keep their parentheses.
    pub ret: Option<String>,
    /// Span of the function body, braces exclusive.
    pub body_span: Span,
}

/// All function signatures of one unit, in source order.
#[derive(Debug, Default)]
pub struct SignatureIndex {
    sigs: Vec<FnSig>,
}

impl SignatureIndex {
    /// Scan a unit for function declarations, named and anonymous.
    pub fn scan(source: &str) -> Self {
        let scanned: Vec<ScannedChar> = code_chars(source).collect();
        let mut sigs = Vec::new();
        let mut i = 0;
        while i < scanned.len() {
            let sc = scanned[i];
            if sc.is_code && is_ident_start(sc.ch) {
                let end = word_end(&scanned, i);
                let word: String = scanned[i..end].iter().map(|s| s.ch).collect();
                if word == "func" {
                    if let Some(sig) = parse_func(source, &scanned, end) {
                        sigs.push(sig);
                    }
                }
                i = end;
                continue;
            }
            i += 1;
        }
        Self { sigs }
    }

    /// The innermost function whose body contains `offset`.
    pub fn enclosing(&self, offset: u32) -> Option<&FnSig> {
        self.sigs
            .iter()
            .filter(|s| s.body_span.start <= offset && offset < s.body_span.end)
            .min_by_key(|s| s.body_span.len())
    }

    /// The first function with this name, if any.
    pub fn by_name(&self, name: &str) -> Option<&FnSig> {
        self.sigs.iter().find(|s| !s.name.is_empty() && s.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FnSig> {
        self.sigs.iter()
    }
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

/// Next code, non-whitespace scanned index at or after `i`, staying on
/// the current statement (newlines stop the search).
fn next_code(scanned: &[ScannedChar], mut i: usize) -> Option<usize> {
    while i < scanned.len() {
        let sc = scanned[i];
        if sc.is_code {
            if sc.ch == '\n' {
                return None;
            }
            if !sc.ch.is_whitespace() {
                return Some(i);
            }
        }
        i += 1;
    }
    None
}

/// Scanned index just past the group closed by the matching `close` for
/// the opener at `i`, or `None` if it never closes.
fn skip_group(scanned: &[ScannedChar], i: usize, open: char, close: char) -> Option<usize> {
    let mut depth = 0i32;
    let mut j = i;
    while j < scanned.len() {
        let sc = scanned[j];
        if sc.is_code {
            if sc.ch == open {
                depth += 1;
            } else if sc.ch == close {
                depth -= 1;
                if depth == 0 {
                    return Some(j + 1);
                }
            }
        }
        j += 1;
    }
    None
}

/// Parse one function starting just after its `func` keyword. `None`
/// for anything that is not a function with a body (type annotations
/// like `var f func(int) int` land here and are skipped).
fn parse_func(source: &str, scanned: &[ScannedChar], after_kw: usize) -> Option<FnSig> {
    let i = next_code(scanned, after_kw)?;

    // `func (recv T) Name(...)`, `func Name(...)`, or `func(...)`. A
    // leading paren group is a receiver only when an identifier and a
    // second group follow; otherwise it is an anonymous function's
    // parameter list and any identifier after it starts the return type.
    let (name, params_idx) = if scanned[i].ch == '(' {
        let after = skip_group(scanned, i, '(', ')')?;
        match next_code(scanned, after) {
            Some(j) if is_ident_start(scanned[j].ch) => {
                let end = word_end(scanned, j);
                match next_code(scanned, end) {
                    Some(k) if scanned[k].ch == '(' => {
                        let name: String = scanned[j..end].iter().map(|s| s.ch).collect();
                        (name, k)
                    }
                    _ => (String::new(), i),
                }
            }
            _ => (String::new(), i),
        }
    } else if is_ident_start(scanned[i].ch) {
        let end = word_end(scanned, i);
        let name: String = scanned[i..end].iter().map(|s| s.ch).collect();
        let k = next_code(scanned, end)?;
        if scanned[k].ch != '(' {
            return None;
        }
        (name, k)
    } else {
        return None;
    };

    let params_open = scanned[params_idx].pos as usize;
    let after_params = skip_group(scanned, params_idx, '(', ')')?;
    let params_close = scanned[after_params - 1].pos as usize;

    // Return type runs to the body's `{` at depth zero, on the same
    // logical line. No `{` means no body: not a function declaration.
    let mut depth = 0i32;
    let mut j = after_params;
    let mut open_brace = None;
    while j < scanned.len() {
        let sc = scanned[j];
        if sc.is_code {
            match sc.ch {
                '\n' if depth == 0 => return None,
                '(' | '[' => depth += 1,
                ')' | ']' => depth -= 1,
                '{' if depth == 0 => {
                    open_brace = Some(j);
                    break;
                }
                _ => {}
            }
        }
        j += 1;
    }
    let open_brace = open_brace?;
    let open_pos = scanned[open_brace].pos as usize;
    let after_body = skip_group(scanned, open_brace, '{', '}')?;
    let close_pos = scanned[after_body - 1].pos;

    let ret = source[params_close + 1..open_pos].trim();
    let ret = if ret.is_empty() { None } else { Some(ret.to_string()) };

    Some(FnSig {
        name,
        params: parse_params(&source[params_open + 1..params_close]),
        ret,
        body_span: Span::new(open_pos as u32 + 1, close_pos),
    })
}

/// Parse a host parameter list, handling grouped names (`a, b int`),
/// multi-word types (`chan int`), and unnamed type-only lists.
fn parse_params(text: &str) -> Vec<Param> {
    let elements: Vec<&str> = split_top_level(text, ",")
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    if elements.is_empty() {
        return Vec::new();
    }

    let any_named = elements
        .iter()
        .any(|el| el.split_whitespace().nth(1).is_some());
    if !any_named {
        // Type-only list: `func f(int, string)`.
        return elements
            .into_iter()
            .map(|ty| Param { name: String::new(), ty: ty.to_string() })
            .collect();
    }

    // Grouped names inherit the type of the next element that has one.
    let mut params: Vec<Param> = Vec::with_capacity(elements.len());
    let mut pending = 0usize;
    for el in elements {
        let mut words = el.split_whitespace();
        let first = words.next().unwrap_or_default();
        let rest: Vec<&str> = words.collect();
        if rest.is_empty() {
            params.push(Param { name: first.to_string(), ty: String::new() });
            pending += 1;
        } else {
            let ty = rest.join(" ");
            for p in params.iter_mut().rev().take(pending) {
                p.ty = ty.clone();
            }
            pending = 0;
            params.push(Param { name: first.to_string(), ty });
        }
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_simple_function() {
        let src = "func area(s Shape) float64 {\n\treturn 0.0\n}\n";
        let idx = SignatureIndex::scan(src);
        let sig = idx.by_name("area").unwrap();
        assert_eq!(sig.params, vec![Param { name: "s".into(), ty: "Shape".into() }]);
        assert_eq!(sig.ret.as_deref(), Some("float64"));
        assert_eq!(&src[sig.body_span.range()], "\n\treturn 0.0\n");
    }

    #[test]
    fn function_without_return_type() {
        let idx = SignatureIndex::scan("func log(msg string) {\n\tprintln(msg)\n}\n");
        assert_eq!(idx.by_name("log").unwrap().ret, None);
    }

    #[test]
    fn generic_return_annotation_preserved() {
        let idx = SignatureIndex::scan("func parse(s string) Result<int, string> {\n\treturn x\n}\n");
        assert_eq!(idx.by_name("parse").unwrap().ret.as_deref(), Some("Result<int, string>"));
    }

    #[test]
    fn multi_value_return_keeps_parens() {
        let idx = SignatureIndex::scan("func pair() (int, error) {\n\treturn 1, nil\n}\n");
        assert_eq!(idx.by_name("pair").unwrap().ret.as_deref(), Some("(int, error)"));
    }

    #[test]
    fn method_receiver_is_skipped() {
        let idx = SignatureIndex::scan("func (s *Server) addr() string {\n\treturn s.a\n}\n");
        let sig = idx.by_name("addr").unwrap();
        assert!(sig.params.is_empty());
        assert_eq!(sig.ret.as_deref(), Some("string"));
    }

    #[test]
    fn grouped_params_share_type() {
        let idx = SignatureIndex::scan("func add(a, b int, s string) int {\n\treturn a\n}\n");
        let sig = idx.by_name("add").unwrap();
        assert_eq!(
            sig.params,
            vec![
                Param { name: "a".into(), ty: "int".into() },
                Param { name: "b".into(), ty: "int".into() },
                Param { name: "s".into(), ty: "string".into() },
            ]
        );
    }

    #[test]
    fn type_only_params() {
        let idx = SignatureIndex::scan("func f(int, string) {\n}\n");
        let sig = idx.by_name("f").unwrap();
        assert_eq!(
            sig.params,
            vec![
                Param { name: "".into(), ty: "int".into() },
                Param { name: "".into(), ty: "string".into() },
            ]
        );
    }

    #[test]
    fn anonymous_function_is_recorded() {
        let src = "func outer() int {\n\tf := func(x int) int {\n\t\treturn x\n\t}\n\treturn f(1)\n}\n";
        let idx = SignatureIndex::scan(src);
        assert_eq!(idx.iter().count(), 2);
        let inner_return = src.find("return x").unwrap() as u32;
        let enclosing = idx.enclosing(inner_return).unwrap();
        assert_eq!(enclosing.name, "");
        assert_eq!(enclosing.ret.as_deref(), Some("int"));
    }

    #[test]
    fn enclosing_picks_innermost() {
        let src = "func outer() string {\n\tg := func() int {\n\t\treturn 1\n\t}\n\treturn h(g)\n}\n";
        let idx = SignatureIndex::scan(src);
        let inner = src.find("return 1").unwrap() as u32;
        assert_eq!(idx.enclosing(inner).unwrap().ret.as_deref(), Some("int"));
        let outer = src.find("return h").unwrap() as u32;
        assert_eq!(idx.enclosing(outer).unwrap().ret.as_deref(), Some("string"));
    }

    #[test]
    fn func_type_annotation_is_not_a_function() {
        let idx = SignatureIndex::scan("var handler func(int) int\nfunc real() {\n}\n");
        assert_eq!(idx.iter().count(), 1);
        assert!(idx.by_name("real").is_some());
    }

    #[test]
    fn func_in_string_is_ignored() {
        let idx = SignatureIndex::scan("s := \"func fake() int {\"\nfunc real() {\n}\n");
        assert_eq!(idx.iter().count(), 1);
    }
}
