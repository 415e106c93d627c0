//! Constructor-call and type-annotation rewriting.
//!
//! Three passes share this machinery: the user-enum pass and the two
//! builtin passes (`Result`, `Option`). Each walks a text with the code
//! scanner, finds constructor names in call position (word-boundary,
//! outside strings and comments, not behind a selector dot), and
//! replaces the call with the lowered constructor. Arguments that are
//! not stable storage locations are hoisted into `__graft_tmp<n>`
//! bindings so the emitted call never takes the address of a literal
//! or call result.
//!
//! Builtin calls infer their type arguments before rewriting: the
//! argument expression's type fills the parameter it is tied to, and
//! the enclosing function's declared return type fills what is left
//! when the call sits in a `return` statement. When both know the same
//! parameter, the argument wins. A parameter neither source can fill is
//! an inference-incomplete diagnostic and the call stays as written.

use graft_adt::Resolution;
use graft_common::diag::{codes, Diagnostic};
use graft_common::span::Span;
use graft_parse::ast::{EnumDecl, VariantKind};
use graft_parse::scan::{
    code_chars, is_ident, is_ident_continue, is_ident_start, is_selector_path, matching_delim,
    split_top_level, ScannedChar,
};
use graft_parse::types::find_generic_refs;
use rustc_hash::FxHashMap;

use crate::context::Context;

/// Constructor names reserved for the builtin plugins. The user-enum
/// pass never intercepts these.
pub const BUILTIN_CTOR_NAMES: [&str; 4] = ["Ok", "Err", "Some", "None"];

/// Which constructors one rewriting pass intercepts.
#[derive(Debug, Clone, Copy)]
pub enum CallTarget<'t> {
    /// Variants of the named concrete user enums.
    UserEnums(&'t [String]),
    /// Variants of one builtin generic template.
    Builtin(&'static str),
}

/// How return-position is judged for the enclosing-return-type fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnCtx {
    /// Look at the statement text on the call's own line.
    PerLine,
    /// The whole text sits in return position.
    Always,
    /// The text never sits in return position.
    Never,
}

/// One rewriting result: the new text plus hoisted statements that must
/// execute before it.
#[derive(Debug, Default)]
pub struct Rewritten {
    pub text: String,
    pub hoists: Vec<String>,
}

/// Rewrite constructor calls in `text`, then keep rewriting inside the
/// hoists the rewrite produced until none are left. Hoists come back in
/// evaluation order.
pub fn rewrite_deep(
    text: &str,
    at_base: u32,
    target: CallTarget<'_>,
    ret: ReturnCtx,
    ctx: &mut Context<'_>,
) -> Rewritten {
    let rw = rewrite_calls(text, at_base, target, ret, ctx);
    let mut hoists = Vec::new();
    for h in rw.hoists {
        let inner = rewrite_deep(&h, at_base, target, ReturnCtx::Never, ctx);
        hoists.extend(inner.hoists);
        hoists.push(inner.text);
    }
    Rewritten { text: rw.text, hoists }
}

/// Rewrite a multi-line text, splicing each line's hoists in before it
/// at the line's own indentation. Used for plain user lines and for
/// block arm bodies, where a hoist is just another statement.
pub fn rewrite_lines(
    text: &str,
    span: Span,
    ann_filter: &dyn Fn(&str) -> bool,
    target: CallTarget<'_>,
    ctx: &mut Context<'_>,
) -> String {
    let mut out = String::with_capacity(text.len());
    let mut offset = 0usize;
    for piece in text.split_inclusive('\n') {
        let at = span.start + (offset as u32).min(span.len());
        offset += piece.len();
        let (line, eol) = match piece.strip_suffix('\n') {
            Some(l) => (l, "\n"),
            None => (piece, ""),
        };
        let annotated = rewrite_annotations(line, at, ann_filter, ctx);
        let rw = rewrite_deep(&annotated, at, target, ReturnCtx::PerLine, ctx);
        if !rw.hoists.is_empty() {
            let indent = leading_ws(line);
            for h in &rw.hoists {
                out.push_str(indent);
                out.push_str(h);
                out.push('\n');
            }
        }
        out.push_str(&rw.text);
        out.push_str(eol);
    }
    out
}

/// Rewrite one stored expression text (scrutinee, guard, expression arm
/// body): annotations first, then constructor calls.
pub fn rewrite_expr(
    text: &str,
    at: u32,
    ann_filter: &dyn Fn(&str) -> bool,
    target: CallTarget<'_>,
    ret: ReturnCtx,
    ctx: &mut Context<'_>,
) -> Rewritten {
    let annotated = rewrite_annotations(text, at, ann_filter, ctx);
    rewrite_deep(&annotated, at, target, ret, ctx)
}

/// Re-run a pass over hoists produced by earlier passes.
pub fn rewrite_hoist_list(
    hoists: &mut Vec<String>,
    at: u32,
    target: CallTarget<'_>,
    ctx: &mut Context<'_>,
) {
    let old = std::mem::take(hoists);
    for h in old {
        let rw = rewrite_deep(&h, at, target, ReturnCtx::Never, ctx);
        hoists.extend(rw.hoists);
        hoists.push(rw.text);
    }
}

/// Rewrite generic type annotations (`Result<int, string>`) to their
/// instantiations' concrete names, materializing on demand. Only
/// references whose base name is a registered template and passes
/// `filter` are touched.
pub fn rewrite_annotations(
    text: &str,
    at_base: u32,
    filter: &dyn Fn(&str) -> bool,
    ctx: &mut Context<'_>,
) -> String {
    let refs = {
        let is_template = |n: &str| ctx.instantiator.is_template(n) && filter(n);
        find_generic_refs(text, &is_template)
    };
    if refs.is_empty() {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut last = 0usize;
    for r in refs {
        let span = ctx.unit_span(at_base + r.start as u32, at_base + r.end as u32);
        if let Some(name) = ctx.materialize(&r.name, &r.args, span) {
            out.push_str(&text[last..r.start]);
            out.push_str(&name);
            last = r.end;
        }
    }
    out.push_str(&text[last..]);
    out
}

/// One scan-and-replace pass over `text` for `target`'s constructors.
pub fn rewrite_calls(
    text: &str,
    at_base: u32,
    target: CallTarget<'_>,
    ret: ReturnCtx,
    ctx: &mut Context<'_>,
) -> Rewritten {
    let scanned: Vec<ScannedChar> = code_chars(text).collect();
    let builtin_decl: Option<EnumDecl> = match target {
        CallTarget::Builtin(name) => ctx.instantiator.template(name).cloned(),
        CallTarget::UserEnums(_) => None,
    };

    let mut out = String::with_capacity(text.len());
    let mut hoists = Vec::new();
    let mut last = 0usize;
    let mut i = 0usize;
    while i < scanned.len() {
        let sc = scanned[i];
        if !sc.is_code || !is_ident_start(sc.ch) {
            i += 1;
            continue;
        }
        let end = word_end(&scanned, i);
        let wstart = scanned[i].pos as usize;
        let wend = scanned[end - 1].pos as usize + scanned[end - 1].ch.len_utf8();
        let word = &text[wstart..wend];

        if preceded_by_dot(&scanned, i) {
            i = end;
            continue;
        }

        // Resolve the word to a constructor this pass owns.
        let resolved = match (&target, &builtin_decl) {
            (CallTarget::UserEnums(user), _) => {
                resolve_user_ctor(word, user, wstart, wend, at_base, ctx)
            }
            (CallTarget::Builtin(_), Some(decl)) => decl
                .variant(word)
                .map(|v| (decl.name.clone(), v.kind.clone())),
            _ => None,
        };
        let Some((owner, kind)) = resolved else {
            i = end;
            continue;
        };

        // Call position: `(` next, or a bare `None`.
        let open = next_code_on_line(&scanned, end).filter(|&j| scanned[j].ch == '(');
        let (args, call_end) = match open {
            Some(j) => {
                let open_pos = scanned[j].pos as usize;
                let Some(close) = matching_delim(text, open_pos) else {
                    i = end;
                    continue;
                };
                let args: Vec<String> = split_top_level(&text[open_pos + 1..close], ",")
                    .into_iter()
                    .map(str::trim)
                    .filter(|a| !a.is_empty())
                    .map(str::to_string)
                    .collect();
                (args, close + 1)
            }
            None if word == "None" && matches!(target, CallTarget::Builtin(_)) => {
                (Vec::new(), wend)
            }
            None => {
                i = end;
                continue;
            }
        };

        let span = ctx.unit_span(at_base + wstart as u32, at_base + call_end as u32);
        let arity = match &kind {
            VariantKind::Unit => 0,
            VariantKind::Tuple(tys) => tys.len(),
            VariantKind::Struct(fields) => fields.len(),
        };
        if args.len() != arity {
            ctx.sink.push(Diagnostic::error(
                codes::PATTERN_ARITY,
                format!("constructor `{word}` takes {arity} argument(s), found {}", args.len()),
                span,
            ));
            i = skip_to(&scanned, end, call_end);
            continue;
        }

        // For builtins the owner is a template; pin its type arguments.
        let enum_name = match target {
            CallTarget::UserEnums(_) => Some(owner),
            CallTarget::Builtin(template) => infer_builtin_args(
                template,
                &kind,
                &args,
                text,
                wstart,
                at_base,
                ret,
                span,
                ctx,
            ),
        };
        let Some(enum_name) = enum_name else {
            i = skip_to(&scanned, end, call_end);
            continue;
        };

        // Emit the lowered call, hoisting unaddressable arguments.
        let mut lowered_args = Vec::with_capacity(args.len());
        for arg in &args {
            if is_ident(arg) || is_selector_path(arg) {
                lowered_args.push(format!("&{arg}"));
            } else {
                let tmp = ctx.next_tmp();
                hoists.push(format!("{tmp} := {arg}"));
                lowered_args.push(format!("&{tmp}"));
            }
        }
        out.push_str(&text[last..wstart]);
        out.push_str(&format!("{enum_name}_{word}({})", lowered_args.join(", ")));
        last = call_end;
        i = skip_to(&scanned, end, call_end);
    }
    out.push_str(&text[last..]);
    Rewritten { text: out, hoists }
}

/// Resolve a word against the unit's concrete user enums. Ambiguity is
/// reported here; anything else that does not resolve is silently left
/// to the host (it may be a host function or a later pass's name).
fn resolve_user_ctor(
    word: &str,
    user_enums: &[String],
    wstart: usize,
    wend: usize,
    at_base: u32,
    ctx: &mut Context<'_>,
) -> Option<(String, VariantKind)> {
    if BUILTIN_CTOR_NAMES.contains(&word) || ctx.sigs.by_name(word).is_some() {
        return None;
    }
    let owners: Vec<String> = match ctx.registry.lookup_variant(word, None) {
        Resolution::Found(decl, _) => vec![decl.name.clone()],
        Resolution::Ambiguous(owners) => owners,
        Resolution::NotFound => return None,
    };
    // Materialized instantiations of user templates count as user
    // enums; their names live in the pending list until collection.
    let mut owners: Vec<String> = owners
        .into_iter()
        .filter(|o| user_enums.contains(o) || ctx.pending.iter().any(|(_, n)| n == o))
        .collect();
    match owners.len() {
        0 => None,
        1 => {
            let owner = owners.pop()?;
            let kind = ctx.registry.get(&owner)?.variant(word)?.kind.clone();
            Some((owner, kind))
        }
        _ => {
            let span = ctx.unit_span(at_base + wstart as u32, at_base + wend as u32);
            ctx.sink.push(Diagnostic::error(
                codes::AMBIGUOUS_VARIANT,
                format!(
                    "constructor `{word}` is ambiguous: declared by {}",
                    owners.join(", ")
                ),
                span,
            ));
            None
        }
    }
}

/// Infer a builtin call's type arguments and materialize the
/// instantiation. `None` means a diagnostic was recorded and the call
/// stays as written.
#[allow(clippy::too_many_arguments)]
fn infer_builtin_args(
    template: &str,
    kind: &VariantKind,
    args: &[String],
    text: &str,
    wstart: usize,
    at_base: u32,
    ret: ReturnCtx,
    span: Span,
    ctx: &mut Context<'_>,
) -> Option<String> {
    let params: Vec<String> = match ctx.instantiator.template(template) {
        Some(decl) => decl.type_params.clone(),
        None => return None,
    };
    let at = at_base + wstart as u32;
    let mut values: FxHashMap<String, String> = FxHashMap::default();

    // Argument expressions first: each fills the parameter its field is
    // declared with.
    if let VariantKind::Tuple(tys) = kind {
        for (arg, ty) in args.iter().zip(tys) {
            if params.contains(ty) && !values.contains_key(ty) {
                if let Some(found) = ctx.expr_type(arg, at) {
                    values.insert(ty.clone(), found);
                }
            }
        }
    }

    // The enclosing return type fills what is left, in return position.
    let in_return = match ret {
        ReturnCtx::Always => true,
        ReturnCtx::Never => false,
        ReturnCtx::PerLine => line_is_return(text, wstart),
    };
    if in_return && values.len() < params.len() {
        if let Some(ret_ty) = ctx.enclosing_return(at) {
            let trimmed = ret_ty.trim();
            let refs = find_generic_refs(trimmed, &|n: &str| n == template);
            if let [r] = refs.as_slice() {
                if r.start == 0 && r.end == trimmed.len() {
                    for (p, a) in params.iter().zip(&r.args) {
                        values.entry(p.clone()).or_insert_with(|| a.clone());
                    }
                }
            }
        }
    }

    let missing: Vec<&str> = params
        .iter()
        .filter(|p| !values.contains_key(*p))
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        ctx.sink.push(Diagnostic::error(
            codes::GENERIC_ARGS_UNKNOWN,
            format!(
                "cannot infer type argument(s) {} of `{template}`; annotate the enclosing \
                 function's return type or bind the value with a typed declaration",
                missing.join(", "),
            ),
            span,
        ));
        return None;
    }

    let ordered: Vec<String> = params.iter().map(|p| values[p].clone()).collect();
    ctx.materialize(template, &ordered, span)
}

/// Whether the statement text before `pos` on its own line starts with
/// the `return` keyword.
fn line_is_return(text: &str, pos: usize) -> bool {
    let line_start = text[..pos].rfind('\n').map_or(0, |i| i + 1);
    let stmt = text[line_start..pos]
        .rsplit(';')
        .next()
        .unwrap_or("")
        .trim_start();
    match stmt.strip_prefix("return") {
        Some(rest) => rest.chars().next().map_or(true, |c| !is_ident_continue(c)),
        None => false,
    }
}

fn leading_ws(line: &str) -> &str {
    let end = line
        .char_indices()
        .find(|&(_, c)| c != ' ' && c != '\t')
        .map_or(line.len(), |(i, _)| i);
    &line[..end]
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

/// First code, non-whitespace scanned index at or after `i` on the same
/// line.
fn next_code_on_line(scanned: &[ScannedChar], mut i: usize) -> Option<usize> {
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

/// Last code, non-whitespace char before scanned index `i` is a `.`.
fn preceded_by_dot(scanned: &[ScannedChar], i: usize) -> bool {
    scanned[..i]
        .iter()
        .rev()
        .find(|sc| sc.is_code && !sc.ch.is_whitespace())
        .is_some_and(|sc| sc.ch == '.')
}

/// Scanned index at or after `from` whose byte position reaches `pos`.
fn skip_to(scanned: &[ScannedChar], from: usize, pos: usize) -> usize {
    let mut j = from;
    while j < scanned.len() && (scanned[j].pos as usize) < pos {
        j += 1;
    }
    j
}

#[cfg(test)]
mod tests {
    use super::*;
    use graft_common::options::Options;
    use graft_infer::NullOracle;
    use graft_parse::ast::{Field, Variant};

    const ORACLE: NullOracle = NullOracle;

    fn decl(name: &str, params: &[&str], variants: Vec<Variant>) -> EnumDecl {
        EnumDecl {
            name: name.into(),
            type_params: params.iter().map(|p| p.to_string()).collect(),
            variants,
            span: Span::point(0),
        }
    }

    fn tuple_variant(name: &str, tys: &[&str]) -> Variant {
        Variant {
            name: name.into(),
            kind: VariantKind::Tuple(tys.iter().map(|t| t.to_string()).collect()),
            span: Span::point(0),
        }
    }

    fn unit_variant(name: &str) -> Variant {
        Variant { name: name.into(), kind: VariantKind::Unit, span: Span::point(0) }
    }

    /// Context over a source with a Shape enum registered and the two
    /// builtin templates installed.
    fn ctx_for(source: &str) -> Context<'static> {
        let mut ctx = Context::new(source, Options::default(), &ORACLE);
        ctx.registry
            .register(decl(
                "Shape",
                &[],
                vec![
                    tuple_variant("Circle", &["float64"]),
                    Variant {
                        name: "Rect".into(),
                        kind: VariantKind::Struct(vec![
                            Field { name: "w".into(), ty: "float64".into() },
                            Field { name: "h".into(), ty: "float64".into() },
                        ]),
                        span: Span::point(0),
                    },
                    unit_variant("Point"),
                ],
            ))
            .unwrap();
        ctx.instantiator
            .register_template(decl(
                "Result",
                &["T", "E"],
                vec![tuple_variant("Ok", &["T"]), tuple_variant("Err", &["E"])],
            ))
            .unwrap();
        ctx.instantiator
            .register_template(decl(
                "Option",
                &["T"],
                vec![tuple_variant("Some", &["T"]), unit_variant("None")],
            ))
            .unwrap();
        ctx
    }

    fn user_enums() -> Vec<String> {
        vec!["Shape".to_string()]
    }

    #[test]
    fn user_ctor_with_addressable_arg() {
        let mut ctx = ctx_for("");
        let users = user_enums();
        let rw = rewrite_deep(
            "s := Circle(r)",
            0,
            CallTarget::UserEnums(&users),
            ReturnCtx::Never,
            &mut ctx,
        );
        assert_eq!(rw.text, "s := Shape_Circle(&r)");
        assert!(rw.hoists.is_empty());
    }

    #[test]
    fn literal_arg_is_hoisted() {
        let mut ctx = ctx_for("");
        let users = user_enums();
        let rw = rewrite_deep(
            "s := Circle(2.0)",
            0,
            CallTarget::UserEnums(&users),
            ReturnCtx::Never,
            &mut ctx,
        );
        assert_eq!(rw.hoists, vec!["__graft_tmp0 := 2.0".to_string()]);
        assert_eq!(rw.text, "s := Shape_Circle(&__graft_tmp0)");
    }

    #[test]
    fn call_result_arg_is_hoisted() {
        let mut ctx = ctx_for("");
        let users = user_enums();
        let rw = rewrite_deep(
            "s := Rect(area(x), h)",
            0,
            CallTarget::UserEnums(&users),
            ReturnCtx::Never,
            &mut ctx,
        );
        assert_eq!(rw.hoists, vec!["__graft_tmp0 := area(x)".to_string()]);
        assert_eq!(rw.text, "s := Shape_Rect(&__graft_tmp0, &h)");
    }

    #[test]
    fn selector_and_string_occurrences_are_left_alone() {
        let mut ctx = ctx_for("");
        let users = user_enums();
        let src = "a := res.Circle(1)\nb := \"Circle(1)\"";
        let rw = rewrite_deep(src, 0, CallTarget::UserEnums(&users), ReturnCtx::Never, &mut ctx);
        assert_eq!(rw.text, src);
    }

    #[test]
    fn builtin_ok_infers_from_argument_and_return() {
        let src = "func parse(s string, n int) Result<int, string> {\n\treturn Ok(n)\n}\n";
        let mut ctx = ctx_for(src);
        let at = src.find("Ok(n)").unwrap() as u32;
        let rw = rewrite_deep("Ok(n)", at, CallTarget::Builtin("Result"), ReturnCtx::Always, &mut ctx);
        assert_eq!(rw.text, "Result_int_string_Ok(&n)");
        assert!(ctx.registry.contains("Result_int_string"));
        assert_eq!(ctx.pending, vec![("Result".to_string(), "Result_int_string".to_string())]);
    }

    #[test]
    fn argument_type_wins_over_return_type() {
        // Declared return says T = int; the argument resolves to string.
        let src = "func f(s string) Result<int, string> {\n\treturn Ok(s)\n}\n";
        let mut ctx = ctx_for(src);
        let at = src.find("Ok(s)").unwrap() as u32;
        let rw = rewrite_deep("Ok(s)", at, CallTarget::Builtin("Result"), ReturnCtx::Always, &mut ctx);
        assert_eq!(rw.text, "Result_string_string_Ok(&s)");
    }

    #[test]
    fn unresolvable_type_argument_is_a_diagnostic() {
        let mut ctx = ctx_for("func g() {\n\tx := Ok(y)\n}\n");
        let rw = rewrite_deep("x := Ok(y)", 11, CallTarget::Builtin("Result"), ReturnCtx::PerLine, &mut ctx);
        assert_eq!(rw.text, "x := Ok(y)");
        let diag = ctx.sink.iter().next().unwrap();
        assert_eq!(diag.code, codes::GENERIC_ARGS_UNKNOWN);
        assert!(diag.message.contains('T'));
    }

    #[test]
    fn bare_none_uses_the_return_type() {
        let src = "func find(k string) Option<int> {\n\treturn None\n}\n";
        let mut ctx = ctx_for(src);
        let at = src.find("None").unwrap() as u32;
        let rw = rewrite_deep("None", at, CallTarget::Builtin("Option"), ReturnCtx::Always, &mut ctx);
        assert_eq!(rw.text, "Option_int_None()");
        assert!(ctx.registry.contains("Option_int"));
    }

    #[test]
    fn nested_generic_argument_from_return_is_rejected() {
        let src = "func f(o Option<int>) Result<Option<int>, string> {\n\treturn Ok(o)\n}\n";
        let mut ctx = ctx_for(src);
        let at = src.find("Ok(o)").unwrap() as u32;
        let rw = rewrite_deep("Ok(o)", at, CallTarget::Builtin("Result"), ReturnCtx::Always, &mut ctx);
        assert_eq!(rw.text, "Ok(o)");
        assert!(ctx.sink.iter().any(|d| d.code == codes::NESTED_GENERIC));
    }

    #[test]
    fn annotation_in_signature_is_rewritten() {
        let mut ctx = ctx_for("");
        let out = rewrite_annotations(
            "func parse(s string) Result<int, string> {",
            0,
            &|n| n == "Result",
            &mut ctx,
        );
        assert_eq!(out, "func parse(s string) Result_int_string {");
        assert!(ctx.registry.contains("Result_int_string"));
    }

    #[test]
    fn ambiguous_user_ctor_is_a_diagnostic() {
        let mut ctx = ctx_for("");
        ctx.registry
            .register(decl("Temp", &[], vec![tuple_variant("Circle", &["int"])]))
            .unwrap();
        let users = vec!["Shape".to_string(), "Temp".to_string()];
        let rw = rewrite_deep(
            "s := Circle(x)",
            0,
            CallTarget::UserEnums(&users),
            ReturnCtx::Never,
            &mut ctx,
        );
        assert_eq!(rw.text, "s := Circle(x)");
        assert!(ctx.sink.iter().any(|d| d.code == codes::AMBIGUOUS_VARIANT));
    }

    #[test]
    fn arity_mismatch_is_a_diagnostic() {
        let mut ctx = ctx_for("");
        let users = user_enums();
        let rw = rewrite_deep(
            "s := Circle(a, b)",
            0,
            CallTarget::UserEnums(&users),
            ReturnCtx::Never,
            &mut ctx,
        );
        assert_eq!(rw.text, "s := Circle(a, b)");
        assert!(ctx.sink.iter().any(|d| d.code == codes::PATTERN_ARITY));
    }

    #[test]
    fn lines_rewriting_splices_hoists_at_line_indent() {
        let mut ctx = ctx_for("");
        let users = user_enums();
        let text = "\tif ok {\n\t\ts := Circle(2.0)\n\t}\n";
        let out = rewrite_lines(
            text,
            Span::new(0, text.len() as u32),
            &|_| false,
            CallTarget::UserEnums(&users),
            &mut ctx,
        );
        assert_eq!(out, "\tif ok {\n\t\t__graft_tmp0 := 2.0\n\t\ts := Shape_Circle(&__graft_tmp0)\n\t}\n");
    }

    #[test]
    fn host_function_with_variant_name_is_not_intercepted() {
        let src = "func Point() int {\n\treturn 1\n}\nfunc main() {\n\tx := Point()\n}\n";
        let mut ctx = ctx_for(src);
        let users = user_enums();
        let rw = rewrite_deep("x := Point()", 0, CallTarget::UserEnums(&users), ReturnCtx::Never, &mut ctx);
        assert_eq!(rw.text, "x := Point()");
    }
}
