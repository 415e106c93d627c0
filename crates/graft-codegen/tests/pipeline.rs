//! Integration tests for the full lowering pipeline.
//!
//! These tests run whole units through `compile_unit` and assert on the
//! generated host text and the recorded diagnostics: dispatch structure
//! for every variant kind, closure typing in expression contexts, guard
//! nesting, variant-name resolution across enums, generic instantiation
//! from signatures, nil-safety modes, and the guarantee that generated
//! output never contains another extractable construct.

use graft_codegen::{compile_unit, UnitOutcome};
use graft_common::diag::codes;
use graft_common::{NilSafety, Options, Severity};
use graft_infer::NullOracle;
use graft_parse::find_constructs;

// ── Helpers ────────────────────────────────────────────────────────────

/// Run one unit through the pipeline with the given nil-safety mode.
fn compile_with(source: &str, nil_safety: NilSafety) -> UnitOutcome {
    let options = Options {
        nil_safety,
        ..Options::default()
    };
    compile_unit(source, options, &NullOracle).expect("extraction failed")
}

/// Run one unit with nil checks off, the mode that keeps dispatch
/// structure easiest to assert on.
fn compile(source: &str) -> UnitOutcome {
    compile_with(source, NilSafety::Off)
}

fn output(outcome: &UnitOutcome) -> &str {
    match &outcome.output {
        Some(text) => text,
        None => panic!(
            "unit produced no output; diagnostics: {:#?}",
            outcome.diagnostics
        ),
    }
}

fn assert_diag(outcome: &UnitOutcome, code: &str, needle: &str) {
    assert!(
        outcome
            .diagnostics
            .iter()
            .any(|d| d.code == code && d.message.contains(needle)),
        "expected {code} mentioning {needle:?}, got: {:#?}",
        outcome.diagnostics
    );
}

// ── Dispatch structure ─────────────────────────────────────────────────

#[test]
fn statement_match_dispatches_on_all_variant_kinds() {
    let source = "package main

enum Shape {
\tCircle(float64),
\tRect { w: float64, h: float64 },
\tPoint,
}

func inspect(s *Shape) {
\tmatch s {
\t\tCircle(r) => use(r),
\t\tRect { w, h } => area(w, h),
\t\tPoint => done(),
\t}
}
";
    let outcome = compile_with(source, NilSafety::On);
    let out = output(&outcome);
    assert!(outcome.diagnostics.is_empty(), "{:#?}", outcome.diagnostics);

    // Tuple variant: nil check, deref binding, body, flag set.
    assert!(out.contains(
        "\t__graft_m0 := s\n\
         \t__graft_matched0 := false\n\
         \tif !__graft_matched0 && __graft_m0.tag == Shape_Tag_Circle {\n\
         \t\tif __graft_m0.Circle_0 == nil { panic(\"graft: Shape.Circle: field Circle_0 is nil\") }\n\
         \t\tr := *__graft_m0.Circle_0\n\
         \t\tuse(r)\n\
         \t\t__graft_matched0 = true\n\
         \t}\n"
    ));

    // Struct variant: one slot per named field.
    assert!(out.contains(
        "\t\tif __graft_m0.Rect_w == nil { panic(\"graft: Shape.Rect: field Rect_w is nil\") }\n\
         \t\tw := *__graft_m0.Rect_w\n"
    ));
    assert!(out.contains("\t\th := *__graft_m0.Rect_h\n"));
    assert!(out.contains("\t\tarea(w, h)\n"));

    // Unit variant: tag test only.
    assert!(out.contains(
        "\tif !__graft_matched0 && __graft_m0.tag == Shape_Tag_Point {\n\
         \t\tdone()\n"
    ));

    // Runtime fallback after the last arm.
    assert!(out.contains(
        "\tif !__graft_matched0 {\n\
         \t\tpanic(\"graft: no match arm matched\")\n\
         \t}\n"
    ));
}

#[test]
fn expression_match_wraps_in_a_typed_closure() {
    let source = "package main

enum Shape {
\tCircle(float64),
\tPoint,
}

func area(s *Shape) float64 {
\tv := match s {
\t\tCircle(r) => r * r * 3.14,
\t\tPoint => 0.0,
\t}
\treturn v
}
";
    let outcome = compile(source);
    let out = output(&outcome);
    assert!(outcome.diagnostics.is_empty(), "{:#?}", outcome.diagnostics);

    // The closure's return type comes from the first arm whose body
    // type is derivable (here the 0.0 literal), never left blank.
    assert!(out.contains("\tv := func() float64 {\n\t\t__graft_m0 := s\n"));
    assert!(out.contains("\t\t\treturn r * r * 3.14\n"));
    assert!(out.contains("\t\t\treturn 0.0\n"));
    assert!(out.contains("\t\tpanic(\"graft: no match arm matched\")\n\t}()\n"));
    assert!(out.contains("\treturn v\n"));
}

#[test]
fn tuple_scrutinees_destructure_elementwise() {
    let source = "package main

func quadrant(a int, b int) string {
\treturn match (a, b) {
\t\t(0, 0) => \"origin\",
\t\t(x, 0) => axis(x),
\t\t_ => \"plane\",
\t}
}
";
    let outcome = compile(source);
    let out = output(&outcome);
    assert!(outcome.diagnostics.is_empty(), "{:#?}", outcome.diagnostics);

    assert!(out.contains(
        "\treturn func() string {\n\
         \t\t__graft_m0_0 := a\n\
         \t\t__graft_m0_1 := b\n"
    ));
    assert!(out.contains("\t\tif __graft_m0_0 == 0 && __graft_m0_1 == 0 {\n\t\t\treturn \"origin\"\n"));
    assert!(out.contains("\t\tif __graft_m0_1 == 0 {\n\t\t\tx := __graft_m0_0\n\t\t\treturn axis(x)\n"));
}

#[test]
fn guards_nest_inside_the_structural_test() {
    let source = "package main

enum Shape {
\tCircle(float64),
\tPoint,
}

func f(s *Shape) {
\tmatch s {
\t\tCircle(r) if r > 1.0 => big(r),
\t\t_ => small(),
\t}
}
";
    let outcome = compile(source);
    let out = output(&outcome);
    assert!(outcome.diagnostics.is_empty(), "{:#?}", outcome.diagnostics);

    // Bindings are in scope for the guard; the flag only flips inside it,
    // so a false guard falls through to the next arm.
    assert!(out.contains(
        "\tif !__graft_matched0 && __graft_m0.tag == Shape_Tag_Circle {\n\
         \t\tr := *__graft_m0.Circle_0\n\
         \t\tif r > 1.0 {\n\
         \t\t\tbig(r)\n\
         \t\t\t__graft_matched0 = true\n\
         \t\t}\n\
         \t}\n"
    ));
    assert!(out.contains(
        "\tif !__graft_matched0 {\n\
         \t\tsmall()\n\
         \t\t__graft_matched0 = true\n\
         \t}\n"
    ));
}

// ── Variant resolution across enums ────────────────────────────────────

const TWO_ENUMS: &str = "package main

enum NetResult {
\tOk(int),
\tDown,
}

enum DiskResult {
\tOk(int),
\tFull,
}
";

#[test]
fn typed_scrutinee_picks_among_shared_variant_names() {
    let source = format!(
        "{TWO_ENUMS}
func f(n *NetResult) {{
\tmatch n {{
\t\tOk(v) => use(v),
\t\tDown => halt(),
\t}}
}}
"
    );
    let outcome = compile(&source);
    let out = output(&outcome);
    assert!(outcome.diagnostics.is_empty(), "{:#?}", outcome.diagnostics);
    assert!(out.contains("__graft_m0.tag == NetResult_Tag_Ok"));
    assert!(!out.contains("__graft_m0.tag == DiskResult_Tag_Ok"));
}

#[test]
fn unknown_scrutinee_with_shared_variant_names_is_ambiguous() {
    let source = format!(
        "{TWO_ENUMS}
func f(x any) {{
\tmatch x {{
\t\tOk(v) => use(v),
\t\t_ => skip(),
\t}}
}}
"
    );
    let outcome = compile(&source);
    assert!(outcome.output.is_none());
    assert_diag(&outcome, codes::AMBIGUOUS_VARIANT, "DiskResult");
    assert_diag(&outcome, codes::AMBIGUOUS_VARIANT, "NetResult");
}

#[test]
fn unknown_variant_in_a_pattern_blocks_output() {
    let source = "package main

enum Shape {
\tCircle(float64),
\tPoint,
}

func f(s *Shape) {
\tmatch s {
\t\tCircle(r) => use(r),
\t\tSquare(q) => use(q),
\t\tPoint => halt(),
\t}
}
";
    let outcome = compile(source);
    assert!(outcome.output.is_none());
    assert_diag(&outcome, codes::UNKNOWN_VARIANT, "no variant `Square`");
}

#[test]
fn missing_variants_are_reported_by_name() {
    let source = "package main

enum Shape {
\tCircle(float64),
\tRect { w: float64, h: float64 },
\tPoint,
}

func f(s *Shape) {
\tmatch s {
\t\tCircle(r) => use(r),
\t}
}
";
    let outcome = compile(source);
    assert!(outcome.output.is_none());
    assert_diag(
        &outcome,
        codes::NON_EXHAUSTIVE_MATCH,
        "missing variant(s): Rect, Point",
    );
}

// ── Generic instantiation end to end ───────────────────────────────────

#[test]
fn builtin_result_flows_from_signature_to_dispatch() {
    let source = "package main

func parse(s string) Result<int, string> {
\tif bad(s) {
\t\treturn Err(\"nope\")
\t}
\treturn Ok(1)
}

func main() {
\tmatch parse(\"x\") {
\t\tOk(v) => use(v),
\t\tErr(e) => warn(e),
\t}
}
";
    let outcome = compile(source);
    let out = output(&outcome);
    assert!(outcome.diagnostics.is_empty(), "{:#?}", outcome.diagnostics);

    // The annotation is mangled and the constructors take addresses of
    // hoisted temporaries.
    assert!(out.contains("func parse(s string) Result_int_string {"));
    assert!(out.contains("\t\t__graft_tmp0 := \"nope\"\n\t\treturn Result_int_string_Err(&__graft_tmp0)\n"));
    assert!(out.contains("\t__graft_tmp1 := 1\n\treturn Result_int_string_Ok(&__graft_tmp1)\n"));

    // The call-result scrutinee resolves to the same instantiation.
    assert!(out.contains("\t__graft_m0 := parse(\"x\")\n"));
    assert!(out.contains("__graft_m0.tag == Result_int_string_Tag_Ok"));
    assert!(out.contains("v := *__graft_m0.Ok_0"));

    // One injected declaration block serves both uses.
    assert_eq!(out.matches("type Result_int_string struct {").count(), 1);
    assert!(out.contains("func Result_int_string_Ok(a0 *int) Result_int_string {"));
}

#[test]
fn user_templates_reach_match_dispatch() {
    let source = "package main

enum Either<L, R> {
\tLeft(L),
\tRight(R),
}

func pick(e *Either<int, string>) int {
\treturn match e {
\t\tLeft(l) => l,
\t\tRight(r) => length(r),
\t}
}
";
    let outcome = compile(source);
    let out = output(&outcome);
    assert!(outcome.diagnostics.is_empty(), "{:#?}", outcome.diagnostics);

    assert!(out.contains("func pick(e *Either_int_string) int {"));
    assert!(out.contains("\treturn func() int {\n\t\t__graft_m0 := e\n"));
    assert!(out.contains("__graft_m0.tag == Either_int_string_Tag_Left"));
    assert!(out.contains("l := *__graft_m0.Left_0"));
    assert!(out.contains("type Either_int_string struct {"));

    // The template itself never reaches the output.
    assert!(!out.contains("enum Either"));
    assert!(!out.contains("type Either struct"));
}

// ── Output hygiene ─────────────────────────────────────────────────────

#[test]
fn output_is_never_reextractable() {
    let source = "package main

enum Shape {
\tCircle(float64),
\tPoint,
}

func label(s *Shape, t *Shape) string {
\tnote := \"match me: enum Shape { }\"
\tmatch s {
\t\tCircle(r) => {
\t\t\tinner := match t {
\t\t\t\tPoint => \"point\",
\t\t\t\t_ => \"circle\",
\t\t\t}
\t\t\temit(note, inner, r)
\t\t},
\t\tPoint => emit(note, \"point\", 0.0),
\t}
\treturn \"done\"
}
";
    let outcome = compile_with(source, NilSafety::On);
    let out = output(&outcome);
    assert!(outcome.diagnostics.is_empty(), "{:#?}", outcome.diagnostics);

    // The user's string literal survives verbatim.
    assert!(out.contains("note := \"match me: enum Shape { }\""));
    assert!(out.contains("inner := func() string {"));

    // Nothing in the generated text scans as a new construct, even
    // though panic strings mention the word "match".
    let constructs = find_constructs(out).expect("output must stay scannable");
    assert!(
        constructs.is_empty(),
        "generated output re-extracts: {:?}",
        constructs
            .iter()
            .map(|c| &out[c.keyword_span.range()])
            .collect::<Vec<_>>()
    );
}

// ── Nil-safety modes ───────────────────────────────────────────────────

const NIL_SOURCE: &str = "package main

enum Shape {
\tCircle(float64),
\tPoint,
}

func f(s *Shape) {
\tmatch s {
\t\tCircle(r) => use(r),
\t\tPoint => done(),
\t}
}
";

#[test]
fn nil_safety_modes_gate_the_slot_checks() {
    let off = compile_with(NIL_SOURCE, NilSafety::Off);
    let out = output(&off);
    assert!(!out.contains("== nil"));
    assert!(!out.contains("__graft_debug_checks"));

    let on = compile_with(NIL_SOURCE, NilSafety::On);
    let out = output(&on);
    assert!(out.contains("if __graft_m0.Circle_0 == nil { panic(\"graft: Shape.Circle: field Circle_0 is nil\") }"));
    assert!(!out.contains("__graft_debug_checks"));

    let debug = compile_with(NIL_SOURCE, NilSafety::Debug);
    let out = output(&debug);
    assert!(out.contains("if __graft_debug_checks && __graft_m0.Circle_0 == nil {"));
    assert!(out.contains("var __graft_debug_checks = true"));
    assert!(out.contains("func GraftSetDebugChecks(enabled bool)"));
}

#[test]
fn debug_flag_declares_once_for_many_matches() {
    let source = "package main

enum Shape {
\tCircle(float64),
\tPoint,
}

func f(a *Shape, b *Shape) {
\tmatch a {
\t\tCircle(r) => use(r),
\t\t_ => skip(),
\t}
\tmatch b {
\t\tCircle(r) => use(r),
\t\t_ => skip(),
\t}
}
";
    let outcome = compile_with(source, NilSafety::Debug);
    let out = output(&outcome);

    // Distinct temps per construct, one flag declaration for the unit.
    assert!(out.contains("\t__graft_m0 := a\n"));
    assert!(out.contains("\t__graft_m1 := b\n"));
    assert_eq!(out.matches("var __graft_debug_checks = true").count(), 1);
    assert_eq!(out.matches("func GraftSetDebugChecks").count(), 1);
}

// ── Warnings ───────────────────────────────────────────────────────────

#[test]
fn warnings_do_not_block_output() {
    let source = "package main

func f(x int) {
\tmatch x {
\t\t_ => first(),
\t\t1 => second(),
\t}
}
";
    let outcome = compile(source);
    assert!(outcome.output.is_some());
    assert_diag(&outcome, codes::UNREACHABLE_ARM, "never match");
    assert!(outcome
        .diagnostics
        .iter()
        .all(|d| d.severity == Severity::Warning));
}
