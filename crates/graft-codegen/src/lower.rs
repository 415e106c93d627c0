//! Match lowering.
//!
//! A stored construct advances through four states, strictly in order:
//! scrutinee bound, arms compiled, exhaustiveness checked, emitted. A
//! construct that cannot advance records its diagnostic and collapses
//! to an explicit error marker, so one bad match never hides problems
//! in the rest of the unit.
//!
//! Statement context emits a flat dispatch block: the scrutinee binds
//! once, every arm is an independent `if` gated by a matched flag, and
//! a trailing fallback panics. Expression context wraps the same arm
//! chain in an immediately-invoked closure whose declared return type
//! comes from the first arm body the inference service can type; a
//! matched arm returns directly. In both shapes a failed guard falls
//! out of its arm's `if` and the next arm still runs.

use graft_adt::{hint_from_type, Slot, TAG_FIELD};
use graft_common::diag::{codes, Diagnostic};
use graft_common::options::NilSafety;
use graft_common::span::Span;
use graft_parse::ast::{EnumDecl, Pattern, VariantKind};
use graft_parse::construct::MatchContext;
use graft_parse::find_generic_refs;
use graft_parse::scan::{is_ident, matching_delim, split_top_level};

use crate::context::{Context, MatchConstruct};
use crate::emit::{
    error_marker, nil_check_cond, nil_panic, HostWriter, MATCHED_FLAG, MATCH_TEMP, NO_MATCH_PANIC,
};

/// Lower one stored construct to its replacement text. On failure the
/// diagnostics are already in the sink and the construct's lines become
/// an explicit marker, keeping later stages honest about where it was.
pub fn lower_construct(mc: &MatchConstruct, ctx: &mut Context<'_>) -> String {
    match Lowering::new(mc).run(ctx) {
        Ok(text) => text,
        Err(why) => marker_block(mc, why),
    }
}

fn marker_block(mc: &MatchConstruct, why: &str) -> String {
    let stmt = error_marker(why);
    match mc.context {
        MatchContext::Statement => format!("{}{stmt}\n", mc.indent),
        MatchContext::Expression => format!("{}{stmt}{}\n", mc.prefix, mc.suffix),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Created,
    ScrutineeBound,
    ArmsCompiled,
    ExhaustivenessChecked,
}

/// What the scrutinee turned out to be.
#[derive(Debug)]
enum Shape {
    Pending,
    /// A value of a registered enum; dispatch on its tag.
    Enum(String),
    /// A parenthesized element list; per-position checks against the
    /// decomposed element temporaries.
    Tuple(Vec<String>),
    /// An opaque host value; literal and catch-all arms only.
    Value,
}

/// Conditions and statements at one nesting depth of a compiled arm.
/// Conditions at depth d are checked before statements at depth d run;
/// statements at depth d bind what conditions at depth d+1 read.
#[derive(Debug, Default)]
struct Level {
    conds: Vec<String>,
    stmts: Vec<String>,
}

#[derive(Debug, Default)]
struct Levels {
    levels: Vec<Level>,
}

impl Levels {
    fn at(&mut self, depth: usize) -> &mut Level {
        while self.levels.len() <= depth {
            self.levels.push(Level::default());
        }
        &mut self.levels[depth]
    }

    fn cond(&mut self, depth: usize, c: String) {
        self.at(depth).conds.push(c);
    }

    fn stmt(&mut self, depth: usize, s: String) {
        self.at(depth).stmts.push(s);
    }

    fn cond_count(&self) -> usize {
        self.levels.iter().map(|l| l.conds.len()).sum()
    }
}

/// Variant coverage one arm contributes toward exhaustiveness.
struct Cover {
    selects: Option<String>,
    /// Sub-patterns are all irrefutable, so the selected variant is
    /// fully covered.
    full: bool,
}

impl Cover {
    fn plain() -> Self {
        Cover { selects: None, full: false }
    }

    fn catch_all() -> Self {
        Cover { selects: None, full: true }
    }

    fn variant(name: &str, full: bool) -> Self {
        Cover { selects: Some(name.to_string()), full }
    }
}

struct CompiledArm {
    levels: Vec<Level>,
    guard: Option<String>,
    guard_hoists: Vec<String>,
    body_hoists: Vec<String>,
    body: String,
    pattern_span: Span,
    selects: Option<String>,
    full_cover: bool,
    /// No condition at any depth: the arm matches every value.
    irrefutable: bool,
}

impl CompiledArm {
    fn unguarded_catch_all(&self) -> bool {
        self.irrefutable && self.guard.is_none()
    }
}

struct Lowering<'m> {
    mc: &'m MatchConstruct,
    temp: String,
    flag: String,
    state: State,
    shape: Shape,
    compiled: Vec<CompiledArm>,
    ret_ty: Option<String>,
}

impl<'m> Lowering<'m> {
    fn new(mc: &'m MatchConstruct) -> Self {
        Self {
            mc,
            temp: format!("{MATCH_TEMP}{}", mc.id),
            flag: format!("{MATCHED_FLAG}{}", mc.id),
            state: State::Created,
            shape: Shape::Pending,
            compiled: Vec::new(),
            ret_ty: None,
        }
    }

    fn run(mut self, ctx: &mut Context<'_>) -> Result<String, &'static str> {
        self.bind_scrutinee(ctx)?;
        self.compile_arms(ctx)?;
        self.check_exhaustiveness(ctx)?;
        Ok(self.emit())
    }

    /// Classify the scrutinee: tuple decomposition, a registered enum
    /// (by resolved type, else by the variants the arms name), or an
    /// opaque value.
    fn bind_scrutinee(&mut self, ctx: &mut Context<'_>) -> Result<(), &'static str> {
        debug_assert_eq!(self.state, State::Created);
        if self.mc.poisoned {
            return Err("invalid match construct");
        }
        let has_tuple_arm = self
            .mc
            .arms
            .iter()
            .any(|a| matches!(a.arm.pattern, Pattern::Tuple(_)));
        if has_tuple_arm {
            match tuple_elements(&self.mc.scrutinee) {
                Some(elems) => self.shape = Shape::Tuple(elems),
                None => {
                    ctx.sink.push(Diagnostic::error(
                        codes::INVALID_PATTERN,
                        "tuple patterns need a parenthesized scrutinee like `(a, b)`",
                        self.mc.header_span,
                    ));
                    return Err("tuple pattern without a tuple scrutinee");
                }
            }
        } else if let Some(name) = self.resolve_enum(ctx)? {
            self.shape = Shape::Enum(name);
        } else {
            self.shape = Shape::Value;
        }
        self.state = State::ScrutineeBound;
        Ok(())
    }

    fn resolve_enum(&self, ctx: &mut Context<'_>) -> Result<Option<String>, &'static str> {
        if let Some(ty) = ctx.expr_type(&self.mc.scrutinee, self.mc.header_span.start) {
            if let Some(name) = resolve_type_enum(&ty, ctx) {
                return Ok(Some(name));
            }
        }
        // No static type; let the variant names the arms use decide. A
        // unique hit anywhere settles it, a name owned by several enums
        // with no unique hit is an explicit ambiguity.
        let mut ambiguous: Option<(String, Vec<String>)> = None;
        for sa in &self.mc.arms {
            let Some(name) = sa.arm.pattern.variant_name() else {
                continue;
            };
            match ctx.registry.lookup_variant(name, None) {
                graft_adt::Resolution::Found(decl, _) => return Ok(Some(decl.name.clone())),
                graft_adt::Resolution::Ambiguous(owners) => {
                    ambiguous.get_or_insert((name.to_string(), owners));
                }
                graft_adt::Resolution::NotFound => {}
            }
        }
        if let Some((name, owners)) = ambiguous {
            ctx.sink.push(Diagnostic::error(
                codes::AMBIGUOUS_VARIANT,
                format!(
                    "variant `{name}` is declared by {}; the scrutinee's type is unknown, so \
                     nothing disambiguates",
                    owners.join(", ")
                ),
                self.mc.header_span,
            ));
            return Err("ambiguous scrutinee enum");
        }
        Ok(None)
    }

    fn compile_arms(&mut self, ctx: &mut Context<'_>) -> Result<(), &'static str> {
        debug_assert_eq!(self.state, State::ScrutineeBound);
        let expr_ctx = self.mc.context == MatchContext::Expression;
        for i in 0..self.mc.arms.len() {
            let sa = &self.mc.arms[i];
            if expr_ctx && sa.arm.has_block_body() {
                ctx.sink.push(Diagnostic::error(
                    codes::BLOCK_ARM_IN_EXPR,
                    "arm bodies of a match used as a value must be expressions, not blocks",
                    sa.arm.body_span,
                ));
                return Err("block arm in expression context");
            }
            if expr_ctx && sa.arm.body.trim().is_empty() {
                ctx.sink.push(Diagnostic::error(
                    codes::BLOCK_ARM_IN_EXPR,
                    "arm of a match used as a value has no body expression",
                    sa.arm.body_span,
                ));
                return Err("empty arm in expression context");
            }
            let mut levels = Levels::default();
            let span = sa.arm.pattern_span;
            let cover = self.compile_top(&sa.arm.pattern, span, &mut levels, ctx)?;
            let irrefutable = levels.cond_count() == 0;
            self.compiled.push(CompiledArm {
                levels: levels.levels,
                guard: sa.arm.guard.clone(),
                guard_hoists: sa.guard_hoists.clone(),
                body_hoists: sa.body_hoists.clone(),
                body: sa.arm.body.clone(),
                pattern_span: span,
                selects: cover.selects,
                full_cover: cover.full,
                irrefutable,
            });
        }
        if expr_ctx {
            self.ret_ty = Some(self.infer_result_type(ctx)?);
        }
        self.state = State::ArmsCompiled;
        Ok(())
    }

    /// Compile one arm's pattern against the bound scrutinee.
    fn compile_top(
        &self,
        pat: &Pattern,
        span: Span,
        levels: &mut Levels,
        ctx: &mut Context<'_>,
    ) -> Result<Cover, &'static str> {
        match &self.shape {
            Shape::Pending => Err("scrutinee not bound"),
            Shape::Enum(enum_name) => {
                let enum_name = enum_name.clone();
                self.compile_enum_top(pat, &enum_name, span, levels, ctx)
            }
            Shape::Tuple(elems) => {
                let elems = elems.clone();
                self.compile_tuple_top(pat, &elems, span, levels, ctx)
            }
            Shape::Value => match pat {
                Pattern::Wildcard => Ok(Cover::catch_all()),
                Pattern::Ident(b) => {
                    levels.stmt(0, format!("{b} := {}", self.temp));
                    Ok(Cover::catch_all())
                }
                Pattern::Literal(l) => {
                    levels.cond(0, format!("{} == {l}", self.temp));
                    Ok(Cover::plain())
                }
                Pattern::Constructor { name, .. } | Pattern::Struct { name, .. } => {
                    ctx.sink.push(Diagnostic::error(
                        codes::UNKNOWN_VARIANT,
                        format!("no enum in scope declares a variant `{name}`"),
                        span,
                    ));
                    Err("unknown variant")
                }
                Pattern::Tuple(_) => {
                    ctx.sink.push(Diagnostic::error(
                        codes::INVALID_PATTERN,
                        "tuple pattern does not match a single value",
                        span,
                    ));
                    Err("tuple pattern against a single value")
                }
            },
        }
    }

    fn compile_enum_top(
        &self,
        pat: &Pattern,
        enum_name: &str,
        span: Span,
        levels: &mut Levels,
        ctx: &mut Context<'_>,
    ) -> Result<Cover, &'static str> {
        match pat {
            Pattern::Wildcard => Ok(Cover::catch_all()),
            Pattern::Ident(name) => {
                let Some(decl) = registered(enum_name, ctx) else {
                    return Err("unregistered scrutinee enum");
                };
                match decl.variant(name) {
                    Some(v) if v.arity() == 0 => {
                        levels.cond(0, self.tag_cond(&self.temp, enum_name, name));
                        Ok(Cover::variant(name, true))
                    }
                    Some(v) => {
                        ctx.sink.push(Diagnostic::error(
                            codes::PATTERN_ARITY,
                            format!(
                                "variant `{name}` of `{enum_name}` has {} field(s); bind them \
                                 with `{name}(..)`",
                                v.arity()
                            ),
                            span,
                        ));
                        Err("unbound variant fields")
                    }
                    None => {
                        levels.stmt(0, format!("{name} := {}", self.temp));
                        Ok(Cover::catch_all())
                    }
                }
            }
            Pattern::Constructor { name, .. } | Pattern::Struct { name, .. } => {
                let temp = self.temp.clone();
                let full = self.compile_variant(pat, &temp, enum_name, 0, span, levels, ctx)?;
                Ok(Cover::variant(name, full))
            }
            Pattern::Literal(_) => {
                ctx.sink.push(Diagnostic::error(
                    codes::INVALID_PATTERN,
                    format!("a literal pattern cannot match enum `{enum_name}`"),
                    span,
                ));
                Err("literal pattern against an enum")
            }
            Pattern::Tuple(_) => {
                ctx.sink.push(Diagnostic::error(
                    codes::INVALID_PATTERN,
                    format!("a tuple pattern cannot match enum `{enum_name}`"),
                    span,
                ));
                Err("tuple pattern against an enum")
            }
        }
    }

    fn compile_tuple_top(
        &self,
        pat: &Pattern,
        elems: &[String],
        span: Span,
        levels: &mut Levels,
        ctx: &mut Context<'_>,
    ) -> Result<Cover, &'static str> {
        match pat {
            Pattern::Wildcard => Ok(Cover::catch_all()),
            Pattern::Tuple(subs) => {
                if subs.len() != elems.len() {
                    ctx.sink.push(Diagnostic::error(
                        codes::PATTERN_ARITY,
                        format!(
                            "tuple pattern binds {} element(s); the scrutinee has {}",
                            subs.len(),
                            elems.len()
                        ),
                        span,
                    ));
                    return Err("tuple arity mismatch");
                }
                for (k, sub) in subs.iter().enumerate() {
                    let temp_k = format!("{}_{k}", self.temp);
                    self.compile_position(sub, &temp_k, &elems[k], span, levels, ctx)?;
                }
                Ok(Cover::plain())
            }
            _ => {
                ctx.sink.push(Diagnostic::error(
                    codes::INVALID_PATTERN,
                    "this pattern does not destructure the tuple scrutinee; use `(..)` or `_`",
                    span,
                ));
                Err("non-tuple pattern against a tuple scrutinee")
            }
        }
    }

    /// One tuple position, checked against its bound element temp.
    fn compile_position(
        &self,
        pat: &Pattern,
        temp_k: &str,
        elem_expr: &str,
        span: Span,
        levels: &mut Levels,
        ctx: &mut Context<'_>,
    ) -> Result<(), &'static str> {
        match pat {
            Pattern::Wildcard => Ok(()),
            Pattern::Literal(l) => {
                levels.cond(0, format!("{temp_k} == {l}"));
                Ok(())
            }
            Pattern::Ident(b) => {
                if let Some(enum_name) = self.element_enum(elem_expr, None, ctx) {
                    if let Some(decl) = registered(&enum_name, ctx) {
                        if let Some(v) = decl.variant(b) {
                            if v.arity() != 0 {
                                ctx.sink.push(Diagnostic::error(
                                    codes::PATTERN_ARITY,
                                    format!(
                                        "variant `{b}` of `{enum_name}` has {} field(s); bind \
                                         them with `{b}(..)`",
                                        v.arity()
                                    ),
                                    span,
                                ));
                                return Err("unbound variant fields");
                            }
                            levels.cond(0, self.tag_cond(temp_k, &enum_name, b));
                            return Ok(());
                        }
                    }
                }
                levels.stmt(0, format!("{b} := {temp_k}"));
                Ok(())
            }
            Pattern::Constructor { name, .. } | Pattern::Struct { name, .. } => {
                let Some(enum_name) = self.element_enum(elem_expr, Some(name), ctx) else {
                    ctx.sink.push(Diagnostic::error(
                        codes::UNKNOWN_VARIANT,
                        format!("cannot resolve the enum declaring variant `{name}`"),
                        span,
                    ));
                    return Err("unknown variant");
                };
                self.compile_variant(pat, temp_k, &enum_name, 0, span, levels, ctx)?;
                Ok(())
            }
            Pattern::Tuple(_) => {
                ctx.sink.push(Diagnostic::error(
                    codes::INVALID_PATTERN,
                    "tuple patterns do not nest",
                    span,
                ));
                Err("nested tuple pattern")
            }
        }
    }

    /// Enum behind one tuple element: the element expression's resolved
    /// type first, else a unique owner of the variant the pattern names.
    fn element_enum(
        &self,
        elem_expr: &str,
        variant: Option<&str>,
        ctx: &mut Context<'_>,
    ) -> Option<String> {
        if let Some(ty) = ctx.expr_type(elem_expr, self.mc.header_span.start) {
            if let Some(name) = resolve_type_enum(&ty, ctx) {
                return Some(name);
            }
        }
        let name = variant?;
        match ctx.registry.lookup_variant(name, None) {
            graft_adt::Resolution::Found(decl, _) => Some(decl.name.clone()),
            _ => None,
        }
    }

    /// Compile a variant-selecting pattern against `val`, an expression
    /// of enum `enum_name` that is valid once the conditions at `depth`
    /// hold. The tag check lands at `depth`; field extraction follows
    /// it, and sub-pattern checks land one level deeper. Returns true
    /// when every sub-pattern is irrefutable.
    #[allow(clippy::too_many_arguments)]
    fn compile_variant(
        &self,
        pat: &Pattern,
        val: &str,
        enum_name: &str,
        depth: usize,
        span: Span,
        levels: &mut Levels,
        ctx: &mut Context<'_>,
    ) -> Result<bool, &'static str> {
        let Some(decl) = registered(enum_name, ctx) else {
            return Err("unregistered enum");
        };
        let layout = graft_adt::lower(&decl);
        match pat {
            Pattern::Constructor { name, args } => {
                let Some(variant) = decl.variant(name) else {
                    return unknown_variant(enum_name, name, span, ctx);
                };
                if matches!(variant.kind, VariantKind::Struct(_)) {
                    ctx.sink.push(Diagnostic::error(
                        codes::PATTERN_ARITY,
                        format!("variant `{name}` has named fields; destructure with `{name} {{ .. }}`"),
                        span,
                    ));
                    return Err("positional pattern against named fields");
                }
                let Some(vlay) = layout.variant(name) else {
                    return unknown_variant(enum_name, name, span, ctx);
                };
                if args.len() != vlay.slots.len() {
                    ctx.sink.push(Diagnostic::error(
                        codes::PATTERN_ARITY,
                        format!(
                            "pattern `{name}(..)` binds {} value(s); the variant has {} field(s)",
                            args.len(),
                            vlay.slots.len()
                        ),
                        span,
                    ));
                    return Err("pattern arity mismatch");
                }
                levels.cond(depth, self.tag_cond(val, enum_name, name));
                let mut full = true;
                for (sub, slot) in args.iter().zip(&vlay.slots) {
                    let sub_full =
                        self.compile_slot(sub, val, slot, enum_name, name, depth, span, levels, ctx)?;
                    full = full && sub_full;
                }
                Ok(full)
            }
            Pattern::Struct { name, fields } => {
                let Some(variant) = decl.variant(name) else {
                    return unknown_variant(enum_name, name, span, ctx);
                };
                if !matches!(variant.kind, VariantKind::Struct(_)) {
                    ctx.sink.push(Diagnostic::error(
                        codes::PATTERN_ARITY,
                        format!("variant `{name}` has no named fields; destructure with `{name}(..)`"),
                        span,
                    ));
                    return Err("named pattern against positional fields");
                }
                let Some(vlay) = layout.variant(name) else {
                    return unknown_variant(enum_name, name, span, ctx);
                };
                levels.cond(depth, self.tag_cond(val, enum_name, name));
                for fp in fields {
                    let Some(slot) = vlay.slots.iter().find(|s| s.param == fp.field) else {
                        ctx.sink.push(Diagnostic::error(
                            codes::UNKNOWN_FIELD,
                            format!("variant `{name}` of `{enum_name}` has no field `{}`", fp.field),
                            span,
                        ));
                        return Err("unknown field");
                    };
                    if fp.binding == "_" {
                        continue;
                    }
                    let ptr = format!("{val}.{}", slot.field);
                    self.nil_guard(&ptr, enum_name, name, &slot.field, depth, levels, ctx);
                    levels.stmt(depth, format!("{} := *{ptr}", fp.binding));
                }
                Ok(true)
            }
            Pattern::Ident(name) => {
                // Callers classified this as a unit variant already.
                levels.cond(depth, self.tag_cond(val, enum_name, name));
                Ok(true)
            }
            _ => Err("not a variant pattern"),
        }
    }

    /// One constructor-pattern slot. The nil guard runs at `depth`,
    /// after the owning tag check; whatever the sub-pattern tests runs
    /// one level deeper, against the dereferenced slot.
    #[allow(clippy::too_many_arguments)]
    fn compile_slot(
        &self,
        sub: &Pattern,
        val: &str,
        slot: &Slot,
        enum_name: &str,
        variant: &str,
        depth: usize,
        span: Span,
        levels: &mut Levels,
        ctx: &mut Context<'_>,
    ) -> Result<bool, &'static str> {
        let ptr = format!("{val}.{}", slot.field);
        let deref = format!("(*{ptr})");
        match sub {
            Pattern::Wildcard => Ok(true),
            Pattern::Ident(b) => {
                if let Some(slot_enum) = self.slot_enum(&slot.ty, ctx) {
                    if let Some(decl) = registered(&slot_enum, ctx) {
                        if let Some(v) = decl.variant(b) {
                            if v.arity() != 0 {
                                ctx.sink.push(Diagnostic::error(
                                    codes::PATTERN_ARITY,
                                    format!(
                                        "variant `{b}` of `{slot_enum}` has {} field(s); bind \
                                         them with `{b}(..)`",
                                        v.arity()
                                    ),
                                    span,
                                ));
                                return Err("unbound variant fields");
                            }
                            self.nil_guard(&ptr, enum_name, variant, &slot.field, depth, levels, ctx);
                            levels.cond(depth + 1, self.tag_cond(&deref, &slot_enum, b));
                            return Ok(false);
                        }
                    }
                }
                self.nil_guard(&ptr, enum_name, variant, &slot.field, depth, levels, ctx);
                levels.stmt(depth, format!("{b} := *{ptr}"));
                Ok(true)
            }
            Pattern::Literal(l) => {
                self.nil_guard(&ptr, enum_name, variant, &slot.field, depth, levels, ctx);
                levels.cond(depth + 1, format!("{deref} == {l}"));
                Ok(false)
            }
            Pattern::Constructor { name, .. } | Pattern::Struct { name, .. } => {
                let Some(slot_enum) = self.slot_enum(&slot.ty, ctx) else {
                    ctx.sink.push(Diagnostic::error(
                        codes::INVALID_PATTERN,
                        format!(
                            "pattern `{name}(..)` cannot destructure a field of host type `{}`",
                            slot.ty
                        ),
                        span,
                    ));
                    return Err("constructor pattern against a host type");
                };
                self.nil_guard(&ptr, enum_name, variant, &slot.field, depth, levels, ctx);
                self.compile_variant(sub, &deref, &slot_enum, depth + 1, span, levels, ctx)?;
                Ok(false)
            }
            Pattern::Tuple(_) => {
                ctx.sink.push(Diagnostic::error(
                    codes::INVALID_PATTERN,
                    "tuple patterns do not nest inside constructor patterns",
                    span,
                ));
                Err("nested tuple pattern")
            }
        }
    }

    fn slot_enum(&self, ty: &str, ctx: &Context<'_>) -> Option<String> {
        resolve_type_enum(ty, ctx)
    }

    fn tag_cond(&self, val: &str, enum_name: &str, variant: &str) -> String {
        format!("{val}.{TAG_FIELD} == {enum_name}_Tag_{variant}")
    }

    fn nil_guard(
        &self,
        ptr: &str,
        enum_name: &str,
        variant: &str,
        field: &str,
        depth: usize,
        levels: &mut Levels,
        ctx: &mut Context<'_>,
    ) {
        if let Some(cond) = nil_check_cond(ctx.options.nil_safety, ptr) {
            if ctx.options.nil_safety == NilSafety::Debug {
                ctx.debug_guards_used = true;
            }
            levels.stmt(
                depth,
                format!("if {cond} {{ {} }}", nil_panic(enum_name, variant, field)),
            );
        }
    }

    /// Declared return type of the expression context's closure: the
    /// first arm body the service can type, else the enclosing declared
    /// return type when the construct itself sits in a return.
    fn infer_result_type(&self, ctx: &mut Context<'_>) -> Result<String, &'static str> {
        for sa in &self.mc.arms {
            let at = sa.arm.body_span.start;
            if let Some(ty) = ctx.expr_type(&sa.arm.body, at) {
                return Ok(ty);
            }
            if let Some(ty) = generated_ctor_type(&sa.arm.body, ctx) {
                return Ok(ty);
            }
        }
        if self.mc.prefix.trim() == "return" {
            if let Some(ty) = ctx.enclosing_return(self.mc.keyword_span.start) {
                return Ok(ty);
            }
        }
        ctx.sink.push(Diagnostic::error(
            codes::UNTYPED_MATCH,
            "cannot infer the type of this match expression; no arm body's type is derivable",
            self.mc.keyword_span,
        ));
        Err("untyped match expression")
    }

    fn check_exhaustiveness(&mut self, ctx: &mut Context<'_>) -> Result<(), &'static str> {
        debug_assert_eq!(self.state, State::ArmsCompiled);
        if let Some(first) = self.compiled.iter().position(|a| a.unguarded_catch_all()) {
            for arm in &self.compiled[first + 1..] {
                ctx.sink.push(Diagnostic::warning(
                    codes::UNREACHABLE_ARM,
                    "this arm follows an unguarded catch-all and can never match",
                    arm.pattern_span,
                ));
            }
        }
        if self.compiled.is_empty() {
            ctx.sink.push(Diagnostic::error(
                codes::NON_EXHAUSTIVE_MATCH,
                "match has no arms",
                self.mc.keyword_span,
            ));
            return Err("match has no arms");
        }
        let catch_all = self.compiled.iter().any(CompiledArm::unguarded_catch_all);
        match &self.shape {
            Shape::Enum(enum_name) if !catch_all => {
                let Some(decl) = registered(enum_name, ctx) else {
                    return Err("unregistered scrutinee enum");
                };
                let missing: Vec<&str> = decl
                    .variants
                    .iter()
                    .map(|v| v.name.as_str())
                    .filter(|v| {
                        !self.compiled.iter().any(|a| {
                            a.guard.is_none() && a.full_cover && a.selects.as_deref() == Some(v)
                        })
                    })
                    .collect();
                if !missing.is_empty() {
                    ctx.sink.push(Diagnostic::error(
                        codes::NON_EXHAUSTIVE_MATCH,
                        format!(
                            "match on `{enum_name}` is not exhaustive; missing variant(s): {}",
                            missing.join(", ")
                        ),
                        self.mc.keyword_span,
                    ));
                    return Err("non-exhaustive match");
                }
            }
            Shape::Tuple(_) if !catch_all => {
                ctx.sink.push(Diagnostic::error(
                    codes::NON_EXHAUSTIVE_MATCH,
                    "tuple match is not exhaustive; add an unguarded arm that matches in every \
                     position",
                    self.mc.keyword_span,
                ));
                return Err("non-exhaustive match");
            }
            Shape::Value if !catch_all => {
                ctx.sink.push(Diagnostic::error(
                    codes::NON_EXHAUSTIVE_MATCH,
                    "match on a non-enum value needs an unguarded catch-all arm (`_` or a binding)",
                    self.mc.keyword_span,
                ));
                return Err("non-exhaustive match");
            }
            _ => {}
        }
        self.state = State::ExhaustivenessChecked;
        Ok(())
    }

    fn emit(&self) -> String {
        debug_assert_eq!(self.state, State::ExhaustivenessChecked);
        match self.mc.context {
            MatchContext::Statement => self.emit_statement(),
            MatchContext::Expression => self.emit_expression(),
        }
    }

    fn emit_preamble(&self, w: &mut HostWriter, depth: usize) {
        for h in &self.mc.scrutinee_hoists {
            w.line(depth, h);
        }
        match &self.shape {
            Shape::Tuple(elems) => {
                for (k, e) in elems.iter().enumerate() {
                    w.line(depth, &format!("{}_{k} := {e}", self.temp));
                }
            }
            _ => w.line(depth, &format!("{} := {}", self.temp, self.mc.scrutinee)),
        }
    }

    fn emit_statement(&self) -> String {
        let mut w = HostWriter::new(&self.mc.indent);
        self.emit_preamble(&mut w, 0);
        w.line(0, &format!("{} := false", self.flag));
        for arm in &self.compiled {
            let mut head = format!("!{}", self.flag);
            if let Some(l0) = arm.levels.first() {
                for c in &l0.conds {
                    head.push_str(" && ");
                    head.push_str(c);
                }
            }
            w.line(0, &format!("if {head} {{"));
            let mut depth = 1;
            if let Some(l0) = arm.levels.first() {
                for s in &l0.stmts {
                    w.line(depth, s);
                }
            }
            for level in arm.levels.iter().skip(1) {
                if !level.conds.is_empty() {
                    w.line(depth, &format!("if {} {{", level.conds.join(" && ")));
                    depth += 1;
                }
                for s in &level.stmts {
                    w.line(depth, s);
                }
            }
            if let Some(g) = &arm.guard {
                for h in &arm.guard_hoists {
                    w.line(depth, h);
                }
                w.line(depth, &format!("if {g} {{"));
                depth += 1;
            }
            for h in &arm.body_hoists {
                w.line(depth, h);
            }
            emit_body(&mut w, depth, &arm.body);
            w.line(depth, &format!("{} = true", self.flag));
            while depth > 0 {
                depth -= 1;
                w.line(depth, "}");
            }
        }
        w.line(0, &format!("if !{} {{", self.flag));
        w.line(1, NO_MATCH_PANIC);
        w.line(0, "}");
        w.finish()
    }

    fn emit_expression(&self) -> String {
        let ret = self.ret_ty.as_deref().unwrap_or_default();
        let mut w = HostWriter::new(&self.mc.indent);
        w.raw(&self.mc.prefix);
        w.raw(&format!("func() {ret} {{\n"));
        self.emit_preamble(&mut w, 1);
        for arm in &self.compiled {
            let conds0: Vec<&str> = arm
                .levels
                .first()
                .map(|l| l.conds.iter().map(String::as_str).collect())
                .unwrap_or_default();
            // A bare block when nothing to test, so arm bindings stay
            // scoped to their own arm.
            if conds0.is_empty() {
                w.line(1, "{");
            } else {
                w.line(1, &format!("if {} {{", conds0.join(" && ")));
            }
            let mut depth = 2;
            if let Some(l0) = arm.levels.first() {
                for s in &l0.stmts {
                    w.line(depth, s);
                }
            }
            for level in arm.levels.iter().skip(1) {
                if !level.conds.is_empty() {
                    w.line(depth, &format!("if {} {{", level.conds.join(" && ")));
                    depth += 1;
                }
                for s in &level.stmts {
                    w.line(depth, s);
                }
            }
            if let Some(g) = &arm.guard {
                for h in &arm.guard_hoists {
                    w.line(depth, h);
                }
                w.line(depth, &format!("if {g} {{"));
                depth += 1;
            }
            for h in &arm.body_hoists {
                w.line(depth, h);
            }
            w.line(depth, &format!("return {}", arm.body.trim()));
            while depth > 1 {
                depth -= 1;
                w.line(depth, "}");
            }
        }
        w.line(1, NO_MATCH_PANIC);
        w.raw(&format!("{}}}(){}\n", self.mc.indent, self.mc.suffix));
        w.finish()
    }
}

fn registered(enum_name: &str, ctx: &Context<'_>) -> Option<EnumDecl> {
    ctx.registry.get(enum_name).cloned()
}

/// Registered enum a type annotation names, directly (`Shape`,
/// `*Shape`) or as a generic reference whose instantiation this unit
/// already materialized (`Option<int>`).
fn resolve_type_enum(ty: &str, ctx: &Context<'_>) -> Option<String> {
    if let Some(hint) = hint_from_type(ty) {
        if ctx.registry.contains(hint) {
            return Some(hint.to_string());
        }
    }
    let t = ty.trim().trim_start_matches('*').trim();
    let refs = find_generic_refs(t, &|n: &str| ctx.instantiator.is_template(n));
    if let [r] = refs.as_slice() {
        if r.start == 0 && r.end == t.len() {
            let name = graft_adt::mangle(&r.name, &r.args);
            if ctx.registry.contains(&name) {
                return Some(name);
            }
        }
    }
    None
}

fn unknown_variant(
    enum_name: &str,
    variant: &str,
    span: Span,
    ctx: &mut Context<'_>,
) -> Result<bool, &'static str> {
    ctx.sink.push(Diagnostic::error(
        codes::UNKNOWN_VARIANT,
        format!("enum `{enum_name}` has no variant `{variant}`"),
        span,
    ));
    Err("unknown variant")
}

/// The enum a rewritten constructor call produces, recognized by the
/// `<Enum>_<Variant>(` shape the rewriting passes emit. This is the one
/// structural fact about generated text the lowering may rely on.
fn generated_ctor_type(body: &str, ctx: &Context<'_>) -> Option<String> {
    let t = body.trim();
    let open = t.find('(')?;
    let name = &t[..open];
    if !is_ident(name) || matching_delim(t, open) != Some(t.len() - 1) {
        return None;
    }
    for decl in ctx.registry.iter() {
        let prefix = format!("{}_", decl.name);
        if let Some(variant) = name.strip_prefix(&prefix) {
            if decl.variant(variant).is_some() {
                return Some(decl.name.clone());
            }
        }
    }
    None
}

/// Decompose a parenthesized scrutinee into its top-level elements.
fn tuple_elements(scrutinee: &str) -> Option<Vec<String>> {
    let t = scrutinee.trim();
    if !t.starts_with('(') || matching_delim(t, 0) != Some(t.len() - 1) {
        return None;
    }
    let inner = &t[1..t.len() - 1];
    let parts: Vec<String> = split_top_level(inner, ",")
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();
    (parts.len() >= 2).then_some(parts)
}

/// Emit an arm body in statement position: block interiors are
/// unwrapped, and the fragment's own common indentation is replaced by
/// the emission depth so relative nesting survives.
fn emit_body(w: &mut HostWriter, depth: usize, body: &str) {
    let t = body.trim();
    let text = if t.starts_with('{') && matching_delim(t, 0) == Some(t.len() - 1) {
        &t[1..t.len() - 1]
    } else {
        body
    };
    reindent(w, depth, text);
}

fn reindent(w: &mut HostWriter, depth: usize, text: &str) {
    let mut common: Option<&str> = None;
    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let ws = &line[..line.len() - line.trim_start().len()];
        common = Some(match common {
            None => ws,
            Some(prev) => shared_prefix(prev, ws),
        });
    }
    let common = common.unwrap_or("");
    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let rest = line.strip_prefix(common).unwrap_or_else(|| line.trim_start());
        w.line(depth, rest);
    }
}

fn shared_prefix<'a>(a: &'a str, b: &str) -> &'a str {
    let n = a
        .bytes()
        .zip(b.bytes())
        .take_while(|(x, y)| x == y)
        .count();
    &a[..n]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{MatchSite, StoredArm};
    use graft_common::options::Options;
    use graft_infer::NullOracle;
    use graft_parse::ast::{Field, Variant};
    use graft_parse::construct::find_constructs;
    use graft_parse::split_arms;

    const ORACLE: NullOracle = NullOracle;

    fn shape_decl() -> EnumDecl {
        EnumDecl {
            name: "Shape".into(),
            type_params: vec![],
            variants: vec![
                Variant {
                    name: "Circle".into(),
                    kind: VariantKind::Tuple(vec!["float64".into()]),
                    span: Span::point(0),
                },
                Variant {
                    name: "Rect".into(),
                    kind: VariantKind::Struct(vec![
                        Field { name: "w".into(), ty: "float64".into() },
                        Field { name: "h".into(), ty: "float64".into() },
                    ]),
                    span: Span::point(0),
                },
                Variant { name: "Point".into(), kind: VariantKind::Unit, span: Span::point(0) },
            ],
            span: Span::point(0),
        }
    }

    fn ctx_with_shape(source: &'static str, options: Options) -> Context<'static> {
        let mut ctx = Context::new(source, options, &ORACLE);
        ctx.registry.register(shape_decl()).unwrap();
        ctx
    }

    /// Build the stored form of the first match construct in `src`, the
    /// way discovery does.
    fn stored(src: &str, ctx: &mut Context<'_>) -> MatchConstruct {
        let raw = find_constructs(src).unwrap().remove(0);
        let arms = split_arms(&raw.body, raw.body_span.start, raw.span)
            .unwrap()
            .into_iter()
            .map(|ra| StoredArm::new(ra.parse().unwrap()))
            .collect();
        MatchConstruct {
            id: ctx.next_match_id(),
            site: MatchSite::Unit(0),
            scrutinee: raw.header.clone(),
            scrutinee_hoists: Vec::new(),
            arms,
            context: raw.context(),
            prefix: raw.prefix.clone(),
            suffix: raw.suffix.clone(),
            indent: raw.indent().to_string(),
            keyword_span: raw.keyword_span,
            header_span: raw.header_span,
            body_span: raw.body_span,
            span: raw.span,
            poisoned: false,
        }
    }

    fn off() -> Options {
        Options { nil_safety: NilSafety::Off, ..Options::default() }
    }

    #[test]
    fn statement_dispatch_covers_all_variants() {
        let src = "func handle(s Shape) {\n\tmatch s {\n\t\tCircle(r) => use(r),\n\t\tRect { w, h: height } => use2(w, height),\n\t\tPoint => done(),\n\t}\n}\n";
        let mut ctx = ctx_with_shape(src, off());
        let mc = stored(src, &mut ctx);
        let out = lower_construct(&mc, &mut ctx);
        assert!(!ctx.sink.has_errors(), "{:?}", ctx.sink.iter().collect::<Vec<_>>());
        assert!(out.contains("\t__graft_m0 := s\n"));
        assert!(out.contains("\t__graft_matched0 := false\n"));
        assert!(out.contains("\tif !__graft_matched0 && __graft_m0.tag == Shape_Tag_Circle {\n"));
        assert!(out.contains("\t\tr := *__graft_m0.Circle_0\n"));
        assert!(out.contains("\t\tw := *__graft_m0.Rect_w\n"));
        assert!(out.contains("\t\theight := *__graft_m0.Rect_h\n"));
        assert!(out.contains("\tif !__graft_matched0 && __graft_m0.tag == Shape_Tag_Point {\n"));
        assert!(out.contains("\t\t__graft_matched0 = true\n"));
        assert!(out.ends_with("\tif !__graft_matched0 {\n\t\tpanic(\"graft: no match arm matched\")\n\t}\n"));
    }

    #[test]
    fn missing_variant_is_non_exhaustive() {
        let src = "func handle(s Shape) {\n\tmatch s {\n\t\tCircle(r) => use(r),\n\t\tRect { w } => use(w),\n\t}\n}\n";
        let mut ctx = ctx_with_shape(src, off());
        let mc = stored(src, &mut ctx);
        let out = lower_construct(&mc, &mut ctx);
        let diag = ctx.sink.iter().next().unwrap();
        assert_eq!(diag.code, codes::NON_EXHAUSTIVE_MATCH);
        assert!(diag.message.contains("Point"));
        assert!(out.contains("panic(\"graft error:"));
    }

    #[test]
    fn wildcard_completes_coverage() {
        let src = "func handle(s Shape) {\n\tmatch s {\n\t\tCircle(r) => use(r),\n\t\t_ => other(),\n\t}\n}\n";
        let mut ctx = ctx_with_shape(src, off());
        let mc = stored(src, &mut ctx);
        let out = lower_construct(&mc, &mut ctx);
        assert!(!ctx.sink.has_errors());
        assert!(out.contains("\tif !__graft_matched0 {\n\t\tother()\n"));
    }

    #[test]
    fn guarded_arm_covers_nothing() {
        let src = "func handle(s Shape) {\n\tmatch s {\n\t\tCircle(r) if r > 1.0 => big(),\n\t\tRect { w } => use(w),\n\t\tPoint => done(),\n\t}\n}\n";
        let mut ctx = ctx_with_shape(src, off());
        let mc = stored(src, &mut ctx);
        lower_construct(&mc, &mut ctx);
        let diag = ctx.sink.iter().next().unwrap();
        assert_eq!(diag.code, codes::NON_EXHAUSTIVE_MATCH);
        assert!(diag.message.contains("Circle"));
    }

    #[test]
    fn guard_nests_inside_the_structural_match() {
        let src = "func handle(s Shape) {\n\tmatch s {\n\t\tCircle(r) if r > 1.0 => big(),\n\t\tCircle(r) => small(),\n\t\t_ => other(),\n\t}\n}\n";
        let mut ctx = ctx_with_shape(src, off());
        let mc = stored(src, &mut ctx);
        let out = lower_construct(&mc, &mut ctx);
        assert!(!ctx.sink.has_errors());
        // The guard sits inside the tag check; its failure leaves the
        // matched flag unset so the second Circle arm still runs.
        assert!(out.contains(
            "\tif !__graft_matched0 && __graft_m0.tag == Shape_Tag_Circle {\n\t\tr := *__graft_m0.Circle_0\n\t\tif r > 1.0 {\n\t\t\tbig()\n\t\t\t__graft_matched0 = true\n\t\t}\n\t}\n"
        ));
        assert_eq!(out.matches("Shape_Tag_Circle").count(), 2);
    }

    #[test]
    fn expression_context_builds_typed_closure() {
        let src = "func area(s Shape) {\n\tx := match s {\n\t\tCircle(r) => r * r * 3.14,\n\t\tRect { w, h } => w * h,\n\t\tPoint => 0.0,\n\t}\n\tuse(x)\n}\n";
        let mut ctx = ctx_with_shape(src, off());
        let mc = stored(src, &mut ctx);
        assert_eq!(mc.context, MatchContext::Expression);
        let out = lower_construct(&mc, &mut ctx);
        assert!(!ctx.sink.has_errors(), "{:?}", ctx.sink.iter().collect::<Vec<_>>());
        assert!(out.starts_with("\tx := func() float64 {\n"));
        assert!(out.contains("\t\t__graft_m0 := s\n"));
        assert!(out.contains("\t\t\treturn r * r * 3.14\n"));
        assert!(out.contains("\t\tpanic(\"graft: no match arm matched\")\n"));
        assert!(out.ends_with("\t}()\n"));
    }

    #[test]
    fn untyped_expression_match_is_a_diagnostic() {
        let src = "func f(s Shape) {\n\tx := match s {\n\t\tCircle(r) => r,\n\t\t_ => fallback(),\n\t}\n\tuse(x)\n}\n";
        let mut ctx = ctx_with_shape(src, off());
        let mc = stored(src, &mut ctx);
        lower_construct(&mc, &mut ctx);
        let diag = ctx.sink.iter().next().unwrap();
        assert_eq!(diag.code, codes::UNTYPED_MATCH);
    }

    #[test]
    fn return_position_falls_back_to_the_declared_return_type() {
        let src = "func area(s Shape) float64 {\n\treturn match s {\n\t\tCircle(r) => r * r,\n\t\t_ => fallback(),\n\t}\n}\n";
        let mut ctx = ctx_with_shape(src, off());
        let mc = stored(src, &mut ctx);
        let out = lower_construct(&mc, &mut ctx);
        assert!(!ctx.sink.has_errors());
        assert!(out.starts_with("\treturn func() float64 {\n"));
    }

    #[test]
    fn block_arm_in_expression_context_is_a_diagnostic() {
        let src = "func f(s Shape) {\n\tx := match s {\n\t\tCircle(r) => { use(r) },\n\t\t_ => 0.0,\n\t}\n\tuse(x)\n}\n";
        let mut ctx = ctx_with_shape(src, off());
        let mc = stored(src, &mut ctx);
        lower_construct(&mc, &mut ctx);
        let diag = ctx.sink.iter().next().unwrap();
        assert_eq!(diag.code, codes::BLOCK_ARM_IN_EXPR);
    }

    #[test]
    fn block_bodies_inline_in_statement_context() {
        let src = "func f(s Shape) {\n\tmatch s {\n\t\tCircle(r) => {\n\t\t\tlog(r)\n\t\t\tuse(r)\n\t\t},\n\t\t_ => other(),\n\t}\n}\n";
        let mut ctx = ctx_with_shape(src, off());
        let mc = stored(src, &mut ctx);
        let out = lower_construct(&mc, &mut ctx);
        assert!(!ctx.sink.has_errors());
        assert!(out.contains("\t\tlog(r)\n\t\tuse(r)\n\t\t__graft_matched0 = true\n"));
    }

    #[test]
    fn nil_safety_on_guards_every_slot_read() {
        let src = "func f(s Shape) {\n\tmatch s {\n\t\tCircle(r) => use(r),\n\t\t_ => other(),\n\t}\n}\n";
        let mut ctx = ctx_with_shape(src, Options::default());
        let mc = stored(src, &mut ctx);
        let out = lower_construct(&mc, &mut ctx);
        assert!(out.contains(
            "\t\tif __graft_m0.Circle_0 == nil { panic(\"graft: Shape.Circle: field Circle_0 is nil\") }\n\t\tr := *__graft_m0.Circle_0\n"
        ));
        assert!(!ctx.debug_guards_used);
    }

    #[test]
    fn nil_safety_debug_gates_the_check_and_marks_the_context() {
        let src = "func f(s Shape) {\n\tmatch s {\n\t\tCircle(r) => use(r),\n\t\t_ => other(),\n\t}\n}\n";
        let options = Options { nil_safety: NilSafety::Debug, ..Options::default() };
        let mut ctx = ctx_with_shape(src, options);
        let mc = stored(src, &mut ctx);
        let out = lower_construct(&mc, &mut ctx);
        assert!(out.contains("if __graft_debug_checks && __graft_m0.Circle_0 == nil {"));
        assert!(ctx.debug_guards_used);
    }

    #[test]
    fn literal_match_needs_a_catch_all() {
        let src = "func f(n int) {\n\tmatch n {\n\t\t0 => zero(),\n\t\t1 => one(),\n\t}\n}\n";
        let mut ctx = ctx_with_shape(src, off());
        let mc = stored(src, &mut ctx);
        lower_construct(&mc, &mut ctx);
        let diag = ctx.sink.iter().next().unwrap();
        assert_eq!(diag.code, codes::NON_EXHAUSTIVE_MATCH);
    }

    #[test]
    fn literal_match_with_catch_all_compares_the_temp() {
        let src = "func f(n int) {\n\tmatch n {\n\t\t0 => zero(),\n\t\tother => use(other),\n\t}\n}\n";
        let mut ctx = ctx_with_shape(src, off());
        let mc = stored(src, &mut ctx);
        let out = lower_construct(&mc, &mut ctx);
        assert!(!ctx.sink.has_errors());
        assert!(out.contains("\tif !__graft_matched0 && __graft_m0 == 0 {\n"));
        assert!(out.contains("\t\tother := __graft_m0\n"));
    }

    #[test]
    fn tuple_match_decomposes_elements() {
        let src = "func f(a int, b int) {\n\tmatch (a, b) {\n\t\t(0, y) => use(y),\n\t\t(x, 0) => use(x),\n\t\t_ => both(),\n\t}\n}\n";
        let mut ctx = ctx_with_shape(src, off());
        let mc = stored(src, &mut ctx);
        let out = lower_construct(&mc, &mut ctx);
        assert!(!ctx.sink.has_errors(), "{:?}", ctx.sink.iter().collect::<Vec<_>>());
        assert!(out.contains("\t__graft_m0_0 := a\n\t__graft_m0_1 := b\n"));
        assert!(out.contains("\tif !__graft_matched0 && __graft_m0_0 == 0 {\n\t\ty := __graft_m0_1\n"));
        assert!(out.contains("\tif !__graft_matched0 && __graft_m0_1 == 0 {\n\t\tx := __graft_m0_0\n"));
    }

    #[test]
    fn tuple_match_without_catch_all_is_rejected() {
        let src = "func f(a int, b int) {\n\tmatch (a, b) {\n\t\t(0, y) => use(y),\n\t\t(x, 0) => use(x),\n\t}\n}\n";
        let mut ctx = ctx_with_shape(src, off());
        let mc = stored(src, &mut ctx);
        lower_construct(&mc, &mut ctx);
        let diag = ctx.sink.iter().next().unwrap();
        assert_eq!(diag.code, codes::NON_EXHAUSTIVE_MATCH);
    }

    #[test]
    fn tuple_arity_mismatch_is_a_diagnostic() {
        let src = "func f(a int, b int) {\n\tmatch (a, b) {\n\t\t(0, y, z) => use(y),\n\t\t_ => both(),\n\t}\n}\n";
        let mut ctx = ctx_with_shape(src, off());
        let mc = stored(src, &mut ctx);
        lower_construct(&mc, &mut ctx);
        let diag = ctx.sink.iter().next().unwrap();
        assert_eq!(diag.code, codes::PATTERN_ARITY);
    }

    #[test]
    fn unguarded_all_binding_tuple_arm_is_exhaustive() {
        let src = "func f(a int, b int) {\n\tmatch (a, b) {\n\t\t(0, 0) => origin(),\n\t\t(x, y) => use(x, y),\n\t}\n}\n";
        let mut ctx = ctx_with_shape(src, off());
        let mc = stored(src, &mut ctx);
        lower_construct(&mc, &mut ctx);
        assert!(!ctx.sink.has_errors());
    }

    #[test]
    fn nested_constructor_pattern_checks_the_inner_tag() {
        let src = "func f(o Option_Shape) {\n\tmatch o {\n\t\tSome(Circle(r)) => use(r),\n\t\tSome(other) => use2(other),\n\t\tNothing => none(),\n\t}\n}\n";
        let mut ctx = ctx_with_shape(src, off());
        let opt = EnumDecl {
            name: "Option_Shape".into(),
            type_params: vec![],
            variants: vec![
                Variant {
                    name: "Some".into(),
                    kind: VariantKind::Tuple(vec!["Shape".into()]),
                    span: Span::point(0),
                },
                Variant { name: "Nothing".into(), kind: VariantKind::Unit, span: Span::point(0) },
            ],
            span: Span::point(0),
        };
        ctx.registry.register(opt).unwrap();
        let mc = stored(src, &mut ctx);
        let out = lower_construct(&mc, &mut ctx);
        assert!(!ctx.sink.has_errors(), "{:?}", ctx.sink.iter().collect::<Vec<_>>());
        assert!(out.contains("__graft_m0.tag == Option_Shape_Tag_Some {"));
        assert!(out.contains("\t\tif (*__graft_m0.Some_0).tag == Shape_Tag_Circle {\n"));
        assert!(out.contains("\t\t\tr := *(*__graft_m0.Some_0).Circle_0\n"));
    }

    #[test]
    fn pattern_arity_mismatch_on_constructor() {
        let src = "func f(s Shape) {\n\tmatch s {\n\t\tCircle(a, b) => use(a),\n\t\t_ => other(),\n\t}\n}\n";
        let mut ctx = ctx_with_shape(src, off());
        let mc = stored(src, &mut ctx);
        lower_construct(&mc, &mut ctx);
        let diag = ctx.sink.iter().next().unwrap();
        assert_eq!(diag.code, codes::PATTERN_ARITY);
    }

    #[test]
    fn unknown_struct_field_is_a_diagnostic() {
        let src = "func f(s Shape) {\n\tmatch s {\n\t\tRect { q } => use(q),\n\t\t_ => other(),\n\t}\n}\n";
        let mut ctx = ctx_with_shape(src, off());
        let mc = stored(src, &mut ctx);
        lower_construct(&mc, &mut ctx);
        let diag = ctx.sink.iter().next().unwrap();
        assert_eq!(diag.code, codes::UNKNOWN_FIELD);
    }

    #[test]
    fn ambiguous_variant_without_type_information() {
        let src = "func f(v interface{}) {\n\tmatch v {\n\t\tOk(x) => use(x),\n\t\t_ => other(),\n\t}\n}\n";
        let mut ctx = ctx_with_shape(src, off());
        for name in ["NetResult", "FileResult"] {
            ctx.registry
                .register(EnumDecl {
                    name: name.into(),
                    type_params: vec![],
                    variants: vec![Variant {
                        name: "Ok".into(),
                        kind: VariantKind::Tuple(vec!["int".into()]),
                        span: Span::point(0),
                    }],
                    span: Span::point(0),
                })
                .unwrap();
        }
        let mc = stored(src, &mut ctx);
        lower_construct(&mc, &mut ctx);
        let diag = ctx.sink.iter().next().unwrap();
        assert_eq!(diag.code, codes::AMBIGUOUS_VARIANT);
        assert!(diag.message.contains("FileResult") && diag.message.contains("NetResult"));
    }

    #[test]
    fn known_scrutinee_type_resolves_shared_variant_names() {
        let src = "func f(v FileResult) {\n\tmatch v {\n\t\tOk(x) => use(x),\n\t\t_ => other(),\n\t}\n}\n";
        let mut ctx = ctx_with_shape(src, off());
        for name in ["NetResult", "FileResult"] {
            ctx.registry
                .register(EnumDecl {
                    name: name.into(),
                    type_params: vec![],
                    variants: vec![Variant {
                        name: "Ok".into(),
                        kind: VariantKind::Tuple(vec!["int".into()]),
                        span: Span::point(0),
                    }],
                    span: Span::point(0),
                })
                .unwrap();
        }
        let mc = stored(src, &mut ctx);
        let out = lower_construct(&mc, &mut ctx);
        assert!(!ctx.sink.has_errors());
        assert!(out.contains("__graft_m0.tag == FileResult_Tag_Ok"));
    }

    #[test]
    fn arm_after_catch_all_is_unreachable() {
        let src = "func f(n int) {\n\tmatch n {\n\t\t_ => any(),\n\t\t0 => zero(),\n\t}\n}\n";
        let mut ctx = ctx_with_shape(src, off());
        let mc = stored(src, &mut ctx);
        lower_construct(&mc, &mut ctx);
        assert!(!ctx.sink.has_errors());
        let diag = ctx.sink.iter().next().unwrap();
        assert_eq!(diag.code, codes::UNREACHABLE_ARM);
    }

    #[test]
    fn empty_match_is_rejected() {
        let src = "func f(n int) {\n\tmatch n {\n\t}\n}\n";
        let mut ctx = ctx_with_shape(src, off());
        let mc = stored(src, &mut ctx);
        let out = lower_construct(&mc, &mut ctx);
        let diag = ctx.sink.iter().next().unwrap();
        assert_eq!(diag.code, codes::NON_EXHAUSTIVE_MATCH);
        assert!(diag.message.contains("no arms"));
        assert!(out.contains("panic(\"graft error:"));
    }

    #[test]
    fn generated_constructor_body_types_the_closure() {
        let src = "func f(s Shape) {\n\tx := match s {\n\t\tCircle(r) => Shape_Circle(&r),\n\t\t_ => fallback(),\n\t}\n\tuse(x)\n}\n";
        let mut ctx = ctx_with_shape(src, off());
        let mc = stored(src, &mut ctx);
        let out = lower_construct(&mc, &mut ctx);
        assert!(!ctx.sink.has_errors());
        assert!(out.starts_with("\tx := func() Shape {\n"));
    }
}
