//! The plugin pipeline.
//!
//! Compilation is three global phases over one shared [`Context`]:
//! every plugin discovers, then every plugin transforms, then every
//! plugin collects. Discovery registers declarations and stashes match
//! constructs; transformation rewrites constructor calls and generic
//! annotations in the host text and in the stored construct texts, then
//! lowers the stored matches; collection contributes the injected
//! declaration block.
//!
//! Plugin order is a contract. User enums run first so their
//! constructors resolve ahead of the builtin names, `Result` and
//! `Option` follow, and match lowering runs last, once every stored
//! text is in its final form.

use graft_common::diag::{codes, Diagnostic};
use graft_common::span::Span;
use graft_parse::ast::{EnumDecl, Variant, VariantKind};
use graft_parse::construct::{find_constructs, ConstructKind, MatchContext, RawConstruct};
use graft_parse::scan::find_top_level_word;
use graft_parse::{parse_enum_decl, split_arms, ExtractError};

use crate::context::{adt_diag, nested_token, Context, MatchConstruct, MatchSite, StoredArm};
use crate::emit::enum_decls;
use crate::lower::lower_construct;
use crate::rewrite::{
    rewrite_annotations, rewrite_expr, rewrite_hoist_list, rewrite_lines, CallTarget, ReturnCtx,
};
use crate::unit::SourceUnit;

/// One pass of the pipeline.
pub trait Plugin {
    fn name(&self) -> &'static str;

    /// Register declarations and stash raw constructs. A structural
    /// failure aborts the unit.
    fn discover(
        &mut self,
        unit: &mut SourceUnit,
        ctx: &mut Context<'_>,
    ) -> Result<(), ExtractError>;

    /// Rewrite host text segments and stored construct texts; the match
    /// plugin lowers the stored constructs here.
    fn transform(&mut self, unit: &mut SourceUnit, ctx: &mut Context<'_>);

    /// Contribute injected declarations.
    fn collect(&mut self, ctx: &mut Context<'_>);
}

/// The standard pipeline, in its required order.
pub fn default_plugins() -> Vec<Box<dyn Plugin>> {
    vec![
        Box::new(EnumPlugin::new()),
        Box::new(GenericBuiltin::result()),
        Box::new(GenericBuiltin::option()),
        Box::new(MatchPlugin),
    ]
}

// ── User enums ─────────────────────────────────────────────────────────

/// Collects `enum` declarations, rewrites their constructor calls, and
/// injects the tagged-union declarations.
pub struct EnumPlugin {
    user_enums: Vec<String>,
    user_templates: Vec<String>,
}

impl EnumPlugin {
    pub fn new() -> Self {
        Self { user_enums: Vec::new(), user_templates: Vec::new() }
    }
}

impl Default for EnumPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for EnumPlugin {
    fn name(&self) -> &'static str {
        "enum"
    }

    fn discover(
        &mut self,
        unit: &mut SourceUnit,
        ctx: &mut Context<'_>,
    ) -> Result<(), ExtractError> {
        let idxs: Vec<usize> = unit
            .constructs()
            .filter(|(_, rc)| rc.kind == ConstructKind::Enum)
            .map(|(i, _)| i)
            .collect();
        for idx in idxs {
            let raw = unit.construct(idx).clone();
            unit.splice(idx, String::new());
            if !raw.prefix.trim().is_empty() || !raw.suffix.trim().is_empty() {
                ctx.sink.push(Diagnostic::error(
                    codes::MALFORMED_ENUM,
                    "an enum declaration must stand alone on its lines",
                    raw.keyword_span,
                ));
                continue;
            }
            match parse_enum_decl(&raw) {
                Ok(decl) if decl.is_generic() => {
                    self.user_templates.push(decl.name.clone());
                    if let Err(e) = ctx.instantiator.register_template(decl) {
                        ctx.sink.push(adt_diag(e));
                    }
                }
                Ok(decl) => {
                    self.user_enums.push(decl.name.clone());
                    if let Err(e) = ctx.registry.register(decl) {
                        ctx.sink.push(adt_diag(e));
                    }
                }
                Err(d) => ctx.sink.push(d),
            }
        }
        Ok(())
    }

    fn transform(&mut self, unit: &mut SourceUnit, ctx: &mut Context<'_>) {
        if self.user_enums.is_empty() && self.user_templates.is_empty() {
            return;
        }
        let templates = &self.user_templates;
        let filter = |n: &str| templates.iter().any(|t| t == n);
        let target = CallTarget::UserEnums(&self.user_enums);
        rewrite_unit(unit, &filter, target, ctx);
        rewrite_stored(&filter, target, ctx);
    }

    fn collect(&mut self, ctx: &mut Context<'_>) {
        for name in &self.user_enums {
            inject_enum(name, ctx);
        }
        // Injecting can materialize instantiations referenced by field
        // types, so drain until quiet.
        loop {
            let batch = ctx.drain_pending(|t| self.user_templates.iter().any(|u| u == t));
            if batch.is_empty() {
                break;
            }
            for name in &batch {
                inject_enum(name, ctx);
            }
        }
    }
}

// ── Builtin generics ───────────────────────────────────────────────────

/// One builtin generic template (`Result` or `Option`). Inactive when
/// the unit declares its own enum or template of the same name; the
/// user declaration wins and the builtin name is plain host text.
pub struct GenericBuiltin {
    template: &'static str,
    active: bool,
}

impl GenericBuiltin {
    pub fn result() -> Self {
        Self { template: "Result", active: false }
    }

    pub fn option() -> Self {
        Self { template: "Option", active: false }
    }

    fn decl(&self) -> EnumDecl {
        let variant = |name: &str, kind: VariantKind| Variant {
            name: name.to_string(),
            kind,
            span: Span::point(0),
        };
        match self.template {
            "Result" => EnumDecl {
                name: "Result".into(),
                type_params: vec!["T".into(), "E".into()],
                variants: vec![
                    variant("Ok", VariantKind::Tuple(vec!["T".into()])),
                    variant("Err", VariantKind::Tuple(vec!["E".into()])),
                ],
                span: Span::point(0),
            },
            _ => EnumDecl {
                name: "Option".into(),
                type_params: vec!["T".into()],
                variants: vec![
                    variant("Some", VariantKind::Tuple(vec!["T".into()])),
                    variant("None", VariantKind::Unit),
                ],
                span: Span::point(0),
            },
        }
    }
}

impl Plugin for GenericBuiltin {
    fn name(&self) -> &'static str {
        self.template
    }

    fn discover(
        &mut self,
        _unit: &mut SourceUnit,
        ctx: &mut Context<'_>,
    ) -> Result<(), ExtractError> {
        if ctx.instantiator.is_template(self.template) || ctx.registry.contains(self.template) {
            return Ok(());
        }
        match ctx.instantiator.register_template(self.decl()) {
            Ok(()) => self.active = true,
            Err(e) => ctx.sink.push(adt_diag(e)),
        }
        Ok(())
    }

    fn transform(&mut self, unit: &mut SourceUnit, ctx: &mut Context<'_>) {
        if !self.active {
            return;
        }
        let template = self.template;
        let filter = |n: &str| n == template;
        let target = CallTarget::Builtin(template);
        rewrite_unit(unit, &filter, target, ctx);
        rewrite_stored(&filter, target, ctx);
    }

    fn collect(&mut self, ctx: &mut Context<'_>) {
        if !self.active {
            return;
        }
        loop {
            let batch = ctx.drain_pending(|t| t == self.template);
            if batch.is_empty() {
                break;
            }
            for name in &batch {
                inject_enum(name, ctx);
            }
        }
    }
}

// ── Match lowering ─────────────────────────────────────────────────────

/// Stores match constructs at discovery, nested ones extracted out of
/// arm bodies behind placeholder tokens, and lowers them all once the
/// other plugins have finished rewriting the stored texts.
pub struct MatchPlugin;

impl Plugin for MatchPlugin {
    fn name(&self) -> &'static str {
        "match"
    }

    fn discover(
        &mut self,
        unit: &mut SourceUnit,
        ctx: &mut Context<'_>,
    ) -> Result<(), ExtractError> {
        let idxs: Vec<usize> = unit
            .constructs()
            .filter(|(_, rc)| rc.kind == ConstructKind::Match)
            .map(|(i, _)| i)
            .collect();
        for idx in idxs {
            let raw = unit.construct(idx).clone();
            let context = raw.context();
            store_match(&raw, MatchSite::Unit(idx), context, ctx)?;
        }
        Ok(())
    }

    fn transform(&mut self, unit: &mut SourceUnit, ctx: &mut Context<'_>) {
        // A nested construct is always stored after its parent, so
        // popping lowers innermost matches first and each parent
        // splices finished child text out of its arm bodies.
        while let Some(mc) = ctx.matches.pop() {
            let text = lower_construct(&mc, ctx);
            match &mc.site {
                MatchSite::Unit(idx) => unit.splice(*idx, text),
                MatchSite::Nested { parent, arm, token } => {
                    let body = &mut ctx.matches[*parent].arms[*arm].arm.body;
                    splice_nested(body, token, &text);
                }
            }
        }
    }

    fn collect(&mut self, ctx: &mut Context<'_>) {
        if ctx.debug_guards_used {
            ctx.injector.ensure_debug_flag();
        }
    }
}

/// Parse and stash one match construct, recursing into arm bodies.
fn store_match(
    raw: &RawConstruct,
    site: MatchSite,
    context: MatchContext,
    ctx: &mut Context<'_>,
) -> Result<(), ExtractError> {
    let id = ctx.next_match_id();
    let raw_arms = split_arms(&raw.body, raw.body_span.start, raw.span)?;
    let mut poisoned = false;

    if find_top_level_word(&raw.header, "match").is_some() {
        ctx.sink.push(Diagnostic::error(
            codes::INVALID_PATTERN,
            "a match cannot be the scrutinee of another match; bind it to a name first",
            raw.header_span,
        ));
        poisoned = true;
    }

    let mut arms = Vec::with_capacity(raw_arms.len());
    for ra in &raw_arms {
        if let Some(g) = &ra.guard {
            if find_top_level_word(g, "match").is_some() {
                ctx.sink.push(Diagnostic::error(
                    codes::INVALID_PATTERN,
                    "a match cannot appear in an arm guard; bind it to a name first",
                    ra.pattern_span,
                ));
                poisoned = true;
            }
        }
        match ra.parse() {
            Ok(arm) => arms.push(StoredArm::new(arm)),
            Err(d) => {
                ctx.sink.push(d);
                poisoned = true;
            }
        }
    }

    let idx = ctx.matches.len();
    ctx.matches.push(MatchConstruct {
        id,
        site,
        scrutinee: raw.header.clone(),
        scrutinee_hoists: Vec::new(),
        arms,
        context,
        prefix: raw.prefix.clone(),
        suffix: raw.suffix.clone(),
        indent: raw.indent().to_string(),
        keyword_span: raw.keyword_span,
        header_span: raw.header_span,
        body_span: raw.body_span,
        span: raw.span,
        poisoned,
    });
    if poisoned {
        return Ok(());
    }

    let arm_count = ctx.matches[idx].arms.len();
    for arm in 0..arm_count {
        extract_nested(idx, arm, ctx)?;
    }
    Ok(())
}

/// Pull nested constructs out of one arm body, replacing each with a
/// placeholder token. This runs at discovery, before any constructor
/// rewriting, so the nested arms' patterns are never mistaken for
/// calls.
fn extract_nested(parent: usize, arm: usize, ctx: &mut Context<'_>) -> Result<(), ExtractError> {
    let body = ctx.matches[parent].arms[arm].arm.body.clone();
    let body_at = ctx.matches[parent].arms[arm].arm.body_span.start;
    let parent_context = ctx.matches[parent].context;
    let found = find_constructs(&body)?;
    if found.is_empty() {
        return Ok(());
    }

    let mut replacements: Vec<(Span, String)> = Vec::new();
    for rc in &found {
        match rc.kind {
            ConstructKind::Enum => {
                ctx.sink.push(Diagnostic::error(
                    codes::MALFORMED_ENUM,
                    "enum declarations must be at the top level of the unit",
                    offset_span(rc.keyword_span, body_at),
                ));
                ctx.matches[parent].poisoned = true;
                return Ok(());
            }
            ConstructKind::Match => {
                // An arm of a match used as a value must itself produce
                // a value, whatever the nested construct's own line
                // looks like.
                let context = if parent_context == MatchContext::Expression {
                    MatchContext::Expression
                } else {
                    rc.context()
                };
                let token = nested_token(ctx.matches.len());
                let shifted = shift_construct(rc, body_at);
                store_match(
                    &shifted,
                    MatchSite::Nested { parent, arm, token: token.clone() },
                    context,
                    ctx,
                )?;
                replacements.push((rc.cut, token));
            }
        }
    }

    // Back to front so earlier cut offsets stay valid.
    let mut new_body = body;
    for (cut, token) in replacements.into_iter().rev() {
        let range = cut.range();
        let mut repl = token;
        if new_body[range.clone()].ends_with('\n') {
            repl.push('\n');
        }
        new_body.replace_range(range, &repl);
    }
    ctx.matches[parent].arms[arm].arm.body = new_body;
    Ok(())
}

/// Move a nested construct's spans from arm-body coordinates into the
/// original source. The cut stays body-relative; it is only ever
/// applied to the body slice.
fn shift_construct(rc: &RawConstruct, by: u32) -> RawConstruct {
    let mut rc = rc.clone();
    rc.keyword_span = offset_span(rc.keyword_span, by);
    rc.span = offset_span(rc.span, by);
    rc.header_span = offset_span(rc.header_span, by);
    rc.body_span = offset_span(rc.body_span, by);
    rc
}

fn offset_span(s: Span, by: u32) -> Span {
    Span::new(s.start + by, s.end + by)
}

/// Replace a nested construct's placeholder with its lowered text. The
/// token stands on its own line when the construct did; the generated
/// text is always newline-terminated whole lines.
fn splice_nested(body: &mut String, token: &str, text: &str) {
    let lined = format!("{token}\n");
    if let Some(pos) = body.find(&lined) {
        body.replace_range(pos..pos + lined.len(), text);
    } else if let Some(pos) = body.find(token) {
        body.replace_range(pos..pos + token.len(), text);
    }
}

// ── Shared rewriting drivers ───────────────────────────────────────────

/// Run one constructor pass over every host text segment.
fn rewrite_unit(
    unit: &mut SourceUnit,
    filter: &dyn Fn(&str) -> bool,
    target: CallTarget<'_>,
    ctx: &mut Context<'_>,
) {
    for (span, text) in unit.text_segments_mut() {
        let rewritten = rewrite_lines(text, span, filter, target, ctx);
        *text = rewritten;
    }
}

/// Run one constructor pass over every stored match's texts: scrutinee,
/// guards, and arm bodies, plus the hoists earlier passes produced.
fn rewrite_stored(filter: &dyn Fn(&str) -> bool, target: CallTarget<'_>, ctx: &mut Context<'_>) {
    let mut matches = std::mem::take(&mut ctx.matches);
    for mc in &mut matches {
        let at = mc.header_span.start;
        rewrite_hoist_list(&mut mc.scrutinee_hoists, at, target, ctx);
        let rw = rewrite_expr(&mc.scrutinee, at, filter, target, ReturnCtx::Never, ctx);
        mc.scrutinee = rw.text;
        mc.scrutinee_hoists.extend(rw.hoists);

        let in_return =
            mc.context == MatchContext::Expression && mc.prefix.trim() == "return";
        for sa in &mut mc.arms {
            let pat_at = sa.arm.pattern_span.end;
            rewrite_hoist_list(&mut sa.guard_hoists, pat_at, target, ctx);
            if let Some(g) = sa.arm.guard.take() {
                let rw = rewrite_expr(&g, pat_at, filter, target, ReturnCtx::Never, ctx);
                sa.arm.guard = Some(rw.text);
                sa.guard_hoists.extend(rw.hoists);
            }

            let body_at = sa.arm.body_span.start;
            rewrite_hoist_list(&mut sa.body_hoists, body_at, target, ctx);
            if sa.arm.has_block_body() {
                let span =
                    Span::new(body_at, body_at.saturating_add(sa.arm.body.len() as u32));
                sa.arm.body = rewrite_lines(&sa.arm.body, span, filter, target, ctx);
            } else {
                let ret = match mc.context {
                    MatchContext::Statement => ReturnCtx::PerLine,
                    MatchContext::Expression if in_return => ReturnCtx::Always,
                    MatchContext::Expression => ReturnCtx::Never,
                };
                let rw = rewrite_expr(&sa.arm.body, body_at, filter, target, ret, ctx);
                sa.arm.body = rw.text;
                sa.body_hoists.extend(rw.hoists);
            }
        }
    }
    ctx.matches = matches;
}

/// Inject the tagged-union declarations for one registered enum. Field
/// types may reference generic templates; those materialize here so the
/// declaration block names only concrete types.
fn inject_enum(name: &str, ctx: &mut Context<'_>) {
    let Some(mut decl) = ctx.registry.get(name).cloned() else {
        return;
    };
    normalize_field_types(&mut decl, ctx);
    let layout = graft_adt::lower(&decl);
    ctx.injector.add(name, enum_decls(&layout));
}

fn normalize_field_types(decl: &mut EnumDecl, ctx: &mut Context<'_>) {
    let at = decl.span.start;
    let any = |_: &str| true;
    for v in &mut decl.variants {
        match &mut v.kind {
            VariantKind::Unit => {}
            VariantKind::Tuple(tys) => {
                for ty in tys {
                    *ty = rewrite_annotations(ty, at, &any, ctx);
                }
            }
            VariantKind::Struct(fields) => {
                for f in fields {
                    f.ty = rewrite_annotations(&f.ty, at, &any, ctx);
                }
            }
        }
    }
}
