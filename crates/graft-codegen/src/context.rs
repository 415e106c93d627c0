//! Per-unit compilation context.
//!
//! Everything the plugins share lives here and is built fresh for each
//! unit: the ADT registry, the template instantiator, the diagnostics
//! sink, the scanned signature index, stored match constructs, the
//! temp-name counters, and the declaration injector. Nothing is global.

use graft_adt::{AdtError, AdtErrorKind, AdtRegistry, InstError, Instantiator};
use graft_common::diag::{codes, Diagnostic, DiagnosticSink};
use graft_common::options::Options;
use graft_common::span::Span;
use graft_infer::{InferenceService, TypeOracle};
use graft_parse::ast::MatchArm;
use graft_parse::construct::MatchContext;
use graft_parse::SignatureIndex;

use crate::emit::HOIST_TEMP;
use crate::inject::DeclInjector;

/// One stored arm: the parsed arm plus hoisted statements produced by
/// constructor rewriting inside its texts. Guard hoists run after the
/// structural match and before the guard; body hoists run only once the
/// guard has passed.
#[derive(Debug)]
pub struct StoredArm {
    pub arm: MatchArm,
    pub guard_hoists: Vec<String>,
    pub body_hoists: Vec<String>,
}

impl StoredArm {
    pub fn new(arm: MatchArm) -> Self {
        Self { arm, guard_hoists: Vec::new(), body_hoists: Vec::new() }
    }
}

/// Where a lowered construct's generated text is spliced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchSite {
    /// Replaces construct segment `idx` of the source unit.
    Unit(usize),
    /// Replaces `token` inside the body text of arm `arm` of the match
    /// stored at index `parent`. Nested constructs are extracted out of
    /// arm bodies at discovery so constructor rewriting never touches
    /// their patterns.
    Nested {
        parent: usize,
        arm: usize,
        token: String,
    },
}

/// Placeholder standing in for nested match `idx` inside a parent arm
/// body. The control characters keep it out of reach of every rewriting
/// pass: it is not an identifier, not a literal, and never code the
/// scanner cares about.
pub fn nested_token(idx: usize) -> String {
    format!("\u{1}graft:{idx}\u{1}")
}

/// One match construct between discovery and lowering.
#[derive(Debug)]
pub struct MatchConstruct {
    /// Per-unit construct number; names the scrutinee temp and matched
    /// flag (`__graft_m3`, `__graft_matched3`).
    pub id: u32,
    pub site: MatchSite,
    /// Scrutinee expression text; rewritten in place by the
    /// constructor plugins.
    pub scrutinee: String,
    pub scrutinee_hoists: Vec<String>,
    pub arms: Vec<StoredArm>,
    pub context: MatchContext,
    /// Raw text before the keyword on its line (`x := `, `return `).
    pub prefix: String,
    /// Raw text after the closing brace on its line (` + 2`).
    pub suffix: String,
    /// Leading whitespace of the construct's first line.
    pub indent: String,
    pub keyword_span: Span,
    /// Span of the scrutinee text in the original source.
    pub header_span: Span,
    pub body_span: Span,
    pub span: Span,
    /// Set when discovery already recorded a diagnostic for this
    /// construct; lowering goes straight to the error marker.
    pub poisoned: bool,
}

/// Shared mutable state for one unit's pipeline run.
pub struct Context<'a> {
    pub options: Options,
    pub registry: AdtRegistry,
    pub instantiator: Instantiator,
    pub sink: DiagnosticSink,
    pub sigs: SignatureIndex,
    pub oracle: &'a dyn TypeOracle,
    pub injector: DeclInjector,
    pub matches: Vec<MatchConstruct>,
    /// Instantiations materialized this run, as (template, concrete
    /// name), awaiting declaration emission in the collect phase.
    pub pending: Vec<(String, String)>,
    /// Set when lowering emitted a debug-gated nil check, so the
    /// collect phase declares the flag.
    pub debug_guards_used: bool,
    match_ids: u32,
    tmp_ids: u32,
    source_len: u32,
}

impl<'a> Context<'a> {
    pub fn new(source: &str, options: Options, oracle: &'a dyn TypeOracle) -> Self {
        Self {
            sink: DiagnosticSink::new(options.max_diagnostics),
            options,
            registry: AdtRegistry::new(),
            instantiator: Instantiator::new(),
            sigs: SignatureIndex::scan(source),
            oracle,
            injector: DeclInjector::new(),
            matches: Vec::new(),
            pending: Vec::new(),
            debug_guards_used: false,
            match_ids: 0,
            tmp_ids: 0,
            source_len: source.len() as u32,
        }
    }

    /// Span into the original source, clamped to the unit. Offsets
    /// computed inside rewritten texts can drift past the original end
    /// once hoists and renames change lengths; diagnostics must still
    /// point somewhere real.
    pub fn unit_span(&self, start: u32, end: u32) -> Span {
        let s = start.min(self.source_len);
        Span::new(s, end.clamp(s, self.source_len))
    }

    /// Next per-construct id for scrutinee temp and matched flag.
    pub fn next_match_id(&mut self) -> u32 {
        let id = self.match_ids;
        self.match_ids += 1;
        id
    }

    /// Fresh hoist temporary name.
    pub fn next_tmp(&mut self) -> String {
        let id = self.tmp_ids;
        self.tmp_ids += 1;
        format!("{HOIST_TEMP}{id}")
    }

    /// Resolve an expression's host type at `at` (a byte offset into
    /// the original source).
    pub fn expr_type(&self, expr: &str, at: u32) -> Option<String> {
        InferenceService::new(self.oracle, &self.sigs).expr_type(expr, at)
    }

    /// Declared return type of the function enclosing `at`.
    pub fn enclosing_return(&self, at: u32) -> Option<String> {
        InferenceService::new(self.oracle, &self.sigs)
            .enclosing_return(at)
            .map(str::to_string)
    }

    /// Materialize a template instantiation: cache lookup, registry
    /// registration for new entries, and a pending record for the
    /// collect phase. Failures become diagnostics and `None`.
    pub fn materialize(&mut self, template: &str, args: &[String], at: Span) -> Option<String> {
        match self.instantiator.instantiate(template, args) {
            Ok(inst) => {
                if let Some(decl) = inst.created {
                    match self.registry.register(decl) {
                        Ok(()) => self.pending.push((template.to_string(), inst.name.clone())),
                        Err(err) => {
                            self.sink.push(adt_diag(err));
                            return None;
                        }
                    }
                }
                Some(inst.name)
            }
            Err(err) => {
                self.sink.push(inst_diag(err, at));
                None
            }
        }
    }

    /// Drain pending instantiations whose template `filter` accepts.
    pub fn drain_pending(&mut self, filter: impl Fn(&str) -> bool) -> Vec<String> {
        let mut taken = Vec::new();
        let mut kept = Vec::new();
        for (template, name) in self.pending.drain(..) {
            if filter(&template) {
                taken.push(name);
            } else {
                kept.push((template, name));
            }
        }
        self.pending = kept;
        taken
    }
}

/// Map a registry error to its diagnostic.
pub fn adt_diag(err: AdtError) -> Diagnostic {
    let code = match &err.kind {
        AdtErrorKind::DuplicateEnum { .. } => codes::DUPLICATE_ENUM,
        AdtErrorKind::DuplicateVariant { .. } => codes::DUPLICATE_VARIANT,
    };
    Diagnostic::error(code, err.kind.to_string(), err.span)
}

/// Map an instantiation error to its diagnostic.
pub fn inst_diag(err: InstError, at: Span) -> Diagnostic {
    let code = match &err {
        InstError::NestedGeneric { .. } => codes::NESTED_GENERIC,
        InstError::UnknownTemplate { .. } | InstError::ArityMismatch { .. } => {
            codes::GENERIC_ARGS_UNKNOWN
        }
    };
    Diagnostic::error(code, err.to_string(), at)
}
