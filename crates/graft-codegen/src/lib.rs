//! graft code generation: the plugin pipeline that rewrites one source
//! unit.
//!
//! This crate takes the raw text of a `.graft` unit and produces the
//! host-language text: enum declarations become injected tagged-union
//! declarations, constructor calls become generated-constructor calls,
//! and match constructs become dispatch blocks or typed closures.
//!
//! # Architecture
//!
//! - [`unit`]: the segmented source unit constructs are spliced into
//! - [`context`]: per-unit shared state (registry, sink, stored matches)
//! - [`plugins`]: the discover/transform/collect pipeline and its four
//!   standard plugins
//! - [`rewrite`]: constructor-call and generic-annotation rewriting
//! - [`lower`]: match lowering, from stored construct to emitted text
//! - [`emit`]: host-text fragments (declarations, writers, markers)
//! - [`inject`]: the deduplicated generated-declaration block

pub mod context;
pub mod emit;
pub mod inject;
pub mod lower;
pub mod plugins;
pub mod rewrite;
pub mod unit;

use graft_common::diag::Diagnostic;
use graft_common::options::Options;
use graft_infer::TypeOracle;
use graft_parse::ExtractError;

use crate::context::Context;
use crate::plugins::default_plugins;
use crate::unit::SourceUnit;

/// The result of compiling one unit.
///
/// `output` is the full rewritten text, present only when the unit
/// produced no error diagnostics; warnings alone do not suppress it.
pub struct UnitOutcome {
    pub output: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Compile one unit's source text.
///
/// Structural extraction failures (unterminated construct, missing
/// body) abort with an [`ExtractError`]. Everything else is recorded in
/// the returned diagnostics, and the rewritten text is withheld when
/// any of them is an error.
pub fn compile_unit(
    source: &str,
    options: Options,
    oracle: &dyn TypeOracle,
) -> Result<UnitOutcome, ExtractError> {
    let mut unit = SourceUnit::parse(source)?;
    let mut ctx = Context::new(source, options, oracle);
    let mut plugins = default_plugins();

    for plugin in plugins.iter_mut() {
        plugin.discover(&mut unit, &mut ctx)?;
    }
    for plugin in plugins.iter_mut() {
        plugin.transform(&mut unit, &mut ctx);
    }
    for plugin in plugins.iter_mut() {
        plugin.collect(&mut ctx);
    }

    let injected = ctx.injector.render();
    let failed = ctx.sink.has_errors();
    let output = (!failed).then(|| unit.render(&injected));
    Ok(UnitOutcome { output, diagnostics: ctx.sink.into_vec() })
}
