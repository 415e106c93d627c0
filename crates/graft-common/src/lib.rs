//! Shared foundation types for the graft preprocessor.
//!
//! Every position in the pipeline is a byte offset into the original
//! source text ([`Span`]), converted to line/column pairs on demand via
//! [`LineIndex`]. Diagnostics for one compilation unit accumulate in a
//! capped [`DiagnosticSink`]; behavioural knobs live in [`Options`].

pub mod diag;
pub mod options;
pub mod span;

pub use diag::{Diagnostic, DiagnosticSink, Severity};
pub use options::{NilSafety, Options};
pub use span::{LineIndex, Span};
