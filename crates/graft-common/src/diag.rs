//! Diagnostics for one compilation unit.
//!
//! Semantic problems (unknown variant, non-exhaustive match, failed
//! inference) do not abort processing: the offending site is replaced with
//! a marker in the output and a [`Diagnostic`] is recorded here. Only
//! structural extraction errors are fatal, and those travel as typed
//! `Err` values instead.
//!
//! The sink is capped. Once a unit has produced [`DiagnosticSink::cap`]
//! diagnostics a single sentinel entry is appended and everything after
//! it is counted but dropped, so a pathological input cannot balloon the
//! report.

use serde::Serialize;

use crate::span::Span;

// ── Error Codes ────────────────────────────────────────────────────────

/// Stable diagnostic codes, one per semantic failure class.
///
/// Codes are part of the tool's output contract: tests and editor
/// integrations match on them, so existing codes are never renumbered.
pub mod codes {
    /// An enum with this name was already declared in the same unit.
    pub const DUPLICATE_ENUM: &str = "E0001";
    /// A variant name is repeated within one enum declaration.
    pub const DUPLICATE_VARIANT: &str = "E0002";
    /// A pattern or constructor names a variant no registered enum defines.
    pub const UNKNOWN_VARIANT: &str = "E0003";
    /// Several enums define the variant and no type information picks one.
    pub const AMBIGUOUS_VARIANT: &str = "E0004";
    /// A match without a catch-all leaves some variants unhandled.
    pub const NON_EXHAUSTIVE_MATCH: &str = "E0005";
    /// A constructor pattern binds a different number of fields than the
    /// variant declares.
    pub const PATTERN_ARITY: &str = "E0006";
    /// A struct pattern names a field the variant does not have.
    pub const UNKNOWN_FIELD: &str = "E0007";
    /// An expression-context match whose result type cannot be derived
    /// from any arm.
    pub const UNTYPED_MATCH: &str = "E0008";
    /// Type arguments for a Result/Option constructor could not be
    /// derived from arguments or context.
    pub const GENERIC_ARGS_UNKNOWN: &str = "E0009";
    /// An arm's pattern text could not be parsed.
    pub const INVALID_PATTERN: &str = "E0010";
    /// A generic type argument is itself generic; only one level of
    /// nesting is supported.
    pub const NESTED_GENERIC: &str = "E0011";
    /// An enum declaration that could not be understood (missing name,
    /// bad variant syntax, or not at the top level of the unit).
    pub const MALFORMED_ENUM: &str = "E0012";
    /// A block-bodied arm in a match used as an expression.
    pub const BLOCK_ARM_IN_EXPR: &str = "E0013";
    /// An arm after an unguarded catch-all can never match.
    pub const UNREACHABLE_ARM: &str = "W0001";
    /// Sentinel appended when the per-unit diagnostic cap is reached.
    pub const TOO_MANY_DIAGNOSTICS: &str = "E0999";
}

// ── Diagnostic ─────────────────────────────────────────────────────────

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// One recorded problem: a stable code, a severity, a human-readable
/// message, and the byte span of the offending source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub code: &'static str,
    pub severity: Severity,
    pub message: String,
    pub span: Span,
}

impl Diagnostic {
    /// Create an error-severity diagnostic.
    pub fn error(code: &'static str, message: impl Into<String>, span: Span) -> Self {
        Self {
            code,
            severity: Severity::Error,
            message: message.into(),
            span,
        }
    }

    /// Create a warning-severity diagnostic.
    pub fn warning(code: &'static str, message: impl Into<String>, span: Span) -> Self {
        Self {
            code,
            severity: Severity::Warning,
            message: message.into(),
            span,
        }
    }
}

// ── Sink ───────────────────────────────────────────────────────────────

/// Append-only store of diagnostics for one unit, bounded by a cap.
#[derive(Debug)]
pub struct DiagnosticSink {
    diags: Vec<Diagnostic>,
    cap: usize,
    /// Diagnostics discarded after the sentinel was appended.
    dropped: usize,
}

impl DiagnosticSink {
    /// Create a sink that stores at most `cap` diagnostics plus one
    /// sentinel.
    pub fn new(cap: usize) -> Self {
        Self {
            diags: Vec::new(),
            cap,
            dropped: 0,
        }
    }

    /// Record a diagnostic. Once the cap is reached a single
    /// [`codes::TOO_MANY_DIAGNOSTICS`] sentinel is stored in its place
    /// and later pushes only bump the dropped counter.
    pub fn push(&mut self, diag: Diagnostic) {
        if self.diags.len() < self.cap {
            self.diags.push(diag);
            return;
        }
        if self.dropped == 0 {
            self.diags.push(Diagnostic::error(
                codes::TOO_MANY_DIAGNOSTICS,
                format!("more than {} problems in this unit; further reports dropped", self.cap),
                diag.span,
            ));
        }
        self.dropped += 1;
    }

    /// Whether any error-severity diagnostic was recorded.
    pub fn has_errors(&self) -> bool {
        self.diags.iter().any(|d| d.severity == Severity::Error)
    }

    /// Number of stored diagnostics (sentinel included).
    pub fn len(&self) -> usize {
        self.diags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diags.is_empty()
    }

    /// Diagnostics dropped past the cap.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Iterate over the stored diagnostics in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diags.iter()
    }

    /// Consume the sink, yielding the stored diagnostics.
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diags
    }
}
