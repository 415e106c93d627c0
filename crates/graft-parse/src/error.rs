//! Structural extraction errors.
//!
//! These are the fatal failures of the text stage: a construct whose byte
//! span cannot be completed, or a match body that yields no arms. Unlike
//! semantic diagnostics they abort the unit, so they travel as typed
//! `Err` values rather than through the diagnostic sink.

use std::fmt;

use graft_common::span::Span;

/// Stable codes for structural errors, disjoint from the `E####`
/// diagnostic space.
pub mod codes {
    /// No `{` found to open the construct's body.
    pub const MISSING_BODY: &str = "P0001";
    /// Delimiter depth never returned to zero before end of input.
    pub const UNTERMINATED: &str = "P0002";
    /// A non-empty match body produced zero arms.
    pub const NO_ARMS: &str = "P0003";
}

/// A structural extraction error with location information and an
/// optional related span for context (e.g. "construct opened here").
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractError {
    /// Stable error code from [`codes`].
    pub code: &'static str,
    /// Human-readable description of what went wrong.
    pub message: String,
    /// Primary source location where the error was detected.
    pub span: Span,
    /// Optional related location with context message.
    pub related: Option<(String, Span)>,
}

impl ExtractError {
    /// Create a new extraction error with just a message and span.
    pub fn new(code: &'static str, message: impl Into<String>, span: Span) -> Self {
        Self {
            code,
            message: message.into(),
            span,
            related: None,
        }
    }

    /// Create an extraction error with a related span for additional context.
    pub fn with_related(
        code: &'static str,
        message: impl Into<String>,
        span: Span,
        related_message: impl Into<String>,
        related_span: Span,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            span,
            related: Some((related_message.into(), related_span)),
        }
    }
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExtractError {}
