//! Registration and instantiation errors.
//!
//! These are semantic failures: the caller turns them into diagnostics
//! with the right span and keeps processing the unit.

use std::fmt;

use serde::Serialize;

use graft_common::span::Span;

/// A failed enum registration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdtError {
    pub kind: AdtErrorKind,
    pub span: Span,
}

impl AdtError {
    pub fn new(kind: AdtErrorKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// The specific kind of registration error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum AdtErrorKind {
    /// An enum with this name is already registered in the unit.
    DuplicateEnum { name: String, prev: Span },
    /// A variant name appears twice within one declaration.
    DuplicateVariant { enum_name: String, variant: String },
}

impl fmt::Display for AdtErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateEnum { name, .. } => {
                write!(f, "enum `{name}` is declared more than once")
            }
            Self::DuplicateVariant { enum_name, variant } => {
                write!(f, "enum `{enum_name}` declares variant `{variant}` more than once")
            }
        }
    }
}

impl fmt::Display for AdtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for AdtError {}

/// A failed generic instantiation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum InstError {
    /// No template with this name is registered.
    UnknownTemplate { name: String },
    /// Wrong number of type arguments for the template.
    ArityMismatch {
        template: String,
        expected: usize,
        got: usize,
    },
    /// A type argument is itself generic; only one level is supported.
    NestedGeneric { arg: String },
}

impl fmt::Display for InstError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownTemplate { name } => write!(f, "no generic enum named `{name}`"),
            Self::ArityMismatch { template, expected, got } => write!(
                f,
                "`{template}` takes {expected} type argument(s), found {got}"
            ),
            Self::NestedGeneric { arg } => write!(
                f,
                "type argument `{arg}` is itself generic; only one level of type arguments is supported"
            ),
        }
    }
}

impl std::error::Error for InstError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adt_error_display() {
        let err = AdtError::new(
            AdtErrorKind::DuplicateEnum { name: "Shape".into(), prev: Span::new(0, 4) },
            Span::new(40, 44),
        );
        assert_eq!(err.to_string(), "enum `Shape` is declared more than once");
    }

    #[test]
    fn inst_error_display() {
        let err = InstError::ArityMismatch {
            template: "Result".into(),
            expected: 2,
            got: 1,
        };
        assert_eq!(err.to_string(), "`Result` takes 2 type argument(s), found 1");
    }
}
