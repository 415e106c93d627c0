//! Behavioural options threaded through the pipeline.

use serde::Serialize;

/// How generated tag-dispatch code guards against nil enum values.
///
/// A lowered match reads the tag field through a pointer; a nil scrutinee
/// would crash there with a bare runtime fault. The three modes trade
/// overhead against how loud that failure is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NilSafety {
    /// No check: a nil scrutinee faults on the tag read.
    Off,
    /// Emit an explicit nil check that panics with a descriptive message
    /// before the tag is read.
    #[default]
    On,
    /// Like `On`, but the check is wrapped in a flag the host program can
    /// toggle at run time; release binaries skip the branch.
    Debug,
}

/// Per-run options, fixed before any unit is processed.
#[derive(Debug, Clone)]
pub struct Options {
    /// Nil-scrutinee guarding mode for generated dispatch code.
    pub nil_safety: NilSafety,
    /// Per-unit diagnostic cap before the sentinel kicks in.
    pub max_diagnostics: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            nil_safety: NilSafety::default(),
            max_diagnostics: 64,
        }
    }
}
