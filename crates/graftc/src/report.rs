//! Diagnostic rendering for the driver.
//!
//! Human-readable reports go through ariadne; `--json` switches to one
//! serde_json object per line on stderr. Both forms carry the stable
//! `E####`/`P####` code so tests and editor integrations can match on it.

use ariadne::{Config, Label, Report, ReportKind, Source};

use graft_common::{Diagnostic, LineIndex, Severity, Span};
use graft_parse::ExtractError;

/// How diagnostics are rendered.
pub struct ReportOptions {
    /// Colorize human-readable output.
    pub color: bool,
    /// Emit one JSON object per line instead of rendered reports.
    pub json: bool,
}

impl ReportOptions {
    fn config(&self) -> Config {
        if self.color {
            Config::default()
        } else {
            Config::default().with_color(false)
        }
    }
}

/// Print every diagnostic for one unit.
///
/// Returns true if any diagnostic has error severity.
pub fn print_diagnostics(
    diags: &[Diagnostic],
    source: &str,
    file: &str,
    opts: &ReportOptions,
) -> bool {
    let index = LineIndex::new(source);
    let mut has_errors = false;
    for diag in diags {
        if diag.severity == Severity::Error {
            has_errors = true;
        }
        if opts.json {
            let (line, col) = index.line_col(diag.span.start);
            let obj = serde_json::json!({
                "code": diag.code,
                "severity": diag.severity,
                "message": diag.message,
                "file": file,
                "span": diag.span,
                "line": line,
                "col": col,
            });
            eprintln!("{}", obj);
        } else {
            let kind = match diag.severity {
                Severity::Error => ReportKind::Error,
                Severity::Warning => ReportKind::Warning,
            };
            let (start, end) = clamp(diag.span, source.len());
            let _ = Report::<std::ops::Range<usize>>::build(kind, start..end)
                .with_code(diag.code)
                .with_message(&diag.message)
                .with_config(opts.config())
                .with_label(Label::new(start..end).with_message(&diag.message))
                .finish()
                .eprint(Source::from(source));
        }
    }
    has_errors
}

/// Print a fatal extraction error, the structural failure that aborted the
/// unit before any lowering ran.
pub fn print_extract_error(err: &ExtractError, source: &str, file: &str, opts: &ReportOptions) {
    if opts.json {
        let index = LineIndex::new(source);
        let (line, col) = index.line_col(err.span.start);
        let obj = serde_json::json!({
            "code": err.code,
            "severity": "error",
            "message": err.message,
            "file": file,
            "span": err.span,
            "line": line,
            "col": col,
        });
        eprintln!("{}", obj);
        return;
    }

    let (start, end) = clamp(err.span, source.len());
    let mut builder = Report::<std::ops::Range<usize>>::build(ReportKind::Error, start..end)
        .with_code(err.code)
        .with_message(&err.message)
        .with_config(opts.config())
        .with_label(Label::new(start..end).with_message(&err.message));
    if let Some((related_msg, related_span)) = &err.related {
        let (rs, re) = clamp(*related_span, source.len());
        builder = builder.with_label(Label::new(rs..re).with_message(related_msg));
    }
    let _ = builder.finish().eprint(Source::from(source));
}

/// Clamp a span to the source so ariadne always receives an in-bounds,
/// non-empty range (point spans widen to one byte).
fn clamp(span: Span, len: usize) -> (usize, usize) {
    if len == 0 {
        return (0, 0);
    }
    let start = (span.start as usize).min(len - 1);
    let end = (span.end as usize).clamp(start + 1, len);
    (start, end)
}
