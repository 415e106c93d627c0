//! Splitting a match body into arms.
//!
//! Arms are separated by top-level `=>`. The text between two arrows
//! holds the previous arm's body and the next arm's pattern; the *last*
//! top-level comma in that stretch is the divider, so commas inside
//! call arguments, tuple patterns, and block bodies never split arms.
//! A guard is the part of a pattern after a top-level `if`.

use graft_common::span::Span;

use crate::ast::MatchArm;
use crate::error::{codes, ExtractError};
use crate::pattern::parse_pattern;
use crate::scan::{find_top_level_word, last_top_level_comma, split_ranges};

/// One arm as raw text, before pattern parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct RawArm {
    pub pattern: String,
    pub pattern_span: Span,
    pub guard: Option<String>,
    pub body: String,
    pub body_span: Span,
}

impl RawArm {
    /// Parse the pattern text, producing a structured arm. Pattern
    /// failures are semantic diagnostics, not fatal errors.
    pub fn parse(&self) -> Result<MatchArm, graft_common::Diagnostic> {
        let pattern = parse_pattern(&self.pattern, self.pattern_span)?;
        Ok(MatchArm {
            pattern,
            pattern_span: self.pattern_span,
            guard: self.guard.clone(),
            body: self.body.clone(),
            body_span: self.body_span,
        })
    }
}

/// Split a match construct's interior into raw arms.
///
/// `offset` is the byte position of `body` within the unit, so that the
/// returned spans are absolute. Zero arms from a non-empty body is a
/// structural error carrying `construct_span`; an empty body yields an
/// empty arm list (exhaustiveness rejects it later with a proper
/// diagnostic).
pub fn split_arms(
    body: &str,
    offset: u32,
    construct_span: Span,
) -> Result<Vec<RawArm>, ExtractError> {
    let segments = split_ranges(body, "=>");
    if segments.len() == 1 {
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        return Err(ExtractError::new(
            codes::NO_ARMS,
            "match body has no `=>` arms",
            construct_span,
        ));
    }

    let arm_count = segments.len() - 1;
    let mut lhs = Vec::with_capacity(arm_count);
    let mut bodies = Vec::with_capacity(arm_count);

    lhs.push(segments[0].clone());
    for (k, seg) in segments.iter().enumerate().skip(1) {
        let last = k == segments.len() - 1;
        let text = &body[seg.clone()];
        if !last {
            let comma = last_top_level_comma(text).ok_or_else(|| {
                ExtractError::new(
                    codes::NO_ARMS,
                    "expected `,` between match arms",
                    Span::new(offset + seg.start as u32, offset + seg.end as u32),
                )
            })?;
            bodies.push(seg.start..seg.start + comma);
            lhs.push(seg.start + comma + 1..seg.end);
        } else {
            // Trailing comma after the final body is allowed.
            let trimmed = text.trim_end();
            let mut end = seg.start + trimmed.len();
            if trimmed.ends_with(',')
                && last_top_level_comma(text) == Some(trimmed.len() - 1)
            {
                end -= 1;
            }
            bodies.push(seg.start..end);
        }
    }

    let mut arms = Vec::with_capacity(arm_count);
    for (lhs_range, body_range) in lhs.into_iter().zip(bodies) {
        let lhs_text = &body[lhs_range.clone()];
        let (pat_range, guard) = match find_top_level_word(lhs_text, "if") {
            Some(p) => (
                lhs_range.start..lhs_range.start + p,
                Some(lhs_text[p + 2..].trim().to_string()),
            ),
            None => (lhs_range.clone(), None),
        };
        let (pattern, pattern_span) = trimmed(body, pat_range, offset);
        let (body_text, body_span) = trimmed(body, body_range, offset);
        arms.push(RawArm {
            pattern,
            pattern_span,
            guard,
            body: body_text,
            body_span,
        });
    }
    Ok(arms)
}

/// Trim a range of `text` on both sides, returning the trimmed string
/// and its absolute span.
fn trimmed(text: &str, range: std::ops::Range<usize>, offset: u32) -> (String, Span) {
    let raw = &text[range.clone()];
    let t = raw.trim_start();
    let start = range.start + (raw.len() - t.len());
    let t = t.trim_end();
    (
        t.to_string(),
        Span::new(offset + start as u32, offset + (start + t.len()) as u32),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Pattern;

    fn arms(body: &str) -> Vec<RawArm> {
        split_arms(body, 0, Span::new(0, body.len() as u32)).unwrap()
    }

    #[test]
    fn splits_two_simple_arms() {
        let got = arms("\n\tCircle(r) => r * r,\n\tPoint => 0.0,\n");
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].pattern, "Circle(r)");
        assert_eq!(got[0].body, "r * r");
        assert_eq!(got[1].pattern, "Point");
        assert_eq!(got[1].body, "0.0");
    }

    #[test]
    fn no_trailing_comma_on_last_arm() {
        let got = arms("A => 1, B => 2");
        assert_eq!(got.len(), 2);
        assert_eq!(got[1].body, "2");
    }

    #[test]
    fn commas_inside_calls_do_not_split() {
        let got = arms("Pair(a, b) => add(a, b),\n_ => zero(0, 0),");
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].pattern, "Pair(a, b)");
        assert_eq!(got[0].body, "add(a, b)");
        assert_eq!(got[1].body, "zero(0, 0)");
    }

    #[test]
    fn block_bodies_keep_their_commas() {
        let got = arms("A => { f(x, y) },\nB => 2,");
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].body, "{ f(x, y) }");
        assert_eq!(got[1].pattern, "B");
    }

    #[test]
    fn guard_is_split_from_pattern() {
        let got = arms("Some(v) if v > 0 => v,\n_ => 0,");
        assert_eq!(got[0].pattern, "Some(v)");
        assert_eq!(got[0].guard.as_deref(), Some("v > 0"));
        assert_eq!(got[1].guard, None);
    }

    #[test]
    fn guard_with_call_commas() {
        let got = arms("Some(v) if inRange(v, 1, 9) => v,\n_ => 0,");
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].guard.as_deref(), Some("inRange(v, 1, 9)"));
    }

    #[test]
    fn empty_body_gives_no_arms() {
        assert!(arms("   \n\t ").is_empty());
    }

    #[test]
    fn non_empty_body_without_arrows_is_fatal() {
        let err = split_arms("just some text", 0, Span::new(10, 24)).unwrap_err();
        assert_eq!(err.code, codes::NO_ARMS);
        assert_eq!(err.span, Span::new(10, 24));
    }

    #[test]
    fn missing_comma_between_arms_is_fatal() {
        let err = split_arms("A => 1 B => 2", 0, Span::new(0, 13)).unwrap_err();
        assert_eq!(err.code, codes::NO_ARMS);
    }

    #[test]
    fn spans_are_absolute() {
        let body = "A => 1,";
        let got = split_arms(body, 100, Span::new(90, 110)).unwrap();
        assert_eq!(got[0].pattern_span, Span::new(100, 101));
        assert_eq!(got[0].body_span, Span::new(105, 106));
    }

    #[test]
    fn nested_match_in_body_stays_whole() {
        let got = arms("A => match t {\n\tB => 1,\n\tC => 2,\n},\nD => 3,");
        assert_eq!(got.len(), 2);
        assert!(got[0].body.contains("match t"));
        assert!(got[0].body.ends_with('}'));
        assert_eq!(got[1].pattern, "D");
    }

    #[test]
    fn raw_arm_parses_into_match_arm() {
        let got = arms("Circle(r) if r > 0 => r,");
        let arm = got[0].parse().unwrap();
        match arm.pattern {
            Pattern::Constructor { ref name, ref args } => {
                assert_eq!(name, "Circle");
                assert_eq!(args.len(), 1);
            }
            ref other => panic!("unexpected pattern: {other:?}"),
        }
        assert_eq!(arm.guard.as_deref(), Some("r > 0"));
    }
}
