//! The per-unit source model.
//!
//! A unit is split once, up front, into an alternating sequence of
//! plain-text segments and construct segments. Plugins rewrite text
//! segments in place and splice lowered output over construct segments;
//! the final printer concatenates the segments and appends the injected
//! declaration block. Each segment remembers the byte span it came from
//! in the original source, which is what anchors diagnostics and
//! inference lookups after the texts themselves have changed.

use graft_common::span::Span;
use graft_parse::construct::{find_constructs, RawConstruct};
use graft_parse::error::ExtractError;

/// What a segment holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// User lines, passed through (possibly rewritten).
    Text,
    /// An extracted construct; the payload is its index in the unit's
    /// construct list.
    Construct(usize),
}

/// One contiguous piece of the unit.
#[derive(Debug)]
pub struct Segment {
    /// Original byte range this segment replaces.
    pub span: Span,
    pub kind: SegmentKind,
    /// Current text; starts as the original slice.
    pub text: String,
}

/// One compilation unit, segmented for rewriting.
#[derive(Debug)]
pub struct SourceUnit {
    source: String,
    segments: Vec<Segment>,
    constructs: Vec<RawConstruct>,
}

impl SourceUnit {
    /// Extract every top-level construct and segment the unit around
    /// them. Structural extraction failures abort the unit.
    pub fn parse(source: &str) -> Result<Self, ExtractError> {
        let constructs = find_constructs(source)?;
        let mut segments = Vec::new();
        let mut prev = 0u32;
        for (i, c) in constructs.iter().enumerate() {
            if c.cut.start > prev {
                segments.push(Segment {
                    span: Span::new(prev, c.cut.start),
                    kind: SegmentKind::Text,
                    text: source[prev as usize..c.cut.start as usize].to_string(),
                });
            }
            segments.push(Segment {
                span: c.cut,
                kind: SegmentKind::Construct(i),
                text: source[c.cut.range()].to_string(),
            });
            prev = c.cut.end;
        }
        if (prev as usize) < source.len() {
            segments.push(Segment {
                span: Span::new(prev, source.len() as u32),
                kind: SegmentKind::Text,
                text: source[prev as usize..].to_string(),
            });
        }
        Ok(Self {
            source: source.to_string(),
            segments,
            constructs,
        })
    }

    /// The unchanged original source.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn constructs(&self) -> impl Iterator<Item = (usize, &RawConstruct)> {
        self.constructs.iter().enumerate()
    }

    pub fn construct(&self, idx: usize) -> &RawConstruct {
        &self.constructs[idx]
    }

    /// Replace a construct's segment with generated text. The text
    /// stands in for whole lines and must be newline-terminated (or
    /// empty, which removes the lines).
    pub fn splice(&mut self, construct_idx: usize, text: String) {
        for seg in &mut self.segments {
            if seg.kind == SegmentKind::Construct(construct_idx) {
                seg.text = text;
                return;
            }
        }
    }

    /// Visit every text segment for in-place rewriting.
    pub fn text_segments_mut(&mut self) -> impl Iterator<Item = (Span, &mut String)> {
        self.segments
            .iter_mut()
            .filter(|s| s.kind == SegmentKind::Text)
            .map(|s| (s.span, &mut s.text))
    }

    /// Final print: user segments in order, then the injected block.
    pub fn render(&self, injected: &str) -> String {
        let mut out = String::with_capacity(self.source.len() + injected.len() + 2);
        for seg in &self.segments {
            out.push_str(&seg.text);
        }
        if !injected.is_empty() {
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out.push('\n');
            out.push_str(injected);
            if !out.ends_with('\n') {
                out.push('\n');
            }
        }
        out
    }
}
