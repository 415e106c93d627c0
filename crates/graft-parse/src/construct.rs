//! Locating `enum` and `match` constructs in host source.
//!
//! The extractor walks the unit once with the code scanner, looking for
//! the two keywords at statement-start positions. For each hit it slices
//! the exact byte span of the construct: keyword, header (enum name or
//! scrutinee), brace-delimited body, and the text before and after on
//! the boundary lines. Delimiters inside strings, rune literals, and
//! comments never count toward depth, and keyword occurrences inside
//! them are never construct starts.
//!
//! A construct whose body never closes is a fatal [`ExtractError`]; the
//! extractor never guesses a truncated or over-extended span.

use graft_common::span::Span;

use crate::error::{codes, ExtractError};
use crate::scan::{code_chars, is_ident_continue, is_ident_start, ScannedChar};

/// Which construct a raw extraction is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstructKind {
    Enum,
    Match,
}

impl ConstructKind {
    fn keyword(self) -> &'static str {
        match self {
            ConstructKind::Enum => "enum",
            ConstructKind::Match => "match",
        }
    }
}

/// Where a match construct sits relative to the host statement around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchContext {
    /// The construct is the whole statement; arms run for effect.
    Statement,
    /// The construct produces a value (`x := match ...`, `return match ...`).
    Expression,
}

/// One extracted construct, still as raw text.
#[derive(Debug, Clone, PartialEq)]
pub struct RawConstruct {
    pub kind: ConstructKind,
    /// Span of the keyword itself.
    pub keyword_span: Span,
    /// Keyword through closing brace.
    pub span: Span,
    /// The whole-lines region the splice replaces: start of the keyword's
    /// line through the end of the closing brace's line, newline included.
    pub cut: Span,
    /// Raw text on the keyword's line before the keyword.
    pub prefix: String,
    /// Trimmed text between the keyword and the opening brace.
    pub header: String,
    pub header_span: Span,
    /// Interior text between the braces, exclusive.
    pub body: String,
    pub body_span: Span,
    /// Raw text after the closing brace up to the end of that line.
    pub suffix: String,
}

impl RawConstruct {
    /// Statement or expression position, judged from the prefix text.
    pub fn context(&self) -> MatchContext {
        if self.prefix.trim().is_empty() {
            MatchContext::Statement
        } else {
            MatchContext::Expression
        }
    }

    /// Leading whitespace of the construct's first line, for indenting
    /// spliced output.
    pub fn indent(&self) -> &str {
        let end = self
            .prefix
            .char_indices()
            .find(|&(_, c)| c != ' ' && c != '\t')
            .map_or(self.prefix.len(), |(i, _)| i);
        &self.prefix[..end]
    }
}

/// Find every top-level construct in the unit, in source order.
///
/// Constructs nested inside another construct's body are not returned
/// here; match lowering re-runs extraction on arm bodies and handles
/// them recursively.
pub fn find_constructs(source: &str) -> Result<Vec<RawConstruct>, ExtractError> {
    let scanned: Vec<ScannedChar> = code_chars(source).collect();
    let mut out = Vec::new();

    // Code text accumulated since the last statement boundary, comments
    // and literals elided. This is what the statement-start check reads.
    let mut code_prefix = String::new();
    let mut line_start = 0usize;

    let mut i = 0;
    while i < scanned.len() {
        let sc = scanned[i];
        if sc.ch == '\n' {
            line_start = sc.pos as usize + 1;
        }
        if !sc.is_code {
            i += 1;
            continue;
        }
        match sc.ch {
            '\n' | ';' | '{' | '}' => {
                code_prefix.clear();
                i += 1;
            }
            c if is_ident_start(c) => {
                let word_end = word_end(&scanned, i);
                let word: String = scanned[i..word_end].iter().map(|s| s.ch).collect();
                let kind = match word.as_str() {
                    "match" => Some(ConstructKind::Match),
                    "enum" => Some(ConstructKind::Enum),
                    _ => None,
                };
                if let Some(kind) = kind {
                    if starts_statement(&code_prefix) {
                        let construct =
                            extract_at(source, &scanned, i, word_end, kind, line_start)?;
                        let resume = construct.cut.end as usize;
                        out.push(construct);
                        while i < scanned.len() && (scanned[i].pos as usize) < resume {
                            i += 1;
                        }
                        code_prefix.clear();
                        line_start = resume;
                        continue;
                    }
                }
                code_prefix.push_str(&word);
                i = word_end;
            }
            c => {
                code_prefix.push(c);
                i += 1;
            }
        }
    }
    Ok(out)
}

/// Whether a keyword preceded by `prefix` (code text since the last
/// statement boundary) starts a construct: the prefix is blank, or it
/// ends with `=`/`:=` (but not a comparison operator), or its last word
/// is `return`.
fn starts_statement(prefix: &str) -> bool {
    let t = prefix.trim_end();
    if t.is_empty() {
        return true;
    }
    if let Some(stripped) = t.strip_suffix('=') {
        return !matches!(stripped.chars().next_back(), Some('=' | '!' | '<' | '>'));
    }
    if let Some(stripped) = t.strip_suffix("return") {
        return stripped
            .chars()
            .next_back()
            .map_or(true, |c| !is_ident_continue(c));
    }
    false
}

/// Length of the identifier word starting at scanned index `i`, as an
/// exclusive scanned index. Non-code characters end the word.
fn word_end(scanned: &[ScannedChar], i: usize) -> usize {
    let mut j = i;
    let mut next_pos = scanned[i].pos;
    while j < scanned.len() {
        let sc = scanned[j];
        if !sc.is_code || !is_ident_continue(sc.ch) || sc.pos != next_pos {
            break;
        }
        next_pos = sc.pos + sc.ch.len_utf8() as u32;
        j += 1;
    }
    j
}

/// Slice the construct whose keyword starts at scanned index `kw_idx`.
fn extract_at(
    source: &str,
    scanned: &[ScannedChar],
    kw_idx: usize,
    kw_end_idx: usize,
    kind: ConstructKind,
    line_start: usize,
) -> Result<RawConstruct, ExtractError> {
    let kw_pos = scanned[kw_idx].pos;
    let kw_end = kw_pos + kind.keyword().len() as u32;
    let keyword_span = Span::new(kw_pos, kw_end);

    // First `{` at paren/bracket depth zero opens the body. Composite
    // literals in the scrutinee must be parenthesized, the host's own
    // statement-head rule.
    let mut depth = 0i32;
    let mut open_idx = None;
    for (j, sc) in scanned.iter().enumerate().skip(kw_end_idx) {
        if !sc.is_code {
            continue;
        }
        match sc.ch {
            '(' | '[' => depth += 1,
            ')' | ']' => depth -= 1,
            '{' if depth == 0 => {
                open_idx = Some(j);
                break;
            }
            _ => {}
        }
    }
    let open_idx = open_idx.ok_or_else(|| {
        ExtractError::new(
            codes::MISSING_BODY,
            format!("expected `{{` to open the {} body", kind.keyword()),
            keyword_span,
        )
    })?;
    let open_pos = scanned[open_idx].pos;

    // Brace depth from the construct's own `{` back down to zero.
    let mut close_idx = None;
    let mut brace_depth = 0i32;
    for (j, sc) in scanned.iter().enumerate().skip(open_idx) {
        if !sc.is_code {
            continue;
        }
        match sc.ch {
            '{' => brace_depth += 1,
            '}' => {
                brace_depth -= 1;
                if brace_depth == 0 {
                    close_idx = Some(j);
                    break;
                }
            }
            _ => {}
        }
    }
    let close_idx = close_idx.ok_or_else(|| {
        ExtractError::with_related(
            codes::UNTERMINATED,
            format!("unterminated {} construct", kind.keyword()),
            Span::point(source.len() as u32),
            format!("{} opened here", kind.keyword()),
            keyword_span,
        )
    })?;
    let close_pos = scanned[close_idx].pos;

    // Boundary-line slices around the construct proper.
    let eol = source[close_pos as usize..]
        .find('\n')
        .map(|n| close_pos as usize + n);
    let (suffix_end, cut_end) = match eol {
        Some(n) => (n, n + 1),
        None => (source.len(), source.len()),
    };

    let header_raw = &source[kw_end as usize..open_pos as usize];
    let lead = header_raw.len() - header_raw.trim_start().len();
    let header = header_raw.trim().to_string();
    let header_start = kw_end + lead as u32;
    let header_span = Span::new(header_start, header_start + header.len() as u32);

    Ok(RawConstruct {
        kind,
        keyword_span,
        span: Span::new(kw_pos, close_pos + 1),
        cut: Span::new(line_start as u32, cut_end as u32),
        prefix: source[line_start..kw_pos as usize].to_string(),
        header,
        header_span,
        body: source[open_pos as usize + 1..close_pos as usize].to_string(),
        body_span: Span::new(open_pos + 1, close_pos),
        suffix: source[close_pos as usize + 1..suffix_end].to_string(),
    })
}
