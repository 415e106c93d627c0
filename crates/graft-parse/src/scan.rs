//! Syntax-aware scanning over host source text.
//!
//! The extractor never parses the host language; it only needs to know,
//! for every character, whether it is *code* or part of a string literal,
//! rune literal, or comment, and what the delimiter depth is. Everything
//! in this module is built on [`CodeScanner`], a state machine that walks
//! the text once and flags each character accordingly. Depth tracking,
//! top-level splitting, and word search all ignore non-code characters,
//! which is what keeps `match` inside a string literal from ever being
//! treated as a keyword.

use std::iter::Peekable;
use std::ops::Range;
use std::str::CharIndices;

// ── Character classes ──────────────────────────────────────────────────

/// Whether a character can start a host identifier.
pub fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

/// Whether a character can continue a host identifier.
pub fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Whether the whole text is a single host identifier.
pub fn is_ident(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if is_ident_start(c) => chars.all(is_ident_continue),
        _ => false,
    }
}

/// Whether the text is a dotted selector path (`a`, `a.b`, `a.b.c`).
///
/// Selector paths are the only argument shapes that are stable storage
/// locations, i.e. the only things the rewriter may take an address of
/// directly.
pub fn is_selector_path(text: &str) -> bool {
    !text.is_empty() && text.split('.').all(is_ident)
}

// ── Code scanner ───────────────────────────────────────────────────────

/// One scanned character: its byte position, the character itself, and
/// whether it is code (as opposed to string/rune/comment interior).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScannedChar {
    pub pos: u32,
    pub ch: char,
    pub is_code: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    LineComment,
    BlockComment,
    Str,
    RawStr,
    CharLit,
}

/// State machine over host text that classifies every character as code
/// or literal/comment interior.
///
/// Host literal syntax is Go-shaped: `//` line comments, `/* */` block
/// comments (non-nesting), `"..."` strings with backslash escapes,
/// backtick raw strings (no escapes, may span lines), and `'...'` rune
/// literals. A newline inside an interpreted string or rune literal ends
/// the literal, so one stray quote cannot swallow the rest of the file.
/// Newlines that end a line comment are emitted as code, because they
/// still terminate the statement.
pub struct CodeScanner<'src> {
    iter: Peekable<CharIndices<'src>>,
    state: State,
    pending: Option<ScannedChar>,
}

/// Scan `text`, yielding every character with its code/non-code flag.
pub fn code_chars(text: &str) -> CodeScanner<'_> {
    CodeScanner {
        iter: text.char_indices().peekable(),
        state: State::Normal,
        pending: None,
    }
}

impl<'src> CodeScanner<'src> {
    fn emit(pos: usize, ch: char, is_code: bool) -> ScannedChar {
        ScannedChar {
            pos: pos as u32,
            ch,
            is_code,
        }
    }

    /// Consume the next raw character and stash it as a pending non-code
    /// emission. Used for two-character tokens (`//`, `/*`, `*/`) and
    /// string escapes, so both halves come out of the iterator.
    fn defer(&mut self) {
        if let Some((i, c)) = self.iter.next() {
            self.pending = Some(Self::emit(i, c, false));
        }
    }
}

impl<'src> Iterator for CodeScanner<'src> {
    type Item = ScannedChar;

    fn next(&mut self) -> Option<ScannedChar> {
        if let Some(p) = self.pending.take() {
            return Some(p);
        }
        let (i, c) = self.iter.next()?;
        match self.state {
            State::Normal => match c {
                '/' if self.iter.peek().map(|&(_, n)| n) == Some('/') => {
                    self.state = State::LineComment;
                    self.defer();
                    Some(Self::emit(i, c, false))
                }
                '/' if self.iter.peek().map(|&(_, n)| n) == Some('*') => {
                    self.state = State::BlockComment;
                    self.defer();
                    Some(Self::emit(i, c, false))
                }
                '"' => {
                    self.state = State::Str;
                    Some(Self::emit(i, c, false))
                }
                '`' => {
                    self.state = State::RawStr;
                    Some(Self::emit(i, c, false))
                }
                '\'' => {
                    self.state = State::CharLit;
                    Some(Self::emit(i, c, false))
                }
                _ => Some(Self::emit(i, c, true)),
            },
            State::LineComment => {
                if c == '\n' {
                    self.state = State::Normal;
                    Some(Self::emit(i, c, true))
                } else {
                    Some(Self::emit(i, c, false))
                }
            }
            State::BlockComment => {
                if c == '*' && self.iter.peek().map(|&(_, n)| n) == Some('/') {
                    self.state = State::Normal;
                    self.defer();
                }
                Some(Self::emit(i, c, false))
            }
            State::Str | State::CharLit => {
                let quote = if self.state == State::Str { '"' } else { '\'' };
                match c {
                    '\\' => {
                        self.defer();
                        Some(Self::emit(i, c, false))
                    }
                    '\n' => {
                        // Unterminated literal; resync at the line break.
                        self.state = State::Normal;
                        Some(Self::emit(i, c, true))
                    }
                    _ => {
                        if c == quote {
                            self.state = State::Normal;
                        }
                        Some(Self::emit(i, c, false))
                    }
                }
            }
            State::RawStr => {
                if c == '`' {
                    self.state = State::Normal;
                }
                Some(Self::emit(i, c, false))
            }
        }
    }
}

// ── Depth-aware helpers ────────────────────────────────────────────────

/// Byte positions of every occurrence of `sep` at delimiter depth zero,
/// outside strings and comments. `sep` must be non-empty ASCII.
pub fn top_level_positions(text: &str, sep: &str) -> Vec<usize> {
    debug_assert!(!sep.is_empty() && sep.is_ascii());
    let chars: Vec<ScannedChar> = code_chars(text).collect();
    let sep_chars: Vec<char> = sep.chars().collect();
    let mut out = Vec::new();
    let mut depth = 0i32;
    let mut i = 0;
    while i < chars.len() {
        let sc = chars[i];
        if !sc.is_code {
            i += 1;
            continue;
        }
        match sc.ch {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = (depth - 1).max(0),
            _ => {
                if depth == 0 && matches_at(&chars, i, &sep_chars) {
                    out.push(sc.pos as usize);
                    i += sep_chars.len();
                    continue;
                }
            }
        }
        i += 1;
    }
    out
}

/// Whether the scanned characters starting at `i` spell `sep` as
/// byte-contiguous code.
fn matches_at(chars: &[ScannedChar], i: usize, sep: &[char]) -> bool {
    if i + sep.len() > chars.len() {
        return false;
    }
    let base = chars[i].pos;
    sep.iter().enumerate().all(|(k, &want)| {
        let sc = chars[i + k];
        sc.is_code && sc.ch == want && sc.pos == base + k as u32
    })
}

/// Split `text` into the byte ranges between top-level occurrences of
/// `sep`. Always returns at least one range (the whole text when `sep`
/// never occurs at the top level).
pub fn split_ranges(text: &str, sep: &str) -> Vec<Range<usize>> {
    let mut out = Vec::new();
    let mut start = 0;
    for pos in top_level_positions(text, sep) {
        out.push(start..pos);
        start = pos + sep.len();
    }
    out.push(start..text.len());
    out
}

/// Split `text` on top-level occurrences of `sep`, returning slices.
pub fn split_top_level<'a>(text: &'a str, sep: &str) -> Vec<&'a str> {
    split_ranges(text, sep)
        .into_iter()
        .map(|r| &text[r])
        .collect()
}

/// Byte position of the last top-level comma, if any.
pub fn last_top_level_comma(text: &str) -> Option<usize> {
    top_level_positions(text, ",").last().copied()
}

/// First top-level, identifier-bounded occurrence of `word`.
pub fn find_top_level_word(text: &str, word: &str) -> Option<usize> {
    for pos in top_level_positions(text, word) {
        let before_ok = text[..pos]
            .chars()
            .next_back()
            .map_or(true, |c| !is_ident_continue(c));
        let after_ok = text[pos + word.len()..]
            .chars()
            .next()
            .map_or(true, |c| !is_ident_continue(c));
        if before_ok && after_ok {
            return Some(pos);
        }
    }
    None
}

/// Given the byte position of an opening `(`, `[`, or `{` in `text`,
/// return the byte position of its matching closer, honouring strings
/// and comments. `None` if the delimiter never closes.
pub fn matching_delim(text: &str, open_pos: usize) -> Option<usize> {
    let open = text[open_pos..].chars().next()?;
    let close = match open {
        '(' => ')',
        '[' => ']',
        '{' => '}',
        _ => return None,
    };
    let mut depth = 0i32;
    for sc in code_chars(text) {
        if (sc.pos as usize) < open_pos || !sc.is_code {
            continue;
        }
        if sc.ch == open {
            depth += 1;
        } else if sc.ch == close {
            depth -= 1;
            if depth == 0 {
                return Some(sc.pos as usize);
            }
        }
    }
    None
}
