//! # Equation Extractor
//!
//! Document text to ordered equation occurrences.
//!
//! A cursor-driven state machine recognizes the four math-region
//! conventions:
//!
//! - `$$ … $$`   block, may span lines
//! - `\[ … \]`   block, may span lines
//! - `$ … $`     inline, single line
//! - `\( … \)`   inline, single line
//!
//! The machine tracks the nearest preceding section heading (Markdown
//! `#`-style or single-line HTML `<h1>`–`<h6>`) and attaches it to each
//! occurrence. Malformed regions produce `ExtractionWarning`s and the scan
//! resumes at the next recognizable boundary: one broken equation never
//! costs the rest of the document.
//!
//! Extraction is a pure function of the input text, so byte-identical
//! input yields byte-identical occurrence lists.

use crate::normalizer::normalize;
use crate::primitives::MAX_DOCUMENT_OCCURRENCES;
use crate::types::{EquationKind, EquationOccurrence, ExtractionWarning};

// =============================================================================
// OUTCOME
// =============================================================================

/// Everything one extraction pass produced for one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionOutcome {
    /// Occurrences in document order, ordinals dense from zero.
    pub occurrences: Vec<EquationOccurrence>,
    /// Recoverable problems, in discovery order.
    pub warnings: Vec<ExtractionWarning>,
}

// =============================================================================
// SCANNER
// =============================================================================

struct Scanner<'a> {
    document_id: &'a str,
    text: &'a str,
    /// Byte offset of the cursor; always on a char boundary.
    pos: usize,
    /// 1-based line of the cursor.
    line: usize,
    section: String,
    ordinal: usize,
    outcome: ExtractionOutcome,
}

impl<'a> Scanner<'a> {
    fn new(document_id: &'a str, text: &'a str) -> Self {
        Self {
            document_id,
            text,
            pos: 0,
            line: 1,
            section: String::new(),
            ordinal: 0,
            outcome: ExtractionOutcome::default(),
        }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn at_line_start(&self) -> bool {
        self.pos == 0 || self.text.as_bytes()[self.pos - 1] == b'\n'
    }

    /// Advance the cursor over `n` bytes, counting newlines.
    fn advance(&mut self, n: usize) {
        let end = self.pos + n;
        self.line += self.text[self.pos..end].matches('\n').count();
        self.pos = end;
    }

    fn warn(&mut self, line: usize, reason: impl Into<String>) {
        self.outcome.warnings.push(ExtractionWarning {
            document_id: self.document_id.to_string(),
            line,
            section_id: self.section.clone(),
            reason: reason.into(),
        });
    }

    fn emit(&mut self, start: usize, end: usize, kind: EquationKind, line: usize) {
        let raw = &self.text[start..end];
        let body = &self.text[start + opener_len(raw)..end - closer_len(raw)];
        if body.trim().is_empty() {
            self.warn(line, "empty math region");
            return;
        }
        let normalized = normalize(raw);
        self.outcome.occurrences.push(EquationOccurrence {
            document_id: self.document_id.to_string(),
            section_id: self.section.clone(),
            ordinal: self.ordinal,
            line,
            raw_text: raw.to_string(),
            kind,
            normalized_text: normalized,
            matched_formula_id: None,
        });
        self.ordinal += 1;
    }

    /// Consume a heading line if the cursor sits on one.
    fn try_heading(&mut self) -> bool {
        if !self.at_line_start() {
            return false;
        }
        let line_end = self
            .rest()
            .find('\n')
            .map(|i| self.pos + i)
            .unwrap_or(self.text.len());
        let line_text = &self.text[self.pos..line_end];

        if let Some(heading) = parse_heading(line_text) {
            self.section = heading;
            // consume the line and its newline, if present
            let n = line_end - self.pos + usize::from(line_end < self.text.len());
            self.advance(n);
            return true;
        }
        false
    }

    /// Scan for a closing token; block regions may cross lines, inline
    /// regions must close before the next newline.
    fn find_close(&self, body_start: usize, close: &str, inline: bool) -> Option<usize> {
        let haystack = &self.text[body_start..];
        let mut offset = 0;
        while let Some(found) = haystack[offset..].find(close) {
            let absolute = offset + found;
            // an escaped dollar is literal text, not a boundary
            if close == "$" && haystack[..absolute].ends_with('\\') {
                offset = absolute + 1;
                continue;
            }
            if inline && haystack[..absolute].contains('\n') {
                return None;
            }
            return Some(body_start + absolute);
        }
        None
    }

    /// Recognize and consume one math region at the cursor. Returns false
    /// if the cursor is not on an opener.
    fn try_region(&mut self) -> bool {
        let rest = self.rest();
        let (open, close, kind, inline) = if rest.starts_with("$$") {
            ("$$", "$$", EquationKind::Display, false)
        } else if rest.starts_with("\\[") {
            ("\\[", "\\]", EquationKind::Display, false)
        } else if rest.starts_with("\\(") {
            ("\\(", "\\)", EquationKind::Inline, true)
        } else if rest.starts_with('$') {
            ("$", "$", EquationKind::Inline, true)
        } else {
            return false;
        };

        let open_line = self.line;
        let body_start = self.pos + open.len();
        match self.find_close(body_start, close, inline) {
            Some(close_start) => {
                let end = close_start + close.len();
                let start = self.pos;
                self.advance(end - self.pos);
                self.emit(start, end, kind, open_line);
            }
            None => {
                // skip just the opener; the rest of the document may hold
                // further well-formed regions
                self.warn(
                    open_line,
                    format!("unterminated '{open}' math region"),
                );
                self.advance(open.len());
            }
        }
        true
    }

    fn run(mut self) -> ExtractionOutcome {
        while self.pos < self.text.len() {
            if self.try_heading() {
                continue;
            }
            if self.outcome.occurrences.len() >= MAX_DOCUMENT_OCCURRENCES {
                self.warn(self.line, "occurrence limit reached; document truncated");
                break;
            }

            let rest = self.rest();
            if rest.starts_with("\\$") {
                // escaped dollar is literal prose
                self.advance(2);
                continue;
            }
            if rest.starts_with("\\]") || rest.starts_with("\\)") {
                self.warn(self.line, "unmatched closing math delimiter");
                self.advance(2);
                continue;
            }
            if self.try_region() {
                continue;
            }

            // plain text: advance one char
            let step = rest.chars().next().map(char::len_utf8).unwrap_or(1);
            self.advance(step);
        }
        self.outcome
    }
}

/// Length of the opening delimiter of a raw region.
fn opener_len(raw: &str) -> usize {
    if raw.starts_with("$$") || raw.starts_with("\\[") || raw.starts_with("\\(") {
        2
    } else {
        1
    }
}

/// Length of the closing delimiter of a raw region.
fn closer_len(raw: &str) -> usize {
    if raw.ends_with("\\]") || raw.ends_with("\\)") {
        2
    } else if raw.ends_with("$$") && raw.len() >= 4 {
        2
    } else {
        1
    }
}

/// Parse a Markdown or single-line HTML heading; returns its text.
fn parse_heading(line: &str) -> Option<String> {
    let trimmed = line.trim();

    // Markdown: 1-6 leading '#' followed by a space.
    let hashes = trimmed.bytes().take_while(|b| *b == b'#').count();
    if (1..=6).contains(&hashes) {
        let rest = &trimmed[hashes..];
        if let Some(text) = rest.strip_prefix(' ') {
            let text = text.trim().trim_end_matches('#').trim();
            if !text.is_empty() {
                return Some(text.to_string());
            }
        }
    }

    // HTML: <hN ...>text</hN> on one line.
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("<h") {
        let level = lower.as_bytes().get(2).copied()?;
        if level.is_ascii_digit() && (b'1'..=b'6').contains(&level) {
            let tag_end = trimmed.find('>')?;
            let close = lower.find("</h")?;
            if close > tag_end {
                let text = trimmed[tag_end + 1..close].trim();
                if !text.is_empty() {
                    return Some(text.to_string());
                }
            }
        }
    }

    None
}

// =============================================================================
// EXTRACTION
// =============================================================================

/// Extract every math region of one document.
///
/// Pure: no I/O, no shared state; safe to run on corpus documents from
/// independent worker threads.
#[must_use]
pub fn extract_document(document_id: &str, text: &str) -> ExtractionOutcome {
    Scanner::new(document_id, text).run()
}

// =============================================================================
// TESTS
// =============================================================================
