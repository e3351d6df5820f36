//! # Normalizer Module
//!
//! Canonical comparison strings for equation text.
//!
//! Both sides of the reconciliation pass through `normalize`: the store's
//! display variants when the display index is built, and each extracted
//! occurrence's raw text before lookup. The rules are purely textual —
//! there is no notion of algebraic equivalence.
//!
//! Rules, applied in fixed order:
//! 1. Strip the delimiter markers (`$$ … $$`, `\[ … \]`, `$ … $`, `\( … \)`)
//! 2. Collapse all whitespace runs (including newlines) to one space, trim
//! 3. Unify macro spellings that render identically via a fixed table,
//!    re-collapsing any whitespace the substitutions disturb
//! 4. Strip trailing prose punctuation (periods, commas)
//!
//! Case is never folded: `M` and `m` denote different quantities.
//! `normalize` is idempotent; the property suite verifies this.

// =============================================================================
// SUBSTITUTION TABLE
// =============================================================================

/// Macro spellings that render identically, mapped to one canonical token.
///
/// Entries are applied as plain substring replacements in table order, so
/// longer spellings of the same prefix must come first.
pub const SUBSTITUTIONS: &[(&str, &str)] = &[
    // fraction variants render the same glyphs
    ("\\dfrac", "\\frac"),
    ("\\tfrac", "\\frac"),
    // auto-sized delimiters collapse to the bare delimiter
    ("\\left(", "("),
    ("\\right)", ")"),
    ("\\left[", "["),
    ("\\right]", "]"),
    ("\\left\\{", "\\{"),
    ("\\right\\}", "\\}"),
    ("\\left|", "|"),
    ("\\right|", "|"),
    // spacing macros only tune kerning
    ("\\,", " "),
    ("\\;", " "),
    ("\\:", " "),
    ("\\!", ""),
    ("\\limits", ""),
];

/// Delimiter pairs recognized by rule 1, longest opener first.
const DELIMITER_PAIRS: &[(&str, &str)] = &[
    ("$$", "$$"),
    ("\\[", "\\]"),
    ("\\(", "\\)"),
    ("$", "$"),
];

// =============================================================================
// NORMALIZATION
// =============================================================================

/// Map raw equation text to its canonical comparison string.
///
/// The rule pass runs to a fixpoint: stripping trailing prose punctuation
/// can expose a delimiter pair (`$x$.`), so a single pass is not enough to
/// guarantee idempotence. Every changing pass strictly shrinks the text,
/// so the loop is bounded.
#[must_use]
pub fn normalize(raw: &str) -> String {
    let mut current = raw.trim().to_string();
    loop {
        let next = normalize_pass(&current);
        if next == current {
            return next;
        }
        current = next;
    }
}

/// One ordered application of the four normalization rules.
fn normalize_pass(text: &str) -> String {
    let stripped = strip_delimiters(text);
    let collapsed = collapse_whitespace(stripped);
    let substituted = apply_substitutions(&collapsed);
    // substitutions may merge adjacent spaces or drop a spacing macro
    // between two spaces, so the run-collapse is re-applied
    let recollapsed = collapse_whitespace(&substituted);
    strip_trailing_punctuation(&recollapsed)
}

/// Remove one matching delimiter pair from the ends of the text.
fn strip_delimiters(text: &str) -> &str {
    for (open, close) in DELIMITER_PAIRS {
        let min_len = open.len() + close.len();
        if text.len() >= min_len && text.starts_with(open) && text.ends_with(close) {
            return &text[open.len()..text.len() - close.len()];
        }
    }
    text
}

/// Collapse every whitespace run (including newlines) to a single space.
fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_run = false;
    for ch in text.trim().chars() {
        if ch.is_whitespace() {
            if !in_run {
                out.push(' ');
                in_run = true;
            }
        } else {
            out.push(ch);
            in_run = false;
        }
    }
    out
}

/// Apply the fixed substitution table as plain substring replacements.
fn apply_substitutions(text: &str) -> String {
    let mut out = text.to_string();
    for (from, to) in SUBSTITUTIONS {
        if out.contains(from) {
            out = out.replace(from, to);
        }
    }
    out
}

/// Drop trailing periods and commas introduced by prose context, together
/// with any whitespace they leave behind.
fn strip_trailing_punctuation(text: &str) -> String {
    text.trim_end_matches(|c: char| c == '.' || c == ',' || c.is_whitespace())
        .to_string()
}

// =============================================================================
// TESTS
// =============================================================================
