//! Text fitting: normalise a cell value and squeeze it into a slide text block.
//!
//! Spreadsheet cells arrive with Windows line endings, pasted zero-width
//! characters, stray control bytes, and the occasional essay-length answer.
//! Every rule here is a pure `&str → String` pass, so the same cell always
//! renders to the same slide text. Overflow is never an error: text past the
//! block's [`TextCapacity`] is cut and marked with an ellipsis.
//!
//! ## Rule Order
//!
//! Normalisation runs before measuring so that invisible characters and
//! trailing blanks never count against the budget. Line truncation runs before
//! character truncation so the ellipsis always lands on the last visible line.

use crate::config::TextCapacity;
use once_cell::sync::Lazy;
use regex::Regex;

/// Appended to truncated text.
pub const ELLIPSIS: char = '\u{2026}';

/// How far back from the cut point to look for a word boundary.
const WORD_BOUNDARY_WINDOW: usize = 16;

/// Text ready to place in a slide block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FittedText {
    pub text: String,
    pub truncated: bool,
}

/// Normalise `raw` and truncate it to `capacity`.
///
/// 1. Normalise line endings (CRLF / CR → LF)
/// 2. Strip invisible Unicode and XML-illegal control characters
/// 3. Trim trailing whitespace per line, collapse runs of blank lines
/// 4. Trim the whole text
/// 5. Keep at most `max_lines` lines
/// 6. Keep at most `max_chars` characters, preferring a word boundary
/// 7. Append `…` when anything was cut
pub fn fit_text(raw: &str, capacity: TextCapacity) -> FittedText {
    let s = normalise(raw);
    let (s, cut_lines) = limit_lines(&s, capacity.max_lines);
    let (s, cut_chars) = limit_chars(&s, capacity.max_chars);
    let truncated = cut_lines || cut_chars;

    if !truncated {
        return FittedText {
            text: s,
            truncated,
        };
    }

    let mut text = s.trim_end().to_string();
    // A cut by lines alone may leave a last line already at the char limit.
    if text.chars().count() + 1 > capacity.max_chars {
        let (shorter, _) = hard_cut(&text, capacity.max_chars.saturating_sub(1));
        text = shorter.trim_end().to_string();
    }
    text.push(ELLIPSIS);

    FittedText { text, truncated }
}

/// Apply the normalisation rules only (no truncation).
pub fn normalise(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    let s = remove_control_chars(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    s.trim().to_string()
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Strip invisible and illegal characters ──────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

/// XML 1.0 forbids C0 controls other than tab, LF and CR. A single stray
/// `\u{0B}` from a sheet cell would make the slide part unreadable.
fn remove_control_chars(input: &str) -> String {
    input
        .chars()
        .filter(|&c| c == '\n' || c == '\t' || !(c.is_control() && (c as u32) < 0x20))
        .filter(|&c| c != '\u{FFFE}' && c != '\u{FFFF}')
        .collect()
}

// ── Rule 3: Trim trailing whitespace, collapse blank runs ───────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

// ── Rule 5: Line budget ──────────────────────────────────────────────────────

fn limit_lines(input: &str, max_lines: usize) -> (String, bool) {
    let max_lines = max_lines.max(1);
    if input.lines().count() <= max_lines {
        return (input.to_string(), false);
    }
    let kept = input.lines().take(max_lines).collect::<Vec<_>>().join("\n");
    (kept, true)
}

// ── Rule 6: Character budget ─────────────────────────────────────────────────

fn limit_chars(input: &str, max_chars: usize) -> (String, bool) {
    if input.chars().count() <= max_chars {
        return (input.to_string(), false);
    }
    // Reserve one slot for the ellipsis.
    let keep = max_chars.saturating_sub(1);
    let (cut, _) = hard_cut(input, keep);
    let splits_word = input.chars().nth(keep).is_some_and(|c| !c.is_whitespace())
        && cut.chars().last().is_some_and(|c| !c.is_whitespace());
    if splits_word {
        (back_off_to_boundary(&cut), true)
    } else {
        (cut, true)
    }
}

/// First `n` characters of `input`, and whether anything was dropped.
fn hard_cut(input: &str, n: usize) -> (String, bool) {
    match input.char_indices().nth(n) {
        Some((byte_idx, _)) => (input[..byte_idx].to_string(), true),
        None => (input.to_string(), false),
    }
}

/// Cut back to the last whitespace if it sits within the final
/// [`WORD_BOUNDARY_WINDOW`] characters, so words are not split mid-way.
fn back_off_to_boundary(cut: &str) -> String {
    let total = cut.chars().count();
    let window_start = total.saturating_sub(WORD_BOUNDARY_WINDOW);
    let boundary = cut
        .char_indices()
        .enumerate()
        .filter(|(i, (_, c))| *i >= window_start && c.is_whitespace())
        .map(|(_, (byte_idx, _))| byte_idx)
        .last();

    match boundary {
        Some(byte_idx) if byte_idx > 0 => cut[..byte_idx].to_string(),
        _ => cut.to_string(),
    }
}
