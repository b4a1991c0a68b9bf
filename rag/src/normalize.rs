//! Page-text normalization applied before chunking.
//!
//! Raw text extracted from PDF pages carries ligatures, broken hyphenation,
//! ragged whitespace and table layouts that confuse sentence segmentation.
//! [`normalize`] repairs all of that as a pure computation; it never fails.

use std::sync::LazyLock;

use regex::Regex;

/// Sentinel opening a table region that must not be re-wrapped.
pub const TABLE_BEGIN: &str = "[TABLE_BEGIN]";
/// Sentinel closing a table region.
pub const TABLE_END: &str = "[TABLE_END]";

/// Options controlling which normalization passes run.
#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    /// Mark table regions with [`TABLE_BEGIN`]/[`TABLE_END`] sentinels and
    /// exempt them from whitespace collapsing.
    pub preserve_tables: bool,
    /// Trim lines, collapse space runs and excess blank lines.
    pub normalize_whitespace: bool,
    /// Keep paragraph separators and sentinels on their own blank-line
    /// delimited blocks.
    pub detect_paragraphs: bool,
    /// Insert `--- Sayfa i/N ---` markers between pages (only meaningful
    /// through [`normalize_pages`]).
    pub include_page_markers: bool,
    /// Stitch `word-\nbreak` hyphenation at line ends.
    pub remove_hyphenation: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            preserve_tables: true,
            normalize_whitespace: true,
            detect_paragraphs: true,
            include_page_markers: true,
            remove_hyphenation: true,
        }
    }
}

/// Ligatures and common extraction artifacts, fixed before anything else.
const COMMON_FIXES: &[(&str, &str)] = &[
    ("\u{fb01}", "fi"),
    ("\u{fb02}", "fl"),
    ("\u{fb00}", "ff"),
    ("\u{fb03}", "ffi"),
    ("\u{fb04}", "ffl"),
    ("\u{2026}", "..."),
];

static SPACE_BEFORE_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+([,.;:!?])").expect("static regex"));

static HYPHEN_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\w)-\n(\p{Ll})").expect("static regex"));

static EXCESS_NEWLINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("static regex"));

static INNER_SPACES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]{2,}").expect("static regex"));

/// Normalizes one block of raw page text.
///
/// Passes run in a fixed order: artifact fixes, table marking, whitespace
/// normalization (skipped inside marked tables), hyphenation stitching, and
/// paragraph-boundary cleanup.
#[must_use]
pub fn normalize(raw: &str, opts: &NormalizeOptions) -> String {
    let mut text = apply_common_fixes(raw);

    if opts.preserve_tables {
        text = mark_tables(&text);
    }

    if opts.normalize_whitespace {
        text = normalize_whitespace_outside_tables(&text);
    }

    if opts.remove_hyphenation {
        text = HYPHEN_BREAK.replace_all(&text, "$1$2").into_owned();
    }

    if opts.detect_paragraphs {
        text = isolate_sentinels(&text);
    }

    text.trim().to_string()
}

/// Normalizes a sequence of pages and joins them, optionally interleaving
/// page markers so downstream chunking can track page transitions.
#[must_use]
pub fn normalize_pages(pages: &[(u32, String)], opts: &NormalizeOptions) -> String {
    let total = pages.len();
    let mut out = String::new();

    for (page_number, raw) in pages {
        let cleaned = normalize(raw, opts);
        if opts.include_page_markers {
            out.push_str(&page_marker_line(*page_number, total));
        } else if !out.is_empty() {
            out.push_str("\n\n");
        }
        out.push_str(&cleaned);
    }

    out.trim().to_string()
}

/// The page marker recognized by the chunker's paragraph scanner.
pub(crate) fn page_marker_line(page: u32, total: usize) -> String {
    format!("\n--- Sayfa {page}/{total} ---\n")
}

fn apply_common_fixes(raw: &str) -> String {
    let mut text = raw.replace("\r\n", "\n").replace('\r', "\n");
    for (from, to) in COMMON_FIXES {
        text = text.replace(from, to);
    }
    SPACE_BEFORE_PUNCT.replace_all(&text, "$1").into_owned()
}

/// Returns `true` if the line shows any recognizable table signal.
pub(crate) fn is_table_line(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return false;
    }

    let pipes = trimmed.matches('|').count();
    if pipes >= 2 {
        return true;
    }

    if trimmed.len() >= 3
        && trimmed
            .chars()
            .all(|c| matches!(c, '-' | '+' | '=' | '|' | '_' | ' '))
    {
        return true;
    }

    if trimmed.matches('\t').count() >= 2 {
        return true;
    }

    has_column_gap(trimmed)
}

/// A run of three or more spaces between non-space characters.
fn has_column_gap(trimmed: &str) -> bool {
    let bytes = trimmed.as_bytes();
    let mut run = 0usize;
    let mut seen_content = false;
    for &b in bytes {
        if b == b' ' {
            run += 1;
        } else {
            if seen_content && run >= 3 {
                return true;
            }
            run = 0;
            seen_content = true;
        }
    }
    false
}

/// Wraps runs of table-looking lines in sentinel markers.
///
/// A run qualifies when at least two consecutive lines carry a signal, and
/// at least half of the run's lines do (guards against stray indentation).
fn mark_tables(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len() + 8);
    let mut idx = 0usize;

    while idx < lines.len() {
        if !is_table_line(lines[idx]) {
            out.push(lines[idx].to_string());
            idx += 1;
            continue;
        }

        // Extend to the blank line, but end the region at the last line
        // that still carries a table signal.
        let mut scan = idx;
        let mut last_signal = idx;
        let mut signal_lines = 0usize;
        while scan < lines.len() && !lines[scan].trim().is_empty() {
            if is_table_line(lines[scan]) {
                last_signal = scan;
                signal_lines += 1;
            }
            scan += 1;
        }

        let run = &lines[idx..=last_signal];
        if run.len() >= 2 && signal_lines * 2 >= run.len() {
            out.push(TABLE_BEGIN.to_string());
            out.extend(run.iter().map(ToString::to_string));
            out.push(TABLE_END.to_string());
        } else {
            out.extend(run.iter().map(ToString::to_string));
        }
        idx = last_signal + 1;
    }

    out.join("\n")
}

/// Trims lines and collapses space runs, leaving table regions untouched.
fn normalize_whitespace_outside_tables(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_table = false;

    for segment in split_keeping_sentinels(text) {
        match segment {
            Segment::Begin => {
                in_table = true;
                out.push_str(TABLE_BEGIN);
            }
            Segment::End => {
                in_table = false;
                out.push_str(TABLE_END);
            }
            Segment::Text(body) => {
                if in_table {
                    out.push_str(body);
                } else {
                    let trimmed_lines: Vec<String> = body
                        .lines()
                        .map(|line| INNER_SPACES.replace_all(line.trim(), " ").into_owned())
                        .collect();
                    let joined = trimmed_lines.join("\n");
                    out.push_str(&EXCESS_NEWLINES.replace_all(&joined, "\n\n"));
                }
            }
        }
    }

    out
}

enum Segment<'a> {
    Begin,
    End,
    Text(&'a str),
}

fn split_keeping_sentinels(text: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut rest = text;

    loop {
        let begin = rest.find(TABLE_BEGIN);
        let end = rest.find(TABLE_END);
        let (pos, len, segment) = match (begin, end) {
            (Some(b), Some(e)) if b < e => (b, TABLE_BEGIN.len(), Segment::Begin),
            (Some(b), None) => (b, TABLE_BEGIN.len(), Segment::Begin),
            (_, Some(e)) => (e, TABLE_END.len(), Segment::End),
            (None, None) => {
                if !rest.is_empty() {
                    segments.push(Segment::Text(rest));
                }
                return segments;
            }
        };

        if pos > 0 {
            segments.push(Segment::Text(&rest[..pos]));
        }
        segments.push(segment);
        rest = &rest[pos + len..];
    }
}

/// Puts table sentinels and page markers on their own paragraph boundaries.
fn isolate_sentinels(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        let trimmed = line.trim();
        let is_boundary = trimmed == TABLE_BEGIN
            || trimmed == TABLE_END
            || trimmed.starts_with("--- Sayfa ");
        if is_boundary {
            if !out.ends_with("\n\n") && !out.is_empty() {
                if out.ends_with('\n') {
                    out.push('\n');
                } else {
                    out.push_str("\n\n");
                }
            }
            out.push_str(trimmed);
            out.push_str("\n\n");
        } else {
            out.push_str(line);
            out.push('\n');
        }
    }
    EXCESS_NEWLINES.replace_all(&out, "\n\n").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixes_ligatures_and_ellipsis() {
        let opts = NormalizeOptions::default();
        let out = normalize("e\u{fb03}cient \u{fb01}ne text\u{2026} done", &opts);
        assert_eq!(out, "efficient fine text... done");
    }

    #[test]
    fn repairs_spacing_before_punctuation() {
        let opts = NormalizeOptions::default();
        assert_eq!(normalize("word , next .", &opts), "word, next.");
    }

    #[test]
    fn stitches_hyphenation_at_line_breaks() {
        let opts = NormalizeOptions::default();
        assert_eq!(normalize("infor-\nmation flows", &opts), "information flows");
    }

    #[test]
    fn hyphenation_requires_lowercase_continuation() {
        let opts = NormalizeOptions::default();
        // An uppercase continuation is a new clause, not a broken word.
        let out = normalize("end-\nBeginning", &opts);
        assert!(out.contains('-'));
    }

    #[test]
    fn collapses_whitespace() {
        let opts = NormalizeOptions::default();
        let out = normalize("a    b\n\n\n\n\nc", &opts);
        assert_eq!(out, "a b\n\nc");
    }

    #[test]
    fn marks_pipe_tables() {
        let opts = NormalizeOptions::default();
        let raw = "intro text\n| a | b |\n| 1 | 2 |\nafter";
        let out = normalize(raw, &opts);
        assert!(out.contains(TABLE_BEGIN));
        assert!(out.contains(TABLE_END));
        let begin = out.find(TABLE_BEGIN).unwrap();
        let end = out.find(TABLE_END).unwrap();
        assert!(begin < out.find("| a | b |").unwrap());
        assert!(end > out.find("| 1 | 2 |").unwrap());
    }

    #[test]
    fn table_interior_spacing_is_preserved() {
        let opts = NormalizeOptions::default();
        let raw = "Name     Qty     Price\nApple    3       5.00";
        let out = normalize(raw, &opts);
        assert!(out.contains("Name     Qty     Price"));
    }

    #[test]
    fn single_table_like_line_is_not_marked() {
        let opts = NormalizeOptions::default();
        let out = normalize("just | one | line here", &opts);
        assert!(!out.contains(TABLE_BEGIN));
    }

    #[test]
    fn page_markers_are_inserted() {
        let opts = NormalizeOptions::default();
        let pages = vec![(1, "First page.".to_string()), (2, "Second page.".to_string())];
        let out = normalize_pages(&pages, &opts);
        assert!(out.contains("--- Sayfa 1/2 ---"));
        assert!(out.contains("--- Sayfa 2/2 ---"));
        assert!(out.find("First page.").unwrap() < out.find("--- Sayfa 2/2 ---").unwrap());
    }

    #[test]
    fn page_markers_can_be_disabled() {
        let opts = NormalizeOptions {
            include_page_markers: false,
            ..NormalizeOptions::default()
        };
        let pages = vec![(1, "One.".to_string()), (2, "Two.".to_string())];
        let out = normalize_pages(&pages, &opts);
        assert!(!out.contains("--- Sayfa"));
        assert_eq!(out, "One.\n\nTwo.");
    }

    #[test]
    fn empty_input_stays_empty() {
        let opts = NormalizeOptions::default();
        assert_eq!(normalize("", &opts), "");
        assert_eq!(normalize_pages(&[], &opts), "");
    }
}
