//! Sentence segmentation and the ephemeral sentence/paragraph model.
//!
//! Sentences and paragraphs live only while chunks are being assembled;
//! nothing outside this module holds on to them.

use std::sync::LazyLock;

use regex::Regex;

use crate::normalize::{TABLE_BEGIN, TABLE_END};

/// Prefix attached to atomic table sentences.
pub(crate) const TABLE_SENTENCE_PREFIX: &str = "[TABLO]";

static PAGE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^--- Sayfa (\d+)/\d+ ---$").expect("static regex"));

/// One segmented sentence, or a page-break marker in the sentence stream.
#[derive(Debug, Clone)]
pub(crate) struct Sentence {
    /// Sentence text; empty for page breaks.
    pub text: String,
    /// Space-separated word count.
    pub word_count: usize,
    /// Marks a transition between pages; carries no content.
    pub is_page_break: bool,
    /// Page the sentence sat on, when known.
    pub page_number: Option<u32>,
}

impl Sentence {
    pub(crate) fn content(text: String, page_number: Option<u32>) -> Self {
        let word_count = text.split_whitespace().count();
        Self {
            text,
            word_count,
            is_page_break: false,
            page_number,
        }
    }

    pub(crate) const fn page_break(page_number: u32) -> Self {
        Self {
            text: String::new(),
            word_count: 0,
            is_page_break: true,
            page_number: Some(page_number),
        }
    }
}

/// An ordered group of sentences delimited by blank lines, plus the
/// structure observed on its raw lines.
///
/// A paragraph with no sentences and a page number is a page transition.
#[derive(Debug, Clone)]
pub(crate) struct Paragraph {
    pub sentences: Vec<Sentence>,
    pub page_number: Option<u32>,
    pub heading: Option<String>,
    pub contains_table: bool,
    pub contains_list: bool,
}

impl Paragraph {
    pub(crate) const fn is_page_break(&self) -> bool {
        self.sentences.is_empty()
    }
}

/// Returns the page number when the line is a `--- Sayfa i/N ---` marker.
pub(crate) fn page_marker_number(line: &str) -> Option<u32> {
    PAGE_MARKER
        .captures(line.trim())
        .and_then(|caps| caps[1].parse().ok())
}

/// Splits a text block into sentences.
///
/// A boundary is a whitespace run preceded by `.`, `!`, `?` or `:` and
/// followed by an uppercase letter (including Turkish diacritics), a digit,
/// a quote or an opening bracket. `[TABLE_BEGIN]..[TABLE_END]` regions are
/// never subdivided; they come through [`split_block_sentences`] as one
/// atomic sentence.
pub(crate) fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0usize;
    let mut prev_non_ws: Option<char> = None;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, ch)) = chars.next() {
        if ch.is_whitespace() {
            let boundary_before = matches!(prev_non_ws, Some('.' | '!' | '?' | ':'));
            if boundary_before {
                // Look past the whitespace run for an opener.
                let mut rest = text[idx..].char_indices().skip_while(|(_, c)| c.is_whitespace());
                if let Some((offset, next)) = rest.next() {
                    if is_sentence_opener(next) {
                        let piece = text[start..idx].trim();
                        if !piece.is_empty() {
                            sentences.push(piece.to_string());
                        }
                        start = idx + offset;
                        // Skip the consumed whitespace.
                        while chars.peek().is_some_and(|(i, _)| *i < start) {
                            chars.next();
                        }
                        prev_non_ws = None;
                        continue;
                    }
                }
            }
        } else {
            prev_non_ws = Some(ch);
        }
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }
    sentences
}

const fn is_sentence_opener(ch: char) -> bool {
    ch.is_ascii_uppercase()
        || ch.is_ascii_digit()
        || matches!(ch, 'Ç' | 'Ğ' | 'İ' | 'Ö' | 'Ş' | 'Ü' | '"' | '[')
}

/// Splits a paragraph block into sentence strings, keeping table regions
/// atomic and prefixed with `[TABLO]`.
pub(crate) fn split_block_sentences(block: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut rest = block;

    while let Some(begin) = rest.find(TABLE_BEGIN) {
        let before = &rest[..begin];
        out.extend(split_sentences(before));

        let after_begin = &rest[begin + TABLE_BEGIN.len()..];
        let (body, tail) = after_begin.find(TABLE_END).map_or(
            (after_begin, ""),
            |end| (&after_begin[..end], &after_begin[end + TABLE_END.len()..]),
        );

        let body = body.trim();
        if body.is_empty() {
            out.push(TABLE_SENTENCE_PREFIX.to_string());
        } else {
            out.push(format!("{TABLE_SENTENCE_PREFIX} {body}"));
        }
        rest = tail;
    }

    out.extend(split_sentences(rest));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_terminal_punctuation() {
        let sentences = split_sentences("First point. Second point. Third!");
        assert_eq!(
            sentences,
            vec!["First point.", "Second point.", "Third!"]
        );
    }

    #[test]
    fn requires_uppercase_or_digit_opener() {
        // Lowercase continuation after a period is an abbreviation, not a boundary.
        let sentences = split_sentences("See e.g. the appendix. Also section 2.");
        assert_eq!(sentences, vec!["See e.g. the appendix.", "Also section 2."]);
    }

    #[test]
    fn colon_followed_by_uppercase_splits() {
        let sentences = split_sentences("Note: This matters.");
        assert_eq!(sentences, vec!["Note:", "This matters."]);
    }

    #[test]
    fn turkish_uppercase_opens_a_sentence() {
        let sentences = split_sentences("Giriş bölümü bitti. Şimdi yöntem geliyor.");
        assert_eq!(sentences.len(), 2);
        assert_eq!(sentences[1], "Şimdi yöntem geliyor.");
    }

    #[test]
    fn table_regions_stay_atomic() {
        let block = "Before the table. [TABLE_BEGIN]\n| a | b |\n| 1 | 2 |\n[TABLE_END] After it.";
        let sentences = split_block_sentences(block);
        assert_eq!(sentences.len(), 3);
        assert!(sentences[1].starts_with("[TABLO]"));
        assert!(sentences[1].contains("| 1 | 2 |"));
        assert_eq!(sentences[2], "After it.");
    }

    #[test]
    fn page_marker_parsing() {
        assert_eq!(page_marker_number("--- Sayfa 12/40 ---"), Some(12));
        assert_eq!(page_marker_number("--- Sayfa x/40 ---"), None);
        assert_eq!(page_marker_number("plain text"), None);
    }

    #[test]
    fn page_break_sentence_is_empty() {
        let sentence = Sentence::page_break(7);
        assert!(sentence.is_page_break);
        assert!(sentence.text.is_empty());
        assert_eq!(sentence.word_count, 0);
        assert_eq!(sentence.page_number, Some(7));
    }
}
