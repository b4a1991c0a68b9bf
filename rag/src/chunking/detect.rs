//! Heading, table and list detection on paragraph blocks.

use std::sync::LazyLock;

use regex::Regex;

use crate::normalize::{TABLE_BEGIN, TABLE_END};

use super::sentence::TABLE_SENTENCE_PREFIX;

static NUMBERED_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\d+\.)+\s*[A-ZÇĞİÖŞÜ]").expect("static regex"));

static LETTER_DOT_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]\.\s+").expect("static regex"));

static LETTER_PAREN_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]\)\s+").expect("static regex"));

static MARKDOWN_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#{1,4}\s+").expect("static regex"));

static SECTION_WORD_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:BÖLÜM|KISIM|MADDE|Bölüm|Kısım|Madde|CHAPTER|Chapter|SECTION|Section)\b")
        .expect("static regex")
});

static BULLET_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[-•*▪◦‣]\s+").expect("static regex"));

static NUMBERED_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d{1,3}[.)]\s+").expect("static regex"));

static LETTERED_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[a-zA-Z][.)]\s+").expect("static regex"));

static ROMAN_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:[ivx]{1,5}|[IVX]{1,5})[.)]\s+").expect("static regex"));

/// Returns `true` when the line reads as a section heading.
pub(crate) fn is_heading(line: &str) -> bool {
    let line = line.trim();
    if line.is_empty() {
        return false;
    }

    if NUMBERED_HEADING.is_match(line)
        || LETTER_DOT_HEADING.is_match(line)
        || LETTER_PAREN_HEADING.is_match(line)
        || MARKDOWN_HEADING.is_match(line)
        || SECTION_WORD_HEADING.is_match(line)
    {
        return true;
    }

    if is_all_caps(line) {
        return true;
    }

    // Short standalone title line: begins uppercase, no sentence break inside.
    line.chars().count() < 80
        && line.split_whitespace().count() <= 10
        && line.chars().next().is_some_and(char::is_uppercase)
        && !line.contains(". ")
        && !line.ends_with('.')
}

fn is_all_caps(line: &str) -> bool {
    line.chars().count() >= 10
        && line.chars().any(char::is_alphabetic)
        && !line.chars().any(char::is_lowercase)
}

/// Returns `true` when the paragraph block contains table content.
pub(crate) fn block_contains_table(block: &str) -> bool {
    if block.contains(TABLE_BEGIN)
        || block.contains(TABLE_END)
        || block.contains(TABLE_SENTENCE_PREFIX)
    {
        return true;
    }

    let lines: Vec<&str> = block.lines().filter(|l| !l.trim().is_empty()).collect();

    if lines.iter().any(|l| is_piped_or_bordered(l)) {
        return true;
    }

    let tabbed = lines
        .iter()
        .filter(|l| l.matches('\t').count() >= 2)
        .count();
    if tabbed >= 2 {
        return true;
    }

    if lines.len() >= 3 {
        let gapped = lines.iter().filter(|l| has_wide_gap(l)).count();
        if gapped * 2 >= lines.len() {
            return true;
        }
    }

    false
}

fn is_piped_or_bordered(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.matches('|').count() >= 2 {
        return true;
    }
    trimmed.len() >= 3
        && !trimmed.is_empty()
        && trimmed
            .chars()
            .all(|c| matches!(c, '-' | '+' | '=' | '|' | '_' | ' '))
}

fn has_wide_gap(line: &str) -> bool {
    line.trim().contains("   ")
}

/// Returns `true` when at least two lines look like list items.
pub(crate) fn block_contains_list(block: &str) -> bool {
    let list_lines = block
        .lines()
        .filter(|line| {
            BULLET_LINE.is_match(line)
                || NUMBERED_LINE.is_match(line)
                || LETTERED_LINE.is_match(line)
                || ROMAN_LINE.is_match(line)
        })
        .count();
    list_lines >= 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markdown_headings() {
        assert!(is_heading("# Introduction"));
        assert!(is_heading("### Deep subsection"));
        assert!(!is_heading("##### too deep"));
    }

    #[test]
    fn numbered_headings() {
        assert!(is_heading("1. Giriş"));
        assert!(is_heading("2.3. Data Model"));
        assert!(is_heading("B. Appendix material"));
    }

    #[test]
    fn section_word_headings() {
        assert!(is_heading("BÖLÜM 3"));
        assert!(is_heading("Chapter 12: Results"));
        assert!(is_heading("MADDE 5"));
    }

    #[test]
    fn all_caps_headings() {
        assert!(is_heading("GENEL HÜKÜMLER"));
        assert!(!is_heading(
            "genel hükümler ve ilgili maddeler hakkında uzun açıklamalar"
        ));
    }

    #[test]
    fn short_title_heuristic() {
        assert!(is_heading("Deney Sonuçları"));
        assert!(!is_heading("This chapter introduces the system. It explains basics."));
        assert!(!is_heading("lowercase opener never titles"));
        assert!(!is_heading("This chapter introduces the system."));
    }

    #[test]
    fn table_blocks() {
        assert!(block_contains_table("[TABLE_BEGIN]\nrows\n[TABLE_END]"));
        assert!(block_contains_table("a | b | c\n1 | 2 | 3"));
        assert!(block_contains_table("x\t\ty\t\tz\n1\t\t2\t\t3"));
        assert!(!block_contains_table("plain prose without structure"));
    }

    #[test]
    fn column_gap_tables_need_majority() {
        let block = "Name   Qty   Price\nApple   3   5\nPear   1   2";
        assert!(block_contains_table(block));
        let mostly_prose = "one line here\nanother line\nthird line";
        assert!(!block_contains_table(mostly_prose));
    }

    #[test]
    fn list_blocks() {
        assert!(block_contains_list("- first\n- second"));
        assert!(block_contains_list("1. one\n2. two"));
        assert!(block_contains_list("a) option\nb) option"));
        assert!(block_contains_list("i. item\nii. item"));
        assert!(!block_contains_list("- a single bullet"));
        assert!(!block_contains_list("no lists at all"));
    }
}
