//! Query analysis: structural references, simplification and language.
//!
//! Users ask things like "sayfa 12'deki tabloyu özetle" or "what does
//! Figure 2-1 show". Before any search runs, the analyzer pulls out page
//! numbers and figure/table references (high-signal retrieval evidence),
//! strips stop words down to a compact lexical query, and guesses the
//! query language independently of the document language.

use std::sync::LazyLock;

use regex::Regex;

static PAGE_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:sayfa|page|s\.|p\.)\s*(\d+)").expect("static regex"));

static PAGE_ORDINAL_TR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\.\s*sayfa").expect("static regex"));

static PAGE_ORDINAL_EN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)(?:st|nd|rd|th)\s*page").expect("static regex"));

static FIGURE_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:figure|fig\.?|şekil)\s*(\d+[-.\s]?\d*)").expect("static regex"));

static TABLE_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:table|tablo)\s*(\d+[-.\s]?\d*)").expect("static regex"));

const TURKISH_STOP_WORDS: &[&str] = &[
    "ne", "nedir", "nasıl", "neden", "hangi", "ile", "ve", "veya", "bir", "bu", "şu", "için",
    "gibi", "daha", "mi", "mı",
];

const ENGLISH_STOP_WORDS: &[&str] = &[
    "the", "a", "an", "is", "are", "was", "what", "how", "why", "which", "and", "or", "in", "of",
    "for", "about",
];

const TURKISH_DIACRITICS: &[char] = &['ç', 'ğ', 'ı', 'ö', 'ş', 'ü', 'Ç', 'Ğ', 'İ', 'Ö', 'Ş', 'Ü'];

/// Maximum words kept in the simplified query.
const SIMPLIFIED_WORD_LIMIT: usize = 5;

/// Stemming assumption detected for a query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryLanguage {
    /// Turkish diacritics or stop words dominate.
    Turkish,
    /// English stop words dominate.
    English,
    /// No stemming-language assumption.
    Simple,
}

/// Everything the retrieval engine wants to know about a user query.
#[derive(Clone, Debug)]
pub struct QueryAnalysis {
    /// Page numbers referenced in the query, in order of appearance.
    pub page_numbers: Vec<u32>,
    /// Figure references such as `2-1` or `3`.
    pub figure_refs: Vec<String>,
    /// Table references.
    pub table_refs: Vec<String>,
    /// Stop-word-stripped lexical query, at most five words.
    pub simplified_query: String,
    /// Detected query language.
    pub query_language: QueryLanguage,
}

impl QueryAnalysis {
    /// `true` when the query names a page, figure or table explicitly.
    #[must_use]
    pub fn has_specific_reference(&self) -> bool {
        !self.page_numbers.is_empty() || !self.figure_refs.is_empty() || !self.table_refs.is_empty()
    }
}

/// Analyzes a user query for structural references, a simplified lexical
/// form, and its language.
#[must_use]
pub fn analyze(query: &str) -> QueryAnalysis {
    QueryAnalysis {
        page_numbers: extract_page_numbers(query),
        figure_refs: extract_refs(&FIGURE_REF, query),
        table_refs: extract_refs(&TABLE_REF, query),
        simplified_query: simplify(query),
        query_language: detect_language(query),
    }
}

fn extract_page_numbers(query: &str) -> Vec<u32> {
    let mut pages = Vec::new();
    for pattern in [&*PAGE_WORD, &*PAGE_ORDINAL_TR, &*PAGE_ORDINAL_EN] {
        for caps in pattern.captures_iter(query) {
            if let Ok(page) = caps[1].parse::<u32>() {
                if !pages.contains(&page) {
                    pages.push(page);
                }
            }
        }
    }
    pages
}

fn extract_refs(pattern: &Regex, query: &str) -> Vec<String> {
    pattern
        .captures_iter(query)
        .map(|caps| caps[1].trim().to_string())
        .filter(|r| !r.is_empty())
        .collect()
}

fn simplify(query: &str) -> String {
    query
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .filter(|word| {
            !TURKISH_STOP_WORDS.contains(word) && !ENGLISH_STOP_WORDS.contains(word)
        })
        .filter(|word| word.chars().count() >= 3)
        .take(SIMPLIFIED_WORD_LIMIT)
        .collect::<Vec<_>>()
        .join(" ")
}

fn detect_language(query: &str) -> QueryLanguage {
    let diacritics = query
        .chars()
        .filter(|c| TURKISH_DIACRITICS.contains(c))
        .count();
    if diacritics > 0 {
        return QueryLanguage::Turkish;
    }

    let lowered = query.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    let turkish = words
        .iter()
        .filter(|w| TURKISH_STOP_WORDS.contains(&w.as_ref()))
        .count();
    let english = words
        .iter()
        .filter(|w| ENGLISH_STOP_WORDS.contains(&w.as_ref()))
        .count();

    if turkish > english {
        QueryLanguage::Turkish
    } else if english > turkish {
        QueryLanguage::English
    } else {
        QueryLanguage::Simple
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_number_spellings_agree() {
        for query in ["page 45", "Page 45", "s.45", "sayfa 45", "45. sayfa", "45th page"] {
            let analysis = analyze(query);
            assert_eq!(analysis.page_numbers, vec![45], "query: {query}");
        }
    }

    #[test]
    fn multiple_pages_accumulate() {
        let analysis = analyze("compare page 3 with sayfa 7");
        assert_eq!(analysis.page_numbers, vec![3, 7]);
    }

    #[test]
    fn figure_references() {
        assert_eq!(analyze("what does Figure 2-1 show").figure_refs, vec!["2-1"]);
        assert_eq!(analyze("fig. 3 caption").figure_refs, vec!["3"]);
        assert_eq!(analyze("Şekil 4.2 nerede").figure_refs, vec!["4.2"]);
    }

    #[test]
    fn table_references() {
        assert_eq!(analyze("Table 3 values").table_refs, vec!["3"]);
        assert_eq!(analyze("tablo 2-4 özeti").table_refs, vec!["2-4"]);
        assert!(analyze("a table of contents").table_refs.is_empty());
    }

    #[test]
    fn specific_reference_flag() {
        assert!(analyze("summarize page 1").has_specific_reference());
        assert!(analyze("Figure 2").has_specific_reference());
        assert!(!analyze("general summary please").has_specific_reference());
    }

    #[test]
    fn simplified_query_strips_stop_words() {
        let analysis = analyze("What is the cardiac arrest protocol for adults");
        assert_eq!(analysis.simplified_query, "cardiac arrest protocol adults");
    }

    #[test]
    fn simplified_query_caps_at_five_words() {
        let analysis = analyze("alpha beta gamma delta epsilon zeta eta");
        assert_eq!(
            analysis.simplified_query.split(' ').count(),
            SIMPLIFIED_WORD_LIMIT
        );
    }

    #[test]
    fn short_words_are_dropped() {
        let analysis = analyze("go to it now ok");
        assert_eq!(analysis.simplified_query, "now");
    }

    #[test]
    fn diacritics_force_turkish() {
        assert_eq!(analyze("başlıca sonuçlar").query_language, QueryLanguage::Turkish);
    }

    #[test]
    fn stop_word_majority_decides_language() {
        assert_eq!(
            analyze("what is the main result").query_language,
            QueryLanguage::English
        );
        assert_eq!(
            analyze("bu sonuc ne anlama gelir").query_language,
            QueryLanguage::Turkish
        );
        assert_eq!(analyze("lorem ipsum dolor").query_language, QueryLanguage::Simple);
    }
}
