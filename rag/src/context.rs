//! Token-budgeted serialization of ranked chunks into an LLM prompt
//! context.
//!
//! The output shape is part of the engine's external contract: a header
//! with usage guidelines, `---`-separated numbered passages with page and
//! metadata banners, and a footer summarizing the pages cited. Downstream
//! prompts rely on this exact layout.

use std::collections::BTreeSet;

use passaj_core::{Error, Result};

use crate::config::EngineConfig;
use crate::types::{RetrievedContext, ScoredChunk};

const HEADER_TITLE: &str = "# Document Context";

const GUIDELINES: &str = "Answer the question using only the numbered passages below. \
Cite passages by their bracketed number and mention page numbers when you refer to \
specific content. If the passages do not contain the answer, say so.";

const FOOTER_REMINDER: &str = "(Base your answer on the passages above; cite by number.)";

/// Vector similarity at or above which a passage is flagged a high match.
const HIGH_MATCH_SIMILARITY: f32 = 0.7;

/// Rerank score at or above which a passage is flagged very relevant.
const VERY_RELEVANT_RERANK: f32 = 8.0;

/// Pages beyond which the footer page list collapses to a range.
const FOOTER_PAGE_LIMIT: usize = 5;

/// Serializes ranked chunks under a token budget.
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    max_tokens: usize,
    token_multiplier: f32,
}

impl ContextBuilder {
    /// Creates a builder with an explicit budget and token multiplier.
    #[must_use]
    pub const fn new(max_tokens: usize, token_multiplier: f32) -> Self {
        Self {
            max_tokens,
            token_multiplier,
        }
    }

    /// Creates a builder from the engine configuration.
    #[must_use]
    pub const fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.max_context_tokens, config.token_multiplier)
    }

    /// Estimated token cost of a piece of output.
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    pub fn estimate_tokens(&self, text: &str) -> usize {
        let words = text.split_whitespace().count();
        (words as f32 * self.token_multiplier).ceil() as usize
    }

    /// Builds the context string from ranked candidates.
    ///
    /// Chunks are taken in input order until the next one would push the
    /// running estimate over the budget. The header is always emitted, even
    /// when it alone breaches the budget; the footer is emitted afterwards
    /// and accounted after the fact.
    ///
    /// # Errors
    /// [`Error::TokenLimitExceeded`] when candidates exist but not a single
    /// one fits the budget.
    pub fn build(&self, candidates: &[ScoredChunk]) -> Result<RetrievedContext> {
        let header = format!("{HEADER_TITLE}\n{GUIDELINES}\n");
        let mut used = self.estimate_tokens(&header);

        let mut body = String::new();
        let mut pages: BTreeSet<u32> = BTreeSet::new();
        let mut included = 0usize;

        for (position, candidate) in candidates.iter().enumerate() {
            let block = format_chunk(position + 1, candidate);
            let cost = self.estimate_tokens(&block);
            if used + cost > self.max_tokens {
                break;
            }

            body.push_str(&block);
            used += cost;
            included += 1;
            pages.extend(candidate.chunk.start_page..=candidate.chunk.end_page);
        }

        if included == 0 && !candidates.is_empty() {
            return Err(Error::TokenLimitExceeded {
                budget: self.max_tokens,
            });
        }

        let footer = format_footer(included, &pages);
        let context = format!("{header}{body}\n{footer}");

        Ok(RetrievedContext {
            context,
            source_pages: pages,
            chunk_count: included,
        })
    }
}

fn format_chunk(number: usize, candidate: &ScoredChunk) -> String {
    let chunk = &candidate.chunk;

    let page_info = if chunk.spans_pages() {
        format!("(Page {}-{})", chunk.start_page, chunk.end_page)
    } else {
        format!("(Page {})", chunk.start_page)
    };

    let mut banner = format!("[{number}]{page_info}");

    if candidate.vector_score >= HIGH_MATCH_SIMILARITY {
        banner.push_str(" [High Match]");
    }
    if candidate.rerank_score.is_some_and(|s| s >= VERY_RELEVANT_RERANK) {
        banner.push_str(" [Very Relevant]");
    }

    let mut badges: Vec<String> = Vec::new();
    if let Some(section) = &chunk.section_title {
        badges.push(format!("📑 {section}"));
    }
    if chunk.contains_table {
        badges.push("📊 Table".to_string());
    }
    if chunk.contains_list {
        badges.push("📝 List".to_string());
    }
    if !chunk.image_references.is_empty() {
        badges.push(format!("🖼️ {} images", chunk.image_references.len()));
    }
    if !badges.is_empty() {
        banner.push_str(&format!(" [{}]", badges.join(" | ")));
    }

    format!("\n---\n{banner}\n{}\n", chunk.content)
}

fn format_footer(sections: usize, pages: &BTreeSet<u32>) -> String {
    let page_list = if pages.is_empty() {
        "none".to_string()
    } else if pages.len() > FOOTER_PAGE_LIMIT {
        let first = pages.iter().next().expect("non-empty");
        let last = pages.iter().next_back().expect("non-empty");
        format!("{first}…{last} ({} pages)", pages.len())
    } else {
        pages
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    };

    format!("---\nSummary: {sections} sections, Pages: {page_list}\n{FOOTER_REMINDER}")
}
