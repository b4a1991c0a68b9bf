//! Reciprocal Rank Fusion over the retrieval sub-query results.

use std::collections::HashMap;

use ordered_float::OrderedFloat;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::types::{Chunk, ScoredChunk};

/// Where a ranked list came from; decides its fusion weight and which raw
/// score it contributes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ContributionSource {
    /// Page-number lookup; boosted.
    Page,
    /// Figure/table reference lookup; boosted.
    Reference,
    /// Vector similarity search.
    Vector,
    /// BM25 lexical search.
    Bm25,
}

/// One sub-query's ranked candidates with their raw scores.
#[derive(Debug)]
pub(crate) struct RankedList {
    pub source: ContributionSource,
    pub items: Vec<(Chunk, f32)>,
}

impl RankedList {
    pub(crate) const fn new(source: ContributionSource, items: Vec<(Chunk, f32)>) -> Self {
        Self { source, items }
    }

    /// Wraps rows that carry no raw score (page and reference lookups).
    pub(crate) fn from_chunks(source: ContributionSource, chunks: Vec<Chunk>) -> Self {
        Self::new(source, chunks.into_iter().map(|c| (c, 0.0)).collect())
    }
}

const fn source_weight(source: ContributionSource, config: &EngineConfig) -> f32 {
    match source {
        ContributionSource::Page => config.page_boost,
        ContributionSource::Reference => config.ref_boost,
        ContributionSource::Vector => config.vector_weight,
        ContributionSource::Bm25 => config.bm25_weight,
    }
}

/// Fuses ranked lists into a single candidate list ordered by descending
/// RRF score, ties broken by ascending chunk index.
///
/// Each list contributes `weight / (rrf_k + rank)` per chunk, rank being
/// 1-based; raw vector and BM25 scores are carried through for the context
/// builder's confidence badges.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn fuse(lists: Vec<RankedList>, config: &EngineConfig) -> Vec<ScoredChunk> {
    let mut by_id: HashMap<Uuid, ScoredChunk> = HashMap::new();

    for list in lists {
        let weight = source_weight(list.source, config);
        for (rank, (chunk, raw_score)) in list.items.into_iter().enumerate() {
            let contribution = weight / (config.rrf_k + (rank + 1) as f32);
            let scored = by_id
                .entry(chunk.id)
                .or_insert_with(|| ScoredChunk::unscored(chunk));

            scored.rrf_score += contribution;
            match list.source {
                ContributionSource::Vector => scored.vector_score = raw_score,
                ContributionSource::Bm25 => scored.bm25_score = raw_score,
                ContributionSource::Page | ContributionSource::Reference => {}
            }
        }
    }

    let mut fused: Vec<ScoredChunk> = by_id.into_values().collect();
    fused.sort_by_key(|s| {
        (
            std::cmp::Reverse(OrderedFloat(s.rrf_score)),
            s.chunk.chunk_index,
        )
    });
    fused
}
