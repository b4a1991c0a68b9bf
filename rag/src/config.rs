//! Engine configuration.

use std::time::Duration;

/// Tunables for chunking, retrieval scoring, embedding throughput, caching
/// and context sizing.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Preferred chunk size in words.
    pub target_chunk_size: usize,
    /// Minimum words a non-final chunk may hold.
    pub min_chunk_size: usize,
    /// Hard upper bound in words; a chunk closes mid-paragraph at this size.
    pub max_chunk_size: usize,
    /// Trailing sentences replayed at the head of the next chunk.
    pub overlap_sentences: usize,

    /// Candidates requested from each retrieval sub-query.
    pub top_k: usize,
    /// Candidates kept for an optional rerank pass.
    pub rerank_top_k: usize,
    /// Hard cosine-similarity floor for the vector sub-query.
    pub similarity_threshold: f32,
    /// RRF weight applied to BM25 contributions.
    pub bm25_weight: f32,
    /// RRF weight applied to vector contributions.
    pub vector_weight: f32,
    /// The `k` in `1 / (k + rank)`.
    pub rrf_k: f32,
    /// Multiplier for page-number sub-query contributions.
    pub page_boost: f32,
    /// Multiplier for figure/table-reference contributions.
    pub ref_boost: f32,

    /// Expected embedding vector length.
    pub embedding_dimension: usize,
    /// Pause between consecutive batch slices.
    pub inter_batch_pause: Duration,
    /// Number of texts embedded concurrently per slice.
    pub batch_size: usize,
    /// Retry attempts for transient provider failures.
    pub max_retries: usize,
    /// Initial backoff; doubles per attempt.
    pub base_backoff: Duration,

    /// Memory-cache capacity in entries.
    pub cache_max_size: usize,
    /// Validity window for both cache tiers.
    pub cache_ttl: Duration,

    /// Default token budget for built contexts.
    pub max_context_tokens: usize,
    /// Words-to-tokens estimate multiplier.
    pub token_multiplier: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            target_chunk_size: 500,
            min_chunk_size: 60,
            max_chunk_size: 750,
            overlap_sentences: 2,

            top_k: 10,
            rerank_top_k: 5,
            similarity_threshold: 0.35,
            bm25_weight: 0.35,
            vector_weight: 0.65,
            rrf_k: 60.0,
            page_boost: 1.5,
            ref_boost: 1.3,

            embedding_dimension: 1536,
            inter_batch_pause: Duration::from_millis(50),
            batch_size: 5,
            max_retries: 3,
            base_backoff: Duration::from_millis(500),

            cache_max_size: 1000,
            cache_ttl: Duration::from_secs(7 * 24 * 3600),

            max_context_tokens: 4000,
            token_multiplier: 1.3,
        }
    }
}

impl EngineConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder for custom configuration.
    #[must_use]
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::new()
    }
}

/// Builder for [`EngineConfig`].
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Creates a builder seeded with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }

    /// Sets the chunk sizing parameters (target, min, max, in words).
    #[must_use]
    pub const fn chunk_sizes(mut self, target: usize, min: usize, max: usize) -> Self {
        self.config.target_chunk_size = target;
        self.config.min_chunk_size = min;
        self.config.max_chunk_size = max;
        self
    }

    /// Sets the number of overlap sentences between consecutive chunks.
    #[must_use]
    pub const fn overlap_sentences(mut self, sentences: usize) -> Self {
        self.config.overlap_sentences = sentences;
        self
    }

    /// Sets the per-sub-query candidate count.
    #[must_use]
    pub const fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Sets the cosine-similarity floor for vector candidates.
    #[must_use]
    pub const fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.config.similarity_threshold = threshold;
        self
    }

    /// Sets the RRF source weights.
    #[must_use]
    pub const fn fusion_weights(mut self, vector: f32, bm25: f32) -> Self {
        self.config.vector_weight = vector;
        self.config.bm25_weight = bm25;
        self
    }

    /// Sets the structural boosts for page and figure/table matches.
    #[must_use]
    pub const fn structural_boosts(mut self, page: f32, reference: f32) -> Self {
        self.config.page_boost = page;
        self.config.ref_boost = reference;
        self
    }

    /// Sets the expected embedding dimension.
    #[must_use]
    pub const fn embedding_dimension(mut self, dimension: usize) -> Self {
        self.config.embedding_dimension = dimension;
        self
    }

    /// Sets batch throughput: slice size and inter-slice pause.
    #[must_use]
    pub const fn batching(mut self, batch_size: usize, pause: Duration) -> Self {
        self.config.batch_size = batch_size;
        self.config.inter_batch_pause = pause;
        self
    }

    /// Sets the retry policy for transient provider failures.
    #[must_use]
    pub const fn retries(mut self, max_retries: usize, base_backoff: Duration) -> Self {
        self.config.max_retries = max_retries;
        self.config.base_backoff = base_backoff;
        self
    }

    /// Sets memory-cache capacity and the TTL shared by both tiers.
    #[must_use]
    pub const fn cache(mut self, max_size: usize, ttl: Duration) -> Self {
        self.config.cache_max_size = max_size;
        self.config.cache_ttl = ttl;
        self
    }

    /// Sets context sizing: token budget and words-to-tokens multiplier.
    #[must_use]
    pub const fn context_tokens(mut self, max_tokens: usize, multiplier: f32) -> Self {
        self.config.max_context_tokens = max_tokens;
        self.config.token_multiplier = multiplier;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> EngineConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.target_chunk_size, 500);
        assert_eq!(config.min_chunk_size, 60);
        assert_eq!(config.max_chunk_size, 750);
        assert_eq!(config.overlap_sentences, 2);
        assert!((config.rrf_k - 60.0).abs() < f32::EPSILON);
        assert_eq!(config.batch_size, 5);
        assert_eq!(config.inter_batch_pause, Duration::from_millis(50));
    }

    #[test]
    fn builder_overrides() {
        let config = EngineConfig::builder()
            .chunk_sizes(20, 5, 40)
            .overlap_sentences(1)
            .top_k(6)
            .similarity_threshold(0.4)
            .cache(10, Duration::from_secs(60))
            .context_tokens(800, 1.3)
            .build();

        assert_eq!(config.target_chunk_size, 20);
        assert_eq!(config.min_chunk_size, 5);
        assert_eq!(config.max_chunk_size, 40);
        assert_eq!(config.top_k, 6);
        assert_eq!(config.cache_max_size, 10);
        assert_eq!(config.max_context_tokens, 800);
    }
}
