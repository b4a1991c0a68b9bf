//! The engine façade: ingestion, retrieval and cache administration.
//!
//! An [`Engine`] owns its embedding service (and therefore the caches) and
//! its index-store handle; callers thread the engine value through instead
//! of reaching for process-wide singletons. Progress during ingestion is
//! reported through a callback, never by hopping threads.

use std::path::PathBuf;
use std::time::Duration;

use passaj_core::{EmbeddingModel, Error, Result};
use tracing::{info, warn};

use crate::chunking::DocumentChunker;
use crate::config::EngineConfig;
use crate::context::ContextBuilder;
use crate::embedding::{CacheStats, EmbeddingService};
use crate::normalize::{NormalizeOptions, normalize, page_marker_line};
use crate::query::analyze;
use crate::search::fusion::{ContributionSource, RankedList, fuse};
use crate::search::{broad_context, reference_terms};
use crate::store::{IndexStore, StoredEntry};
use crate::types::{ImageRef, RetrievedContext, ScoredChunk};

/// Progress event emitted while a file is being ingested.
#[derive(Debug, Clone)]
pub struct IngestProgress {
    /// Pages processed so far (meaningful during [`IngestStage::Normalizing`]).
    pub processed: usize,
    /// Total pages in the file.
    pub total: usize,
    /// Current stage.
    pub stage: IngestStage,
}

/// Stages of the ingestion pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestStage {
    /// Cleaning page text.
    Normalizing,
    /// Assembling chunks.
    Chunking,
    /// Fetching embeddings for chunk contents.
    Embedding,
    /// Upserting chunks into the index store.
    Indexing,
    /// Ingestion completed.
    Done,
}

/// The retrieval engine: chunking, cached embeddings, hybrid search and
/// context building over one index store.
pub struct Engine<M: EmbeddingModel, S: IndexStore> {
    embeddings: EmbeddingService<M>,
    store: S,
    config: EngineConfig,
}

impl<M: EmbeddingModel, S: IndexStore> std::fmt::Debug for Engine<M, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("embeddings", &self.embeddings)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<M: EmbeddingModel, S: IndexStore> Engine<M, S> {
    /// Creates a builder wiring a provider model to an index store.
    #[must_use]
    pub fn builder(model: M, store: S) -> EngineBuilder<M, S> {
        EngineBuilder {
            model,
            store,
            config: EngineConfig::default(),
            cache_root: None,
        }
    }

    /// Ingests a file: normalize pages, chunk, embed, upsert.
    ///
    /// Idempotent per file: previous chunks for `file_id` are deleted
    /// first, so re-ingesting identical pages reproduces the same chunk
    /// sequence (ids aside).
    pub async fn ingest(
        &self,
        file_id: &str,
        pages: &[(u32, String)],
        images: &[ImageRef],
    ) -> Result<usize> {
        self.ingest_with_progress(file_id, pages, images, |_| {}).await
    }

    /// Like [`Engine::ingest`], reporting progress through a callback.
    pub async fn ingest_with_progress<F>(
        &self,
        file_id: &str,
        pages: &[(u32, String)],
        images: &[ImageRef],
        mut on_progress: F,
    ) -> Result<usize>
    where
        F: FnMut(IngestProgress),
    {
        let total = pages.len();
        let opts = NormalizeOptions::default();

        self.store.delete_file(file_id).await?;

        let mut text = String::new();
        for (index, (page_number, raw)) in pages.iter().enumerate() {
            text.push_str(&page_marker_line(*page_number, total));
            text.push_str(&normalize(raw, &opts));
            on_progress(IngestProgress {
                processed: index + 1,
                total,
                stage: IngestStage::Normalizing,
            });
        }

        on_progress(IngestProgress {
            processed: total,
            total,
            stage: IngestStage::Chunking,
        });
        let chunker = DocumentChunker::from_config(&self.config);
        let chunks = chunker.chunk(text.trim(), file_id, images);

        if chunks.is_empty() {
            info!(file_id, "ingestion produced no chunks");
            on_progress(IngestProgress {
                processed: total,
                total,
                stage: IngestStage::Done,
            });
            return Ok(0);
        }

        on_progress(IngestProgress {
            processed: total,
            total,
            stage: IngestStage::Embedding,
        });
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = self.embeddings.embed_batch(&texts).await?;

        on_progress(IngestProgress {
            processed: total,
            total,
            stage: IngestStage::Indexing,
        });
        let count = chunks.len();
        let entries: Vec<StoredEntry> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| StoredEntry::new(chunk, vector))
            .collect();
        self.store.upsert_chunks(entries).await?;

        info!(file_id, chunks = count, pages = total, "file ingested");
        on_progress(IngestProgress {
            processed: total,
            total,
            stage: IngestStage::Done,
        });
        Ok(count)
    }

    /// Answers a query with a token-budgeted context string plus the pages
    /// and chunk count behind it.
    pub async fn retrieve(
        &self,
        file_id: &str,
        query: &str,
        max_tokens: usize,
    ) -> Result<RetrievedContext> {
        if self.store.count_chunks(file_id).await? == 0 {
            return Err(Error::NotIndexed(file_id.to_string()));
        }

        let mut candidates = self.hybrid_search(query, file_id, self.config.top_k).await?;

        if candidates.is_empty() {
            warn!(file_id, "fused retrieval empty; sampling broad context");
            candidates = match broad_context(&self.store, file_id, self.config.top_k).await {
                Ok(sampled) => sampled,
                Err(err) => {
                    warn!(%err, file_id, "broad-context sampling failed");
                    return Ok(RetrievedContext::empty());
                }
            };
        }

        if candidates.is_empty() {
            return Ok(RetrievedContext::empty());
        }

        ContextBuilder::new(max_tokens, self.config.token_multiplier).build(&candidates)
    }

    /// Runs the four retrieval sub-queries concurrently and fuses them.
    ///
    /// Page, reference and BM25 failures degrade to empty lists; a vector
    /// failure is fatal. The result is sorted by descending RRF score with
    /// ascending chunk index as the tiebreak.
    pub async fn hybrid_search(
        &self,
        query: &str,
        file_id: &str,
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let analysis = analyze(query);
        let terms = reference_terms(&analysis);

        let page_lookup = async {
            if analysis.page_numbers.is_empty() {
                Ok(Vec::new())
            } else {
                self.store
                    .fetch_by_pages(file_id, &analysis.page_numbers, top_k)
                    .await
            }
        };

        let reference_lookup = async {
            if terms.is_empty() {
                Ok(Vec::new())
            } else {
                self.store.fetch_by_content(file_id, &terms, top_k).await
            }
        };

        let vector_lookup = async {
            let embedding = self.embeddings.embed(query).await?;
            self.store
                .vector_search(
                    file_id,
                    &embedding,
                    top_k,
                    self.config.similarity_threshold,
                )
                .await
                .map_err(|err| Error::SearchFailed(err.to_string()))
        };

        let lexical_query = if analysis.simplified_query.is_empty() {
            query
        } else {
            analysis.simplified_query.as_str()
        };
        let bm25_lookup = self.store.bm25_search(file_id, lexical_query, top_k);

        let (page_rows, reference_rows, vector_rows, bm25_rows) =
            tokio::join!(page_lookup, reference_lookup, vector_lookup, bm25_lookup);

        let vector_rows = vector_rows?;

        let page_rows = page_rows.unwrap_or_else(|err| {
            warn!(%err, "page lookup failed; continuing without it");
            Vec::new()
        });
        let reference_rows = reference_rows.unwrap_or_else(|err| {
            warn!(%err, "reference lookup failed; continuing without it");
            Vec::new()
        });
        let bm25_rows = bm25_rows.unwrap_or_else(|err| {
            warn!(%err, "BM25 lookup failed; continuing without it");
            Vec::new()
        });

        if bm25_rows.is_empty() {
            // Common when query vocabulary does not occur in the document.
            info!(file_id, "BM25 returned no rows; continuing with vector-only");
        }

        info!(
            file_id,
            page = page_rows.len(),
            reference = reference_rows.len(),
            vector = vector_rows.len(),
            bm25 = bm25_rows.len(),
            "retrieval sub-queries finished"
        );

        let fused = fuse(
            vec![
                RankedList::from_chunks(ContributionSource::Page, page_rows),
                RankedList::from_chunks(ContributionSource::Reference, reference_rows),
                RankedList::new(ContributionSource::Vector, vector_rows),
                RankedList::new(ContributionSource::Bm25, bm25_rows),
            ],
            &self.config,
        );

        info!(file_id, fused = fused.len(), "rank fusion finished");
        Ok(fused)
    }

    /// Cache sizing and hit counters.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.embeddings.stats()
    }

    /// Drops every memory-cache entry.
    pub fn clear_memory_cache(&self) {
        self.embeddings.clear_memory();
    }

    /// Sweeps disk-cache entries older than `older_than`; returns the
    /// number of files removed.
    pub fn cleanup_disk_cache(&self, older_than: Duration) -> usize {
        self.embeddings.cleanup_disk(older_than)
    }

    /// The engine configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The underlying index store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// The embedding service.
    #[must_use]
    pub const fn embeddings(&self) -> &EmbeddingService<M> {
        &self.embeddings
    }
}

/// Builder for [`Engine`].
pub struct EngineBuilder<M: EmbeddingModel, S: IndexStore> {
    model: M,
    store: S,
    config: EngineConfig,
    cache_root: Option<PathBuf>,
}

impl<M: EmbeddingModel, S: IndexStore> std::fmt::Debug for EngineBuilder<M, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineBuilder")
            .field("config", &self.config)
            .field("cache_root", &self.cache_root)
            .finish_non_exhaustive()
    }
}

impl<M: EmbeddingModel, S: IndexStore> EngineBuilder<M, S> {
    /// Replaces the default configuration.
    #[must_use]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Enables the on-disk embedding cache under `root/EmbeddingCache`.
    #[must_use]
    pub fn cache_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.cache_root = Some(root.into());
        self
    }

    /// Builds the engine.
    ///
    /// # Errors
    /// Fails when the disk-cache directory cannot be created.
    pub fn build(self) -> Result<Engine<M, S>> {
        let embeddings = match &self.cache_root {
            Some(root) => EmbeddingService::with_disk_cache(self.model, &self.config, root)?,
            None => EmbeddingService::new(self.model, &self.config),
        };

        Ok(Engine {
            embeddings,
            store: self.store,
            config: self.config,
        })
    }
}
