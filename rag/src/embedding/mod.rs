//! The caching embedding service.
//!
//! Lookup order is memory, then disk (back-filling memory), then the
//! external provider (writing both tiers). Batch fetches run a fixed-size
//! slice of requests concurrently and pause between slices to respect
//! provider rate limits. Transient provider failures are retried with
//! exponential backoff; terminal kinds abort immediately.

mod disk;
mod memory;

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::future::try_join_all;
use passaj_core::{EmbeddingModel, Error, Result};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::config::EngineConfig;

use disk::DiskCache;
use memory::MemoryCache;

/// Observability counters and sizing of the two cache tiers.
#[derive(Clone, Copy, Debug)]
pub struct CacheStats {
    /// Entries currently in the memory tier.
    pub mem_size: usize,
    /// Memory tier capacity.
    pub mem_capacity: usize,
    /// Memory-tier hits.
    pub hits: u64,
    /// Full misses that reached the provider.
    pub misses: u64,
    /// Disk-tier hits.
    pub disk_hits: u64,
}

impl CacheStats {
    /// Fraction of lookups served from either cache tier.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f32 {
        let denominator = self.hits + self.misses;
        if denominator == 0 {
            return 0.0;
        }
        (self.hits + self.disk_hits) as f32 / denominator as f32
    }
}

/// Embedding lookups with a two-tier cache in front of a provider.
pub struct EmbeddingService<M: EmbeddingModel> {
    model: M,
    memory: MemoryCache,
    disk: Option<DiskCache>,
    batch_size: usize,
    inter_batch_pause: Duration,
    max_retries: usize,
    base_backoff: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    disk_hits: AtomicU64,
}

impl<M: EmbeddingModel> std::fmt::Debug for EmbeddingService<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingService")
            .field("memory", &self.memory)
            .field("disk", &self.disk)
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

impl<M: EmbeddingModel> EmbeddingService<M> {
    /// Creates a service with only the memory tier.
    #[must_use]
    pub fn new(model: M, config: &EngineConfig) -> Self {
        Self {
            model,
            memory: MemoryCache::new(config.cache_max_size, config.cache_ttl),
            disk: None,
            batch_size: config.batch_size.max(1),
            inter_batch_pause: config.inter_batch_pause,
            max_retries: config.max_retries,
            base_backoff: config.base_backoff,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            disk_hits: AtomicU64::new(0),
        }
    }

    /// Creates a service with both tiers; the disk tier lives under
    /// `cache_root/EmbeddingCache`.
    pub fn with_disk_cache(model: M, config: &EngineConfig, cache_root: &Path) -> Result<Self> {
        let mut service = Self::new(model, config);
        service.disk = Some(DiskCache::open(cache_root, config.cache_ttl)?);
        Ok(service)
    }

    /// The deterministic cache key: lowercase hex SHA-256 of the UTF-8 text.
    #[must_use]
    pub fn cache_key(text: &str) -> String {
        let digest = Sha256::digest(text.as_bytes());
        format!("{digest:x}")
    }

    /// Embedding vector dimension of the underlying model.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.model.dim()
    }

    /// Embeds one text, consulting memory, then disk, then the provider.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let key = Self::cache_key(text);

        if let Some(vector) = self.memory.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(vector);
        }

        if let Some(disk) = &self.disk {
            if let Some(vector) = disk.read(&key) {
                self.disk_hits.fetch_add(1, Ordering::Relaxed);
                self.memory.put(key, vector.clone());
                return Ok(vector);
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let vector = self.fetch_with_retry(text).await?;

        self.memory.put(key.clone(), vector.clone());
        if let Some(disk) = &self.disk {
            if let Err(err) = disk.write(&key, &vector) {
                debug!(%err, "disk cache write failed; continuing without it");
            }
        }

        Ok(vector)
    }

    /// Embeds many texts, preserving input order.
    ///
    /// Requests within a slice of `batch_size` run concurrently; consecutive
    /// slices are separated by the configured pause.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());

        for (index, slice) in texts.chunks(self.batch_size).enumerate() {
            if index > 0 {
                tokio::time::sleep(self.inter_batch_pause).await;
            }
            let slice_vectors = try_join_all(slice.iter().map(|text| self.embed(text))).await?;
            vectors.extend(slice_vectors);
        }

        Ok(vectors)
    }

    async fn fetch_with_retry(&self, text: &str) -> Result<Vec<f32>> {
        let mut backoff = self.base_backoff;

        for attempt in 0..=self.max_retries {
            match self.model.embed(text).await {
                Ok(vector) => return Ok(vector),
                Err(err) if err.is_terminal() || attempt == self.max_retries => return Err(err),
                Err(err) => {
                    debug!(%err, attempt, "embedding fetch failed; backing off");
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
            }
        }

        Err(Error::EmbeddingFailed("retry budget exhausted".into()))
    }

    /// Current counters and sizing.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            mem_size: self.memory.len(),
            mem_capacity: self.memory.capacity(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            disk_hits: self.disk_hits.load(Ordering::Relaxed),
        }
    }

    /// Drops every memory-tier entry; disk entries are untouched.
    pub fn clear_memory(&self) {
        self.memory.clear();
    }

    /// Removes the memory entry for one text. Mostly useful in tests.
    pub fn evict_memory_entry(&self, text: &str) -> bool {
        self.memory.remove(&Self::cache_key(text))
    }

    /// Sweeps disk entries older than `older_than`. Returns files removed.
    pub fn cleanup_disk(&self, older_than: Duration) -> usize {
        self.disk
            .as_ref()
            .map_or(0, |disk| disk.cleanup(older_than))
    }
}
