//! The index-store contract and its reference backend.
//!
//! The engine is not a storage system: durable state lives behind the
//! [`IndexStore`] trait, which any backend with vector k-NN, BM25 lookup,
//! page/substring lookup and bounded range scans can implement. The crate
//! ships [`MemoryIndexStore`] as the reference backend and [`RedbSnapshot`]
//! for persisting its contents.

mod memory;
mod persistence;

pub use memory::MemoryIndexStore;
pub use persistence::RedbSnapshot;

use core::future::Future;

use passaj_core::Result;
use serde::{Deserialize, Serialize};

use crate::types::Chunk;

/// A chunk together with its embedding, as stored by a backend.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredEntry {
    /// The chunk.
    pub chunk: Chunk,
    /// Its embedding vector.
    pub embedding: Vec<f32>,
}

impl StoredEntry {
    /// Creates a new entry.
    #[must_use]
    pub const fn new(chunk: Chunk, embedding: Vec<f32>) -> Self {
        Self { chunk, embedding }
    }
}

/// Abstract contract to the durable index backing retrieval.
///
/// Concurrency and durability guarantees are the backend's business; the
/// engine only assumes that a returned row is a consistent chunk.
pub trait IndexStore: Send + Sync {
    /// Inserts or replaces chunks; existing rows with the same
    /// `(file_id, chunk_index)` are overwritten.
    fn upsert_chunks(&self, entries: Vec<StoredEntry>) -> impl Future<Output = Result<()>> + Send;

    /// Removes every chunk of a file. Returns how many rows were dropped.
    fn delete_file(&self, file_id: &str) -> impl Future<Output = Result<usize>> + Send;

    /// K-nearest chunks by cosine similarity, filtered to
    /// `similarity >= threshold`. Similarity is in `[0, 1]`.
    fn vector_search(
        &self,
        file_id: &str,
        query: &[f32],
        k: usize,
        threshold: f32,
    ) -> impl Future<Output = Result<Vec<(Chunk, f32)>>> + Send;

    /// Top-k BM25 matches for a lexical query. An empty result is a normal
    /// outcome, never an error.
    fn bm25_search(
        &self,
        file_id: &str,
        query: &str,
        k: usize,
    ) -> impl Future<Output = Result<Vec<(Chunk, f32)>>> + Send;

    /// Chunks whose nominal page is in `pages`, at most `k`, in chunk order.
    fn fetch_by_pages(
        &self,
        file_id: &str,
        pages: &[u32],
        k: usize,
    ) -> impl Future<Output = Result<Vec<Chunk>>> + Send;

    /// Chunks whose content contains any of `terms` (case-insensitive
    /// substring match), at most `k`, in chunk order.
    fn fetch_by_content(
        &self,
        file_id: &str,
        terms: &[String],
        k: usize,
    ) -> impl Future<Output = Result<Vec<Chunk>>> + Send;

    /// A bounded range scan in chunk order, ascending or descending.
    fn fetch_slice(
        &self,
        file_id: &str,
        offset: usize,
        limit: usize,
        ascending: bool,
    ) -> impl Future<Output = Result<Vec<Chunk>>> + Send;

    /// Number of chunks stored for a file.
    fn count_chunks(&self, file_id: &str) -> impl Future<Output = Result<usize>> + Send;
}
