//! In-memory reference backend for the index store.
//!
//! Rows live in per-file tables. Vector search runs over an HNSW graph of
//! unit-normalized embeddings that is dropped on every write and rebuilt
//! lazily on the next search; lexical search is an in-file Okapi BM25 over
//! per-row term counts. Good for single-process readers and tests;
//! durability comes from snapshotting through [`super::RedbSnapshot`].

use std::collections::HashMap;

use instant_distance::{Builder, HnswMap, Point, Search};
use ordered_float::OrderedFloat;
use parking_lot::RwLock;
use passaj_core::{Error, Result};

use crate::types::Chunk;

use super::StoredEntry;

/// Okapi BM25 term-frequency saturation.
const BM25_K1: f32 = 1.2;
/// Okapi BM25 length normalization.
const BM25_B: f32 = 0.75;

/// An embedding scaled to unit length when it enters the graph, so cosine
/// similarity collapses to a plain dot product.
#[derive(Clone, Debug)]
struct UnitVector(Vec<f32>);

impl UnitVector {
    fn from_raw(raw: &[f32]) -> Self {
        let norm = raw.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm == 0.0 {
            // A zero vector stays zero and matches nothing.
            return Self(raw.to_vec());
        }
        Self(raw.iter().map(|v| v / norm).collect())
    }

    fn dot(&self, other: &Self) -> f32 {
        self.0.iter().zip(&other.0).map(|(a, b)| a * b).sum()
    }
}

impl Point for UnitVector {
    fn distance(&self, other: &Self) -> f32 {
        1.0 - self.dot(other)
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// All rows of one file, plus the derived search structures.
struct FileTable {
    rows: Vec<StoredEntry>,
    /// Per-row term counts for BM25, parallel to `rows`.
    term_counts: Vec<HashMap<String, usize>>,
    /// Nearest-neighbour graph keyed by row position. Any write clears it;
    /// the next search pays for the rebuild.
    graph: Option<HnswMap<UnitVector, usize>>,
}

impl FileTable {
    fn new() -> Self {
        Self {
            rows: Vec::new(),
            term_counts: Vec::new(),
            graph: None,
        }
    }

    fn upsert(&mut self, entry: StoredEntry) {
        let counts = term_count(&tokenize(&entry.chunk.content));
        match self
            .rows
            .iter()
            .position(|row| row.chunk.chunk_index == entry.chunk.chunk_index)
        {
            Some(at) => {
                self.rows[at] = entry;
                self.term_counts[at] = counts;
            }
            None => {
                self.rows.push(entry);
                self.term_counts.push(counts);
            }
        }
        self.graph = None;
    }

    /// The nearest-neighbour graph, building it first if a write (or this
    /// being the first search) left it absent.
    fn graph(&mut self) -> Option<&HnswMap<UnitVector, usize>> {
        if self.rows.is_empty() {
            return None;
        }
        if self.graph.is_none() {
            let (points, row_keys): (Vec<UnitVector>, Vec<usize>) = self
                .rows
                .iter()
                .enumerate()
                .map(|(at, row)| (UnitVector::from_raw(&row.embedding), at))
                .unzip();
            self.graph = Some(Builder::default().build(points, row_keys));
        }
        self.graph.as_ref()
    }

    fn sorted_chunks(&self, ascending: bool) -> Vec<&Chunk> {
        let mut chunks: Vec<&Chunk> = self.rows.iter().map(|row| &row.chunk).collect();
        chunks.sort_by_key(|c| c.chunk_index);
        if !ascending {
            chunks.reverse();
        }
        chunks
    }

    #[allow(clippy::cast_precision_loss)]
    fn bm25(&self, query_terms: &[String], k: usize) -> Vec<(Chunk, f32)> {
        let total_docs = self.rows.len();
        if total_docs == 0 || query_terms.is_empty() {
            return Vec::new();
        }

        let doc_lens: Vec<usize> = self
            .term_counts
            .iter()
            .map(|counts| counts.values().sum())
            .collect();
        let avg_len = doc_lens.iter().sum::<usize>() as f32 / total_docs as f32;

        let mut scored: Vec<(Chunk, f32)> = Vec::new();
        for (at, row) in self.rows.iter().enumerate() {
            let mut score = 0.0f32;
            for term in query_terms {
                let tf = *self.term_counts[at].get(term).unwrap_or(&0) as f32;
                if tf == 0.0 {
                    continue;
                }
                let df = self
                    .term_counts
                    .iter()
                    .filter(|counts| counts.contains_key(term))
                    .count() as f32;
                let idf =
                    ((total_docs as f32 - df + 0.5) / (df + 0.5) + 1.0).ln();
                let len_norm = 1.0 - BM25_B + BM25_B * doc_lens[at] as f32 / avg_len.max(1.0);
                score += idf * tf * (BM25_K1 + 1.0) / (tf + BM25_K1 * len_norm);
            }
            if score > 0.0 {
                scored.push((row.chunk.clone(), score));
            }
        }

        scored.sort_by_key(|(chunk, score)| {
            (std::cmp::Reverse(OrderedFloat(*score)), chunk.chunk_index)
        });
        scored.truncate(k);
        scored
    }
}

fn term_count(tokens: &[String]) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for token in tokens {
        *counts.entry(token.clone()).or_insert(0) += 1;
    }
    counts
}

/// The in-memory reference implementation of the index store.
pub struct MemoryIndexStore {
    files: RwLock<HashMap<String, FileTable>>,
}

impl std::fmt::Debug for MemoryIndexStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let files = self.files.read();
        f.debug_struct("MemoryIndexStore")
            .field("files", &files.len())
            .finish()
    }
}

impl Default for MemoryIndexStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryIndexStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            files: RwLock::new(HashMap::new()),
        }
    }

    /// Returns every stored entry, for snapshot persistence.
    #[must_use]
    pub fn snapshot(&self) -> Vec<StoredEntry> {
        let files = self.files.read();
        let mut entries: Vec<StoredEntry> = files
            .values()
            .flat_map(|table| table.rows.iter().cloned())
            .collect();
        entries.sort_by(|a, b| {
            (a.chunk.file_id.as_str(), a.chunk.chunk_index)
                .cmp(&(b.chunk.file_id.as_str(), b.chunk.chunk_index))
        });
        entries
    }

    /// Replaces the store contents with a previously taken snapshot.
    pub fn restore(&self, entries: Vec<StoredEntry>) -> Result<()> {
        let mut files = self.files.write();
        files.clear();
        for entry in entries {
            validate_dimension(files.get(entry.chunk.file_id.as_str()), &entry)?;
            files
                .entry(entry.chunk.file_id.clone())
                .or_insert_with(FileTable::new)
                .upsert(entry);
        }
        Ok(())
    }
}

fn validate_dimension(table: Option<&FileTable>, entry: &StoredEntry) -> Result<()> {
    if let Some(existing) = table.and_then(|t| t.rows.first()) {
        if existing.embedding.len() != entry.embedding.len() {
            return Err(Error::Storage(format!(
                "embedding dimension mismatch: expected {}, got {}",
                existing.embedding.len(),
                entry.embedding.len()
            )));
        }
    }
    Ok(())
}

impl super::IndexStore for MemoryIndexStore {
    async fn upsert_chunks(&self, entries: Vec<StoredEntry>) -> Result<()> {
        let mut files = self.files.write();
        for entry in entries {
            validate_dimension(files.get(entry.chunk.file_id.as_str()), &entry)?;
            files
                .entry(entry.chunk.file_id.clone())
                .or_insert_with(FileTable::new)
                .upsert(entry);
        }
        Ok(())
    }

    async fn delete_file(&self, file_id: &str) -> Result<usize> {
        let mut files = self.files.write();
        Ok(files.remove(file_id).map_or(0, |table| table.rows.len()))
    }

    async fn vector_search(
        &self,
        file_id: &str,
        query: &[f32],
        k: usize,
        threshold: f32,
    ) -> Result<Vec<(Chunk, f32)>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut files = self.files.write();
        let Some(table) = files.get_mut(file_id) else {
            return Ok(Vec::new());
        };

        let needle = UnitVector::from_raw(query);
        let Some(graph) = table.graph() else {
            return Ok(Vec::new());
        };

        // Candidates arrive nearest first, so everything past the first
        // row under the floor is under it too.
        let mut cursor = Search::default();
        let mut hits: Vec<(usize, f32)> = graph
            .search(&needle, &mut cursor)
            .map(|found| (*found.value, 1.0 - found.distance))
            .take_while(|(_, similarity)| *similarity >= threshold)
            .take(k)
            .collect();

        hits.sort_unstable_by(|a, b| {
            b.1.total_cmp(&a.1).then_with(|| {
                let left = table.rows[a.0].chunk.chunk_index;
                let right = table.rows[b.0].chunk.chunk_index;
                left.cmp(&right)
            })
        });

        Ok(hits
            .into_iter()
            .map(|(at, similarity)| (table.rows[at].chunk.clone(), similarity))
            .collect())
    }

    async fn bm25_search(&self, file_id: &str, query: &str, k: usize) -> Result<Vec<(Chunk, f32)>> {
        let files = self.files.read();
        let Some(table) = files.get(file_id) else {
            return Ok(Vec::new());
        };
        Ok(table.bm25(&tokenize(query), k))
    }

    async fn fetch_by_pages(&self, file_id: &str, pages: &[u32], k: usize) -> Result<Vec<Chunk>> {
        let files = self.files.read();
        let Some(table) = files.get(file_id) else {
            return Ok(Vec::new());
        };
        Ok(table
            .sorted_chunks(true)
            .into_iter()
            .filter(|c| pages.contains(&c.page_number))
            .take(k)
            .cloned()
            .collect())
    }

    async fn fetch_by_content(
        &self,
        file_id: &str,
        terms: &[String],
        k: usize,
    ) -> Result<Vec<Chunk>> {
        let files = self.files.read();
        let Some(table) = files.get(file_id) else {
            return Ok(Vec::new());
        };
        let lowered: Vec<String> = terms.iter().map(|t| t.to_lowercase()).collect();
        Ok(table
            .sorted_chunks(true)
            .into_iter()
            .filter(|c| {
                let content = c.content.to_lowercase();
                lowered.iter().any(|term| content.contains(term))
            })
            .take(k)
            .cloned()
            .collect())
    }

    async fn fetch_slice(
        &self,
        file_id: &str,
        offset: usize,
        limit: usize,
        ascending: bool,
    ) -> Result<Vec<Chunk>> {
        let files = self.files.read();
        let Some(table) = files.get(file_id) else {
            return Ok(Vec::new());
        };
        Ok(table
            .sorted_chunks(ascending)
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count_chunks(&self, file_id: &str) -> Result<usize> {
        let files = self.files.read();
        Ok(files.get(file_id).map_or(0, |table| table.rows.len()))
    }
}
