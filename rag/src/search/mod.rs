//! Retrieval internals: rank fusion, reference terms and the
//! broad-context fallback sampler.

pub(crate) mod fusion;

use passaj_core::Result;

use crate::query::QueryAnalysis;
use crate::store::IndexStore;
use crate::types::ScoredChunk;

/// Builds the literal search terms for figure/table references, covering
/// the English and Turkish spellings that occur in document bodies.
pub(crate) fn reference_terms(analysis: &QueryAnalysis) -> Vec<String> {
    let mut terms = Vec::new();
    for figure in &analysis.figure_refs {
        terms.push(format!("Figure {figure}"));
        terms.push(format!("Fig. {figure}"));
        terms.push(format!("Şekil {figure}"));
    }
    for table in &analysis.table_refs {
        terms.push(format!("Table {table}"));
        terms.push(format!("Tablo {table}"));
    }
    terms
}

/// Samples chunks from the beginning, middle and end of a document when
/// fused retrieval came back empty.
///
/// Returns up to `3 * max(1, top_k / 3)` distinct chunks in chunk order,
/// all with zero scores. The result is never fused with anything.
pub(crate) async fn broad_context<S: IndexStore>(
    store: &S,
    file_id: &str,
    top_k: usize,
) -> Result<Vec<ScoredChunk>> {
    let slice_size = (top_k / 3).max(1);
    let total = store.count_chunks(file_id).await?;
    if total == 0 {
        return Ok(Vec::new());
    }

    let middle_offset = total.saturating_sub(slice_size) / 2;
    let end_offset = total.saturating_sub(slice_size);

    let mut chunks = store.fetch_slice(file_id, 0, slice_size, true).await?;
    chunks.extend(store.fetch_slice(file_id, middle_offset, slice_size, true).await?);
    chunks.extend(store.fetch_slice(file_id, end_offset, slice_size, true).await?);

    chunks.sort_by_key(|c| c.chunk_index);
    chunks.dedup_by_key(|c| c.chunk_index);

    Ok(chunks.into_iter().map(ScoredChunk::unscored).collect())
}

#[cfg(test)]
mod tests {
    use crate::query::analyze;
    use crate::store::{MemoryIndexStore, StoredEntry};
    use crate::types::{Chunk, ContentType};
    use std::collections::BTreeSet;
    use uuid::Uuid;

    use super::*;

    #[test]
    fn reference_terms_cover_both_languages() {
        let analysis = analyze("compare Figure 2-1 with Table 3");
        let terms = reference_terms(&analysis);
        assert!(terms.contains(&"Figure 2-1".to_string()));
        assert!(terms.contains(&"Fig. 2-1".to_string()));
        assert!(terms.contains(&"Şekil 2-1".to_string()));
        assert!(terms.contains(&"Table 3".to_string()));
        assert!(terms.contains(&"Tablo 3".to_string()));
    }

    #[test]
    fn no_references_no_terms() {
        let analysis = analyze("plain question");
        assert!(reference_terms(&analysis).is_empty());
    }

    fn entry(index: usize) -> StoredEntry {
        StoredEntry::new(
            Chunk {
                id: Uuid::new_v4(),
                file_id: "f".into(),
                chunk_index: index,
                content: format!("chunk number {index}"),
                page_number: 1,
                start_page: 1,
                end_page: 1,
                section_title: None,
                content_type: ContentType::Text,
                contains_table: false,
                contains_list: false,
                image_references: BTreeSet::new(),
            },
            vec![1.0, 0.0],
        )
    }

    #[tokio::test]
    async fn broad_context_samples_three_regions() {
        let store = MemoryIndexStore::new();
        store
            .upsert_chunks((0..30).map(entry).collect())
            .await
            .unwrap();

        let sampled = broad_context(&store, "f", 9).await.unwrap();
        // Three disjoint slices of three chunks each.
        assert_eq!(sampled.len(), 9);
        let indices: Vec<usize> = sampled.iter().map(|s| s.chunk.chunk_index).collect();
        assert_eq!(indices, vec![0, 1, 2, 13, 14, 15, 27, 28, 29]);
        assert!(sampled.iter().all(|s| s.rrf_score == 0.0));
    }

    #[tokio::test]
    async fn broad_context_deduplicates_overlapping_slices() {
        let store = MemoryIndexStore::new();
        store
            .upsert_chunks((0..2).map(entry).collect())
            .await
            .unwrap();

        let sampled = broad_context(&store, "f", 9).await.unwrap();
        assert_eq!(sampled.len(), 2);
    }

    #[tokio::test]
    async fn broad_context_empty_store() {
        let store = MemoryIndexStore::new();
        let sampled = broad_context(&store, "missing", 9).await.unwrap();
        assert!(sampled.is_empty());
    }
}
