//! Core types for passage retrieval.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Classification of what a chunk predominantly contains.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    /// Plain running text.
    Text,
    /// A marked table region.
    Table,
    /// A bulleted or numbered list.
    List,
    /// Both table and list content.
    Mixed,
    /// The chunk opens with a detected heading.
    Heading,
}

/// Metadata for an image extracted from a document page.
///
/// Chunks reference images by id only; nothing points back.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImageRef {
    /// Stable identifier of the image record.
    pub id: Uuid,
    /// Page the image sits on.
    pub page_number: u32,
}

impl ImageRef {
    /// Creates a new image reference.
    #[must_use]
    pub const fn new(id: Uuid, page_number: u32) -> Self {
        Self { id, page_number }
    }
}

/// The unit of retrieval: a contiguous span of document text with metadata.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Chunk {
    /// Stable identity assigned at creation.
    pub id: Uuid,
    /// Owning document.
    pub file_id: String,
    /// Dense, strictly increasing position within the file, starting at 0.
    pub chunk_index: usize,
    /// Text content; sentences joined by single spaces.
    pub content: String,
    /// Nominal page: the page of the first content sentence.
    pub page_number: u32,
    /// First page any content sat on.
    pub start_page: u32,
    /// Last page any content sat on (`end_page >= start_page`).
    pub end_page: u32,
    /// Nearest heading above this chunk at creation time.
    pub section_title: Option<String>,
    /// Dominant content classification.
    pub content_type: ContentType,
    /// A table appears somewhere in the chunk, whatever `content_type` says.
    pub contains_table: bool,
    /// A list appears somewhere in the chunk.
    pub contains_list: bool,
    /// Ids of images whose page lies within `[start_page, end_page]`.
    pub image_references: BTreeSet<Uuid>,
}

impl Chunk {
    /// Number of space-separated words in the content.
    #[must_use]
    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }

    /// Returns `true` if the chunk spans more than one page.
    #[must_use]
    pub const fn spans_pages(&self) -> bool {
        self.start_page != self.end_page
    }
}

/// A chunk together with the scores it accumulated during retrieval.
#[derive(Clone, Debug)]
pub struct ScoredChunk {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// Cosine similarity from the vector sub-query, 0 when absent.
    pub vector_score: f32,
    /// BM25 score from the lexical sub-query, 0 when absent.
    pub bm25_score: f32,
    /// Fused Reciprocal Rank Fusion score.
    pub rrf_score: f32,
    /// Optional post-fusion rerank score; wins over `rrf_score` when set.
    pub rerank_score: Option<f32>,
}

impl ScoredChunk {
    /// Wraps a chunk with all scores zeroed, as used by the broad-context
    /// fallback.
    #[must_use]
    pub const fn unscored(chunk: Chunk) -> Self {
        Self {
            chunk,
            vector_score: 0.0,
            bm25_score: 0.0,
            rrf_score: 0.0,
            rerank_score: None,
        }
    }

    /// The score retrieval consumers should order by.
    #[must_use]
    pub fn final_score(&self) -> f32 {
        self.rerank_score.unwrap_or(self.rrf_score)
    }
}

/// The result of a retrieval call: a formatted context plus its provenance.
#[derive(Clone, Debug)]
pub struct RetrievedContext {
    /// The formatted, token-budgeted context string.
    pub context: String,
    /// Sorted set of pages the selected chunks came from.
    pub source_pages: BTreeSet<u32>,
    /// Number of chunks that made it into the context.
    pub chunk_count: usize,
}

impl RetrievedContext {
    /// An empty result, returned when even the broad-context fallback
    /// produced nothing.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            context: String::new(),
            source_pages: BTreeSet::new(),
            chunk_count: 0,
        }
    }
}
