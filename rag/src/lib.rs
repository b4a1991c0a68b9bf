//! Hybrid passage retrieval for reader documents.
//!
//! This crate turns cleaned page text into retrieval units and answers
//! natural-language queries with an ordered, token-budgeted context string
//! ready for an LLM prompt. It provides:
//!
//! - **Normalization** of raw page text (ligatures, hyphenation, table
//!   marking, page markers)
//! - **Structure-aware chunking** with section titles, page spans,
//!   table/list detection and near-duplicate elimination
//! - **Cached embeddings** behind a two-tier (memory LRU + disk TTL) cache
//!   with rate-limited batch fetches
//! - **Hybrid search** fusing BM25, vector, page-number and figure/table
//!   lookups with Reciprocal Rank Fusion
//! - **Context building** with numbered citations and metadata badges
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use passaj_rag::{Engine, EngineConfig, MemoryIndexStore};
//! use passaj_core::EmbeddingModel;
//!
//! async fn example<M: EmbeddingModel>(model: M) -> passaj_core::Result<()> {
//!     let engine = Engine::builder(model, MemoryIndexStore::new())
//!         .config(EngineConfig::default())
//!         .build()?;
//!
//!     let pages = vec![(1, "# Giriş\n\nBu bölüm sistemi tanıtır.".to_string())];
//!     engine.ingest("file-1", &pages, &[]).await?;
//!
//!     let answer = engine.retrieve("file-1", "sistemi özetle", 2000).await?;
//!     println!("{}", answer.context);
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`normalize`] - page-text cleanup applied before chunking
//! - [`chunking`] - sentence segmentation and chunk assembly
//! - [`embedding`] - the caching embedding service
//! - [`query`] - structural-reference and language analysis of user queries
//! - [`search`] - rank fusion internals
//! - [`store`] - the index-store contract and the in-memory backend
//! - [`context`] - prompt-context serialization
//!
//! The main entry point is [`Engine`], which owns the caches and the index
//! store and exposes ingestion, retrieval and cache administration.

pub mod chunking;
pub mod config;
pub mod context;
pub mod embedding;
mod engine;
pub mod normalize;
pub mod query;
pub mod search;
pub mod store;
pub mod types;

pub use chunking::DocumentChunker;
pub use config::{EngineConfig, EngineConfigBuilder};
pub use context::ContextBuilder;
pub use embedding::{CacheStats, EmbeddingService};
pub use engine::{Engine, EngineBuilder, IngestProgress, IngestStage};
pub use normalize::{NormalizeOptions, normalize, normalize_pages};
pub use query::{QueryAnalysis, QueryLanguage, analyze};
pub use store::{IndexStore, MemoryIndexStore, RedbSnapshot, StoredEntry};
pub use types::{Chunk, ContentType, ImageRef, RetrievedContext, ScoredChunk};
