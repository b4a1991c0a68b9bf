//! Shared contracts for the passaj workspace.
//!
//! `passaj-core` hosts the pieces every other crate agrees on: the
//! [`EmbeddingModel`] trait that providers implement, and the unified
//! [`Error`] taxonomy that the engine surfaces to callers.
//!
//! Provider crates (such as `passaj-openai`) implement [`EmbeddingModel`];
//! the engine crate (`passaj-rag`) consumes it behind its caching layer and
//! maps every failure into [`Error`].

pub mod embedding;
pub mod error;

pub use embedding::{Embedding, EmbeddingModel};
pub use error::{Error, Result};
