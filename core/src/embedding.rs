//! The embedding-provider contract.
//!
//! An embedding model turns arbitrary text into a fixed-length vector of
//! 32-bit floats. The engine never calls a provider directly; it goes
//! through its caching service, which relies on this trait as the seam to
//! the outside world.

use core::future::Future;

use crate::error::Result;

/// A fixed-length vector of 32-bit floats produced by an embedding model.
pub type Embedding = Vec<f32>;

/// Converts text to vector representations.
///
/// Implementations typically wrap a remote HTTP API. They must classify
/// transport and status failures into the [`crate::Error`] taxonomy so the
/// caller's retry policy can distinguish terminal kinds from transient ones.
///
/// # Implementation Requirements
///
/// - [`embed`](EmbeddingModel::embed) must return vectors with length equal
///   to [`dim`](EmbeddingModel::dim).
/// - The same input text must map to the same vector for the lifetime of
///   the configured model.
pub trait EmbeddingModel: Send + Sync {
    /// Returns the embedding vector dimension.
    fn dim(&self) -> usize;

    /// Converts text to an embedding vector.
    fn embed(&self, text: &str) -> impl Future<Output = Result<Embedding>> + Send;
}
