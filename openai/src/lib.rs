//! OpenAI embeddings provider.
//!
//! Implements [`passaj_core::EmbeddingModel`] against the `/embeddings`
//! endpoint, classifying every HTTP failure into the shared error taxonomy
//! so the engine's retry policy can tell transient outages from terminal
//! misconfiguration.

mod client;
mod embedding;

pub use client::{Config, OpenAI};
