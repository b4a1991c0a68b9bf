//! HTTP client and configuration for the OpenAI API.

use std::sync::Arc;
use std::time::Duration;

use passaj_core::{Error, Result};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
const DEFAULT_EMBEDDING_DIMENSIONS: usize = 1536;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for the OpenAI API.
#[derive(Clone)]
pub struct Config {
    /// Bearer token.
    pub api_key: String,
    /// API root, without a trailing slash.
    pub base_url: String,
    /// Embedding model identifier.
    pub embedding_model: String,
    /// Vector length the chosen model produces.
    pub embedding_dimensions: usize,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("base_url", &self.base_url)
            .field("embedding_model", &self.embedding_model)
            .field("embedding_dimensions", &self.embedding_dimensions)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Creates a configuration with API defaults.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Overrides the API root (for proxies or compatible servers).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Selects a different embedding model and its dimension.
    #[must_use]
    pub fn with_embedding_model(mut self, model: impl Into<String>, dimensions: usize) -> Self {
        self.embedding_model = model.into();
        self.embedding_dimensions = dimensions;
        self
    }

    /// Overrides the per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn request_url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }
}

/// OpenAI API client implementing the embedding-provider contract.
#[derive(Clone)]
pub struct OpenAI {
    http: reqwest::Client,
    config: Arc<Config>,
}

impl std::fmt::Debug for OpenAI {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAI").field("config", &self.config).finish_non_exhaustive()
    }
}

impl OpenAI {
    /// Creates a client from a configuration.
    ///
    /// # Errors
    /// Fails when the underlying HTTP client cannot be constructed.
    pub fn new(config: Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::EmbeddingFailed(format!("HTTP client setup failed: {e}")))?;

        Ok(Self {
            http,
            config: Arc::new(config),
        })
    }

    /// Creates a client with default settings for an API key.
    ///
    /// # Errors
    /// Fails when the underlying HTTP client cannot be constructed.
    pub fn with_api_key(api_key: impl Into<String>) -> Result<Self> {
        Self::new(Config::new(api_key))
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::new("sk-test");
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert_eq!(config.embedding_model, "text-embedding-3-small");
        assert_eq!(config.embedding_dimensions, 1536);
    }

    #[test]
    fn request_url_joins_without_double_slash() {
        let config = Config::new("k").with_base_url("https://proxy.example/v1/");
        assert_eq!(
            config.request_url("/embeddings"),
            "https://proxy.example/v1/embeddings"
        );
    }

    #[test]
    fn debug_hides_api_key() {
        let config = Config::new("sk-secret");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("sk-secret"));
    }

    #[test]
    fn custom_model_updates_dimension() {
        let config = Config::new("k").with_embedding_model("text-embedding-3-large", 3072);
        assert_eq!(config.embedding_dimensions, 3072);
    }
}
