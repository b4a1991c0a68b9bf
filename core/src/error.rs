//! The unified error taxonomy surfaced by the engine.

use thiserror::Error;

/// Errors that can occur in retrieval operations.
///
/// Embedding-provider failures are classified per HTTP status before any
/// retry decision; [`Error::is_terminal`] tells the retry policy which
/// kinds must not be retried.
#[derive(Debug, Error)]
pub enum Error {
    /// Terminal failure to obtain a vector (e.g. the provider responded
    /// without one).
    #[error("embedding failed: {0}")]
    EmbeddingFailed(String),

    /// The external provider refused the configured credentials (HTTP 401/403).
    #[error("embedding provider rejected credentials")]
    AuthForbidden,

    /// Provider rate limit hit (HTTP 429); the caller may back off and retry.
    #[error("embedding provider rate limit exceeded")]
    RateLimited,

    /// Transient provider outage (HTTP 5xx or an unreachable host).
    #[error("embedding provider unavailable")]
    ProviderUnavailable,

    /// Any other non-2xx HTTP failure.
    #[error("unexpected HTTP status {0}")]
    NetworkServer(u16),

    /// The provider returned a response the client could not decode.
    #[error("malformed provider response: {0}")]
    ParseFailed(String),

    /// The vector sub-query failed; no sensible fusion is possible.
    #[error("vector search failed: {0}")]
    SearchFailed(String),

    /// The file has no chunks in the index store.
    #[error("file {0} is not indexed")]
    NotIndexed(String),

    /// The context builder ran out of room before emitting any chunk.
    #[error("token budget {budget} too small for any passage")]
    TokenLimitExceeded {
        /// The budget that was exhausted.
        budget: usize,
    },

    /// Index snapshot persistence failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// IO operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Classifies a non-2xx HTTP status from the embedding provider.
    #[must_use]
    pub const fn classify_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::AuthForbidden,
            429 => Self::RateLimited,
            500..=599 => Self::ProviderUnavailable,
            other => Self::NetworkServer(other),
        }
    }

    /// Returns `true` for kinds that must not be retried.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::AuthForbidden | Self::ParseFailed(_))
    }
}

/// Result type alias for retrieval operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert!(matches!(Error::classify_status(401), Error::AuthForbidden));
        assert!(matches!(Error::classify_status(403), Error::AuthForbidden));
        assert!(matches!(Error::classify_status(429), Error::RateLimited));
        assert!(matches!(
            Error::classify_status(503),
            Error::ProviderUnavailable
        ));
        assert!(matches!(
            Error::classify_status(418),
            Error::NetworkServer(418)
        ));
    }

    #[test]
    fn terminal_kinds() {
        assert!(Error::AuthForbidden.is_terminal());
        assert!(Error::ParseFailed("bad json".into()).is_terminal());
        assert!(!Error::RateLimited.is_terminal());
        assert!(!Error::ProviderUnavailable.is_terminal());
        assert!(!Error::EmbeddingFailed("no vector".into()).is_terminal());
    }
}
