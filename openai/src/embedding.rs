//! Embedding requests against the `/embeddings` endpoint.

use core::future::Future;

use passaj_core::{EmbeddingModel, Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::OpenAI;

impl EmbeddingModel for OpenAI {
    fn dim(&self) -> usize {
        self.config().embedding_dimensions
    }

    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>>> + Send {
        let config = self.config();
        let http = self.http().clone();
        let input = text.to_owned();

        async move {
            let request = EmbeddingRequest {
                model: &config.embedding_model,
                input: &input,
            };

            let response = http
                .post(config.request_url("/embeddings"))
                .bearer_auth(&config.api_key)
                .json(&request)
                .send()
                .await
                .map_err(classify_transport)?;

            let status = response.status();
            if !status.is_success() {
                debug!(status = status.as_u16(), "embedding request rejected");
                return Err(Error::classify_status(status.as_u16()));
            }

            let body: EmbeddingResponse = response
                .json()
                .await
                .map_err(|e| Error::ParseFailed(e.to_string()))?;

            body.data
                .into_iter()
                .next()
                .map(|item| item.embedding)
                .ok_or_else(|| Error::EmbeddingFailed("response missing vector data".into()))
        }
    }
}

/// Transport-level failures (no HTTP status to classify) count as a
/// transient provider outage.
fn classify_transport(err: reqwest::Error) -> Error {
    debug!(%err, "embedding request transport failure");
    Error::ProviderUnavailable
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}
