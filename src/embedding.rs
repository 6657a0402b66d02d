//! Remote embedding client.
//!
//! Defines the [`Embedder`] seam and the [`RemoteEmbedder`] implementation
//! that calls an OpenAI-compatible `POST {endpoint}/v1/embeddings` endpoint.
//! There is no retry, backoff, or caching: a failed call maps to
//! [`Error::RemoteService`] and propagates to the caller.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::config::OpenAiConfig;
use crate::error::{remote_error_message, Error, Result};

/// Request timeout for embedding calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Text-to-vector capability.
///
/// One narrow interface per remote collaborator, so a test double can stand
/// in without a live network dependency.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed one text into a fixed-length vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Vector dimensionality this embedder produces.
    fn dims(&self) -> usize;
}

/// Embedder backed by a hosted embedding model.
pub struct RemoteEmbedder {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    dims: usize,
}

impl RemoteEmbedder {
    pub fn new(config: &OpenAiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::remote("embedding", e.to_string()))?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            model: config.embedding_model.clone(),
            dims: config.embedding_dims,
        })
    }
}

#[async_trait]
impl Embedder for RemoteEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": [text],
        });

        let response = self
            .http
            .post(format!("{}/v1/embeddings", self.endpoint))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::remote("embedding", e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(Error::remote(
                "embedding",
                format!("HTTP {}: {}", status, remote_error_message(&body_text)),
            ));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| Error::remote("embedding", e.to_string()))?;

        let vector = parse_embedding_response(&payload, self.dims)?;
        debug!(model = %self.model, dims = vector.len(), "embedded text");
        Ok(vector)
    }

    fn dims(&self) -> usize {
        self.dims
    }
}

/// Extract the first embedding vector from an embeddings response and check
/// its width against the configured dimensionality.
fn parse_embedding_response(payload: &Value, dims: usize) -> Result<Vec<f32>> {
    let embedding = payload
        .get("data")
        .and_then(Value::as_array)
        .and_then(|data| data.first())
        .and_then(|item| item.get("embedding"))
        .and_then(Value::as_array)
        .ok_or_else(|| {
            Error::remote("embedding", "malformed response: missing data[0].embedding")
        })?;

    let vector: Vec<f32> = embedding
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
        .collect();

    if vector.len() != dims {
        return Err(Error::remote(
            "embedding",
            format!("expected a {}-dimension vector, got {}", dims, vector.len()),
        ));
    }

    Ok(vector)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_embedding_response() {
        let payload = json!({ "data": [ { "embedding": [0.1, 0.2, 0.3] } ] });
        let vector = parse_embedding_response(&payload, 3).unwrap();
        assert_eq!(vector.len(), 3);
        assert!((vector[1] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_parse_missing_data_fails() {
        let payload = json!({ "object": "list" });
        let err = parse_embedding_response(&payload, 3).unwrap_err();
        assert!(err.to_string().contains("malformed response"));
    }

    #[test]
    fn test_parse_wrong_width_fails() {
        let payload = json!({ "data": [ { "embedding": [0.1, 0.2] } ] });
        let err = parse_embedding_response(&payload, 1536).unwrap_err();
        assert!(err.to_string().contains("1536"));
    }
}
