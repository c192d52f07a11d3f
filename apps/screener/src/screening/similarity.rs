//! Semantic similarity between an indexed candidate and a job text.
//!
//! The scoring core only sees `Arc<dyn SimilarityProvider>`. A candidate that
//! has not been indexed yet has similarity 0.0, which is a valid result.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;

#[async_trait]
pub trait SimilarityProvider: Send + Sync {
    /// Returns a value in [0, 1].
    async fn similarity(&self, candidate_id: Uuid, job_text: &str) -> Result<f64, AppError>;
}

/// Used when no embedding service is configured: nothing is indexed.
pub struct UnindexedSimilarity;

#[async_trait]
impl SimilarityProvider for UnindexedSimilarity {
    async fn similarity(&self, _candidate_id: Uuid, _job_text: &str) -> Result<f64, AppError> {
        Ok(0.0)
    }
}

#[derive(Debug, Serialize)]
struct SimilarityRequest<'a> {
    candidate_id: Uuid,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct SimilarityResponse {
    similarity: f64,
}

/// Client for the embedding service's `POST {base}/v1/similarity`.
/// A 404 means the candidate has no embedding yet.
#[derive(Clone)]
pub struct HttpSimilarityProvider {
    client: Client,
    base_url: String,
}

impl HttpSimilarityProvider {
    pub fn new(base_url: impl Into<String>) -> Result<Self, AppError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl SimilarityProvider for HttpSimilarityProvider {
    async fn similarity(&self, candidate_id: Uuid, job_text: &str) -> Result<f64, AppError> {
        let response = self
            .client
            .post(format!("{}/v1/similarity", self.base_url))
            .json(&SimilarityRequest {
                candidate_id,
                text: job_text,
            })
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("similarity request failed: {e}")))?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(%candidate_id, "Candidate not indexed, similarity 0");
            return Ok(0.0);
        }
        if !response.status().is_success() {
            return Err(AppError::ExternalService(format!(
                "similarity service returned {}",
                response.status()
            )));
        }

        let body: SimilarityResponse = response
            .json()
            .await
            .map_err(|e| AppError::ExternalService(format!("bad similarity response: {e}")))?;
        Ok(clamp_similarity(body.similarity))
    }
}

pub fn clamp_similarity(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unindexed_is_zero() {
        let s = UnindexedSimilarity
            .similarity(Uuid::new_v4(), "rust engineer")
            .await
            .unwrap();
        assert_eq!(s, 0.0);
    }

    #[test]
    fn test_clamp_similarity() {
        assert_eq!(clamp_similarity(1.7), 1.0);
        assert_eq!(clamp_similarity(-0.2), 0.0);
        assert_eq!(clamp_similarity(f64::NAN), 0.0);
        assert_eq!(clamp_similarity(0.42), 0.42);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let p = HttpSimilarityProvider::new("http://embeddings:9000/").unwrap();
        assert_eq!(p.base_url, "http://embeddings:9000");
    }
}
