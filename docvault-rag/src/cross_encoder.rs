//! Cross-encoder reranker served over HTTP.
//!
//! Talks to the `/rerank` route of text-embeddings-inference (and servers that
//! mirror it) hosting a model such as `BAAI/bge-reranker-v2-m3`.
//!
//! This module is only available when the `remote` feature is enabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{RagError, Result};
use crate::reranker::Reranker;

const RERANKER: &str = "cross-encoder";

/// A [`Reranker`] that scores (query, text) pairs on a remote cross-encoder.
///
/// Scores are requested normalized (`raw_scores: false`), i.e. in `[0, 1]`.
///
/// # Example
///
/// ```rust,ignore
/// use docvault_rag::cross_encoder::CrossEncoderReranker;
///
/// let reranker = CrossEncoderReranker::new("http://localhost:8081");
/// let scores = reranker.score("what is BGE M3?", &["BM25 definition", "BGE M3 is ..."]).await?;
/// ```
pub struct CrossEncoderReranker {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl CrossEncoderReranker {
    /// Create a reranker for the server rooted at `base_url`.
    pub fn new(base_url: impl AsRef<str>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}/rerank", base_url.as_ref().trim_end_matches('/')),
            api_key: None,
        }
    }

    /// Set the bearer token. Empty keys are ignored.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        self.api_key = (!api_key.is_empty()).then_some(api_key);
        self
    }

    fn error(message: String) -> RagError {
        RagError::RerankerError { reranker: RERANKER.into(), message }
    }
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    query: &'a str,
    texts: &'a [&'a str],
    raw_scores: bool,
}

#[derive(Deserialize)]
struct RankedText {
    index: usize,
    score: f32,
}

#[async_trait]
impl Reranker for CrossEncoderReranker {
    async fn score(&self, query: &str, candidates: &[&str]) -> Result<Vec<f32>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        debug!(reranker = RERANKER, candidates = candidates.len(), "scoring candidates");

        let body = RerankRequest { query, texts: candidates, raw_scores: false };
        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(|e| {
            error!(reranker = RERANKER, error = %e, "request failed");
            Self::error(format!("request failed: {e}"))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            error!(reranker = RERANKER, %status, "rerank API error");
            return Err(Self::error(format!("API returned {status}: {detail}")));
        }

        let ranked: Vec<RankedText> = response.json().await.map_err(|e| {
            error!(reranker = RERANKER, error = %e, "failed to parse response");
            Self::error(format!("failed to parse response: {e}"))
        })?;

        let mut scores = vec![None; candidates.len()];
        for item in ranked {
            let slot = scores
                .get_mut(item.index)
                .ok_or_else(|| Self::error(format!("score index {} out of range", item.index)))?;
            *slot = Some(item.score);
        }
        scores
            .into_iter()
            .enumerate()
            .map(|(i, s)| s.ok_or_else(|| Self::error(format!("missing score for candidate {i}"))))
            .collect()
    }

    fn name(&self) -> &str {
        RERANKER
    }
}
