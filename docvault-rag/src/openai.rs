//! Embedding provider for OpenAI-compatible `/embeddings` endpoints.
//!
//! Besides the OpenAI API itself this covers self-hosted servers that speak
//! the same protocol (text-embeddings-inference, vLLM, vecboost, ...), which is
//! how a local BGE-M3 model is usually served.
//!
//! This module is only available when the `remote` feature is enabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

/// Model requested unless [`OpenAIEmbeddingProvider::with_model`] says otherwise.
pub const DEFAULT_MODEL: &str = "BAAI/bge-m3";

/// Dense output size of BGE-M3.
const DEFAULT_DIMENSIONS: usize = 1024;

const PROVIDER: &str = "openai-compatible";

/// An [`EmbeddingProvider`] backed by an OpenAI-compatible embeddings API.
///
/// Inputs are sent in one request; the response is re-ordered by its `index`
/// field, so servers that answer out of order are handled.
///
/// # Example
///
/// ```rust,ignore
/// use docvault_rag::openai::OpenAIEmbeddingProvider;
///
/// let provider = OpenAIEmbeddingProvider::new("http://localhost:8080/v1")
///     .with_model("BAAI/bge-m3")
///     .with_dimensions(1024);
/// let vectors = provider.embed_batch(&["第一条", "第二条"]).await?;
/// ```
pub struct OpenAIEmbeddingProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    dimensions: usize,
    /// Sent as `dimensions` when set.
    request_dimensions: Option<usize>,
}

impl OpenAIEmbeddingProvider {
    /// Create a provider for the API rooted at `base_url`.
    pub fn new(base_url: impl AsRef<str>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}/embeddings", base_url.as_ref().trim_end_matches('/')),
            api_key: None,
            model: DEFAULT_MODEL.into(),
            dimensions: DEFAULT_DIMENSIONS,
            request_dimensions: None,
        }
    }

    /// Set the bearer token. Empty keys are ignored.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        self.api_key = (!api_key.is_empty()).then_some(api_key);
        self
    }

    /// Model name passed through to the server.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Declare the embedding size the model produces, without asking the API
    /// to truncate.
    pub fn with_native_dimensions(mut self, dims: usize) -> Self {
        self.dimensions = dims;
        self
    }

    /// Ask the server to truncate vectors to `dims`. Only Matryoshka-trained
    /// models honour this.
    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.dimensions = dims;
        self.request_dimensions = Some(dims);
        self
    }

    fn error(message: String) -> RagError {
        RagError::EmbeddingError { provider: PROVIDER.into(), message }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            provider = PROVIDER,
            batch_size = texts.len(),
            model = %self.model,
            "embedding batch"
        );

        let body = EmbeddingRequest {
            model: &self.model,
            input: texts,
            dimensions: self.request_dimensions,
        };
        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "request failed");
            Self::error(format!("request failed: {e}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let detail =
                serde_json::from_str::<ErrorResponse>(&raw).map(|e| e.error.message).unwrap_or(raw);
            error!(provider = PROVIDER, %status, "embedding API error");
            return Err(Self::error(format!("API returned {status}: {detail}")));
        }

        let EmbeddingResponse { mut data } = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            Self::error(format!("failed to parse response: {e}"))
        })?;
        if data.len() != texts.len() {
            return Err(Self::error(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                data.len()
            )));
        }

        data.sort_by_key(|d| d.index);
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}
