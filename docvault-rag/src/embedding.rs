//! Embedding provider trait for generating vector embeddings from text.

use async_trait::async_trait;

use crate::error::{RagError, Result};

/// A provider that generates vector embeddings from text input.
///
/// Implementations wrap a specific embedding backend behind a unified async
/// interface. Ingestion embeds all chunks of a document in a single
/// [`embed_batch`](EmbeddingProvider::embed_batch) call, so backends that
/// support native batching should implement it directly.
///
/// # Example
///
/// ```rust,ignore
/// use docvault_rag::EmbeddingProvider;
///
/// let provider = MyEmbeddingProvider::new();
/// let embeddings = provider.embed_batch(&["hello", "world"]).await?;
/// assert_eq!(embeddings[0].len(), provider.dimensions());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embedding vectors for a batch of text inputs, in input order.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Generate an embedding vector for a single text input.
    ///
    /// The default implementation sends a one-element batch.
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text]).await?.into_iter().next().ok_or_else(|| {
            RagError::EmbeddingError {
                provider: self.name().to_string(),
                message: "provider returned no embedding".into(),
            }
        })
    }

    /// Return the dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;

    /// Short backend name used in errors and logs.
    fn name(&self) -> &str {
        "embedding"
    }
}
