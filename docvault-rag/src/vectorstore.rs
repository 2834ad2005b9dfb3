//! Vector store trait for storing, filtering and searching chunk embeddings.

use async_trait::async_trait;

use crate::document::{Chunk, CollectionInfo, QueryHit};
use crate::error::Result;
use crate::filter::MetadataFilter;

/// A storage backend for chunk embeddings with filtered similarity search.
///
/// Implementations manage named collections of [`Chunk`]s using cosine
/// distance. Errors use the crate taxonomy: a missing collection is
/// [`RagError::CollectionNotFound`](crate::RagError::CollectionNotFound), a
/// duplicate name is
/// [`RagError::CollectionAlreadyExists`](crate::RagError::CollectionAlreadyExists),
/// everything else is a
/// [`RagError::VectorStoreError`](crate::RagError::VectorStoreError).
///
/// # Example
///
/// ```rust,ignore
/// use docvault_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("docs", 384).await?;
/// store.add("docs", &chunks).await?;
/// let hits = store.query("docs", &query_embedding, 5, None).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create a named collection. Fails if it already exists.
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()>;

    /// Fetch a collection's summary. Fails if it does not exist.
    async fn get_collection(&self, name: &str) -> Result<CollectionInfo>;

    /// Delete a named collection and all its chunks. Fails if it does not exist.
    async fn delete_collection(&self, name: &str) -> Result<()>;

    /// Names of all collections, sorted.
    async fn list_collections(&self) -> Result<Vec<String>>;

    /// Add chunks to a collection. Chunks must have embeddings set. Fails
    /// without writing if any id is already present or repeated in the batch.
    async fn add(&self, collection: &str, chunks: &[Chunk]) -> Result<()>;

    /// Fetch chunks matching `filter` (all chunks when `None`), without
    /// embeddings.
    async fn get(&self, collection: &str, filter: Option<&MetadataFilter>) -> Result<Vec<Chunk>>;

    /// Delete chunks matching `filter`, returning how many were removed.
    async fn delete(&self, collection: &str, filter: &MetadataFilter) -> Result<usize>;

    /// Return up to `n_results` chunks closest to `embedding`, restricted to
    /// `filter`, ordered by ascending cosine distance.
    async fn query(
        &self,
        collection: &str,
        embedding: &[f32],
        n_results: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<QueryHit>>;
}
