//! RAG pipeline orchestrator.
//!
//! The [`RagPipeline`] coordinates ingestion, query and administration by
//! composing an [`EmbeddingProvider`], a [`VectorStore`] and an optional
//! [`Reranker`].
//!
//! # Example
//!
//! ```rust,ignore
//! use docvault_rag::{Document, IngestRequest, InMemoryVectorStore, QueryRequest, RagConfig, RagPipeline};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .build()?;
//!
//! pipeline.create_collection("laws").await?;
//! pipeline.ingest("laws", IngestRequest::new(document)).await?;
//! let hits = pipeline.query("laws", QueryRequest::new("contract liability")).await?;
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::chunking::{RecursiveCharacterSplitter, SeparatorSplitter, TextSplitter};
use crate::config::RagConfig;
use crate::document::{Chunk, CollectionInfo, Document, Metadata, QueryHit};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::filter::{DocumentSelector, MetadataFilter, SearchFilter};
use crate::metadata::{self, DOCUMENT_ID_KEY};
use crate::reranker::Reranker;
use crate::vectorstore::VectorStore;

/// Parameters of one ingestion call.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestRequest {
    /// The document to split and store.
    pub document: Document,
    /// Overrides [`RagConfig::chunk_size`].
    pub chunk_size: Option<usize>,
    /// Overrides [`RagConfig::chunk_overlap`].
    pub chunk_overlap: Option<usize>,
    /// Split on this literal separator instead of the recursive splitter.
    pub separator: Option<String>,
}

impl IngestRequest {
    /// Ingest `document` with the configured chunking defaults.
    pub fn new(document: Document) -> Self {
        Self { document, chunk_size: None, chunk_overlap: None, separator: None }
    }

    /// Override chunk size and overlap.
    pub fn with_chunking(mut self, chunk_size: usize, chunk_overlap: usize) -> Self {
        self.chunk_size = Some(chunk_size);
        self.chunk_overlap = Some(chunk_overlap);
        self
    }

    /// Split on a literal separator.
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = Some(separator.into());
        self
    }
}

/// Result of a successful ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOutcome {
    /// Number of chunks written.
    pub chunks_count: usize,
}

/// Parameters of one similarity query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRequest {
    /// Natural-language query text.
    pub query: String,
    /// Number of hits; defaults to [`RagConfig::n_results`].
    pub n_results: Option<usize>,
    /// Re-score the candidates with the configured [`Reranker`].
    pub rerank: bool,
    /// Metadata restrictions.
    pub filter: SearchFilter,
}

impl QueryRequest {
    /// Unfiltered query with the default result count and no rerank.
    pub fn new(query: impl Into<String>) -> Self {
        Self { query: query.into(), ..Default::default() }
    }
}

/// The RAG pipeline orchestrator.
///
/// Every operation validates its input before touching the store or a model,
/// and propagates the first failure unchanged. Construct one via
/// [`RagPipeline::builder()`].
pub struct RagPipeline {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    reranker: Option<Arc<dyn Reranker>>,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the vector store.
    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    /// Whether a reranker is configured.
    pub fn has_reranker(&self) -> bool {
        self.reranker.is_some()
    }

    // ── Administration ─────────────────────────────────────────────

    /// Create a named collection sized for the configured embedding provider.
    ///
    /// # Errors
    ///
    /// [`RagError::CollectionAlreadyExists`] if the name is taken.
    pub async fn create_collection(&self, name: &str) -> Result<CollectionInfo> {
        require("collection_name", name)?;
        let dimensions = self.embedding_provider.dimensions();
        self.vector_store.create_collection(name, dimensions).await.inspect_err(|e| {
            error!(collection = name, error = %e, "failed to create collection");
        })?;
        info!(collection = name, dimensions, "created collection");
        self.vector_store.get_collection(name).await
    }

    /// Fetch a collection summary.
    pub async fn get_collection(&self, name: &str) -> Result<CollectionInfo> {
        require("collection_name", name)?;
        self.vector_store.get_collection(name).await
    }

    /// Delete a collection with all of its chunks.
    pub async fn delete_collection(&self, name: &str) -> Result<()> {
        require("collection_name", name)?;
        self.vector_store.delete_collection(name).await.inspect_err(|e| {
            error!(collection = name, error = %e, "failed to delete collection");
        })?;
        info!(collection = name, "deleted collection");
        Ok(())
    }

    /// Names of all collections.
    pub async fn list_collections(&self) -> Result<Vec<String>> {
        self.vector_store.list_collections().await
    }

    /// One metadata record per stored document, in store order.
    pub async fn list_document_metadatas(&self, collection: &str) -> Result<Vec<Metadata>> {
        require("collection_name", collection)?;
        let chunks = self.vector_store.get(collection, None).await?;

        let mut seen = HashSet::new();
        let mut records = Vec::new();
        for chunk in chunks {
            let Some(document_id) = chunk.metadata.get(DOCUMENT_ID_KEY).map(|v| v.to_string())
            else {
                debug!(chunk = %chunk.id, "chunk has no document id, skipping");
                continue;
            };
            if seen.insert(document_id) {
                records.push(chunk.metadata);
            }
        }
        Ok(records)
    }

    /// Chunks of one document, ordered by chunk index.
    pub async fn get_chunks(
        &self,
        collection: &str,
        selector: &DocumentSelector,
    ) -> Result<Vec<Chunk>> {
        require("collection_name", collection)?;
        let mut chunks = self.vector_store.get(collection, Some(&selector.to_filter())).await?;
        chunks.sort_by_key(|c| c.index().unwrap_or(usize::MAX));
        Ok(chunks)
    }

    /// Delete every chunk of one document, returning how many were removed.
    pub async fn delete_document(
        &self,
        collection: &str,
        selector: &DocumentSelector,
    ) -> Result<usize> {
        require("collection_name", collection)?;
        let removed =
            self.vector_store.delete(collection, &selector.to_filter()).await.inspect_err(|e| {
                error!(collection, ?selector, error = %e, "failed to delete document");
            })?;
        info!(collection, ?selector, chunks_deleted = removed, "deleted document chunks");
        Ok(removed)
    }

    // ── Ingestion ──────────────────────────────────────────────────

    /// Ingest one document: validate → dedupe → split → tag → embed → store.
    ///
    /// # Errors
    ///
    /// - [`RagError::InvalidArgument`] for blank fields, inconsistent chunking
    ///   parameters or text that yields no chunks
    /// - [`RagError::CollectionNotFound`] if the collection is missing
    /// - [`RagError::DocumentAlreadyExists`] if the document id is already stored
    /// - upstream errors from the embedding provider or the store
    pub async fn ingest(&self, collection: &str, request: IngestRequest) -> Result<IngestOutcome> {
        let IngestRequest { document, chunk_size, chunk_overlap, separator } = request;
        require("collection_name", collection)?;
        require("document_name", &document.name)?;
        require("document_id", &document.id)?;
        require("document", &document.text)?;

        let splitter = self.splitter(chunk_size, chunk_overlap, separator)?;

        self.vector_store.get_collection(collection).await?;
        let existing = self
            .vector_store
            .get(collection, Some(&MetadataFilter::equals(DOCUMENT_ID_KEY, document.id.as_str())))
            .await?;
        if !existing.is_empty() {
            warn!(collection, document.id = %document.id, "document already ingested");
            return Err(RagError::DocumentAlreadyExists(document.id));
        }

        let texts: Vec<String> = splitter
            .split(&document.text)
            .iter()
            .map(|piece| piece.trim())
            .filter(|piece| !piece.is_empty())
            .map(|piece| {
                if self.config.tag_chunks {
                    format!("[{}]\n\n{piece}", document.name)
                } else {
                    piece.to_string()
                }
            })
            .collect();
        if texts.is_empty() {
            return Err(RagError::invalid("document produced no chunks"));
        }

        let inputs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let embeddings = self.embedding_provider.embed_batch(&inputs).await.inspect_err(|e| {
            error!(document.id = %document.id, error = %e, "embedding failed during ingestion");
        })?;
        if embeddings.len() != texts.len() {
            return Err(RagError::EmbeddingError {
                provider: self.embedding_provider.name().to_string(),
                message: format!("expected {} embeddings, got {}", texts.len(), embeddings.len()),
            });
        }

        let mut record = document.metadata;
        metadata::stamp_record(&mut record, &document.name, &document.id);

        let chunks: Vec<Chunk> = texts
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(index, (text, embedding))| Chunk {
                id: Chunk::make_id(&document.name, &document.id, index),
                text,
                embedding,
                metadata: record.clone(),
            })
            .collect();

        self.vector_store.add(collection, &chunks).await.inspect_err(|e| {
            error!(document.id = %document.id, error = %e, "store write failed during ingestion");
        })?;

        let chunks_count = chunks.len();
        info!(collection, document.id = %document.id, chunks_count, "ingested document");
        Ok(IngestOutcome { chunks_count })
    }

    fn splitter(
        &self,
        chunk_size: Option<usize>,
        chunk_overlap: Option<usize>,
        separator: Option<String>,
    ) -> Result<Box<dyn TextSplitter>> {
        if let Some(separator) = separator {
            if separator.is_empty() {
                return Err(RagError::invalid("separator must not be empty"));
            }
            return Ok(Box::new(SeparatorSplitter::new(separator)));
        }

        let chunk_size = chunk_size.unwrap_or(self.config.chunk_size);
        let chunk_overlap = chunk_overlap.unwrap_or(self.config.chunk_overlap);
        if chunk_size == 0 {
            return Err(RagError::invalid("chunk_size must be greater than zero"));
        }
        if chunk_overlap >= chunk_size {
            return Err(RagError::invalid(format!(
                "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
            )));
        }
        Ok(Box::new(RecursiveCharacterSplitter::new(chunk_size, chunk_overlap)))
    }

    // ── Query ──────────────────────────────────────────────────────

    /// Query the pipeline: validate → embed → filtered search → rerank.
    ///
    /// Hits are ordered by ascending distance, or by descending rerank score
    /// when `rerank` is set.
    ///
    /// # Errors
    ///
    /// - [`RagError::InvalidArgument`] for a blank query, a zero count, a bad
    ///   filter or a rerank request without a configured reranker
    /// - [`RagError::ResultCountExceeded`] if more hits are asked for than the
    ///   collection holds
    pub async fn query(&self, collection: &str, request: QueryRequest) -> Result<Vec<QueryHit>> {
        require("collection_name", collection)?;
        require("query", &request.query)?;
        let n_results = request.n_results.unwrap_or(self.config.n_results);
        if n_results == 0 {
            return Err(RagError::invalid("n_results must be at least 1"));
        }
        let filter = request.filter.to_filter()?;
        let reranker = if request.rerank {
            Some(self.reranker.as_ref().ok_or_else(|| {
                RagError::invalid("rerank was requested but no reranker is configured")
            })?)
        } else {
            None
        };

        let info = self.vector_store.get_collection(collection).await?;
        if n_results > info.chunks_count {
            return Err(RagError::ResultCountExceeded {
                requested: n_results,
                available: info.chunks_count,
            });
        }

        let embedding = self.embedding_provider.embed(&request.query).await.inspect_err(|e| {
            error!(error = %e, "embedding failed during query");
        })?;

        let fetch = match reranker {
            Some(_) => n_results.saturating_mul(self.config.rerank_multiple),
            None => n_results,
        };
        let hits = self
            .vector_store
            .query(collection, &embedding, fetch, filter.as_ref())
            .await
            .inspect_err(|e| error!(collection, error = %e, "vector store search failed"))?;

        let hits = match reranker {
            Some(reranker) => {
                let candidates = hits.len();
                let reranked = reranker.rerank(&request.query, hits, n_results).await.inspect_err(
                    |e| error!(reranker = reranker.name(), error = %e, "reranking failed"),
                )?;
                debug!(collection, candidates, kept = reranked.len(), "reranked hits");
                reranked
            }
            None => hits,
        };

        info!(collection, n_results, hits = hits.len(), rerank = request.rerank, "query completed");
        Ok(hits)
    }
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(RagError::invalid(format!("{field} must not be empty")));
    }
    Ok(())
}

/// Builder for constructing a [`RagPipeline`].
///
/// The embedding provider and vector store are required; the config falls
/// back to [`RagConfig::default`] and the reranker is optional.
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = RagPipeline::builder()
///     .embedding_provider(Arc::new(embedder))
///     .vector_store(Arc::new(store))
///     .reranker(Arc::new(reranker))  // optional
///     .build()?;
/// ```
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    reranker: Option<Arc<dyn Reranker>>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Set an optional reranker for post-search result reordering.
    pub fn reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    /// Build the [`RagPipeline`], validating the config and that all
    /// required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a required field is missing or
    /// the config is inconsistent.
    pub fn build(self) -> Result<RagPipeline> {
        let config = self.config.unwrap_or_default().validated()?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::ConfigError("vector_store is required".to_string()))?;

        Ok(RagPipeline { config, embedding_provider, vector_store, reranker: self.reranker })
    }
}
