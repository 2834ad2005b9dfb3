//! Configuration for the RAG pipeline.

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Pipeline defaults, overridable per request where the request allows it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RagConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of hits returned when a query does not ask for a count.
    pub n_results: usize,
    /// Over-fetch factor applied to the candidate pool before reranking.
    pub rerank_multiple: usize,
    /// Prefix every chunk with a `[document name]` header line.
    pub tag_chunks: bool,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 512,
            chunk_overlap: 100,
            n_results: 10,
            rerank_multiple: 3,
            tag_chunks: true,
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Re-run builder validation on an already assembled config, e.g. one
    /// deserialized from a file.
    pub fn validated(self) -> Result<Self> {
        RagConfigBuilder { config: self }.build()
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the default number of query hits.
    pub fn n_results(mut self, n: usize) -> Self {
        self.config.n_results = n;
        self
    }

    /// Set the rerank over-fetch factor.
    pub fn rerank_multiple(mut self, multiple: usize) -> Self {
        self.config.rerank_multiple = multiple;
        self
    }

    /// Enable or disable the document-name header on chunk texts.
    pub fn tag_chunks(mut self, tag: bool) -> Self {
        self.config.tag_chunks = tag;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `chunk_size == 0`
    /// - `chunk_overlap >= chunk_size`
    /// - `n_results == 0`
    /// - `rerank_multiple == 0`
    pub fn build(self) -> Result<RagConfig> {
        let config = self.config;
        if config.chunk_size == 0 {
            return Err(RagError::ConfigError("chunk_size must be greater than zero".to_string()));
        }
        if config.chunk_overlap >= config.chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                config.chunk_overlap, config.chunk_size
            )));
        }
        if config.n_results == 0 {
            return Err(RagError::ConfigError("n_results must be greater than zero".to_string()));
        }
        if config.rerank_multiple == 0 {
            return Err(RagError::ConfigError("rerank_multiple must be at least 1".to_string()));
        }
        Ok(config)
    }
}
