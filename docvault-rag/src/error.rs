//! Error types for the `docvault-rag` crate.

use thiserror::Error;

/// Broad category of a [`RagError`], used by callers that map failures onto
/// their own reporting (log level, message prefix, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed, missing or conflicting parameters. Detected before any
    /// store or model call.
    Validation,
    /// A collection or document does not exist.
    NotFound,
    /// A collection or document already exists.
    Conflict,
    /// More results were requested than the collection holds.
    Capacity,
    /// The vector store, embedding model or reranker failed.
    Upstream,
}

/// Errors that can occur in ingestion, query and administration operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// A request parameter failed validation.
    #[error("{0}")]
    InvalidArgument(String),

    /// The named collection does not exist.
    #[error("collection '{0}' does not exist")]
    CollectionNotFound(String),

    /// A collection with the same name already exists.
    #[error("collection '{0}' already exists")]
    CollectionAlreadyExists(String),

    /// Chunks for the document id are already stored in the collection.
    #[error("document id '{0}' already exists")]
    DocumentAlreadyExists(String),

    /// The requested result count exceeds the number of stored chunks.
    #[error("n_results ({requested}) exceeds the number of chunks in the collection ({available})")]
    ResultCountExceeded {
        /// Number of results asked for.
        requested: usize,
        /// Number of chunks currently in the collection.
        available: usize,
    },

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during result reranking.
    #[error("Reranker error ({reranker}): {message}")]
    RerankerError {
        /// The reranker that produced the error.
        reranker: String,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl RagError {
    /// Shorthand for [`RagError::InvalidArgument`].
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// The category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) | Self::ConfigError(_) => ErrorKind::Validation,
            Self::CollectionNotFound(_) => ErrorKind::NotFound,
            Self::CollectionAlreadyExists(_) | Self::DocumentAlreadyExists(_) => {
                ErrorKind::Conflict
            }
            Self::ResultCountExceeded { .. } => ErrorKind::Capacity,
            Self::EmbeddingError { .. }
            | Self::VectorStoreError { .. }
            | Self::RerankerError { .. } => ErrorKind::Upstream,
        }
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
