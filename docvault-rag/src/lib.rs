//! Document ingestion and filtered, optionally reranked retrieval over
//! pluggable vector stores.
//!
//! This crate provides:
//! - Document, chunk and metadata types with a fixed metadata schema
//! - A recursive, boundary-aware text splitter and a literal separator splitter
//! - Search filters translated into store-neutral [`MetadataFilter`]s
//! - [`EmbeddingProvider`], [`Reranker`] and [`VectorStore`] seams
//! - The [`RagPipeline`] tying ingestion, query and administration together
//!
//! Remote adapters (`openai`, `cross_encoder`) sit behind the `remote`
//! feature, the Qdrant store behind `qdrant`.

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod filter;
pub mod inmemory;
pub mod metadata;
pub mod pipeline;
pub mod reranker;
pub mod vectorstore;

#[cfg(feature = "remote")]
pub mod cross_encoder;
#[cfg(feature = "remote")]
pub mod openai;
#[cfg(feature = "qdrant")]
pub mod qdrant;

pub use chunking::{RecursiveCharacterSplitter, SeparatorSplitter, TextSplitter};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{Chunk, CollectionInfo, Document, Metadata, MetadataValue, QueryHit};
pub use embedding::EmbeddingProvider;
pub use error::{ErrorKind, RagError, Result};
pub use filter::{DocumentSelector, MetadataFilter, SearchFilter};
pub use inmemory::InMemoryVectorStore;
pub use metadata::{Category, DocType, DocumentMetadata};
pub use pipeline::{IngestOutcome, IngestRequest, QueryRequest, RagPipeline, RagPipelineBuilder};
pub use reranker::Reranker;
pub use vectorstore::VectorStore;
