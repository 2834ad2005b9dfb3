//! Data types for documents, chunks, metadata and query hits.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Flat metadata record attached to every chunk of a document.
pub type Metadata = BTreeMap<String, MetadataValue>;

/// A scalar metadata value.
///
/// Vector stores only index flat scalar payloads, so nested objects and
/// arrays are not representable here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MetadataValue {
    /// Boolean flag.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// UTF-8 string.
    Str(String),
}

impl MetadataValue {
    /// Borrow the value as a string slice if it is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Convert a JSON scalar into a metadata value. Returns `None` for
    /// `null`, arrays and objects.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(b) => Some(Self::Bool(*b)),
            serde_json::Value::Number(n) => {
                n.as_i64().map(Self::Int).or_else(|| n.as_f64().map(Self::Float))
            }
            serde_json::Value::String(s) => Some(Self::Str(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// A source document submitted for ingestion.
///
/// Documents are never stored whole; only their chunks are.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Human-readable document name, used in chunk ids and text tags.
    pub name: String,
    /// Caller-assigned identifier, unique per collection.
    pub id: String,
    /// The full text content.
    pub text: String,
    /// Metadata record copied onto every chunk.
    pub metadata: Metadata,
}

/// A stored slice of a [`Document`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// `{document_name}-{document_id}-#{index}`.
    pub id: String,
    /// Chunk text as stored (possibly prefixed with the document-name tag).
    pub text: String,
    /// Embedding vector. Empty when the chunk was fetched without embeddings.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
    /// Metadata shared by all chunks of the parent document.
    pub metadata: Metadata,
}

impl Chunk {
    /// Deterministic chunk identifier.
    pub fn make_id(document_name: &str, document_id: &str, index: usize) -> String {
        format!("{document_name}-{document_id}-#{index}")
    }

    /// Position of this chunk within its document, parsed from the id suffix.
    pub fn index(&self) -> Option<usize> {
        self.id.rsplit_once("-#").and_then(|(_, n)| n.parse().ok())
    }
}

/// A chunk returned by a nearest-neighbour query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryHit {
    /// The chunk identifier.
    pub id: String,
    /// The stored chunk text.
    pub text: String,
    /// The chunk's metadata record.
    pub metadata: Metadata,
    /// Cosine distance to the query (`1 - cosine similarity`, lower is closer).
    pub distance: f32,
    /// Cross-encoder relevance score, set only when the query was reranked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rerank_score: Option<f32>,
}

/// Summary of a collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CollectionInfo {
    /// Collection name.
    pub name: String,
    /// Number of chunks currently stored.
    pub chunks_count: usize,
}
