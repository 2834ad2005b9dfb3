//! In-memory vector store using cosine distance.
//!
//! This module provides [`InMemoryVectorStore`], a vector store backed by a
//! `BTreeMap` protected by a `tokio::sync::RwLock`. Opened with
//! [`InMemoryVectorStore::open`], it also keeps a JSON snapshot on disk that
//! is rewritten after every mutation and reloaded on start-up, which is
//! enough persistence for a single-process deployment.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::document::{Chunk, CollectionInfo, QueryHit};
use crate::error::{RagError, Result};
use crate::filter::MetadataFilter;
use crate::vectorstore::VectorStore;

const BACKEND: &str = "InMemory";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoredCollection {
    dimensions: usize,
    /// Chunks in insertion order.
    chunks: Vec<Chunk>,
}

type Collections = BTreeMap<String, StoredCollection>;

/// An in-memory vector store using cosine distance for search.
///
/// Collections are stored as collection name → chunks in insertion order.
/// All operations are async-safe via `tokio::sync::RwLock`.
///
/// # Example
///
/// ```rust,ignore
/// use docvault_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::open("data/docvault.json").await?;
/// store.create_collection("docs", 1024).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<Collections>,
    snapshot_path: Option<PathBuf>,
}

impl InMemoryVectorStore {
    /// Create a new empty, non-persistent store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a store persisted at `path`, loading the existing snapshot if
    /// there is one. Parent directories are created as needed.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let collections = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<Collections>(&bytes).map_err(|e| {
                store_error(format!("corrupt snapshot '{}': {e}", path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Collections::new(),
            Err(e) => {
                return Err(store_error(format!("cannot read '{}': {e}", path.display())));
            }
        };

        info!(path = %path.display(), collections = collections.len(), "opened in-memory store");
        Ok(Self { collections: RwLock::new(collections), snapshot_path: Some(path) })
    }

    /// Snapshot file backing this store, if any.
    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref()
    }

    /// Write the snapshot. Called with the write lock held so snapshots are
    /// written in mutation order.
    async fn persist(&self, collections: &Collections) -> Result<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| store_error(format!("cannot create '{}': {e}", parent.display())))?;
        }

        let bytes = serde_json::to_vec(collections)
            .map_err(|e| store_error(format!("cannot serialize snapshot: {e}")))?;
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| store_error(format!("cannot write '{}': {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| store_error(format!("cannot replace '{}': {e}", path.display())))?;

        debug!(path = %path.display(), "snapshot written");
        Ok(())
    }

    /// Apply `change` to a copy of the map, persist the copy, and only then
    /// swap it in. A failed snapshot write leaves `collections` untouched.
    async fn commit<T>(
        &self,
        collections: &mut Collections,
        change: impl FnOnce(&mut Collections) -> T,
    ) -> Result<T> {
        if self.snapshot_path.is_none() {
            return Ok(change(collections));
        }
        let mut candidate = collections.clone();
        let out = change(&mut candidate);
        self.persist(&candidate).await?;
        *collections = candidate;
        Ok(out)
    }
}

fn store_error(message: String) -> RagError {
    RagError::VectorStoreError { backend: BACKEND.to_string(), message }
}

fn lookup<'a>(collections: &'a Collections, name: &str) -> Result<&'a StoredCollection> {
    collections.get(name).ok_or_else(|| RagError::CollectionNotFound(name.to_string()))
}

/// Compute cosine distance (`1 - cosine similarity`) between two vectors.
///
/// Returns 1.0 if either vector has zero magnitude.
fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}

fn without_embedding(chunk: &Chunk) -> Chunk {
    Chunk { embedding: Vec::new(), ..chunk.clone() }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        let mut collections = self.collections.write().await;
        if collections.contains_key(name) {
            return Err(RagError::CollectionAlreadyExists(name.to_string()));
        }
        self.commit(&mut collections, |c| {
            c.insert(name.to_string(), StoredCollection { dimensions, chunks: Vec::new() });
        })
        .await
    }

    async fn get_collection(&self, name: &str) -> Result<CollectionInfo> {
        let collections = self.collections.read().await;
        let stored = lookup(&collections, name)?;
        Ok(CollectionInfo { name: name.to_string(), chunks_count: stored.chunks.len() })
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        lookup(&collections, name)?;
        self.commit(&mut collections, |c| {
            c.remove(name);
        })
        .await
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        Ok(self.collections.read().await.keys().cloned().collect())
    }

    async fn add(&self, collection: &str, chunks: &[Chunk]) -> Result<()> {
        let mut collections = self.collections.write().await;
        {
            let stored = lookup(&collections, collection)?;
            let mut seen: HashSet<&str> = stored.chunks.iter().map(|c| c.id.as_str()).collect();
            for chunk in chunks {
                if !seen.insert(chunk.id.as_str()) {
                    return Err(store_error(format!("duplicate chunk id '{}'", chunk.id)));
                }
                if stored.dimensions > 0 && chunk.embedding.len() != stored.dimensions {
                    return Err(store_error(format!(
                        "chunk '{}' has dimension {}, collection '{collection}' expects {}",
                        chunk.id,
                        chunk.embedding.len(),
                        stored.dimensions
                    )));
                }
            }
        }

        self.commit(&mut collections, |c| {
            if let Some(stored) = c.get_mut(collection) {
                stored.chunks.extend_from_slice(chunks);
            }
        })
        .await
    }

    async fn get(&self, collection: &str, filter: Option<&MetadataFilter>) -> Result<Vec<Chunk>> {
        let collections = self.collections.read().await;
        let stored = lookup(&collections, collection)?;
        Ok(stored
            .chunks
            .iter()
            .filter(|c| filter.is_none_or(|f| f.matches(&c.metadata)))
            .map(without_embedding)
            .collect())
    }

    async fn delete(&self, collection: &str, filter: &MetadataFilter) -> Result<usize> {
        let mut collections = self.collections.write().await;
        let stored = lookup(&collections, collection)?;
        let removed = stored.chunks.iter().filter(|c| filter.matches(&c.metadata)).count();
        if removed == 0 {
            return Ok(0);
        }

        self.commit(&mut collections, |c| {
            if let Some(stored) = c.get_mut(collection) {
                stored.chunks.retain(|chunk| !filter.matches(&chunk.metadata));
            }
        })
        .await?;
        Ok(removed)
    }

    async fn query(
        &self,
        collection: &str,
        embedding: &[f32],
        n_results: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<QueryHit>> {
        let collections = self.collections.read().await;
        let stored = lookup(&collections, collection)?;
        if stored.dimensions > 0 && embedding.len() != stored.dimensions {
            return Err(store_error(format!(
                "query has dimension {}, collection '{collection}' expects {}",
                embedding.len(),
                stored.dimensions
            )));
        }

        let mut hits: Vec<QueryHit> = stored
            .chunks
            .iter()
            .filter(|c| filter.is_none_or(|f| f.matches(&c.metadata)))
            .map(|chunk| QueryHit {
                id: chunk.id.clone(),
                text: chunk.text.clone(),
                metadata: chunk.metadata.clone(),
                distance: cosine_distance(&chunk.embedding, embedding),
                rerank_score: None,
            })
            .collect();

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(n_results);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Metadata;

    fn chunk(id: &str, embedding: Vec<f32>, document_id: &str) -> Chunk {
        let mut metadata = Metadata::new();
        metadata.insert("document_id".into(), document_id.into());
        Chunk { id: id.into(), text: format!("text of {id}"), embedding, metadata }
    }

    #[tokio::test]
    async fn create_twice_conflicts_and_missing_collection_is_not_found() {
        let store = InMemoryVectorStore::new();
        store.create_collection("laws", 2).await.unwrap();
        assert!(matches!(
            store.create_collection("laws", 2).await,
            Err(RagError::CollectionAlreadyExists(_))
        ));
        assert!(matches!(
            store.delete_collection("ghost").await,
            Err(RagError::CollectionNotFound(_))
        ));
        assert!(matches!(
            store.get_collection("ghost").await,
            Err(RagError::CollectionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn duplicate_ids_reject_the_whole_batch() {
        let store = InMemoryVectorStore::new();
        store.create_collection("c", 2).await.unwrap();
        store.add("c", &[chunk("a", vec![1.0, 0.0], "d1")]).await.unwrap();

        let batch = [chunk("b", vec![0.0, 1.0], "d2"), chunk("a", vec![1.0, 1.0], "d2")];
        let err = store.add("c", &batch).await.unwrap_err();
        assert!(err.to_string().contains("duplicate chunk id 'a'"));
        assert_eq!(store.get_collection("c").await.unwrap().chunks_count, 1);
    }

    #[tokio::test]
    async fn filtered_get_delete_and_query() {
        let store = InMemoryVectorStore::new();
        store.create_collection("c", 2).await.unwrap();
        store
            .add(
                "c",
                &[
                    chunk("a", vec![1.0, 0.0], "d1"),
                    chunk("b", vec![0.9, 0.1], "d2"),
                    chunk("c", vec![0.0, 1.0], "d1"),
                ],
            )
            .await
            .unwrap();

        let d1 = MetadataFilter::equals("document_id", "d1");
        let got = store.get("c", Some(&d1)).await.unwrap();
        assert_eq!(got.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(), vec!["a", "c"]);
        assert!(got.iter().all(|c| c.embedding.is_empty()));

        let hits = store.query("c", &[1.0, 0.0], 10, Some(&d1)).await.unwrap();
        assert_eq!(hits[0].id, "a");
        assert!(hits[0].distance.abs() < 1e-6);
        assert_eq!(hits.len(), 2);

        assert_eq!(store.delete("c", &d1).await.unwrap(), 2);
        assert_eq!(store.get_collection("c").await.unwrap().chunks_count, 1);
    }

    #[tokio::test]
    async fn snapshot_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let store = InMemoryVectorStore::open(&path).await.unwrap();
        store.create_collection("laws", 2).await.unwrap();
        store.add("laws", &[chunk("a", vec![1.0, 0.0], "d1")]).await.unwrap();
        drop(store);

        let reopened = InMemoryVectorStore::open(&path).await.unwrap();
        assert_eq!(reopened.list_collections().await.unwrap(), vec!["laws".to_string()]);
        let hits = reopened.query("laws", &[1.0, 0.0], 1, None).await.unwrap();
        assert_eq!(hits[0].id, "a");
    }

    #[tokio::test]
    async fn failed_snapshot_write_leaves_store_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let parent = dir.path().join("sub");
        let store = InMemoryVectorStore::open(parent.join("store.json")).await.unwrap();
        store.create_collection("laws", 2).await.unwrap();
        store.add("laws", &[chunk("a", vec![1.0, 0.0], "d1")]).await.unwrap();

        // A plain file where the snapshot directory should be breaks every write.
        std::fs::remove_dir_all(&parent).unwrap();
        std::fs::write(&parent, b"").unwrap();

        let err = store.add("laws", &[chunk("b", vec![0.0, 1.0], "d2")]).await.unwrap_err();
        assert!(matches!(err, RagError::VectorStoreError { .. }));
        assert_eq!(store.get_collection("laws").await.unwrap().chunks_count, 1);

        let d1 = MetadataFilter::equals("document_id", "d1");
        assert!(store.delete("laws", &d1).await.is_err());
        assert_eq!(store.get("laws", Some(&d1)).await.unwrap().len(), 1);

        assert!(store.create_collection("other", 2).await.is_err());
        assert!(store.delete_collection("laws").await.is_err());
        assert_eq!(store.list_collections().await.unwrap(), vec!["laws".to_string()]);

        std::fs::remove_file(&parent).unwrap();
        store.add("laws", &[chunk("b", vec![0.0, 1.0], "d2")]).await.unwrap();
        assert_eq!(store.get_collection("laws").await.unwrap().chunks_count, 2);
    }
}
