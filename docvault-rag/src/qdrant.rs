//! Qdrant vector store backend.
//!
//! Provides [`QdrantVectorStore`] which implements [`VectorStore`] using
//! the [qdrant-client](https://docs.rs/qdrant-client) crate over gRPC.
//!
//! Qdrant only accepts integers and UUIDs as point ids, so each chunk id is
//! mapped to a name-based UUID (v5) and kept verbatim in the `chunk_id`
//! payload field. Chunk metadata lives under the `metadata` payload object
//! and filters address it as `metadata.<key>`.
//!
//! This module is only available when the `qdrant` feature is enabled.

use std::collections::HashSet;

use async_trait::async_trait;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    Condition, CountPointsBuilder, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter,
    GetPointsBuilder, PointId, PointStruct, Range, RetrievedPoint, ScrollPointsBuilder,
    SearchPointsBuilder, UpsertPointsBuilder, Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use tracing::debug;
use uuid::Uuid;

use crate::document::{Chunk, CollectionInfo, Metadata, MetadataValue, QueryHit};
use crate::error::{RagError, Result};
use crate::filter::MetadataFilter;
use crate::vectorstore::VectorStore;

const BACKEND: &str = "qdrant";
const CHUNK_ID_FIELD: &str = "chunk_id";
const TEXT_FIELD: &str = "text";
const METADATA_FIELD: &str = "metadata";
const SCROLL_PAGE: u32 = 256;

/// A [`VectorStore`] backed by [Qdrant](https://qdrant.tech/).
///
/// Collections map one-to-one onto Qdrant collections with cosine distance.
/// Duplicate detection on [`add`](VectorStore::add) is a lookup followed by an
/// upsert, so two writers racing on the same ids are not serialized.
pub struct QdrantVectorStore {
    client: Qdrant,
}

impl QdrantVectorStore {
    /// Connect to the Qdrant gRPC endpoint at `url`.
    pub fn new(url: &str) -> Result<Self> {
        Self::with_api_key(url, None)
    }

    /// Connect with an optional API key.
    pub fn with_api_key(url: &str, api_key: Option<String>) -> Result<Self> {
        let client = Qdrant::from_url(url).api_key(api_key).build().map_err(Self::map_err)?;
        Ok(Self { client })
    }

    /// Wrap an existing client.
    pub fn from_client(client: Qdrant) -> Self {
        Self { client }
    }

    fn map_err(e: qdrant_client::QdrantError) -> RagError {
        RagError::VectorStoreError { backend: BACKEND.to_string(), message: e.to_string() }
    }

    async fn ensure_exists(&self, name: &str) -> Result<()> {
        if self.client.collection_exists(name).await.map_err(Self::map_err)? {
            Ok(())
        } else {
            Err(RagError::CollectionNotFound(name.to_string()))
        }
    }

    async fn count(&self, collection: &str, filter: Option<Filter>) -> Result<usize> {
        let mut request = CountPointsBuilder::new(collection).exact(true);
        if let Some(filter) = filter {
            request = request.filter(filter);
        }
        let response = self.client.count(request).await.map_err(Self::map_err)?;
        Ok(response.result.map(|r| r.count as usize).unwrap_or_default())
    }
}

/// Stable point id for a chunk id.
fn point_id(chunk_id: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, chunk_id.as_bytes()).to_string()
}

fn field(key: &str) -> String {
    format!("{METADATA_FIELD}.{key}")
}

fn condition(filter: &MetadataFilter) -> Condition {
    match filter {
        MetadataFilter::Eq { key, value } => match value {
            MetadataValue::Str(s) => Condition::matches(field(key), s.clone()),
            MetadataValue::Int(i) => Condition::matches(field(key), *i),
            MetadataValue::Bool(b) => Condition::matches(field(key), *b),
            MetadataValue::Float(f) => Condition::range(
                field(key),
                Range { gte: Some(*f), lte: Some(*f), ..Default::default() },
            ),
        },
        MetadataFilter::In { key, values } => Condition::matches(field(key), values.clone()),
        MetadataFilter::And(_) | MetadataFilter::Or(_) => to_qdrant_filter(filter).into(),
    }
}

fn to_qdrant_filter(filter: &MetadataFilter) -> Filter {
    match filter {
        MetadataFilter::And(clauses) => Filter::must(clauses.iter().map(condition)),
        MetadataFilter::Or(clauses) => Filter::should(clauses.iter().map(condition)),
        leaf => Filter::must([condition(leaf)]),
    }
}

fn metadata_value(value: &QdrantValue) -> Option<MetadataValue> {
    match value.kind.as_ref()? {
        Kind::StringValue(s) => Some(MetadataValue::Str(s.clone())),
        Kind::IntegerValue(i) => Some(MetadataValue::Int(*i)),
        Kind::DoubleValue(f) => Some(MetadataValue::Float(*f)),
        Kind::BoolValue(b) => Some(MetadataValue::Bool(*b)),
        _ => None,
    }
}

fn string_field(payload: &std::collections::HashMap<String, QdrantValue>, key: &str) -> String {
    match payload.get(key).and_then(|v| v.kind.as_ref()) {
        Some(Kind::StringValue(s)) => s.clone(),
        _ => String::new(),
    }
}

fn metadata_field(payload: &std::collections::HashMap<String, QdrantValue>) -> Metadata {
    match payload.get(METADATA_FIELD).and_then(|v| v.kind.as_ref()) {
        Some(Kind::StructValue(s)) => s
            .fields
            .iter()
            .filter_map(|(k, v)| metadata_value(v).map(|mv| (k.clone(), mv)))
            .collect(),
        _ => Metadata::new(),
    }
}

fn chunk_from_point(point: &RetrievedPoint) -> Chunk {
    Chunk {
        id: string_field(&point.payload, CHUNK_ID_FIELD),
        text: string_field(&point.payload, TEXT_FIELD),
        embedding: Vec::new(),
        metadata: metadata_field(&point.payload),
    }
}

fn payload_for(chunk: &Chunk) -> Result<Payload> {
    let metadata = serde_json::to_value(&chunk.metadata).map_err(|e| RagError::VectorStoreError {
        backend: BACKEND.to_string(),
        message: format!("cannot encode metadata of '{}': {e}", chunk.id),
    })?;
    let payload = serde_json::json!({
        CHUNK_ID_FIELD: chunk.id,
        TEXT_FIELD: chunk.text,
        METADATA_FIELD: metadata,
    });
    Payload::try_from(payload).map_err(|e| RagError::VectorStoreError {
        backend: BACKEND.to_string(),
        message: format!("cannot build payload for '{}': {e}", chunk.id),
    })
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        if self.client.collection_exists(name).await.map_err(Self::map_err)? {
            return Err(RagError::CollectionAlreadyExists(name.to_string()));
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(name)
                    .vectors_config(VectorParamsBuilder::new(dimensions as u64, Distance::Cosine)),
            )
            .await
            .map_err(Self::map_err)?;

        debug!(collection = name, dimensions, "created qdrant collection");
        Ok(())
    }

    async fn get_collection(&self, name: &str) -> Result<CollectionInfo> {
        self.ensure_exists(name).await?;
        let chunks_count = self.count(name, None).await?;
        Ok(CollectionInfo { name: name.to_string(), chunks_count })
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.ensure_exists(name).await?;
        self.client.delete_collection(name).await.map_err(Self::map_err)?;
        debug!(collection = name, "deleted qdrant collection");
        Ok(())
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        let response = self.client.list_collections().await.map_err(Self::map_err)?;
        let mut names: Vec<String> = response.collections.into_iter().map(|c| c.name).collect();
        names.sort();
        Ok(names)
    }

    async fn add(&self, collection: &str, chunks: &[Chunk]) -> Result<()> {
        self.ensure_exists(collection).await?;
        if chunks.is_empty() {
            return Ok(());
        }

        let mut seen = HashSet::new();
        for chunk in chunks {
            if !seen.insert(chunk.id.as_str()) {
                return Err(RagError::VectorStoreError {
                    backend: BACKEND.to_string(),
                    message: format!("duplicate chunk id '{}'", chunk.id),
                });
            }
        }

        let ids: Vec<PointId> = chunks.iter().map(|c| PointId::from(point_id(&c.id))).collect();
        let existing = self
            .client
            .get_points(GetPointsBuilder::new(collection, ids).with_payload(true))
            .await
            .map_err(Self::map_err)?;
        if let Some(point) = existing.result.first() {
            return Err(RagError::VectorStoreError {
                backend: BACKEND.to_string(),
                message: format!(
                    "duplicate chunk id '{}'",
                    string_field(&point.payload, CHUNK_ID_FIELD)
                ),
            });
        }

        let points = chunks
            .iter()
            .map(|chunk| {
                let payload = payload_for(chunk)?;
                Ok(PointStruct::new(point_id(&chunk.id), chunk.embedding.clone(), payload))
            })
            .collect::<Result<Vec<_>>>()?;

        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, points).wait(true))
            .await
            .map_err(Self::map_err)?;

        debug!(collection, count = chunks.len(), "added chunks to qdrant");
        Ok(())
    }

    async fn get(&self, collection: &str, filter: Option<&MetadataFilter>) -> Result<Vec<Chunk>> {
        self.ensure_exists(collection).await?;

        let mut chunks = Vec::new();
        let mut offset: Option<PointId> = None;
        loop {
            let mut request =
                ScrollPointsBuilder::new(collection).limit(SCROLL_PAGE).with_payload(true);
            if let Some(filter) = filter {
                request = request.filter(to_qdrant_filter(filter));
            }
            if let Some(offset) = offset.take() {
                request = request.offset(offset);
            }

            let page = self.client.scroll(request).await.map_err(Self::map_err)?;
            chunks.extend(page.result.iter().map(chunk_from_point));
            match page.next_page_offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        debug!(collection, count = chunks.len(), "scrolled qdrant chunks");
        Ok(chunks)
    }

    async fn delete(&self, collection: &str, filter: &MetadataFilter) -> Result<usize> {
        self.ensure_exists(collection).await?;

        let filter = to_qdrant_filter(filter);
        let matched = self.count(collection, Some(filter.clone())).await?;
        if matched == 0 {
            return Ok(0);
        }

        self.client
            .delete_points(DeletePointsBuilder::new(collection).points(filter).wait(true))
            .await
            .map_err(Self::map_err)?;

        debug!(collection, count = matched, "deleted points from qdrant");
        Ok(matched)
    }

    async fn query(
        &self,
        collection: &str,
        embedding: &[f32],
        n_results: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<QueryHit>> {
        self.ensure_exists(collection).await?;

        let mut request = SearchPointsBuilder::new(collection, embedding.to_vec(), n_results as u64)
            .with_payload(true);
        if let Some(filter) = filter {
            request = request.filter(to_qdrant_filter(filter));
        }
        let response = self.client.search_points(request).await.map_err(Self::map_err)?;

        Ok(response
            .result
            .into_iter()
            .map(|scored| QueryHit {
                id: string_field(&scored.payload, CHUNK_ID_FIELD),
                text: string_field(&scored.payload, TEXT_FIELD),
                metadata: metadata_field(&scored.payload),
                distance: 1.0 - scored.score,
                rerank_score: None,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_ids_are_stable_uuids() {
        let a = point_id("law-1-#0");
        assert_eq!(a, point_id("law-1-#0"));
        assert_ne!(a, point_id("law-1-#1"));
        assert!(Uuid::parse_str(&a).is_ok());
    }

    #[test]
    fn nested_filters_address_metadata_fields() {
        let filter = MetadataFilter::And(vec![
            MetadataFilter::equals("category", "regulation"),
            MetadataFilter::Or(vec![MetadataFilter::In {
                key: "publisher_org_1".into(),
                values: vec!["x".into()],
            }]),
        ]);
        let translated = to_qdrant_filter(&filter);
        assert_eq!(translated.must.len(), 2);
        assert!(format!("{translated:?}").contains("metadata.category"));
        assert!(format!("{translated:?}").contains("metadata.publisher_org_1"));
    }
}
