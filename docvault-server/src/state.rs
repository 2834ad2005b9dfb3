//! Shared handles, built once at start-up.

use std::sync::Arc;

use anyhow::Context;
use docvault_rag::cross_encoder::CrossEncoderReranker;
use docvault_rag::openai::OpenAIEmbeddingProvider;
use docvault_rag::qdrant::QdrantVectorStore;
use docvault_rag::{InMemoryVectorStore, RagPipeline, VectorStore};
use tracing::info;

use crate::config::{ServerSettings, StoreBackend};
use crate::tokens::{HfTokenCounter, TokenCounter};

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<RagPipeline>,
    pub token_counter: Option<Arc<dyn TokenCounter>>,
}

impl AppState {
    pub fn new(pipeline: Arc<RagPipeline>) -> Self {
        Self { pipeline, token_counter: None }
    }

    pub fn with_token_counter(mut self, counter: Arc<dyn TokenCounter>) -> Self {
        self.token_counter = Some(counter);
        self
    }

    /// Connect the store, models and tokenizer described by `settings`.
    pub async fn from_settings(settings: &ServerSettings) -> anyhow::Result<Self> {
        let store: Arc<dyn VectorStore> = match settings.store.backend {
            StoreBackend::Memory => match &settings.store.path {
                Some(path) => Arc::new(
                    InMemoryVectorStore::open(path)
                        .await
                        .context("failed to open in-memory store snapshot")?,
                ),
                None => Arc::new(InMemoryVectorStore::new()),
            },
            StoreBackend::Qdrant => Arc::new(
                QdrantVectorStore::with_api_key(
                    &settings.store.qdrant_url,
                    settings.store.qdrant_api_key.clone(),
                )
                .context("failed to build qdrant client")?,
            ),
        };
        info!(backend = ?settings.store.backend, "vector store ready");

        let embedding = &settings.embedding;
        let mut embedder = OpenAIEmbeddingProvider::new(&embedding.base_url)
            .with_model(&embedding.model)
            .with_api_key(embedding.api_key.clone().unwrap_or_default());
        embedder = if embedding.truncate {
            embedder.with_dimensions(embedding.dimensions)
        } else {
            embedder.with_native_dimensions(embedding.dimensions)
        };

        let mut builder = RagPipeline::builder()
            .config(settings.rag.clone())
            .embedding_provider(Arc::new(embedder))
            .vector_store(store);
        if let Some(rerank) = &settings.rerank {
            let reranker = CrossEncoderReranker::new(&rerank.base_url)
                .with_api_key(rerank.api_key.clone().unwrap_or_default());
            builder = builder.reranker(Arc::new(reranker));
            info!(url = %rerank.base_url, "reranker configured");
        }
        let pipeline = builder.build().context("invalid pipeline configuration")?;

        let mut state = Self::new(Arc::new(pipeline));
        if let Some(tokenizer) = &settings.tokenizer {
            let counter = HfTokenCounter::from_file(&tokenizer.path)?;
            state = state.with_token_counter(Arc::new(counter));
        }
        Ok(state)
    }
}
