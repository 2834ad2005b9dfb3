use std::sync::Arc;

use async_trait::async_trait;
use docvault_rag::{EmbeddingProvider, InMemoryVectorStore, RagPipeline};
use docvault_server::{AppState, Envelope, app_router};

struct ConstantEmbedder;

#[async_trait]
impl EmbeddingProvider for ConstantEmbedder {
    async fn embed_batch(&self, texts: &[&str]) -> docvault_rag::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| vec![1.0, t.len() as f32]).collect())
    }

    fn dimensions(&self) -> usize {
        2
    }
}

async fn spawn_server() -> (String, tokio::task::JoinHandle<()>) {
    let pipeline = RagPipeline::builder()
        .embedding_provider(Arc::new(ConstantEmbedder))
        .vector_store(Arc::new(InMemoryVectorStore::new()))
        .build()
        .expect("pipeline");
    let app = app_router(AppState::new(Arc::new(pipeline)));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });

    (format!("http://{}", addr), handle)
}

#[tokio::test]
async fn errors_are_http_200_envelopes_over_the_wire() {
    let (base, handle) = spawn_server().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/get-collection", base))
        .query(&[("collection_name", "ghost")])
        .send()
        .await
        .expect("get-collection response");
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: Envelope = response.json().await.expect("envelope json");
    assert!(!body.ok);
    assert!(body.message.contains("ghost"));

    handle.abort();
}

#[tokio::test]
async fn ingest_and_query_over_the_wire() {
    let (base, handle) = spawn_server().await;
    let client = reqwest::Client::new();

    let created: Envelope = client
        .get(format!("{}/create-collection?collection_name=docs", base))
        .send()
        .await
        .expect("create response")
        .json()
        .await
        .expect("create json");
    assert!(created.ok);

    let added: Envelope = client
        .post(format!("{}/add-document", base))
        .json(&serde_json::json!({
            "collection_name": "docs",
            "document_name": "guide",
            "document_id": "g1",
            "document": "first paragraph\n\nsecond paragraph",
            "chunk_size": 20,
            "chunk_overlap": 0,
        }))
        .send()
        .await
        .expect("add response")
        .json()
        .await
        .expect("add json");
    assert!(added.ok, "{}", added.message);
    assert_eq!(added.data["document"]["chunks_count"], 2);

    let hits: Envelope = client
        .post(format!("{}/query", base))
        .json(&serde_json::json!({
            "collection_name": "docs",
            "query": "paragraph",
            "n_results": 2,
        }))
        .send()
        .await
        .expect("query response")
        .json()
        .await
        .expect("query json");
    assert!(hits.ok, "{}", hits.message);
    assert_eq!(hits.data["ids"].as_array().map(Vec::len), Some(2));

    handle.abort();
}
