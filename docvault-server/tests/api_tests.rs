//! Route-level tests driving `app_router` in-process with an in-memory store
//! and deterministic mock models.

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use docvault_rag::{EmbeddingProvider, InMemoryVectorStore, RagPipeline, Reranker};
use docvault_server::tokens::TokenizerError;
use docvault_server::{AppState, Envelope, TokenCounter, app_router};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

const DIM: usize = 8;

struct CharEmbedder;

#[async_trait]
impl EmbeddingProvider for CharEmbedder {
    async fn embed_batch(&self, texts: &[&str]) -> docvault_rag::Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| {
                let mut v = vec![0.0; DIM];
                for c in t.chars() {
                    v[c as usize % DIM] += 1.0;
                }
                v
            })
            .collect())
    }

    fn dimensions(&self) -> usize {
        DIM
    }
}

/// Prefers shorter candidates.
struct ShortestFirst;

#[async_trait]
impl Reranker for ShortestFirst {
    async fn score(&self, _query: &str, candidates: &[&str]) -> docvault_rag::Result<Vec<f32>> {
        Ok(candidates.iter().map(|c| 1.0 / (1.0 + c.chars().count() as f32)).collect())
    }
}

/// One token per whitespace-separated word.
struct WordCounter;

impl TokenCounter for WordCounter {
    fn count(&self, text: &str) -> Result<usize, TokenizerError> {
        Ok(text.split_whitespace().count())
    }
}

fn app() -> Router {
    let pipeline = RagPipeline::builder()
        .embedding_provider(Arc::new(CharEmbedder))
        .vector_store(Arc::new(InMemoryVectorStore::new()))
        .reranker(Arc::new(ShortestFirst))
        .build()
        .unwrap();
    app_router(AppState::new(Arc::new(pipeline)).with_token_counter(Arc::new(WordCounter)))
}

async fn send(app: &Router, request: Request<Body>) -> Envelope {
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn get(app: &Router, uri: &str) -> Envelope {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

async fn post(app: &Router, uri: &str, body: Value) -> Envelope {
    let request = Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

async fn add_lines(app: &Router, name: &str, id: &str, count: usize, metadata: Value) -> Envelope {
    let text = (0..count).map(|i| format!("{name} line {i}")).collect::<Vec<_>>().join("\n");
    post(
        app,
        "/add-document",
        json!({
            "collection_name": "laws",
            "document_name": name,
            "document_id": id,
            "document": text,
            "separator": "\n",
            "metadata": metadata,
        }),
    )
    .await
}

#[tokio::test]
async fn health_reports_ok() {
    let envelope = get(&app(), "/health").await;
    assert!(envelope.ok);
    assert_eq!(envelope.data, json!({ "status": "ok" }));
}

#[tokio::test]
async fn collection_lifecycle_uses_the_envelope() {
    let app = app();

    let created = get(&app, "/create-collection?collection_name=laws").await;
    assert!(created.ok, "{}", created.message);
    assert_eq!(created.data["collection"], json!({ "name": "laws", "chunks_count": 0 }));

    let again = get(&app, "/create-collection?collection_name=laws").await;
    assert!(!again.ok);
    assert!(again.message.contains("already exists"));
    assert_eq!(again.data, Value::Null);

    let listed = get(&app, "/list-all-collections").await;
    assert_eq!(listed.data["collections"], json!(["laws"]));

    let deleted = get(&app, "/delete-collection?collection_name=laws").await;
    assert!(deleted.ok);
    assert_eq!(deleted.data, Value::Null);

    let ghost = get(&app, "/delete-collection?collection_name=ghost").await;
    assert!(!ghost.ok);
    assert!(ghost.message.contains("does not exist"));

    let missing = get(&app, "/get-collection?collection_name=laws").await;
    assert!(!missing.ok);
}

#[tokio::test]
async fn missing_parameters_and_bad_json_are_envelopes() {
    let app = app();

    let no_param = get(&app, "/get-collection").await;
    assert!(!no_param.ok);
    assert!(no_param.message.contains("collection_name"));

    let request = Request::post("/add-document")
        .header("content-type", "application/json")
        .body(Body::from("{ not json"))
        .unwrap();
    let bad_json = send(&app, request).await;
    assert!(!bad_json.ok);
    assert!(bad_json.message.starts_with("invalid request"));

    let unknown = get(&app, "/no-such-route").await;
    assert!(!unknown.ok);
    assert_eq!(unknown.message, "invalid request: no route for '/no-such-route'");
    assert_eq!(unknown.data, Value::Null);
}

#[tokio::test]
async fn add_document_then_fetch_and_delete_chunks() {
    let app = app();
    get(&app, "/create-collection?collection_name=laws").await;

    let added = add_lines(&app, "civil", "d1", 4, json!({ "category": "regulation" })).await;
    assert!(added.ok, "{}", added.message);
    assert_eq!(added.data["document"], json!({ "name": "civil", "chunks_count": 4 }));

    let duplicate = add_lines(&app, "civil", "d1", 2, Value::Null).await;
    assert!(!duplicate.ok);
    assert!(duplicate.message.contains("already exists"));

    let chunks = get(&app, "/get-chunks?collection_name=laws&document_id=d1").await;
    assert!(chunks.ok);
    assert_eq!(chunks.data["chunks_count"], 4);
    assert_eq!(chunks.data["ids"][0], "civil-d1-#0");
    assert_eq!(chunks.data["documents"][0], "[civil]\n\ncivil line 0");
    assert_eq!(chunks.data["metadatas"][0]["category"], "regulation");
    assert_eq!(chunks.data["metadatas"][0]["publisher_org_10"], "none");

    let metadatas = get(&app, "/get-all-metadatas-in-collection?collection_name=laws").await;
    assert_eq!(metadatas.data["metadatas"].as_array().unwrap().len(), 1);

    let neither = get(&app, "/delete-document?collection_name=laws").await;
    assert!(!neither.ok);
    assert!(neither.message.contains("at least one"));

    let both =
        get(&app, "/delete-chunks?collection_name=laws&document_id=d1&document_name=civil").await;
    assert!(!both.ok);
    assert!(both.message.contains("at most one"));
    let info = get(&app, "/get-collection?collection_name=laws").await;
    assert_eq!(info.data["collection"]["chunks_count"], 4);

    let request = Request::builder()
        .method(Method::DELETE)
        .uri("/delete-document?collection_name=laws&document_name=civil")
        .body(Body::empty())
        .unwrap();
    let deleted = send(&app, request).await;
    assert!(deleted.ok);
    assert_eq!(deleted.data["chunks_deleted"], 4);
}

#[tokio::test]
async fn invalid_metadata_is_rejected() {
    let app = app();
    get(&app, "/create-collection?collection_name=laws").await;

    let bad_category = add_lines(&app, "civil", "d1", 2, json!({ "category": "law" })).await;
    assert!(!bad_category.ok);
    assert!(bad_category.message.contains("'law'"));

    let nested = add_lines(&app, "civil", "d1", 2, json!({ "tags": { "a": 1 } })).await;
    assert!(!nested.ok);
}

#[tokio::test]
async fn query_over_get_and_post_with_filters_and_rerank() {
    let app = app();
    get(&app, "/create-collection?collection_name=laws").await;
    add_lines(&app, "civil", "d1", 6, json!({ "publishers": ["国务院"] })).await;
    add_lines(&app, "penal", "d2", 6, json!({ "publishers": ["司法部", "公安部"] })).await;

    let plain = get(&app, "/query?collection_name=laws&query=civil%20line&n_results=3").await;
    assert!(plain.ok, "{}", plain.message);
    assert_eq!(plain.data["ids"].as_array().unwrap().len(), 3);
    assert!(plain.data.get("rerank_scores").is_none());
    let distances: Vec<f64> = plain.data["distances"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d.as_f64().unwrap())
        .collect();
    assert!(distances.windows(2).all(|w| w[0] <= w[1]));

    let gongan = "%E5%85%AC%E5%AE%89%E9%83%A8";
    let uri = format!("/query?collection_name=laws&query=line&n_results=4&publishers={gongan},x");
    let by_publisher = get(&app, &uri).await;
    assert!(by_publisher.ok, "{}", by_publisher.message);
    for metadata in by_publisher.data["metadatas"].as_array().unwrap() {
        assert_eq!(metadata["document_id"], "d2");
    }

    let reranked = post(
        &app,
        "/query",
        json!({
            "collection_name": "laws",
            "query": "line",
            "n_results": 2,
            "rerank": true,
            "publishers": ["国务院"],
        }),
    )
    .await;
    assert!(reranked.ok, "{}", reranked.message);
    let scores = reranked.data["rerank_scores"].as_array().unwrap();
    assert_eq!(scores.len(), 2);
    assert!(scores[0].as_f64().unwrap() >= scores[1].as_f64().unwrap());

    let too_many = get(&app, "/query?collection_name=laws&query=line&n_results=1000").await;
    assert!(!too_many.ok);
    assert!(too_many.message.contains("1000") && too_many.message.contains("12"));

    let mixed = post(
        &app,
        "/query",
        json!({ "collection_name": "laws", "query": "line", "publishers": ["x"], "md5": "y" }),
    )
    .await;
    assert!(!mixed.ok);
}

#[tokio::test]
async fn count_tokens_accepts_text_or_query() {
    let app = app();
    let by_text = post(&app, "/count-tokens", json!({ "text": "one two three" })).await;
    assert!(by_text.ok);
    assert_eq!(by_text.data["tokens_length"], 3);

    let by_query = post(&app, "/count-tokens", json!({ "query": "one two" })).await;
    assert_eq!(by_query.data["tokens_length"], 2);
}

#[tokio::test]
async fn count_tokens_without_tokenizer_is_an_error_envelope() {
    let pipeline = RagPipeline::builder()
        .embedding_provider(Arc::new(CharEmbedder))
        .vector_store(Arc::new(InMemoryVectorStore::new()))
        .build()
        .unwrap();
    let app = app_router(AppState::new(Arc::new(pipeline)));
    let envelope = post(&app, "/count-tokens", json!({ "text": "a b" })).await;
    assert!(!envelope.ok);
    assert!(envelope.message.contains("not configured"));
}
