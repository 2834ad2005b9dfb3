use axum::extract::State;
use docvault_rag::{QueryHit, QueryRequest, SearchFilter};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiQuery};
use crate::response::ApiResponse;
use crate::state::AppState;

/// Publisher list: a JSON array in bodies, a comma-separated string in URLs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Publishers {
    List(Vec<String>),
    Joined(String),
}

impl Publishers {
    fn into_vec(self) -> Vec<String> {
        let items = match self {
            Self::List(items) => items,
            Self::Joined(joined) => joined.split(',').map(str::to_string).collect(),
        };
        items.into_iter().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct QueryParams {
    pub collection_name: String,
    pub query: String,
    #[serde(default)]
    pub n_results: Option<usize>,
    #[serde(default)]
    pub rerank: bool,
    #[serde(default)]
    pub publishers: Option<Publishers>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, rename = "type")]
    pub doc_type: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub law_name: Option<String>,
    #[serde(default)]
    pub md5: Option<String>,
    #[serde(default)]
    pub doc_group: Option<String>,
}

impl QueryParams {
    fn into_request(self) -> (String, QueryRequest) {
        let filter = SearchFilter {
            publishers: self.publishers.map(Publishers::into_vec),
            category: self.category,
            doc_type: self.doc_type,
            file_name: self.file_name,
            law_name: self.law_name,
            md5: self.md5,
            doc_group: self.doc_group,
        };
        let request = QueryRequest {
            query: self.query,
            n_results: self.n_results,
            rerank: self.rerank,
            filter,
        };
        (self.collection_name, request)
    }
}

/// GET /query
pub async fn query_get(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<QueryParams>,
) -> Result<ApiResponse, ApiError> {
    run_query(&state, params).await
}

/// POST /query
pub async fn query_post(
    State(state): State<AppState>,
    ApiJson(params): ApiJson<QueryParams>,
) -> Result<ApiResponse, ApiError> {
    run_query(&state, params).await
}

async fn run_query(state: &AppState, params: QueryParams) -> Result<ApiResponse, ApiError> {
    let (collection, request) = params.into_request();
    let reranked = request.rerank;
    let hits = state.pipeline.query(&collection, request).await?;
    Ok(ApiResponse::new(format!("{} result(s)", hits.len()), hits_to_json(hits, reranked)))
}

/// Column-oriented result layout: one array per field, aligned by position.
fn hits_to_json(hits: Vec<QueryHit>, reranked: bool) -> Value {
    let mut ids = Vec::with_capacity(hits.len());
    let mut documents = Vec::with_capacity(hits.len());
    let mut distances = Vec::with_capacity(hits.len());
    let mut metadatas = Vec::with_capacity(hits.len());
    let mut scores = Vec::with_capacity(hits.len());
    for hit in hits {
        ids.push(hit.id);
        documents.push(hit.text);
        distances.push(hit.distance);
        metadatas.push(hit.metadata);
        scores.push(hit.rerank_score);
    }

    let mut data = Map::new();
    data.insert("ids".into(), json!(ids));
    data.insert("documents".into(), json!(documents));
    data.insert("distances".into(), json!(distances));
    data.insert("metadatas".into(), json!(metadatas));
    if reranked {
        data.insert("rerank_scores".into(), json!(scores));
    }
    Value::Object(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publishers_accept_both_shapes() {
        let joined = Publishers::Joined("国务院, 司法部,,".into());
        assert_eq!(joined.into_vec(), vec!["国务院", "司法部"]);

        let list: QueryParams = serde_json::from_value(json!({
            "collection_name": "laws",
            "query": "q",
            "publishers": ["国务院"],
        }))
        .unwrap();
        assert_eq!(list.publishers, Some(Publishers::List(vec!["国务院".into()])));
        assert!(!list.rerank);
    }

    #[test]
    fn rerank_scores_only_when_reranked() {
        let plain = hits_to_json(Vec::new(), false);
        assert!(plain.get("rerank_scores").is_none());
        let reranked = hits_to_json(Vec::new(), true);
        assert_eq!(reranked["rerank_scores"], json!([]));
    }
}
