use axum::extract::State;
use serde::Deserialize;
use serde_json::json;

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CountTokensRequest {
    #[serde(alias = "query")]
    pub text: String,
}

/// POST /count-tokens
pub async fn count_tokens(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CountTokensRequest>,
) -> Result<ApiResponse, ApiError> {
    let counter = state.token_counter.clone().ok_or(ApiError::TokenizerUnavailable)?;
    let tokens_length = tokio::task::spawn_blocking(move || counter.count(&request.text))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(ApiResponse::new(
        format!("{tokens_length} token(s)"),
        json!({ "tokens_length": tokens_length }),
    ))
}
