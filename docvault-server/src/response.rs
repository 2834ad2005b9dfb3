//! The `{ ok, message, data }` envelope every route answers with.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Wire form of every response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub ok: bool,
    pub message: String,
    pub data: Value,
}

impl Envelope {
    pub fn success(message: impl Into<String>, data: Value) -> Self {
        Self { ok: true, message: message.into(), data }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self { ok: false, message: message.into(), data: Value::Null }
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Successful handler output.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    message: String,
    data: Value,
}

impl ApiResponse {
    pub fn new(message: impl Into<String>, data: Value) -> Self {
        Self { message: message.into(), data }
    }

    /// Success without a payload (`data: null`).
    pub fn message(message: impl Into<String>) -> Self {
        Self::new(message, Value::Null)
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        Envelope::success(self.message, self.data).into_response()
    }
}
