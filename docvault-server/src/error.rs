//! Handler failures, rendered as `ok: false` envelopes.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::response::{IntoResponse, Response};
use docvault_rag::{ErrorKind, RagError};
use thiserror::Error;
use tracing::{error, warn};

use crate::response::Envelope;
use crate::tokens::TokenizerError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Rag(#[from] RagError),

    /// The request could not be decoded (missing parameter, bad JSON, ...).
    #[error("invalid request: {0}")]
    BadRequest(String),

    #[error("token counting is not configured")]
    TokenizerUnavailable,

    #[error(transparent)]
    Tokenizer(#[from] TokenizerError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Whether the caller is at fault; those are logged at `warn`.
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::Rag(e) => e.kind() != ErrorKind::Upstream,
            Self::BadRequest(_) | Self::TokenizerUnavailable => true,
            Self::Tokenizer(_) | Self::Internal(_) => false,
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        if self.is_client_error() {
            warn!(error = %message, "request rejected");
        } else {
            error!(error = %message, "request failed");
        }
        Envelope::failure(message).into_response()
    }
}
