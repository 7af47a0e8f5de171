use axum::{response::IntoResponse, Json};

use crate::security::ValidationError;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("{0}")]
    Validation(String),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl From<ValidationError> for ChatError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e.to_string())
    }
}

impl IntoResponse for ChatError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;
        let status = match &self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (
            status,
            Json(serde_json::json!({ "ok": false, "error": self.to_string() })),
        )
            .into_response()
    }
}
