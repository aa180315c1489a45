use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Terminal failures of the extraction pipeline. These are the only
/// failures surfaced to callers with a structured `success:false` envelope.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CheckError {
    #[error("{message}")]
    Blocked { site: String, message: String },

    #[error("Could not determine a valid price. Please provide a URL or paste product/price details.")]
    InvalidInput,
}

impl CheckError {
    pub fn blocked(site: &str) -> Self {
        CheckError::Blocked {
            site: site.to_string(),
            message: format!(
                "{site} is showing a security check. Try again later or paste the product name and price in the text box below."
            ),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            CheckError::Blocked { .. } => "BLOCKED",
            CheckError::InvalidInput => "INVALID_INPUT",
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Check(#[from] CheckError),

    #[error("Not found")]
    NotFound,

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        match self {
            AppError::Check(e) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "success": false, "error": e.to_string(), "code": e.code() })),
            )
                .into_response(),
            AppError::NotFound => (
                StatusCode::NOT_FOUND,
                Json(json!({ "success": false, "error": "Not found" })),
            )
                .into_response(),
            other => {
                error!("Request failed: {other}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "success": false, "error": "Analysis failed" })),
                )
                    .into_response()
            }
        }
    }
}
