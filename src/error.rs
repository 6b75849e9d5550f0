use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("External API error: {0}")]
    ExternalApi(String),

    /// Neither the language model nor the keyword table produced a category
    #[error("Could not map interests '{interests}' to any categories")]
    NoCategoriesResolved {
        interests: String,
        valid_categories: Vec<String>,
        hint: String,
    },

    /// Categories resolved fine but the store had nothing for them
    #[error("No results found matching interests: {interests}")]
    NoResults {
        interests: String,
        mapped_categories: Vec<String>,
    },

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                json!({ "success": false, "error": msg }),
            ),
            AppError::InvalidInput(msg) => (
                StatusCode::BAD_REQUEST,
                json!({ "success": false, "error": msg }),
            ),
            AppError::NoCategoriesResolved {
                valid_categories,
                hint,
                ..
            } => (
                StatusCode::BAD_REQUEST,
                json!({
                    "success": false,
                    "message": format!("{}. Please try different interests.", self),
                    "valid_categories": valid_categories,
                    "hint": hint,
                }),
            ),
            AppError::NoResults {
                mapped_categories, ..
            } => (
                StatusCode::NOT_FOUND,
                json!({
                    "success": false,
                    "message": self.to_string(),
                    "mapped_categories": mapped_categories,
                }),
            ),
            AppError::Database(_) | AppError::Cache(_) | AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "success": false, "error": self.to_string() }),
            ),
            AppError::ExternalApi(msg) => (
                StatusCode::BAD_GATEWAY,
                json!({ "success": false, "error": msg }),
            ),
            AppError::HttpClient(_) => (
                StatusCode::BAD_GATEWAY,
                json!({ "success": false, "error": self.to_string() }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
