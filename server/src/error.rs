//! API error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use cambio_common::Currency;
use serde_json::json;
use thiserror::Error;

/// Errors surfaced to API clients as JSON bodies.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The currency query parameter is missing or unknown.
    #[error("invalid currency parameter")]
    InvalidCurrency,

    /// The aggregation produced nothing and no snapshot exists.
    #[error("no quotes available for {0}")]
    NoQuotes(Currency),

    /// Statistics could not be derived from a non-empty quote set.
    #[error("failed to calculate statistics")]
    StatsUnavailable,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::InvalidCurrency => (
                StatusCode::BAD_REQUEST,
                json!({
                    "error": "Invalid currency parameter. Must be BRL or ARS",
                    "usage": "/quotes?currency=BRL or /quotes?currency=ARS",
                }),
            ),
            ApiError::NoQuotes(currency) => (
                StatusCode::NOT_FOUND,
                json!({
                    "error": format!("No quotes available for {currency}"),
                    "message": "Please try again later",
                }),
            ),
            ApiError::StatsUnavailable => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({
                    "error": "Failed to calculate statistics",
                    "message": "Invalid quote data",
                }),
            ),
        };

        (status, Json(body)).into_response()
    }
}
