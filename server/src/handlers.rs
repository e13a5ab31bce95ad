//! HTTP request handlers.

use axum::extract::{Query, State};
use axum::http::{Method, StatusCode, Uri};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use cambio_common::{time, Currency, QuoteSet};
use cambio_service::{average, slippage, PriceAverages, QuoteCache, SlippageEntry};

use crate::error::ApiError;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<QuoteCache>,
}

/// Query parameters accepted by the data endpoints.
#[derive(Debug, Deserialize)]
pub struct CurrencyParams {
    currency: Option<String>,
}

impl CurrencyParams {
    fn parse(&self) -> Result<Currency, ApiError> {
        self.currency
            .as_deref()
            .ok_or(ApiError::InvalidCurrency)?
            .parse()
            .map_err(|_| ApiError::InvalidCurrency)
    }
}

async fn quotes_for(state: &AppState, params: &CurrencyParams) -> Result<QuoteSet, ApiError> {
    let currency = params.parse()?;
    let quotes = state.cache.get(currency).await;

    if quotes.is_empty() {
        return Err(ApiError::NoQuotes(currency));
    }

    debug!(currency = %currency, quotes = quotes.len(), "serving quote set");
    Ok(quotes)
}

/// GET /quotes - all quotes for a currency.
pub async fn get_quotes(
    State(state): State<AppState>,
    Query(params): Query<CurrencyParams>,
) -> Result<Json<QuoteSet>, ApiError> {
    let quotes = quotes_for(&state, &params).await?;
    Ok(Json(quotes))
}

/// GET /average - mean buy and sell price across sources.
pub async fn get_average(
    State(state): State<AppState>,
    Query(params): Query<CurrencyParams>,
) -> Result<Json<PriceAverages>, ApiError> {
    let quotes = quotes_for(&state, &params).await?;

    let averages = average(&quotes);
    // Guarded even though a non-empty set always yields averages.
    if averages.is_empty() {
        return Err(ApiError::StatsUnavailable);
    }

    Ok(Json(averages))
}

/// GET /slippage - per-source deviation from the average.
pub async fn get_slippage(
    State(state): State<AppState>,
    Query(params): Query<CurrencyParams>,
) -> Result<Json<Vec<SlippageEntry>>, ApiError> {
    let quotes = quotes_for(&state, &params).await?;

    let entries = slippage(&quotes);
    if entries.is_empty() {
        return Err(ApiError::StatsUnavailable);
    }

    Ok(Json(entries))
}

/// GET /health - liveness probe.
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": time::now().to_rfc3339(),
    }))
}

/// GET / - API description.
pub async fn index() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Currency Converter API",
        "endpoints": {
            "quotes": "GET /quotes?currency=BRL or /quotes?currency=ARS",
            "average": "GET /average?currency=BRL or /average?currency=ARS",
            "slippage": "GET /slippage?currency=BRL or /slippage?currency=ARS",
        },
        "supported_currencies": Currency::ALL,
    }))
}

/// Fallback for unknown routes.
pub async fn not_found(method: Method, uri: Uri) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Not Found",
            "message": format!("Route {method} {} not found", uri.path()),
        })),
    )
}
