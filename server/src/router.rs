//! Route wiring.

use axum::http::Method;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{self, AppState};

/// Build the API router.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET])
        .allow_headers(Any)
        .allow_origin(Any);

    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/quotes", get(handlers::get_quotes))
        .route("/average", get(handlers::get_average))
        .route("/slippage", get(handlers::get_slippage))
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use cambio_common::{time, Currency, Quote};
    use cambio_service::{MemoryQuoteStore, QuoteCache};
    use cambio_sources::{CurrencySources, MockRateSource, RateSource, SourceRegistry};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::str::FromStr;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn quote(source: &str, buy: Decimal, sell: Decimal) -> Quote {
        Quote::new(buy, sell, format!("mock://{source}"))
    }

    fn router_with_snapshot(quotes: Vec<Quote>) -> Router {
        let store = Arc::new(MemoryQuoteStore::new());
        if !quotes.is_empty() {
            store.set_snapshot(Currency::Ars, quotes, time::now());
        }

        let registry = Arc::new(SourceRegistry::with_sources(
            CurrencySources::independent(Vec::new()),
            CurrencySources::independent(vec![
                Arc::new(MockRateSource::failing("down")) as Arc<dyn RateSource>
            ]),
        ));

        build_router(AppState {
            cache: Arc::new(QuoteCache::new(store, registry)),
        })
    }

    async fn get_json(
        router: Router,
        uri: &str,
    ) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap();
        (status, body)
    }

    fn sample_quotes() -> Vec<Quote> {
        vec![
            quote("a", dec!(100), dec!(102)),
            quote("b", dec!(98), dec!(101)),
            quote("c", dec!(102), dec!(103)),
        ]
    }

    fn as_decimal(value: &serde_json::Value) -> Decimal {
        Decimal::from_str(value.as_str().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn quotes_returns_the_cached_set() {
        let router = router_with_snapshot(sample_quotes());

        let (status, body) = get_json(router, "/quotes?currency=ARS").await;

        assert_eq!(status, StatusCode::OK);
        let entries = body.as_array().unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0]["source"], "mock://a");
    }

    #[tokio::test]
    async fn missing_currency_is_a_bad_request() {
        let router = router_with_snapshot(sample_quotes());

        let (status, body) = get_json(router, "/quotes").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["error"],
            "Invalid currency parameter. Must be BRL or ARS"
        );
        assert!(body["usage"].as_str().unwrap().contains("/quotes"));
    }

    #[tokio::test]
    async fn unknown_currency_is_a_bad_request() {
        let router = router_with_snapshot(sample_quotes());

        let (status, _) = get_json(router, "/quotes?currency=USD").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn currency_parameter_is_case_insensitive() {
        let router = router_with_snapshot(sample_quotes());

        let (status, _) = get_json(router, "/quotes?currency=ars").await;

        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn empty_quote_set_maps_to_not_found() {
        let router = router_with_snapshot(Vec::new());

        let (status, body) = get_json(router, "/quotes?currency=ARS").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "No quotes available for ARS");
    }

    #[tokio::test]
    async fn average_matches_the_cross_source_mean() {
        let router = router_with_snapshot(sample_quotes());

        let (status, body) = get_json(router, "/average?currency=ARS").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(as_decimal(&body["average_buy_price"]), dec!(100));
        assert_eq!(as_decimal(&body["average_sell_price"]), dec!(102));
    }

    #[tokio::test]
    async fn slippage_lists_every_source() {
        let router = router_with_snapshot(sample_quotes());

        let (status, body) = get_json(router, "/slippage?currency=ARS").await;

        assert_eq!(status, StatusCode::OK);
        let entries = body.as_array().unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(as_decimal(&entries[1]["buy_price_slippage"]), dec!(-2));
        assert_eq!(
            as_decimal(&entries[1]["sell_price_slippage"]),
            dec!(-0.9804)
        );
    }

    #[tokio::test]
    async fn health_reports_liveness() {
        let router = router_with_snapshot(Vec::new());

        let (status, body) = get_json(router, "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert!(body["timestamp"].as_str().is_some());
    }

    #[tokio::test]
    async fn index_describes_the_api() {
        let router = router_with_snapshot(Vec::new());

        let (status, body) = get_json(router, "/").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["supported_currencies"], serde_json::json!(["BRL", "ARS"]));
        assert!(body["endpoints"]["quotes"].as_str().is_some());
    }

    #[tokio::test]
    async fn unknown_route_gets_a_json_not_found() {
        let router = router_with_snapshot(Vec::new());

        let (status, body) = get_json(router, "/nope").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Not Found");
        assert!(body["message"].as_str().unwrap().contains("/nope"));
    }
}
