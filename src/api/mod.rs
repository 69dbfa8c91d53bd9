//! Read API — Axum web server over the coordinator's shared state.
//!
//! Serves the terminal-facing JSON endpoints. CORS enabled for local
//! development.

pub mod routes;

use axum::{
    http::{header, HeaderValue, Method},
    routing::get,
    Router,
};
use tower_http::cors::CorsLayer;
use tracing::info;

pub use routes::AppState;

/// Start the API web server.
///
/// This spawns a background task — it doesn't block.
pub fn spawn_api(state: AppState, port: u16) {
    let app = build_router(state);

    tokio::spawn(async move {
        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
        info!(port, "API server starting on http://localhost:{port}");

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .expect("Failed to bind API port");

        axum::serve(listener, app).await.expect("API server error");
    });
}

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin("*".parse::<HeaderValue>().unwrap())
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/api/round", get(routes::get_round))
        .route("/api/prices", get(routes::get_prices))
        .route("/api/history", get(routes::get_history))
        .route("/api/chart", get(routes::get_chart))
        .route("/api/payout", get(routes::get_payout))
        .route("/health", get(routes::health))
        .layer(cors)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::RoundClock;
    use crate::engine::SharedState;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        let round = RoundClock::default().state_at(30);
        Arc::new(SharedState::new(round, Vec::new()))
    }

    async fn get(uri: &str) -> axum::response::Response {
        build_router(test_state())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        assert_eq!(get("/health").await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_round_endpoint() {
        let resp = get("/api/round").await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["roundNumber"], 1);
        assert_eq!(json["phase"], "OPEN_FOR_BETS");
        assert_eq!(json["secondsRemaining"], 30);
        assert!(json["fairnessSeed"].as_str().unwrap().starts_with("round_1-"));
    }

    #[tokio::test]
    async fn test_prices_endpoint() {
        let resp = get("/api/prices").await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json["entryPrice"].is_null());
    }

    #[tokio::test]
    async fn test_history_endpoint() {
        let resp = get("/api/history").await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
        let json: Vec<serde_json::Value> = serde_json::from_slice(&body).unwrap();
        assert!(json.is_empty());
    }

    #[tokio::test]
    async fn test_chart_endpoint_with_params() {
        let resp = get("/api/chart?points=20&volatility=low").await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), 100_000).await.unwrap();
        let json: Vec<serde_json::Value> = serde_json::from_slice(&body).unwrap();
        assert_eq!(json.len(), 20);
        assert!(json[0]["timestampMs"].is_i64());
    }

    #[tokio::test]
    async fn test_chart_endpoint_bad_volatility() {
        let resp = get("/api/chart?volatility=extreme").await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_payout_endpoint() {
        let resp = get("/api/payout?entry=100.0&exit=110.0&direction=up").await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!((json["multiplier"].as_f64().unwrap() - 5.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_payout_endpoint_losing_bet() {
        let resp = get("/api/payout?entry=100.0&exit=90.0&direction=up").await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["multiplier"].as_f64().unwrap(), 0.0);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        assert_eq!(get("/api/nope").await.status(), StatusCode::NOT_FOUND);
    }
}
