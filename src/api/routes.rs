//! Read-API route handlers.
//!
//! All endpoints return JSON. State is the coordinator's `Arc<SharedState>`;
//! handlers never write, so they can never stall the heartbeat.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::engine::payout::{calculate_payout, fairness_seed, Payout, BASE_PAYOUT};
use crate::engine::SharedState;
use crate::feed::simulation::{generate_market_data, MarketDataPoint, Volatility};
use crate::types::{PriceQuote, RoundOutcome, RoundRecord};

pub type AppState = Arc<SharedState>;

/// Default number of backfill samples when the client doesn't ask.
const DEFAULT_CHART_POINTS: usize = 60;

/// Upper bound on a single backfill request.
const MAX_CHART_POINTS: usize = 600;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundResponse {
    pub round_number: u64,
    pub phase: String,
    pub seconds_remaining: u64,
    pub fairness_seed: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricesResponse {
    pub entry_price: Option<f64>,
    pub settlement_price: Option<f64>,
    pub last_quote: Option<PriceQuote>,
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /api/round
pub async fn get_round(State(state): State<AppState>) -> Json<RoundResponse> {
    let round = state.round_state().await;
    Json(RoundResponse {
        round_number: round.round_number,
        phase: round.phase.to_string(),
        seconds_remaining: round.seconds_remaining,
        fairness_seed: fairness_seed(round.round_number),
    })
}

/// GET /api/prices
pub async fn get_prices(State(state): State<AppState>) -> Json<PricesResponse> {
    let prices = state.latest_prices().await;
    Json(PricesResponse {
        entry_price: prices.entry_price,
        settlement_price: prices.settlement_price,
        last_quote: prices.last_quote,
    })
}

/// GET /api/history
pub async fn get_history(State(state): State<AppState>) -> Json<Vec<RoundRecord>> {
    Json(state.history_snapshot().await)
}

#[derive(Debug, Deserialize)]
pub struct ChartQuery {
    pub points: Option<usize>,
    pub volatility: Option<String>,
}

/// GET /api/chart
///
/// Synthetic backfill series anchored at the last displayed price (or the
/// most recent settlement if no quote has been captured yet).
pub async fn get_chart(
    State(state): State<AppState>,
    Query(query): Query<ChartQuery>,
) -> Result<Json<Vec<MarketDataPoint>>, (StatusCode, String)> {
    let points = query.points.unwrap_or(DEFAULT_CHART_POINTS);
    if points == 0 || points > MAX_CHART_POINTS {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("points must be between 1 and {MAX_CHART_POINTS}"),
        ));
    }

    let volatility = match query.volatility.as_deref() {
        None => Volatility::Medium,
        Some(s) => s
            .parse::<Volatility>()
            .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?,
    };

    let prices = state.latest_prices().await;
    let start_price = prices
        .last_quote
        .map(|q| q.price)
        .or(prices.settlement_price)
        .unwrap_or(100.0);

    let now_ms = chrono::Utc::now().timestamp_millis();
    Ok(Json(generate_market_data(
        points,
        start_price,
        volatility,
        now_ms,
    )))
}

#[derive(Debug, Deserialize)]
pub struct PayoutQuery {
    pub entry: f64,
    pub exit: f64,
    pub direction: String,
}

/// GET /api/payout
pub async fn get_payout(
    Query(query): Query<PayoutQuery>,
) -> Result<Json<Payout>, (StatusCode, String)> {
    if query.entry <= 0.0 {
        return Err((
            StatusCode::BAD_REQUEST,
            "entry must be positive".to_string(),
        ));
    }

    let direction = match query.direction.to_lowercase().as_str() {
        "up" => RoundOutcome::Up,
        "down" => RoundOutcome::Down,
        other => {
            return Err((
                StatusCode::BAD_REQUEST,
                format!("direction must be 'up' or 'down', got '{other}'"),
            ))
        }
    };

    Ok(Json(calculate_payout(
        query.entry,
        query.exit,
        direction,
        BASE_PAYOUT,
    )))
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
