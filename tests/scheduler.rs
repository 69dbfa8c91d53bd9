//! End-to-end scheduler test.
//!
//! Drives a coordinator through full rounds against a deterministic
//! in-memory price source, checking capture instants, settlement
//! outcomes, ledger persistence, and the read API over shared state.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use pulse::clock::RoundClock;
use pulse::config::FeedConfig;
use pulse::engine::Coordinator;
use pulse::feed::smoother::PriceSmoother;
use pulse::feed::{PriceSource, RawQuote};
use pulse::storage::HistoryStore;
use pulse::types::{RoundOutcome, RoundPhase};

/// A deterministic price source for integration testing.
///
/// Plays back a scripted price sequence, one price per fetch. All state
/// is in-memory; an optional forced error simulates an upstream outage.
struct ScriptedSource {
    prices: Arc<Mutex<VecDeque<f64>>>,
    force_error: Arc<Mutex<Option<String>>>,
}

impl ScriptedSource {
    fn new(prices: Vec<f64>) -> Self {
        Self {
            prices: Arc::new(Mutex::new(prices.into())),
            force_error: Arc::new(Mutex::new(None)),
        }
    }

    fn error_handle(&self) -> Arc<Mutex<Option<String>>> {
        Arc::clone(&self.force_error)
    }
}

#[async_trait]
impl PriceSource for ScriptedSource {
    async fn fetch_quote(&self) -> Result<RawQuote> {
        if let Some(err) = self.force_error.lock().unwrap().as_ref() {
            return Err(anyhow!("{}", err));
        }
        let price = self
            .prices
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow!("scripted prices exhausted"))?;
        Ok(RawQuote {
            price,
            change_24h: 1.5,
            change_percent_24h: 0.75,
            volume_24h: 10_000.0,
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn temp_path(tag: &str) -> PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!("pulse_e2e_{tag}_{}.json", uuid::Uuid::new_v4()));
    p
}

/// Captures 60 s apart with price jumps past the 1.0 reset threshold take
/// the smoother's hard-resync path, so scripted prices come through exactly.
fn coordinator_with(path: &PathBuf, prices: Vec<f64>) -> Coordinator {
    let clock = RoundClock::default();
    let initial = clock.state_at(0);
    let smoother = PriceSmoother::new(
        Box::new(ScriptedSource::new(prices)),
        FeedConfig::default(),
    );
    let history = HistoryStore::open(path, 5);
    Coordinator::with_initial_state(clock, smoother, history, initial)
}

#[tokio::test]
async fn test_full_round_lifecycle() {
    let path = temp_path("lifecycle");
    let mut coordinator = coordinator_with(&path, vec![200.0, 210.0]);
    let shared = coordinator.shared();

    // First half: betting open, no prices captured yet.
    for t in 0..59 {
        coordinator.tick_at(t).await;
    }
    let state = shared.round_state().await;
    assert_eq!(state.round_number, 1);
    assert_eq!(state.phase, RoundPhase::OpenForBets);
    assert_eq!(state.seconds_remaining, 2);
    assert!(shared.latest_prices().await.entry_price.is_none());

    // Entry edge at t=59.
    coordinator.tick_at(59).await;
    let prices = shared.latest_prices().await;
    assert_eq!(prices.entry_price, Some(200.0));
    assert!(prices.settlement_price.is_none());

    // Second half counts down toward settlement.
    for t in 60..119 {
        coordinator.tick_at(t).await;
    }
    let state = shared.round_state().await;
    assert_eq!(state.phase, RoundPhase::AwaitingSettlement);
    assert!(shared.history_snapshot().await.is_empty());

    // Settlement edge at t=119.
    coordinator.tick_at(119).await;
    let history = shared.history_snapshot().await;
    assert_eq!(history.len(), 1);
    let record = &history[0];
    assert_eq!(record.round_number, 1);
    assert_eq!(record.entry_price, 200.0);
    assert_eq!(record.settlement_price, 210.0);
    assert_eq!(record.result, RoundOutcome::Up);
    assert_eq!(record.timestamp_ms, 119_000);

    // The ledger survived to disk with the wire field names.
    let on_disk = std::fs::read_to_string(&path).unwrap();
    assert!(on_disk.contains("\"roundNumber\": 1"));
    assert!(on_disk.contains("\"result\": \"up\""));

    std::fs::remove_file(&path).unwrap();
}

#[tokio::test]
async fn test_consecutive_rounds_and_restart() {
    let path = temp_path("restart");

    {
        let mut coordinator =
            coordinator_with(&path, vec![200.0, 210.0, 215.0, 205.0, 220.0, 230.0]);
        for t in 0..(3 * 120) {
            coordinator.tick_at(t).await;
        }

        let history = coordinator.shared().history_snapshot().await;
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].result, RoundOutcome::Up); // 200 → 210
        assert_eq!(history[1].result, RoundOutcome::Down); // 215 → 205
        assert_eq!(history[2].result, RoundOutcome::Up); // 220 → 230
    }

    // Restart from the same file: prior rounds reload into shared state.
    let restarted = coordinator_with(&path, vec![240.0, 250.0]);
    let history = restarted.shared().history_snapshot().await;
    assert_eq!(history.len(), 3);
    assert_eq!(history[2].round_number, 3);

    std::fs::remove_file(&path).unwrap();
}

#[tokio::test]
async fn test_outage_degrades_but_never_stalls() {
    let path = temp_path("outage");
    let source = ScriptedSource::new(vec![200.0]);
    let errors = source.error_handle();

    let clock = RoundClock::default();
    let initial = clock.state_at(0);
    let smoother = PriceSmoother::new(Box::new(source), FeedConfig::default());
    let history = HistoryStore::open(&path, 5);
    let mut coordinator = Coordinator::with_initial_state(clock, smoother, history, initial);

    // Entry captures normally, then the upstream goes dark.
    for t in 0..=59 {
        coordinator.tick_at(t).await;
    }
    *errors.lock().unwrap() = Some("upstream outage".to_string());

    for t in 60..=119 {
        coordinator.tick_at(t).await;
    }

    // Settlement still happened, against the last displayed price.
    let history = coordinator.shared().history_snapshot().await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].entry_price, 200.0);
    assert_eq!(history[0].settlement_price, 200.0);
    assert_eq!(history[0].result, RoundOutcome::Down);

    std::fs::remove_file(&path).unwrap();
}

#[tokio::test]
async fn test_api_serves_coordinator_state() {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    let path = temp_path("api");
    let mut coordinator = coordinator_with(&path, vec![200.0, 210.0]);
    for t in 0..=119 {
        coordinator.tick_at(t).await;
    }

    let app = pulse::api::build_router(coordinator.shared());

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/history")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
    let json: Vec<serde_json::Value> = serde_json::from_slice(&body).unwrap();
    assert_eq!(json.len(), 1);
    assert_eq!(json[0]["roundNumber"], 1);
    assert_eq!(json[0]["entryPrice"], 200.0);
    assert_eq!(json[0]["result"], "up");

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/api/prices")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["entryPrice"], 200.0);
    assert_eq!(json["settlementPrice"], 210.0);

    std::fs::remove_file(&path).unwrap();
}
