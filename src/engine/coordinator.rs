//! Round coordinator — the heartbeat that drives capture and settlement.
//!
//! One logical tick per second: derive the round state from the clock,
//! detect phase edges, capture entry/settlement prices through the
//! smoother at the last second of each half-cycle, compute the round
//! outcome, and append to the bounded history ledger.
//!
//! The coordinator is the sole writer of scheduler state; consumers read
//! `Arc<SharedState>` snapshots without blocking the heartbeat. Dropping
//! the coordinator mid-fetch abandons the in-flight request without
//! appending a partial record.

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::clock::RoundClock;
use crate::feed::smoother::PriceSmoother;
use crate::storage::HistoryStore;
use crate::types::{PriceQuote, PulseError, RoundOutcome, RoundPhase, RoundRecord, RoundState};

// ---------------------------------------------------------------------------
// Shared read state
// ---------------------------------------------------------------------------

/// Latest captured prices, as exposed to consumers.
#[derive(Debug, Clone, Default)]
pub struct CapturedPrices {
    /// Entry price of the round currently open or under settlement.
    pub entry_price: Option<f64>,
    /// Settlement price of the most recently settled round.
    pub settlement_price: Option<f64>,
    /// The last quote the smoother produced for a capture.
    pub last_quote: Option<PriceQuote>,
}

/// Reader-safe snapshots of coordinator state.
///
/// Written only by the heartbeat task; read by the API and betting logic.
pub struct SharedState {
    pub round: RwLock<RoundState>,
    pub prices: RwLock<CapturedPrices>,
    pub history: RwLock<Vec<RoundRecord>>,
}

impl SharedState {
    pub(crate) fn new(round: RoundState, history: Vec<RoundRecord>) -> Self {
        Self {
            round: RwLock::new(round),
            prices: RwLock::new(CapturedPrices::default()),
            history: RwLock::new(history),
        }
    }

    /// Current round state.
    pub async fn round_state(&self) -> RoundState {
        *self.round.read().await
    }

    /// Latest entry/settlement prices.
    pub async fn latest_prices(&self) -> CapturedPrices {
        self.prices.read().await.clone()
    }

    /// Ledger snapshot, most-recent-last.
    pub async fn history_snapshot(&self) -> Vec<RoundRecord> {
        self.history.read().await.clone()
    }
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

/// Drives the scheduler forward one tick at a time.
pub struct Coordinator {
    clock: RoundClock,
    smoother: PriceSmoother,
    history: HistoryStore,
    shared: Arc<SharedState>,

    last_phase: RoundPhase,
    /// Entry price of the round currently in flight.
    entry_price: Option<f64>,
    /// Entry price used by the last settled round (startup fallback).
    prev_entry_price: Option<f64>,
    /// Capture bookkeeping for missed-edge detection. Start as true so a
    /// coordinator that joins mid-half doesn't warn about an edge that
    /// happened before it existed.
    entry_captured: bool,
    settlement_captured: bool,
}

impl Coordinator {
    /// Build a coordinator. Initial phase comes from the clock at start,
    /// not a fixed value; prior history seeds the settlement fallback.
    pub fn new(clock: RoundClock, smoother: PriceSmoother, history: HistoryStore) -> Self {
        let initial = clock.now();
        Self::with_initial_state(clock, smoother, history, initial)
    }

    /// As `new`, but with an explicit starting instant (deterministic tests).
    pub fn with_initial_state(
        clock: RoundClock,
        smoother: PriceSmoother,
        history: HistoryStore,
        initial: RoundState,
    ) -> Self {
        let prev_entry_price = history.records().last().map(|r| r.entry_price);
        let shared = Arc::new(SharedState::new(initial, history.records().to_vec()));

        info!(
            round = initial.round_number,
            phase = %initial.phase,
            seconds_remaining = initial.seconds_remaining,
            prior_rounds = history.records().len(),
            "Coordinator initialised"
        );

        Self {
            clock,
            smoother,
            history,
            shared,
            last_phase: initial.phase,
            entry_price: None,
            prev_entry_price,
            entry_captured: true,
            settlement_captured: true,
        }
    }

    /// Handle for consumers. Reads never block the heartbeat.
    pub fn shared(&self) -> Arc<SharedState> {
        Arc::clone(&self.shared)
    }

    pub fn clock(&self) -> &RoundClock {
        &self.clock
    }

    /// One heartbeat tick at the current wall-clock instant.
    pub async fn tick(&mut self) {
        let epoch_secs = chrono::Utc::now().timestamp().max(0) as u64;
        self.tick_at(epoch_secs).await;
    }

    /// One heartbeat tick at the given epoch second.
    ///
    /// All failures are absorbed here: upstream trouble degrades the quote
    /// inside the smoother, persistence trouble is logged. The heartbeat
    /// never propagates an error.
    pub async fn tick_at(&mut self, epoch_secs: u64) {
        let state = self.clock.state_at(epoch_secs);

        if state.phase != self.last_phase {
            self.on_phase_change(state);
        }

        // Capture edges fire on exact equality: one tick before the half
        // ends. A delayed heartbeat that skips this second loses the
        // capture for that half (reported at the next phase change).
        if state.phase == RoundPhase::OpenForBets && state.seconds_remaining == 1 {
            self.capture_entry(state, epoch_secs).await;
        }

        if state.phase == RoundPhase::AwaitingSettlement && state.seconds_remaining == 1 {
            self.capture_settlement(state, epoch_secs).await;
        }

        *self.shared.round.write().await = state;
    }

    fn on_phase_change(&mut self, state: RoundState) {
        // Report any capture the previous half should have produced.
        let missed = match self.last_phase {
            RoundPhase::OpenForBets if !self.entry_captured => Some(PulseError::MissedCaptureEdge(
                format!("entry for round {}", state.round_number),
            )),
            RoundPhase::AwaitingSettlement if !self.settlement_captured => {
                Some(PulseError::MissedCaptureEdge(format!(
                    "settlement before round {}",
                    state.round_number
                )))
            }
            _ => None,
        };
        if let Some(e) = missed {
            warn!(error = %e, "Heartbeat skipped a capture second");
        }

        info!(
            from = %self.last_phase,
            to = %state.phase,
            round = state.round_number,
            "Phase change"
        );

        match state.phase {
            RoundPhase::OpenForBets => self.entry_captured = false,
            RoundPhase::AwaitingSettlement => self.settlement_captured = false,
        }
        self.last_phase = state.phase;
    }

    async fn capture_entry(&mut self, state: RoundState, epoch_secs: u64) {
        let quote = self.smoother.quote_at(epoch_secs as i64 * 1000).await;
        self.entry_price = Some(quote.price);
        self.entry_captured = true;

        info!(
            round = state.round_number,
            price = quote.price,
            degraded = quote.degraded,
            "Entry price captured"
        );

        let mut prices = self.shared.prices.write().await;
        prices.entry_price = Some(quote.price);
        prices.last_quote = Some(quote);
    }

    async fn capture_settlement(&mut self, state: RoundState, epoch_secs: u64) {
        let quote = self.smoother.quote_at(epoch_secs as i64 * 1000).await;
        let settlement_price = quote.price;

        // Fallback chain for rounds whose entry edge was missed: the
        // previous round's entry, then 0.0.
        let entry_price = match self.entry_price.or(self.prev_entry_price) {
            Some(price) => price,
            None => {
                debug!(
                    round = state.round_number,
                    "No entry price available, settling against 0.0"
                );
                0.0
            }
        };

        let result = RoundOutcome::from_prices(entry_price, settlement_price);
        let record = RoundRecord {
            round_number: state.round_number,
            entry_price,
            settlement_price,
            result,
            timestamp_ms: epoch_secs as i64 * 1000,
        };

        info!(
            round = record.round_number,
            entry = record.entry_price,
            settlement = record.settlement_price,
            result = %record.result,
            degraded = quote.degraded,
            "Round settled"
        );

        if let Err(e) = self.history.append(record) {
            warn!(error = %e, "Failed to persist round history, continuing");
        }

        self.prev_entry_price = Some(entry_price);
        self.entry_price = None;
        self.settlement_captured = true;

        {
            let mut prices = self.shared.prices.write().await;
            prices.settlement_price = Some(settlement_price);
            prices.last_quote = Some(quote);
        }
        *self.shared.history.write().await = self.history.records().to_vec();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
