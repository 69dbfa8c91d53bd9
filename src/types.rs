//! Shared types for the PULSE engine.
//!
//! These types form the data model used across all modules.
//! They are designed to be stable so that feed, engine, storage,
//! and API modules can depend on them without circular references.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Round phase & state
// ---------------------------------------------------------------------------

/// Which half of the cycle the current instant falls in.
///
/// Exactly one phase holds at any instant. The first half of a cycle is
/// open for bets; the second half awaits settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    OpenForBets,
    AwaitingSettlement,
}

impl RoundPhase {
    /// The phase occupying the other half of the cycle.
    pub fn opposite(&self) -> Self {
        match self {
            RoundPhase::OpenForBets => RoundPhase::AwaitingSettlement,
            RoundPhase::AwaitingSettlement => RoundPhase::OpenForBets,
        }
    }
}

impl fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundPhase::OpenForBets => write!(f, "OPEN_FOR_BETS"),
            RoundPhase::AwaitingSettlement => write!(f, "AWAITING_SETTLEMENT"),
        }
    }
}

/// Derived round state at a given instant.
///
/// Never stored — recomputed every tick from wall-clock time, so every
/// independent process agrees on the same value without coordination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundState {
    /// Monotonic round counter, starting at 1 at epoch 0. The same round
    /// number spans both phases of one cycle.
    pub round_number: u64,
    pub phase: RoundPhase,
    /// Seconds left in the current phase, in `1..=cycle/2`.
    pub seconds_remaining: u64,
}

impl fmt::Display for RoundState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "round #{} {} ({}s left)",
            self.round_number, self.phase, self.seconds_remaining,
        )
    }
}

// ---------------------------------------------------------------------------
// Price quote
// ---------------------------------------------------------------------------

/// A displayed price quote produced by the smoother.
///
/// Immutable once constructed — the smoother replaces quotes, it never
/// mutates them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub price: f64,
    pub change_24h: f64,
    pub change_percent_24h: f64,
    pub volume_24h: f64,
    pub captured_at_epoch_ms: i64,
    /// True when the upstream fetch failed and this quote was served from
    /// the last displayed price (or the cold-start fallback). Degraded
    /// quotes are still valid capture input.
    #[serde(default)]
    pub degraded: bool,
}

impl fmt::Display for PriceQuote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "${:.2} (24h {:+.2} / {:+.2}% | vol ${:.0}){}",
            self.price,
            self.change_24h,
            self.change_percent_24h,
            self.volume_24h,
            if self.degraded { " [degraded]" } else { "" },
        )
    }
}

// ---------------------------------------------------------------------------
// Round outcome & record
// ---------------------------------------------------------------------------

/// Direction the price moved over a settled round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundOutcome {
    Up,
    Down,
}

impl RoundOutcome {
    /// Derive the outcome from captured prices.
    ///
    /// Strict comparison: equal prices resolve to DOWN. This preserves the
    /// reference behavior rather than inventing a tie rule.
    pub fn from_prices(entry_price: f64, settlement_price: f64) -> Self {
        if settlement_price > entry_price {
            RoundOutcome::Up
        } else {
            RoundOutcome::Down
        }
    }
}

impl fmt::Display for RoundOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundOutcome::Up => write!(f, "UP"),
            RoundOutcome::Down => write!(f, "DOWN"),
        }
    }
}

/// A settled round. Immutable once created.
///
/// Serialized field names are part of the persistence contract:
/// `roundNumber`, `entryPrice`, `settlementPrice`, `result`, `timestampMs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundRecord {
    pub round_number: u64,
    pub entry_price: f64,
    pub settlement_price: f64,
    pub result: RoundOutcome,
    pub timestamp_ms: i64,
}

impl fmt::Display for RoundRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "round #{}: ${:.2} → ${:.2} = {}",
            self.round_number, self.entry_price, self.settlement_price, self.result,
        )
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for PULSE.
///
/// All of these are absorbed locally — the scheduler never terminates the
/// process because of an upstream or persistence failure.
#[derive(Debug, thiserror::Error)]
pub enum PulseError {
    #[error("Upstream unavailable ({source_name}): {message}")]
    UpstreamUnavailable { source_name: String, message: String },

    #[error("Missed capture edge: {0}")]
    MissedCaptureEdge(String),

    #[error("Persistence failure: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
