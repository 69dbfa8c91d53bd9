//! Payout computation and fairness seed.
//!
//! Pure functions consumed by the betting UI: a winning bet pays a base
//! multiplier plus a margin bonus that grows with how far the price moved
//! in the bettor's favor. The fairness seed is display-only — there is no
//! committed-hash disclosure scheme behind it.

use chrono::Utc;
use serde::Serialize;

use crate::types::RoundOutcome;

/// Base multiplier for a winning bet.
pub const BASE_PAYOUT: f64 = 1.9;

/// Margin bonus step: +0.1x per 0.05 % in-favor move.
const BONUS_STEP_PCT: f64 = 0.0005;
const BONUS_PER_STEP: f64 = 0.1;

/// Cap on the accumulated margin bonus.
const MAX_BONUS: f64 = 3.1;

/// Cap on the total multiplier.
const MAX_MULTIPLIER: f64 = 5.0;

/// Computed payout for a settled bet.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Payout {
    pub payout: f64,
    pub multiplier: f64,
}

/// Compute the payout multiplier for a bet on `direction`, given the round's
/// entry and exit prices. Losing bets (including flat rounds bet UP) pay 0.
pub fn calculate_payout(
    entry_price: f64,
    exit_price: f64,
    direction: RoundOutcome,
    base_payout: f64,
) -> Payout {
    let price_change = exit_price - entry_price;
    let percent_change = (price_change / entry_price).abs();

    let is_win = match direction {
        RoundOutcome::Up => price_change > 0.0,
        RoundOutcome::Down => price_change < 0.0,
    };

    if !is_win {
        return Payout {
            payout: 0.0,
            multiplier: 0.0,
        };
    }

    let margin_bonus = ((percent_change / BONUS_STEP_PCT).floor() * BONUS_PER_STEP).min(MAX_BONUS);
    let multiplier = (base_payout + margin_bonus).min(MAX_MULTIPLIER);

    Payout {
        payout: multiplier,
        multiplier,
    }
}

/// Display-only fairness seed for a round: the round number joined with the
/// current UTC date.
pub fn fairness_seed(round_number: u64) -> String {
    format!("round_{round_number}-{}", Utc::now().format("%Y-%m-%d"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
