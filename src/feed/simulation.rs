//! Deterministic chart-backfill series.
//!
//! Generates a geometric-Brownian-motion price series seeded from the
//! current minute, so independent clients render identical backfill without
//! exchanging data. The generator is a fixed LCG plus Box-Muller transform;
//! swapping in a general-purpose RNG would change the shared sequence, so
//! the recurrence is part of the contract.

use serde::Serialize;

/// One synthetic price sample.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketDataPoint {
    pub timestamp_ms: i64,
    pub price: f64,
}

/// Volatility presets for the synthetic series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Volatility {
    Low,
    Medium,
    High,
}

impl Volatility {
    fn factor(&self) -> f64 {
        match self {
            Volatility::Low => 0.001,
            Volatility::Medium => 0.003,
            Volatility::High => 0.007,
        }
    }
}

impl std::str::FromStr for Volatility {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Volatility::Low),
            "medium" => Ok(Volatility::Medium),
            "high" => Ok(Volatility::High),
            other => Err(anyhow::anyhow!("Unknown volatility preset: {other}")),
        }
    }
}

/// Slight upward bias per step.
const DRIFT: f64 = 0.0001;

/// Fixed-recurrence pseudo-random generator (shared-seed contract).
struct SeededRandom {
    seed: u64,
}

impl SeededRandom {
    fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Uniform in [0, 1).
    fn next(&mut self) -> f64 {
        self.seed = (self.seed.wrapping_mul(9301).wrapping_add(49297)) % 233_280;
        self.seed as f64 / 233_280.0
    }

    /// Standard normal via Box-Muller.
    fn gaussian(&mut self) -> f64 {
        let u1 = self.next().max(f64::MIN_POSITIVE); // ln(0) guard
        let u2 = self.next();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }
}

/// Generate `points` one-second samples ending at `now_ms`, seeded from the
/// minute containing `now_ms`. Prices stay within ±20 % of `start_price`.
pub fn generate_market_data(
    points: usize,
    start_price: f64,
    volatility: Volatility,
    now_ms: i64,
) -> Vec<MarketDataPoint> {
    let seed = (now_ms / 60_000).max(0) as u64;
    let mut rng = SeededRandom::new(seed);

    let vol = volatility.factor();
    let mut data = Vec::with_capacity(points);
    let mut current = start_price;

    for i in 0..points {
        let shock = rng.gaussian();
        current += current * (DRIFT + vol * shock);
        current = current.clamp(start_price * 0.8, start_price * 1.2);

        data.push(MarketDataPoint {
            timestamp_ms: now_ms - ((points - i - 1) as i64) * 1000,
            price: current,
        });
    }

    data
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
