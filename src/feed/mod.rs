//! Price feed — the upstream market-data boundary and the smoothing layer.
//!
//! Defines the `PriceSource` trait (implemented by the DexScreener client)
//! and the `PriceSmoother`, which turns raw upstream quotes into a visually
//! continuous but boundable displayed price. A deterministic chart-backfill
//! generator lives in `simulation`.

pub mod dexscreener;
pub mod simulation;
pub mod smoother;

use anyhow::Result;
use async_trait::async_trait;

/// A raw upstream price quote, before smoothing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawQuote {
    pub price: f64,
    pub change_24h: f64,
    pub change_percent_24h: f64,
    pub volume_24h: f64,
}

/// Abstraction over the upstream market-data fetch.
///
/// Callers must tolerate arbitrary latency and outright failure; no retry
/// or backoff is mandated here — the smoother degrades to its cached or
/// fallback value instead.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetch the current quote, or fail.
    async fn fetch_quote(&self) -> Result<RawQuote>;

    /// Source name for logging and cache identity.
    fn name(&self) -> &str;
}
