//! Price smoother — bounded micro-movement over a noisy upstream feed.
//!
//! Presents a continuously-varying displayed price derived from the raw
//! upstream quote, while bounding deviation from the real value and
//! periodically resynchronizing to it. Caches recent quotes to bound the
//! upstream call rate, and degrades to the last displayed price (never an
//! error) when the upstream is unavailable.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use super::PriceSource;
use crate::config::FeedConfig;
use crate::types::PriceQuote;

/// Mean-reversion strength pulling the displayed price toward the real one.
const MEAN_REVERSION: f64 = 0.3;

/// Smoothing state. Initialized lazily on the first quote, mutated on every
/// subsequent one, and owned by the `PriceSmoother` instance (not a
/// process-wide static) so independent instances can coexist in tests.
#[derive(Debug, Clone, Copy)]
struct SmootherState {
    /// Real price at the last hard sync. Deliberately not updated on
    /// micro-movement steps, so the reset threshold measures drift since
    /// the last resynchronization.
    last_real_price: f64,
    last_displayed_price: f64,
}

/// Converts raw upstream quotes into displayed quotes.
pub struct PriceSmoother {
    source: Box<dyn PriceSource>,
    cfg: FeedConfig,
    state: Option<SmootherState>,
    cached: Option<PriceQuote>,
    last_resync_ms: i64,
    rng: StdRng,
}

impl PriceSmoother {
    pub fn new(source: Box<dyn PriceSource>, cfg: FeedConfig) -> Self {
        Self {
            source,
            cfg,
            state: None,
            cached: None,
            last_resync_ms: 0,
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic random walk for tests.
    #[cfg(test)]
    pub fn with_seed(source: Box<dyn PriceSource>, cfg: FeedConfig, seed: u64) -> Self {
        let mut smoother = Self::new(source, cfg);
        smoother.rng = StdRng::seed_from_u64(seed);
        smoother
    }

    /// Get the current displayed quote, at the current wall-clock instant.
    pub async fn quote(&mut self) -> PriceQuote {
        self.quote_at(chrono::Utc::now().timestamp_millis()).await
    }

    /// Get the current displayed quote as of `now_ms`.
    ///
    /// Cache hits (within the TTL) return the previously computed quote
    /// unchanged. On a miss the upstream is fetched; fetch failure degrades
    /// to the last displayed price (or the configured fallback on a total
    /// cold start) and marks the quote degraded. Degraded quotes are not
    /// cached, so the next call re-attempts the upstream.
    pub async fn quote_at(&mut self, now_ms: i64) -> PriceQuote {
        if let Some(cached) = &self.cached {
            if now_ms - cached.captured_at_epoch_ms < self.cfg.cache_ttl_ms {
                return cached.clone();
            }
        }

        match self.source.fetch_quote().await {
            Ok(raw) => {
                let force_real = now_ms - self.last_resync_ms >= self.cfg.resync_interval_ms;
                let displayed = self.next_displayed(raw.price, force_real);
                if force_real {
                    self.last_resync_ms = now_ms;
                }

                if displayed != raw.price {
                    debug!(
                        real = raw.price,
                        displayed,
                        diff_pct = (displayed - raw.price) / raw.price * 100.0,
                        "Micro-movement applied"
                    );
                }

                let quote = PriceQuote {
                    price: displayed,
                    change_24h: raw.change_24h,
                    change_percent_24h: raw.change_percent_24h,
                    volume_24h: raw.volume_24h,
                    captured_at_epoch_ms: now_ms,
                    degraded: false,
                };
                self.cached = Some(quote.clone());
                quote
            }
            Err(e) => {
                warn!(
                    source = self.source.name(),
                    error = %e,
                    "Upstream fetch failed, serving fallback quote"
                );

                let price = self
                    .state
                    .as_ref()
                    .map(|s| s.last_displayed_price)
                    .unwrap_or(self.cfg.fallback_price);

                PriceQuote {
                    price,
                    change_24h: 0.0,
                    change_percent_24h: 0.0,
                    volume_24h: 0.0,
                    captured_at_epoch_ms: now_ms,
                    degraded: true,
                }
            }
        }
    }

    /// Compute the next displayed price from the real upstream price.
    ///
    /// First observation or a real move beyond the reset threshold snaps
    /// hard to the real price, as does a forced resync. Otherwise a bounded
    /// random walk with mean reversion keeps the displayed price within
    /// ±`max_deviation_pct` of real.
    fn next_displayed(&mut self, real: f64, force_real: bool) -> f64 {
        let state = match &mut self.state {
            None => {
                self.state = Some(SmootherState {
                    last_real_price: real,
                    last_displayed_price: real,
                });
                return real;
            }
            Some(state) => state,
        };

        if (real - state.last_real_price).abs() > self.cfg.reset_threshold || force_real {
            state.last_real_price = real;
            state.last_displayed_price = real;
            return real;
        }

        let random_change = (self.rng.gen::<f64>() * 2.0 - 1.0) * self.cfg.volatility;
        let mean_reversion = (real - state.last_displayed_price) * MEAN_REVERSION;
        let candidate = state.last_displayed_price * (1.0 + random_change) + mean_reversion;

        let max_deviation = real * self.cfg.max_deviation_pct;
        let bounded = candidate.clamp(real - max_deviation, real + max_deviation);

        state.last_displayed_price = bounded;
        bounded
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
