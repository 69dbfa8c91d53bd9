//! DexScreener market-data integration.
//!
//! Fetches live SOL/USDC pair data from the public DexScreener token API.
//! No authentication required.
//!
//! API docs: https://docs.dexscreener.com/api/reference
//! Base URL: https://api.dexscreener.com/latest/dex/tokens
//!
//! Pair selection: of all pairs returned for the wrapped-SOL mint, keep
//! SOL/USDC pairs on the `solana` chain and take the one with the highest
//! USD liquidity; if that pair reports zero 24 h volume, fall back to the
//! highest-volume pair instead.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{PriceSource, RawQuote};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const BASE_URL: &str = "https://api.dexscreener.com/latest/dex/tokens";
const SOURCE_NAME: &str = "dexscreener";

/// Wrapped SOL mint address.
pub const WRAPPED_SOL: &str = "So11111111111111111111111111111111111111112";

// ---------------------------------------------------------------------------
// API response types (DexScreener JSON → Rust)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokensResponse {
    #[serde(default)]
    pairs: Option<Vec<DexPair>>,
}

/// One trading pair. We only deserialize the fields we need.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DexPair {
    #[serde(default)]
    chain_id: String,
    #[serde(default)]
    base_token: TokenRef,
    #[serde(default)]
    quote_token: TokenRef,
    /// Price as a decimal string, e.g. "142.35".
    #[serde(default)]
    price_usd: String,
    #[serde(default)]
    liquidity: Option<PairLiquidity>,
    /// Rolling volume windows in USD.
    #[serde(default)]
    volume: Option<VolumeWindows>,
    /// Absolute price change over rolling windows.
    #[serde(default)]
    price_change: Option<ChangeWindows>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct TokenRef {
    #[serde(default)]
    symbol: String,
}

#[derive(Debug, Clone, Deserialize)]
struct PairLiquidity {
    #[serde(default)]
    usd: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct VolumeWindows {
    #[serde(default)]
    h24: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct ChangeWindows {
    #[serde(default)]
    h24: f64,
}

impl DexPair {
    fn liquidity_usd(&self) -> f64 {
        self.liquidity.as_ref().map(|l| l.usd).unwrap_or(0.0)
    }

    fn volume_24h(&self) -> f64 {
        self.volume.as_ref().map(|v| v.h24).unwrap_or(0.0)
    }

    fn change_24h(&self) -> f64 {
        self.price_change.as_ref().map(|c| c.h24).unwrap_or(0.0)
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// DexScreener price source.
pub struct DexScreenerSource {
    http: Client,
    token_address: String,
}

impl DexScreenerSource {
    /// Create a source for the given token address (wrapped SOL by default).
    pub fn new(token_address: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .user_agent("PULSE/0.1.0 (betting-terminal-engine)")
            .build()
            .context("Failed to build HTTP client for DexScreener")?;

        Ok(Self {
            http,
            token_address: token_address.into(),
        })
    }

    /// Pick the most trustworthy SOL/USDC pair from an API response.
    ///
    /// Highest USD liquidity wins; a best pair with zero reported volume is
    /// replaced by the highest-volume candidate when one exists.
    fn select_pair(pairs: Vec<DexPair>) -> Option<DexPair> {
        let mut candidates: Vec<DexPair> = pairs
            .into_iter()
            .filter(|p| {
                p.chain_id == "solana"
                    && p.base_token.symbol == "SOL"
                    && p.quote_token.symbol == "USDC"
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.liquidity_usd()
                .partial_cmp(&a.liquidity_usd())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let best = candidates.first().cloned()?;
        if best.volume_24h() > 0.0 {
            return Some(best);
        }

        let with_volume = candidates
            .into_iter()
            .filter(|p| p.volume_24h() > 0.0)
            .max_by(|a, b| {
                a.volume_24h()
                    .partial_cmp(&b.volume_24h())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

        match with_volume {
            Some(p) => {
                debug!(volume = p.volume_24h(), "Best pair had no volume, using volume fallback");
                Some(p)
            }
            // Zero-volume best pair is still usable for price.
            None => Some(best),
        }
    }

    fn to_raw_quote(pair: &DexPair) -> Result<RawQuote> {
        let price: f64 = pair
            .price_usd
            .parse()
            .with_context(|| format!("Unparseable priceUsd: {:?}", pair.price_usd))?;
        if !(price > 0.0) {
            anyhow::bail!("Non-positive price from DexScreener: {price}");
        }

        let change_24h = pair.change_24h();
        let change_percent_24h = if change_24h != 0.0 {
            (change_24h / price) * 100.0
        } else {
            0.0
        };

        Ok(RawQuote {
            price,
            change_24h,
            change_percent_24h,
            volume_24h: pair.volume_24h(),
        })
    }
}

#[async_trait]
impl PriceSource for DexScreenerSource {
    async fn fetch_quote(&self) -> Result<RawQuote> {
        let url = format!("{BASE_URL}/{}", self.token_address);
        debug!(url = %url, "Fetching DexScreener pairs");

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .context("DexScreener request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("DexScreener API error {status}: {body}");
        }

        let data: TokensResponse = resp
            .json()
            .await
            .context("Failed to parse DexScreener response")?;

        let pairs = data.pairs.unwrap_or_default();
        if pairs.is_empty() {
            anyhow::bail!("No pairs returned for token {}", self.token_address);
        }

        let pair = Self::select_pair(pairs)
            .context("No suitable SOL/USDC pair found")?;

        Self::to_raw_quote(&pair)
    }

    fn name(&self) -> &str {
        SOURCE_NAME
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
