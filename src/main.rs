//! PULSE — Betting-Terminal Round Scheduler
//!
//! Entry point. Loads configuration, initialises structured logging,
//! reloads the round ledger from disk, wires the price feed through the
//! smoother, and runs the one-second heartbeat with graceful shutdown.

use anyhow::Result;
use std::time::Duration;
use tracing::info;

use pulse::api;
use pulse::clock::RoundClock;
use pulse::config::AppConfig;
use pulse::engine::Coordinator;
use pulse::feed::dexscreener::DexScreenerSource;
use pulse::feed::smoother::PriceSmoother;
use pulse::storage::HistoryStore;

const BANNER: &str = r#"
 ____  _   _ _     ____  _____
|  _ \| | | | |   / ___|| ____|
| |_) | | | | |   \___ \|  _|
|  __/| |_| | |___ ___) | |___
|_|    \___/|_____|____/|_____|

  Price-Up-or-down Live Settlement Engine
  v0.1.0 — Round Scheduler
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cfg = AppConfig::load_or_default("config.toml")?;

    init_logging();

    println!("{BANNER}");
    info!(
        terminal = %cfg.terminal.name,
        cycle_secs = cfg.rounds.cycle_secs,
        heartbeat_secs = cfg.terminal.heartbeat_secs,
        "PULSE starting up"
    );

    // -- Wire up the pipeline --------------------------------------------

    let clock = RoundClock::new(cfg.rounds.cycle_secs)?;
    let source = DexScreenerSource::new(cfg.feed.token_address.clone())?;
    let smoother = PriceSmoother::new(Box::new(source), cfg.feed.clone());
    let history = HistoryStore::open(&cfg.rounds.history_file, cfg.rounds.history_limit);

    let mut coordinator = Coordinator::new(clock, smoother, history);

    if cfg.api.enabled {
        api::spawn_api(coordinator.shared(), cfg.api.port);
    }

    // -- Heartbeat loop ---------------------------------------------------

    let mut interval = tokio::time::interval(Duration::from_secs(cfg.terminal.heartbeat_secs));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(
        interval_secs = cfg.terminal.heartbeat_secs,
        "Entering heartbeat loop. Press Ctrl+C to stop."
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                coordinator.tick().await;
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    let final_round = coordinator.shared().round_state().await;
    info!(
        round = final_round.round_number,
        phase = %final_round.phase,
        "PULSE shut down cleanly."
    );

    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pulse=info"));

    let json_logging = std::env::var("PULSE_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt().with_env_filter(env_filter).with_target(true).init();
    }
}
