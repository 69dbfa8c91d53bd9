//! Round clock — pure derivation of round identity from wall-clock time.
//!
//! Every independent caller (even across machines) converges on identical
//! output for the same instant, because the round state is a total function
//! of epoch seconds and the fixed cycle length. No server coordination, no
//! stored state.

use anyhow::{bail, Result};
use chrono::Utc;

use crate::types::{RoundPhase, RoundState};

/// Default full-cycle length in seconds (60 s open + 60 s settling).
pub const DEFAULT_CYCLE_SECS: u64 = 120;

/// Maps an instant in time to round number, phase, and seconds remaining.
#[derive(Debug, Clone, Copy)]
pub struct RoundClock {
    cycle_secs: u64,
}

impl RoundClock {
    /// Create a clock with the given full-cycle length.
    ///
    /// The cycle splits into two equal halves, so it must be even and at
    /// least 2 seconds.
    pub fn new(cycle_secs: u64) -> Result<Self> {
        if cycle_secs < 2 || cycle_secs % 2 != 0 {
            bail!("cycle length must be an even number of seconds >= 2, got {cycle_secs}");
        }
        Ok(Self { cycle_secs })
    }

    /// Full cycle length in seconds.
    pub fn cycle_secs(&self) -> u64 {
        self.cycle_secs
    }

    /// Length of one phase (half the cycle).
    pub fn half_secs(&self) -> u64 {
        self.cycle_secs / 2
    }

    /// Round state for the current wall-clock instant.
    pub fn now(&self) -> RoundState {
        self.state_at(Utc::now().timestamp().max(0) as u64)
    }

    /// Round state at the given epoch second. Pure and total for all
    /// non-negative epoch values; calling twice with the same input yields
    /// identical output.
    pub fn state_at(&self, epoch_secs: u64) -> RoundState {
        let half = self.half_secs();
        let cycle_position = epoch_secs % self.cycle_secs;
        let round_number = epoch_secs / self.cycle_secs + 1;

        let (phase, seconds_remaining) = if cycle_position < half {
            (RoundPhase::OpenForBets, half - cycle_position)
        } else {
            (
                RoundPhase::AwaitingSettlement,
                self.cycle_secs - cycle_position,
            )
        };

        RoundState {
            round_number,
            phase,
            seconds_remaining,
        }
    }
}

impl Default for RoundClock {
    fn default() -> Self {
        Self {
            cycle_secs: DEFAULT_CYCLE_SECS,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
