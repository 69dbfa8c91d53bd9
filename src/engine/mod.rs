//! Round engine — the heartbeat loop, settlement, and payout math.

pub mod coordinator;
pub mod payout;

pub use coordinator::{CapturedPrices, Coordinator, SharedState};
pub use payout::{calculate_payout, fairness_seed, Payout, BASE_PAYOUT};
