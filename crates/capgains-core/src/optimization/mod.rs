//! Tax-minimizing disposal analysis: single-asset insights and, for lot-based
//! investments, a deterministic batch of simulated exits.

pub mod insights;

#[cfg(feature = "sip")]
pub mod exits;

pub use insights::{asset_insights, InsightKind, OptimizationInsight};

#[cfg(feature = "sip")]
pub use exits::{candidate_exit_dates, simulate_exits, ExitCandidate, ExitSimulation};
