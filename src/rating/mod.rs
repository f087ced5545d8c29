pub mod calculator;
pub mod types;

pub use calculator::{actual_scores, delta, expected_score, pair_update};
pub use types::{ApplyOutcome, ApplySummary, PairUpdate, SideUpdate};
