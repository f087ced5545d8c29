//! Closed registry of pairing and tie-break strategies, keyed by the strings
//! stored on a tournament. Unknown keys are rejected when a tournament is
//! configured, so lookups at pairing or standings time cannot fail.

use std::collections::HashMap;

use serde::Serialize;

use super::pairing::{self, PairingInput, RoundPairing};
use crate::database::models::{text_column, PlayerId};
use crate::errors::{EngineError, EngineResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PairingStrategy {
    /// Swiss: group by points, shuffle within groups, float leftovers down.
    PointsGroups,
}

impl PairingStrategy {
    pub const ALL: [PairingStrategy; 1] = [PairingStrategy::PointsGroups];

    pub fn as_str(&self) -> &'static str {
        match self {
            PairingStrategy::PointsGroups => "points_groups",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PairingStrategy::PointsGroups => "By points (random within groups)",
        }
    }

    pub fn parse(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == key)
    }

    pub fn from_key(key: &str) -> EngineResult<Self> {
        Self::parse(key)
            .ok_or_else(|| EngineError::configuration(format!("unknown pairing strategy '{}'", key)))
    }

    pub fn pair(&self, input: &PairingInput, seed: u64) -> RoundPairing {
        match self {
            PairingStrategy::PointsGroups => pairing::pair_by_points(input, seed),
        }
    }
}

text_column!(PairingStrategy);

/// Per-player totals the tie-break strategies read from.
#[derive(Debug, Clone, Default)]
pub struct TiebreakAggregates {
    pub score_sum: HashMap<PlayerId, f64>,
    pub secondary_score_sum: HashMap<PlayerId, f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TiebreakStrategy {
    #[serde(rename = "none")]
    Disabled,
    ScoreSum,
    SecondaryScoreSum,
}

impl TiebreakStrategy {
    pub const ALL: [TiebreakStrategy; 3] = [
        TiebreakStrategy::Disabled,
        TiebreakStrategy::ScoreSum,
        TiebreakStrategy::SecondaryScoreSum,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TiebreakStrategy::Disabled => "none",
            TiebreakStrategy::ScoreSum => "score_sum",
            TiebreakStrategy::SecondaryScoreSum => "secondary_score_sum",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TiebreakStrategy::Disabled => "None",
            TiebreakStrategy::ScoreSum => "Score sum",
            TiebreakStrategy::SecondaryScoreSum => "Secondary score sum",
        }
    }

    pub fn parse(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == key)
    }

    pub fn from_key(key: &str) -> EngineResult<Self> {
        Self::parse(key)
            .ok_or_else(|| EngineError::configuration(format!("unknown tie-break strategy '{}'", key)))
    }

    pub fn value(&self, player_id: PlayerId, aggregates: &TiebreakAggregates) -> f64 {
        let lookup = |map: &HashMap<PlayerId, f64>| map.get(&player_id).copied().unwrap_or(0.0);
        match self {
            TiebreakStrategy::Disabled => 0.0,
            TiebreakStrategy::ScoreSum => lookup(&aggregates.score_sum),
            TiebreakStrategy::SecondaryScoreSum => lookup(&aggregates.secondary_score_sum),
        }
    }
}

text_column!(TiebreakStrategy);
