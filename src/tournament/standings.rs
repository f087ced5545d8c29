use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;

use super::points::tally_points;
use super::strategy::{TiebreakAggregates, TiebreakStrategy};
use crate::database::models::{Match, Participant, Player, PlayerId, ResultId};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StandingRow {
    pub rank: usize,
    pub player_id: PlayerId,
    pub name: String,
    pub points: f64,
    pub tiebreak1: f64,
    pub tiebreak2: f64,
}

/// Sums each player's scores over the results linked from `matches`.
pub fn aggregate_scores(
    matches: &[Match],
    participants: &HashMap<ResultId, Vec<Participant>>,
) -> TiebreakAggregates {
    let mut aggregates = TiebreakAggregates::default();

    for result_id in matches.iter().filter_map(|m| m.result_id) {
        let Some(sides) = participants.get(&result_id) else {
            continue;
        };
        for side in sides {
            *aggregates.score_sum.entry(side.player_id).or_insert(0.0) +=
                f64::from(side.score.unwrap_or(0));
            *aggregates
                .secondary_score_sum
                .entry(side.player_id)
                .or_insert(0.0) += f64::from(side.secondary_score.unwrap_or(0));
        }
    }

    aggregates
}

/// Ranks `players` by points, then the two tie-breaks, then name. Player id is
/// the final key so players sharing a name still have a fixed order.
pub fn compute_standings(
    players: &[Player],
    matches: &[Match],
    aggregates: &TiebreakAggregates,
    tiebreak1: TiebreakStrategy,
    tiebreak2: TiebreakStrategy,
) -> Vec<StandingRow> {
    let points = tally_points(matches);

    let mut rows: Vec<StandingRow> = players
        .iter()
        .map(|player| StandingRow {
            rank: 0,
            player_id: player.id,
            name: player.name.clone(),
            points: points.get(&player.id).copied().unwrap_or(0.0),
            tiebreak1: tiebreak1.value(player.id, aggregates),
            tiebreak2: tiebreak2.value(player.id, aggregates),
        })
        .collect();

    rows.sort_by(compare_rows);

    for (idx, row) in rows.iter_mut().enumerate() {
        row.rank = idx + 1;
    }

    rows
}

fn compare_rows(a: &StandingRow, b: &StandingRow) -> Ordering {
    b.points
        .total_cmp(&a.points)
        .then(b.tiebreak1.total_cmp(&a.tiebreak1))
        .then(b.tiebreak2.total_cmp(&a.tiebreak2))
        .then_with(|| a.name.cmp(&b.name))
        .then(a.player_id.cmp(&b.player_id))
}
