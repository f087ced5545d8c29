use std::collections::{HashMap, HashSet};

use crate::database::models::{Match, MatchOutcome, PlayerId};

pub const WIN_POINTS: f64 = 1.0;
pub const DRAW_POINTS: f64 = 0.5;

/// Points per player over every decided match. A decided one-sided match is a
/// bye and counts as a win for whoever is present.
pub fn tally_points(matches: &[Match]) -> HashMap<PlayerId, f64> {
    let mut points: HashMap<PlayerId, f64> = HashMap::new();

    for m in matches.iter().filter(|m| m.result != MatchOutcome::Pending) {
        if let Some(player) = m.bye_player() {
            *points.entry(player).or_insert(0.0) += WIN_POINTS;
            continue;
        }

        let (Some(a), Some(b)) = (m.a_player_id, m.b_player_id) else {
            continue;
        };

        match m.result {
            MatchOutcome::AWin => *points.entry(a).or_insert(0.0) += WIN_POINTS,
            MatchOutcome::BWin => *points.entry(b).or_insert(0.0) += WIN_POINTS,
            MatchOutcome::Draw => {
                *points.entry(a).or_insert(0.0) += DRAW_POINTS;
                *points.entry(b).or_insert(0.0) += DRAW_POINTS;
            }
            MatchOutcome::Pending => {}
        }
    }

    points
}

/// Players who already received a bye.
pub fn bye_recipients(matches: &[Match]) -> HashSet<PlayerId> {
    matches
        .iter()
        .filter(|m| m.result != MatchOutcome::Pending)
        .filter_map(Match::bye_player)
        .collect()
}
