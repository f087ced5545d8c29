use super::types::{PairUpdate, SideUpdate};

/// Expected score of a player rated `rating` against `opponent` (0.0..=1.0).
pub fn expected_score(rating: i32, opponent: i32) -> f64 {
    let exponent = f64::from(opponent - rating) / 400.0;
    1.0 / (1.0 + 10f64.powf(exponent))
}

/// Rating delta, rounded half away from zero.
pub fn delta(score: f64, expected: f64, k_factor: i32) -> i32 {
    (f64::from(k_factor) * (score - expected)).round() as i32
}

/// Actual scores: a decisive higher score wins outright, equal scores split.
pub fn actual_scores(a_score: i32, b_score: i32) -> (f64, f64) {
    if a_score > b_score {
        (1.0, 0.0)
    } else if b_score > a_score {
        (0.0, 1.0)
    } else {
        (0.5, 0.5)
    }
}

/// Computes both sides of an update from the current ratings and game scores.
pub fn pair_update(ratings: [i32; 2], scores: [i32; 2], k_factor: i32) -> PairUpdate {
    let expected = [
        expected_score(ratings[0], ratings[1]),
        expected_score(ratings[1], ratings[0]),
    ];
    let (a_actual, b_actual) = actual_scores(scores[0], scores[1]);
    let actual = [a_actual, b_actual];

    let side = |idx: usize| {
        let change = delta(actual[idx], expected[idx], k_factor);
        SideUpdate {
            rating_before: ratings[idx],
            rating_after: ratings[idx] + change,
            expected_score: expected[idx],
            actual_score: actual[idx],
            delta: change,
        }
    };

    [side(0), side(1)]
}
