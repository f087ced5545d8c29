use chrono::{NaiveDateTime, Utc};
use log::{debug, info, warn};
use rusqlite::{Connection, TransactionBehavior};

use crate::config::RatingSettings;
use crate::database::{self, GameResult, GameSystemId, LeaderboardRow, Participant, ResultId, TournamentId};
use crate::errors::{EngineError, EngineResult};
use crate::rating::{self, ApplyOutcome, ApplySummary};

/// Rejects anything but two distinct participants that both carry a score.
pub fn validate_participants(participants: &[Participant]) -> EngineResult<()> {
    if participants.len() != 2 {
        return Err(EngineError::validation(format!(
            "a result needs exactly two participants, got {}",
            participants.len()
        )));
    }

    if participants[0].player_id == participants[1].player_id {
        return Err(EngineError::validation(format!(
            "player {} cannot play against themselves",
            participants[0].player_id
        )));
    }

    if let Some(missing) = participants.iter().find(|p| p.score.is_none()) {
        return Err(EngineError::validation(format!(
            "player {} has no score",
            missing.player_id
        )));
    }

    Ok(())
}

pub struct RatingService {
    settings: RatingSettings,
}

impl RatingService {
    pub fn new(settings: RatingSettings) -> Self {
        Self { settings }
    }

    /// Stores a finished game. Nothing is written unless the participants are valid.
    pub fn record_result(
        &self,
        conn: &mut Connection,
        game_system_id: GameSystemId,
        participants: &[Participant],
        played_at: NaiveDateTime,
        tournament_id: Option<TournamentId>,
    ) -> EngineResult<GameResult> {
        validate_participants(participants)?;

        let tx = conn.transaction()?;

        if database::players::find_system_by_id(&tx, game_system_id)?.is_none() {
            return Err(EngineError::not_found("game system", game_system_id));
        }
        for participant in participants {
            if database::players::find_by_id(&tx, participant.player_id)?.is_none() {
                return Err(EngineError::not_found("player", participant.player_id));
            }
        }

        let result = database::results::insert_result(
            &tx,
            game_system_id,
            tournament_id,
            played_at,
            participants,
        )?;
        tx.commit()?;

        info!(
            "Recorded result {}: player {} vs player {}",
            result.id, participants[0].player_id, participants[1].player_id
        );
        Ok(result)
    }

    /// Applies one result's rating change exactly once. A second call for the
    /// same result is a no-op reported as `AlreadyApplied`.
    pub fn apply_result(&self, conn: &mut Connection, result_id: ResultId) -> EngineResult<ApplyOutcome> {
        // IMMEDIATE takes the write lock up front, so the applied check below
        // cannot race another writer.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let outcome = self.apply_in_transaction(&tx, result_id)?;
        tx.commit()?;
        Ok(outcome)
    }

    fn apply_in_transaction(&self, conn: &Connection, result_id: ResultId) -> EngineResult<ApplyOutcome> {
        let result = database::results::find_by_id(conn, result_id)?
            .ok_or_else(|| EngineError::not_found("result", result_id))?;

        if result.applied {
            debug!("Result {} already applied, skipping", result_id);
            return Ok(ApplyOutcome::AlreadyApplied);
        }

        validate_participants(&result.participants)?;
        let [a, b] = [&result.participants[0], &result.participants[1]];

        let system = result.game_system_id;
        let start = self.settings.start_rating;
        let a_row = database::ratings::find_or_create(conn, a.player_id, system, start)?;
        let b_row = database::ratings::find_or_create(conn, b.player_id, system, start)?;

        let locked = database::ratings::lock_in_order(conn, &[a_row.id, b_row.id])?;
        let locked_for = |rating_id: i64| {
            locked
                .iter()
                .find(|r| r.id == rating_id)
                .cloned()
                .ok_or_else(|| EngineError::Transient(format!("rating row {} vanished", rating_id)))
        };
        let mut a_rating = locked_for(a_row.id)?;
        let mut b_rating = locked_for(b_row.id)?;

        let update = rating::pair_update(
            [a_rating.rating, b_rating.rating],
            [a.score.unwrap_or(0), b.score.unwrap_or(0)],
            self.settings.k_factor,
        );

        let now = Utc::now().naive_utc();
        for (row, side) in [(&mut a_rating, &update[0]), (&mut b_rating, &update[1])] {
            row.rating = side.rating_after;
            row.games_played += 1;
            row.last_updated_at = Some(now);
            database::ratings::persist(conn, row)?;

            database::ratings::insert_change(
                conn,
                result.id,
                row.player_id,
                system,
                side.rating_before,
                side.rating_after,
                side.expected_score,
                side.actual_score,
                self.settings.k_factor,
                now,
            )?;
        }

        database::results::mark_applied(conn, result.id)?;

        info!(
            "Applied result {}: player {} {} -> {}, player {} {} -> {}",
            result.id,
            a.player_id,
            update[0].rating_before,
            update[0].rating_after,
            b.player_id,
            update[1].rating_before,
            update[1].rating_after
        );
        Ok(ApplyOutcome::Applied(update))
    }

    /// Applies every unapplied result in play order. Invalid results are
    /// logged and skipped; any other failure stops the run.
    pub fn apply_pending(&self, conn: &mut Connection) -> EngineResult<ApplySummary> {
        let pending = database::results::list_ids_in_play_order(conn, true)?;
        let mut summary = ApplySummary::default();

        for result_id in pending {
            match self.apply_result(conn, result_id) {
                Ok(ApplyOutcome::Applied(_)) => summary.applied += 1,
                Ok(ApplyOutcome::AlreadyApplied) => summary.skipped += 1,
                Err(EngineError::Validation(reason)) => {
                    warn!("Skipping result {}: {}", result_id, reason);
                    summary.skipped += 1;
                }
                Err(err) => return Err(err),
            }
        }

        info!(
            "Applied {} pending results ({} skipped)",
            summary.applied, summary.skipped
        );
        Ok(summary)
    }

    /// Recomputes every rating from scratch by replaying all results in play
    /// order inside a single transaction.
    pub fn rebuild_ratings(&self, conn: &mut Connection) -> EngineResult<ApplySummary> {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        database::ratings::delete_all(&tx)?;
        database::results::reset_applied(&tx)?;

        let mut summary = ApplySummary::default();
        for result_id in database::results::list_ids_in_play_order(&tx, false)? {
            match self.apply_in_transaction(&tx, result_id) {
                Ok(outcome) if outcome.was_applied() => summary.applied += 1,
                Ok(_) => summary.skipped += 1,
                Err(EngineError::Validation(reason)) => {
                    warn!("Skipping result {} during rebuild: {}", result_id, reason);
                    summary.skipped += 1;
                }
                Err(err) => return Err(err),
            }
        }

        tx.commit()?;
        info!("Rebuilt ratings from {} results", summary.applied);
        Ok(summary)
    }

    pub fn leaderboard(
        &self,
        conn: &Connection,
        game_system_id: GameSystemId,
        limit: usize,
    ) -> EngineResult<Vec<LeaderboardRow>> {
        if database::players::find_system_by_id(conn, game_system_id)?.is_none() {
            return Err(EngineError::not_found("game system", game_system_id));
        }

        Ok(database::ratings::leaderboard(conn, game_system_id, limit)?)
    }
}
