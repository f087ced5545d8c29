use std::collections::HashMap;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};

use super::models::{GameResult, GameSystemId, Participant, ResultId, TournamentId};

/// Inserts the result row and its participants as given; callers validate.
pub fn insert_result(
    conn: &Connection,
    game_system_id: GameSystemId,
    tournament_id: Option<TournamentId>,
    played_at: NaiveDateTime,
    participants: &[Participant],
) -> rusqlite::Result<GameResult> {
    let sql = "INSERT INTO results (game_system_id, tournament_id, played_at) VALUES (?1, ?2, ?3) RETURNING id";
    let id: ResultId = conn.query_row(
        sql,
        params![game_system_id, tournament_id, played_at],
        |row| row.get(0),
    )?;

    for participant in participants {
        insert_participant(conn, id, participant)?;
    }

    Ok(GameResult {
        id,
        game_system_id,
        tournament_id,
        played_at,
        applied: false,
        participants: participants.to_vec(),
    })
}

pub fn insert_participant(
    conn: &Connection,
    result_id: ResultId,
    participant: &Participant,
) -> rusqlite::Result<()> {
    let sql = "INSERT INTO result_participants (result_id, player_id, score, secondary_score, faction) VALUES (?1, ?2, ?3, ?4, ?5)";
    conn.execute(
        sql,
        params![
            result_id,
            participant.player_id,
            participant.score,
            participant.secondary_score,
            participant.faction
        ],
    )?;
    Ok(())
}

fn parse_participant_row(row: &rusqlite::Row) -> rusqlite::Result<Participant> {
    Ok(Participant {
        player_id: row.get(0)?,
        score: row.get(1)?,
        secondary_score: row.get(2)?,
        faction: row.get(3)?,
    })
}

fn load_participants(conn: &Connection, result_id: ResultId) -> rusqlite::Result<Vec<Participant>> {
    let sql = "SELECT player_id, score, secondary_score, faction FROM result_participants WHERE result_id = ?1 ORDER BY id";

    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params![result_id], parse_participant_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

pub fn find_by_id(conn: &Connection, id: ResultId) -> rusqlite::Result<Option<GameResult>> {
    let sql = "SELECT id, game_system_id, tournament_id, played_at, applied FROM results WHERE id = ?1";

    let header = conn
        .query_row(sql, params![id], |row| {
            Ok(GameResult {
                id: row.get(0)?,
                game_system_id: row.get(1)?,
                tournament_id: row.get(2)?,
                played_at: row.get(3)?,
                applied: row.get(4)?,
                participants: Vec::new(),
            })
        })
        .optional()?;

    match header {
        Some(mut result) => {
            result.participants = load_participants(conn, result.id)?;
            Ok(Some(result))
        }
        None => Ok(None),
    }
}

pub fn mark_applied(conn: &Connection, id: ResultId) -> rusqlite::Result<()> {
    conn.execute("UPDATE results SET applied = 1 WHERE id = ?1", params![id])?;
    Ok(())
}

pub fn reset_applied(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute("UPDATE results SET applied = 0", [])?;
    Ok(())
}

/// Result ids in replay order; `only_pending` restricts to unapplied results.
pub fn list_ids_in_play_order(conn: &Connection, only_pending: bool) -> rusqlite::Result<Vec<ResultId>> {
    let sql = if only_pending {
        "SELECT id FROM results WHERE applied = 0 ORDER BY played_at, id"
    } else {
        "SELECT id FROM results ORDER BY played_at, id"
    };

    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

/// Participants of every given result, keyed by result id.
pub fn participants_by_result(
    conn: &Connection,
    result_ids: &[ResultId],
) -> rusqlite::Result<HashMap<ResultId, Vec<Participant>>> {
    let mut stmt = conn.prepare(
        "SELECT player_id, score, secondary_score, faction FROM result_participants WHERE result_id = ?1 ORDER BY id",
    )?;

    let mut by_result = HashMap::new();
    for &result_id in result_ids {
        let participants = stmt
            .query_map(params![result_id], parse_participant_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        by_result.insert(result_id, participants);
    }

    Ok(by_result)
}
