use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};

use super::models::{
    ChildSlot, Match, MatchId, MatchOutcome, PlayerId, ResultId, RoundId, TournamentId,
};

const MATCH_COLUMNS: &str = "id, tournament_id, round_id, a_player_id, b_player_id, result, result_id, parent_match_id, child_slot";

fn parse_match_row(row: &rusqlite::Row) -> rusqlite::Result<Match> {
    Ok(Match {
        id: row.get(0)?,
        tournament_id: row.get(1)?,
        round_id: row.get(2)?,
        a_player_id: row.get(3)?,
        b_player_id: row.get(4)?,
        result: row.get(5)?,
        result_id: row.get(6)?,
        parent_match_id: row.get(7)?,
        child_slot: row.get(8)?,
    })
}

pub fn insert_match(
    conn: &Connection,
    tournament_id: TournamentId,
    round_id: Option<RoundId>,
    a_player_id: Option<PlayerId>,
    b_player_id: Option<PlayerId>,
    result: MatchOutcome,
) -> rusqlite::Result<Match> {
    let sql = format!(
        "INSERT INTO matches (tournament_id, round_id, a_player_id, b_player_id, result) VALUES (?1, ?2, ?3, ?4, ?5) RETURNING {}",
        MATCH_COLUMNS
    );

    conn.query_row(
        &sql,
        params![tournament_id, round_id, a_player_id, b_player_id, result],
        parse_match_row,
    )
}

pub fn find_by_id(conn: &Connection, id: MatchId) -> rusqlite::Result<Option<Match>> {
    let sql = format!("SELECT {} FROM matches WHERE id = ?1", MATCH_COLUMNS);

    conn.query_row(&sql, params![id], parse_match_row)
        .optional()
}

pub fn set_parent(
    conn: &Connection,
    id: MatchId,
    parent_match_id: MatchId,
    child_slot: ChildSlot,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE matches SET parent_match_id = ?1, child_slot = ?2 WHERE id = ?3",
        params![parent_match_id, child_slot, id],
    )?;
    Ok(())
}

pub fn fill_slot(
    conn: &Connection,
    id: MatchId,
    slot: ChildSlot,
    player_id: PlayerId,
) -> rusqlite::Result<()> {
    let sql = match slot {
        ChildSlot::A => "UPDATE matches SET a_player_id = ?1 WHERE id = ?2",
        ChildSlot::B => "UPDATE matches SET b_player_id = ?1 WHERE id = ?2",
    };
    conn.execute(sql, params![player_id, id])?;
    Ok(())
}

pub fn record_outcome(
    conn: &Connection,
    id: MatchId,
    result: MatchOutcome,
    result_id: ResultId,
    reported_at: NaiveDateTime,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE matches SET result = ?1, result_id = ?2, reported_at = ?3 WHERE id = ?4",
        params![result, result_id, reported_at, id],
    )?;
    Ok(())
}

pub fn list_by_tournament(
    conn: &Connection,
    tournament_id: TournamentId,
) -> rusqlite::Result<Vec<Match>> {
    let sql = format!(
        "SELECT {} FROM matches WHERE tournament_id = ?1 ORDER BY id",
        MATCH_COLUMNS
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![tournament_id], parse_match_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

pub fn list_by_round(conn: &Connection, round_id: RoundId) -> rusqlite::Result<Vec<Match>> {
    let sql = format!("SELECT {} FROM matches WHERE round_id = ?1 ORDER BY id", MATCH_COLUMNS);

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![round_id], parse_match_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

pub fn count_pending_in_round(conn: &Connection, round_id: RoundId) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM matches WHERE round_id = ?1 AND result = ?2",
        params![round_id, MatchOutcome::Pending],
        |row| row.get(0),
    )
}

/// Whether the two players already met in this tournament, in either seat.
pub fn existing_pairing(
    conn: &Connection,
    tournament_id: TournamentId,
    player_a: PlayerId,
    player_b: PlayerId,
) -> rusqlite::Result<bool> {
    let sql = "
        SELECT EXISTS (
            SELECT 1 FROM matches
            WHERE tournament_id = ?1
              AND ((a_player_id = ?2 AND b_player_id = ?3) OR (a_player_id = ?3 AND b_player_id = ?2))
        )
    ";
    conn.query_row(sql, params![tournament_id, player_a, player_b], |row| row.get(0))
}
