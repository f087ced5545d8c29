use rusqlite::{params, Connection, OptionalExtension};

use super::models::{
    GameSystemId, PlayerId, Tournament, TournamentFormat, TournamentId, TournamentState,
};
use crate::tournament::strategy::{PairingStrategy, TiebreakStrategy};

const TOURNAMENT_COLUMNS: &str = "id, name, creator_id, game_system_id, format, state, rounds_count, pairing_key, tiebreak1_key, tiebreak2_key, created_at";

#[allow(clippy::too_many_arguments)]
pub fn insert_tournament(
    conn: &Connection,
    name: &str,
    creator_id: PlayerId,
    game_system_id: GameSystemId,
    format: TournamentFormat,
    rounds_count: Option<i32>,
    pairing: PairingStrategy,
    tiebreak1: TiebreakStrategy,
    tiebreak2: TiebreakStrategy,
) -> rusqlite::Result<Tournament> {
    let sql = format!(
        "INSERT INTO tournaments (name, creator_id, game_system_id, format, state, rounds_count, pairing_key, tiebreak1_key, tiebreak2_key) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9) RETURNING {}",
        TOURNAMENT_COLUMNS
    );

    conn.query_row(
        &sql,
        params![
            name,
            creator_id,
            game_system_id,
            format,
            TournamentState::Draft,
            rounds_count,
            pairing,
            tiebreak1,
            tiebreak2
        ],
        parse_tournament_row,
    )
}

fn parse_tournament_row(row: &rusqlite::Row) -> rusqlite::Result<Tournament> {
    Ok(Tournament {
        id: row.get(0)?,
        name: row.get(1)?,
        creator_id: row.get(2)?,
        game_system_id: row.get(3)?,
        format: row.get(4)?,
        state: row.get(5)?,
        rounds_count: row.get(6)?,
        pairing: row.get(7)?,
        tiebreak1: row.get(8)?,
        tiebreak2: row.get(9)?,
        created_at: row.get(10)?,
    })
}

pub fn find_by_id(conn: &Connection, id: TournamentId) -> rusqlite::Result<Option<Tournament>> {
    let sql = format!("SELECT {} FROM tournaments WHERE id = ?1", TOURNAMENT_COLUMNS);

    conn.query_row(&sql, params![id], parse_tournament_row)
        .optional()
}

pub fn list_all(conn: &Connection) -> rusqlite::Result<Vec<Tournament>> {
    let sql = format!("SELECT {} FROM tournaments ORDER BY created_at DESC, id DESC", TOURNAMENT_COLUMNS);

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], parse_tournament_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

pub fn update_state(
    conn: &Connection,
    id: TournamentId,
    state: TournamentState,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE tournaments SET state = ?1 WHERE id = ?2",
        params![state, id],
    )?;
    Ok(())
}

pub fn update_settings(conn: &Connection, tournament: &Tournament) -> rusqlite::Result<()> {
    let sql = "UPDATE tournaments SET rounds_count = ?1, pairing_key = ?2, tiebreak1_key = ?3, tiebreak2_key = ?4 WHERE id = ?5";
    conn.execute(
        sql,
        params![
            tournament.rounds_count,
            tournament.pairing,
            tournament.tiebreak1,
            tournament.tiebreak2,
            tournament.id
        ],
    )?;
    Ok(())
}
