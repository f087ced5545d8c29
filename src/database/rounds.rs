use rusqlite::{params, Connection, OptionalExtension};

use super::models::{Round, RoundId, RoundState, TournamentId};

fn parse_round_row(row: &rusqlite::Row) -> rusqlite::Result<Round> {
    Ok(Round {
        id: row.get(0)?,
        tournament_id: row.get(1)?,
        number: row.get(2)?,
        state: row.get(3)?,
    })
}

pub fn insert_round(
    conn: &Connection,
    tournament_id: TournamentId,
    number: i32,
) -> rusqlite::Result<Round> {
    let sql = "INSERT INTO rounds (tournament_id, number, state) VALUES (?1, ?2, ?3) RETURNING id, tournament_id, number, state";

    conn.query_row(
        sql,
        params![tournament_id, number, RoundState::Pending],
        parse_round_row,
    )
}

pub fn latest(conn: &Connection, tournament_id: TournamentId) -> rusqlite::Result<Option<Round>> {
    let sql = "SELECT id, tournament_id, number, state FROM rounds WHERE tournament_id = ?1 ORDER BY number DESC LIMIT 1";

    conn.query_row(sql, params![tournament_id], parse_round_row)
        .optional()
}

pub fn list_by_tournament(
    conn: &Connection,
    tournament_id: TournamentId,
) -> rusqlite::Result<Vec<Round>> {
    let sql = "SELECT id, tournament_id, number, state FROM rounds WHERE tournament_id = ?1 ORDER BY number";

    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params![tournament_id], parse_round_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

pub fn close(conn: &Connection, id: RoundId) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE rounds SET state = ?1 WHERE id = ?2",
        params![RoundState::Closed, id],
    )?;
    Ok(())
}
