use rusqlite::{params, Connection, OptionalExtension};

use super::models::{PlayerId, Registration, RegistrationStatus, TournamentId};

const REGISTRATION_COLUMNS: &str = "id, tournament_id, player_id, status, created_at";

fn parse_registration_row(row: &rusqlite::Row) -> rusqlite::Result<Registration> {
    Ok(Registration {
        id: row.get(0)?,
        tournament_id: row.get(1)?,
        player_id: row.get(2)?,
        status: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Registers the player once; repeated calls return the existing row.
pub fn upsert_registration(
    conn: &Connection,
    tournament_id: TournamentId,
    player_id: PlayerId,
) -> rusqlite::Result<Registration> {
    conn.execute(
        "INSERT INTO registrations (tournament_id, player_id) VALUES (?1, ?2) ON CONFLICT (tournament_id, player_id) DO NOTHING",
        params![tournament_id, player_id],
    )?;

    let sql = format!(
        "SELECT {} FROM registrations WHERE tournament_id = ?1 AND player_id = ?2",
        REGISTRATION_COLUMNS
    );
    conn.query_row(&sql, params![tournament_id, player_id], parse_registration_row)
}

pub fn find(
    conn: &Connection,
    tournament_id: TournamentId,
    player_id: PlayerId,
) -> rusqlite::Result<Option<Registration>> {
    let sql = format!(
        "SELECT {} FROM registrations WHERE tournament_id = ?1 AND player_id = ?2",
        REGISTRATION_COLUMNS
    );
    conn.query_row(&sql, params![tournament_id, player_id], parse_registration_row)
        .optional()
}

pub fn delete(
    conn: &Connection,
    tournament_id: TournamentId,
    player_id: PlayerId,
) -> rusqlite::Result<bool> {
    let removed = conn.execute(
        "DELETE FROM registrations WHERE tournament_id = ?1 AND player_id = ?2",
        params![tournament_id, player_id],
    )?;
    Ok(removed > 0)
}

pub fn update_status(
    conn: &Connection,
    id: i64,
    status: RegistrationStatus,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE registrations SET status = ?1 WHERE id = ?2",
        params![status, id],
    )?;
    Ok(())
}

/// All registrations in registration order.
pub fn list_by_tournament(
    conn: &Connection,
    tournament_id: TournamentId,
) -> rusqlite::Result<Vec<Registration>> {
    let sql = format!(
        "SELECT {} FROM registrations WHERE tournament_id = ?1 ORDER BY id",
        REGISTRATION_COLUMNS
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![tournament_id], parse_registration_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

/// Checked-in registrants if any exist, otherwise every registrant.
pub fn eligible(
    conn: &Connection,
    tournament_id: TournamentId,
) -> rusqlite::Result<Vec<Registration>> {
    let all = list_by_tournament(conn, tournament_id)?;
    let checked_in: Vec<Registration> = all
        .iter()
        .filter(|r| r.status == RegistrationStatus::CheckedIn)
        .cloned()
        .collect();

    if checked_in.is_empty() {
        Ok(all)
    } else {
        Ok(checked_in)
    }
}
