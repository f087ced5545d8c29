use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

use super::models::{GameSystem, GameSystemId, Player, PlayerId};

pub fn insert_player(conn: &Connection, name: &str) -> Result<Player> {
    let sql = "INSERT INTO players (name) VALUES (?1) RETURNING id, name, created_at";

    conn.query_row(sql, params![name], parse_player_row)
        .context("Failed to insert new player")
}

fn parse_player_row(row: &rusqlite::Row) -> rusqlite::Result<Player> {
    Ok(Player {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: row.get(2)?,
    })
}

pub fn find_by_id(conn: &Connection, id: PlayerId) -> rusqlite::Result<Option<Player>> {
    let sql = "SELECT id, name, created_at FROM players WHERE id = ?1";

    conn.query_row(sql, params![id], parse_player_row).optional()
}

pub fn list_all(conn: &Connection) -> rusqlite::Result<Vec<Player>> {
    let sql = "SELECT id, name, created_at FROM players ORDER BY id";

    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([], parse_player_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

pub fn upsert_game_system(conn: &Connection, name: &str) -> Result<GameSystem> {
    if let Some(existing) = find_system_by_name(conn, name)? {
        return Ok(existing);
    }

    let sql = "INSERT INTO game_systems (name) VALUES (?1) RETURNING id, name";
    conn.query_row(sql, params![name], parse_system_row)
        .context("Failed to insert game system")
}

fn find_system_by_name(conn: &Connection, name: &str) -> Result<Option<GameSystem>> {
    let sql = "SELECT id, name FROM game_systems WHERE name = ?1";

    conn.query_row(sql, params![name], parse_system_row)
        .optional()
        .context("Failed to query game system by name")
}

fn parse_system_row(row: &rusqlite::Row) -> rusqlite::Result<GameSystem> {
    Ok(GameSystem {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}

pub fn find_system_by_id(conn: &Connection, id: GameSystemId) -> rusqlite::Result<Option<GameSystem>> {
    let sql = "SELECT id, name FROM game_systems WHERE id = ?1";

    conn.query_row(sql, params![id], parse_system_row).optional()
}

pub fn list_systems(conn: &Connection) -> rusqlite::Result<Vec<GameSystem>> {
    let mut stmt = conn.prepare("SELECT id, name FROM game_systems ORDER BY name")?;
    let rows = stmt
        .query_map([], parse_system_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}
