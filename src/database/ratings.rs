use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};

use super::models::{GameSystemId, LeaderboardRow, PlayerId, Rating, RatingChange, ResultId};

const RATING_COLUMNS: &str = "id, player_id, game_system_id, rating, games_played, last_updated_at";

fn parse_rating_row(row: &rusqlite::Row) -> rusqlite::Result<Rating> {
    Ok(Rating {
        id: row.get(0)?,
        player_id: row.get(1)?,
        game_system_id: row.get(2)?,
        rating: row.get(3)?,
        games_played: row.get(4)?,
        last_updated_at: row.get(5)?,
    })
}

pub fn find(
    conn: &Connection,
    player_id: PlayerId,
    game_system_id: GameSystemId,
) -> rusqlite::Result<Option<Rating>> {
    let sql = format!(
        "SELECT {} FROM ratings WHERE player_id = ?1 AND game_system_id = ?2",
        RATING_COLUMNS
    );

    conn.query_row(&sql, params![player_id, game_system_id], parse_rating_row)
        .optional()
}

/// Current rating value, if the player has one in this system.
pub fn rating_of(
    conn: &Connection,
    player_id: PlayerId,
    game_system_id: GameSystemId,
) -> rusqlite::Result<Option<i32>> {
    Ok(find(conn, player_id, game_system_id)?.map(|r| r.rating))
}

/// Loads the rating row, creating it at `start_rating` when absent.
pub fn find_or_create(
    conn: &Connection,
    player_id: PlayerId,
    game_system_id: GameSystemId,
    start_rating: i32,
) -> rusqlite::Result<Rating> {
    let insert = "INSERT INTO ratings (player_id, game_system_id, rating, games_played) VALUES (?1, ?2, ?3, 0) ON CONFLICT (player_id, game_system_id) DO NOTHING";
    conn.execute(insert, params![player_id, game_system_id, start_rating])?;

    let sql = format!(
        "SELECT {} FROM ratings WHERE player_id = ?1 AND game_system_id = ?2",
        RATING_COLUMNS
    );
    conn.query_row(&sql, params![player_id, game_system_id], parse_rating_row)
}

/// Re-reads the given rating rows one at a time in ascending row id, so every
/// writer touches shared rows in the same global order.
pub fn lock_in_order(conn: &Connection, rating_ids: &[i64]) -> rusqlite::Result<Vec<Rating>> {
    let mut ids = rating_ids.to_vec();
    ids.sort_unstable();
    ids.dedup();

    let sql = format!("SELECT {} FROM ratings WHERE id = ?1", RATING_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;

    ids.iter()
        .map(|id| stmt.query_row(params![id], parse_rating_row))
        .collect()
}

pub fn persist(conn: &Connection, rating: &Rating) -> rusqlite::Result<()> {
    let sql = "UPDATE ratings SET rating = ?1, games_played = ?2, last_updated_at = ?3 WHERE id = ?4";
    conn.execute(
        sql,
        params![
            rating.rating,
            rating.games_played,
            rating.last_updated_at,
            rating.id
        ],
    )?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn insert_change(
    conn: &Connection,
    result_id: ResultId,
    player_id: PlayerId,
    game_system_id: GameSystemId,
    rating_before: i32,
    rating_after: i32,
    expected_score: f64,
    actual_score: f64,
    k_factor: i32,
    created_at: NaiveDateTime,
) -> rusqlite::Result<RatingChange> {
    let sql = "INSERT INTO rating_changes (result_id, player_id, game_system_id, rating_before, rating_after, expected_score, actual_score, k_factor, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9) RETURNING id, result_id, player_id, game_system_id, rating_before, rating_after, expected_score, actual_score, k_factor";

    conn.query_row(
        sql,
        params![
            result_id,
            player_id,
            game_system_id,
            rating_before,
            rating_after,
            expected_score,
            actual_score,
            k_factor,
            created_at
        ],
        parse_change_row,
    )
}

fn parse_change_row(row: &rusqlite::Row) -> rusqlite::Result<RatingChange> {
    Ok(RatingChange {
        id: row.get(0)?,
        result_id: row.get(1)?,
        player_id: row.get(2)?,
        game_system_id: row.get(3)?,
        rating_before: row.get(4)?,
        rating_after: row.get(5)?,
        expected_score: row.get(6)?,
        actual_score: row.get(7)?,
        k_factor: row.get(8)?,
    })
}

pub fn list_changes_for_result(
    conn: &Connection,
    result_id: ResultId,
) -> rusqlite::Result<Vec<RatingChange>> {
    let sql = "SELECT id, result_id, player_id, game_system_id, rating_before, rating_after, expected_score, actual_score, k_factor FROM rating_changes WHERE result_id = ?1 ORDER BY player_id";

    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params![result_id], parse_change_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

pub fn leaderboard(
    conn: &Connection,
    game_system_id: GameSystemId,
    limit: usize,
) -> rusqlite::Result<Vec<LeaderboardRow>> {
    let sql = "
        SELECT r.player_id, p.name, r.rating, r.games_played
        FROM ratings r
        JOIN players p ON p.id = r.player_id
        WHERE r.game_system_id = ?1
        ORDER BY r.rating DESC, r.games_played DESC, p.name ASC, r.player_id ASC
        LIMIT ?2
    ";

    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params![game_system_id, limit as i64], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })?
        .collect::<rusqlite::Result<Vec<(PlayerId, String, i32, i32)>>>()?;

    Ok(rows
        .into_iter()
        .enumerate()
        .map(|(idx, (player_id, name, rating, games_played))| LeaderboardRow {
            rank: idx + 1,
            player_id,
            name,
            rating,
            games_played,
        })
        .collect())
}

/// Drops every rating row and audit record.
pub fn delete_all(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM rating_changes", [])?;
    conn.execute("DELETE FROM ratings", [])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{create_memory_pool, get_connection, players, setup};

    #[test]
    fn test_find_or_create_is_stable() {
        let pool = create_memory_pool().unwrap();
        let conn = get_connection(&pool).unwrap();
        setup::reset_database(&conn).unwrap();

        let system = players::upsert_game_system(&conn, "Go").unwrap();
        let player = players::insert_player(&conn, "Ann").unwrap();

        let first = find_or_create(&conn, player.id, system.id, 1200).unwrap();
        let again = find_or_create(&conn, player.id, system.id, 1500).unwrap();

        assert_eq!(first.id, again.id);
        assert_eq!(again.rating, 1200);
        assert_eq!(again.games_played, 0);
    }

    #[test]
    fn test_lock_in_order_sorts_by_row_id() {
        let pool = create_memory_pool().unwrap();
        let conn = get_connection(&pool).unwrap();
        setup::reset_database(&conn).unwrap();

        let system = players::upsert_game_system(&conn, "Go").unwrap();
        let ann = players::insert_player(&conn, "Ann").unwrap();
        let ben = players::insert_player(&conn, "Ben").unwrap();
        let a = find_or_create(&conn, ann.id, system.id, 1200).unwrap();
        let b = find_or_create(&conn, ben.id, system.id, 1200).unwrap();

        let locked = lock_in_order(&conn, &[b.id, a.id, b.id]).unwrap();
        let ids: Vec<i64> = locked.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![a.id, b.id]);
    }
}
