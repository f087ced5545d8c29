use anyhow::{Context, Result};
use rusqlite::Connection;

const SCHEMA_SQL: &str = include_str!("schema.sql");

// Children before parents so foreign keys never block a drop.
const TABLES: [&str; 10] = [
    "matches",
    "rounds",
    "registrations",
    "rating_changes",
    "result_participants",
    "results",
    "tournaments",
    "ratings",
    "game_systems",
    "players",
];

pub fn reset_database(conn: &Connection) -> Result<()> {
    for table in TABLES {
        execute_sql(conn, &format!("DROP TABLE IF EXISTS {}", table))
            .with_context(|| format!("Failed to drop table {}", table))?;
    }

    apply_schema(conn)?;
    log::info!("Database schema reset successfully");
    Ok(())
}

pub fn ensure_schema(conn: &Connection) -> Result<()> {
    apply_schema(conn)?;
    log::debug!("Database schema verified");
    Ok(())
}

fn apply_schema(conn: &Connection) -> Result<()> {
    let statements = split_sql_statements(SCHEMA_SQL);

    for (idx, statement) in statements.iter().enumerate() {
        execute_sql(conn, statement)
            .with_context(|| format!("Failed to execute statement {}", idx + 1))?;
    }

    Ok(())
}

fn split_sql_statements(sql: &str) -> Vec<String> {
    sql.split(';')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn execute_sql(conn: &Connection, sql: &str) -> Result<()> {
    conn.execute(sql, [])
        .context("Failed to execute SQL statement")
        .map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{create_memory_pool, get_connection};

    #[test]
    fn test_reset_is_repeatable() {
        let pool = create_memory_pool().unwrap();
        let conn = get_connection(&pool).unwrap();

        reset_database(&conn).unwrap();
        conn.execute("INSERT INTO players (name) VALUES ('Ada')", []).unwrap();
        reset_database(&conn).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM players", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_ensure_schema_keeps_data() {
        let pool = create_memory_pool().unwrap();
        let conn = get_connection(&pool).unwrap();

        ensure_schema(&conn).unwrap();
        conn.execute("INSERT INTO players (name) VALUES ('Ada')", []).unwrap();
        ensure_schema(&conn).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM players", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_split_ignores_blank_statements() {
        let statements = split_sql_statements("CREATE TABLE a (x);\n\n;CREATE TABLE b (y);");
        assert_eq!(statements.len(), 2);
    }
}
