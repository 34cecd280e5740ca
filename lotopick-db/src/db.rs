use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;

use crate::models::{Candidate, Draw, Variant};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS draws (
    variant            TEXT NOT NULL,
    draw_id            TEXT NOT NULL,
    date               TEXT NOT NULL,
    primary_numbers    TEXT NOT NULL,
    secondary_numbers  TEXT NOT NULL,
    PRIMARY KEY (variant, draw_id)
);
";

pub fn db_path() -> std::path::PathBuf {
    let mut path = std::env::current_dir().unwrap_or_default();
    path.push("data");
    path.push("lotopick.db");
    path
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Impossible de créer le répertoire {:?}", parent))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("Impossible d'ouvrir la base {:?}", path))?;
    Ok(conn)
}

pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)
        .context("Échec de la migration")?;
    Ok(())
}

fn encode_numbers(numbers: &[u8]) -> String {
    numbers.iter().map(|n| n.to_string()).collect::<Vec<_>>().join(" ")
}

fn decode_numbers(raw: &str) -> Result<Vec<u8>> {
    raw.split_whitespace()
        .map(|s| s.parse::<u8>().with_context(|| format!("Numéro illisible en base : '{}'", s)))
        .collect()
}

pub fn insert_draw(conn: &Connection, draw: &Draw) -> Result<bool> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO draws (variant, draw_id, date, primary_numbers, secondary_numbers)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            draw.numbers.variant().as_str(),
            draw.draw_id,
            draw.date,
            encode_numbers(draw.numbers.primary()),
            encode_numbers(draw.numbers.secondary()),
        ],
    ).context("Échec de l'insertion")?;
    Ok(changed > 0)
}

/// Derniers tirages d'une variante, du plus récent au plus ancien.
pub fn fetch_last_draws(conn: &Connection, variant: Variant, limit: u32) -> Result<Vec<Draw>> {
    let mut stmt = conn.prepare(
        "SELECT draw_id, date, primary_numbers, secondary_numbers
         FROM draws WHERE variant = ?1 ORDER BY date DESC, draw_id DESC LIMIT ?2"
    )?;
    let rows = stmt.query_map(rusqlite::params![variant.as_str(), limit], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
        ))
    })?.collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(draw_id, date, primary, secondary)| {
            let primary = decode_numbers(&primary)?;
            let secondary = decode_numbers(&secondary)?;
            let numbers = Candidate::new(variant, primary, secondary)
                .with_context(|| format!("Tirage {} invalide en base", draw_id))?;
            Ok(Draw { draw_id, date, numbers })
        })
        .collect()
}

/// Vue historique attendue par le moteur : numéros seuls, plus récent en tête.
pub fn fetch_history(conn: &Connection, variant: Variant, limit: u32) -> Result<Vec<Candidate>> {
    Ok(fetch_last_draws(conn, variant, limit)?
        .into_iter()
        .map(|d| d.numbers)
        .collect())
}

pub fn count_draws(conn: &Connection, variant: Variant) -> Result<u32> {
    let count: u32 = conn.query_row(
        "SELECT COUNT(*) FROM draws WHERE variant = ?1",
        [variant.as_str()],
        |row| row.get(0),
    )?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_draw(id: &str, date: &str, first: u8) -> Draw {
        Draw {
            draw_id: id.to_string(),
            date: date.to_string(),
            numbers: Candidate::new(
                Variant::DoubleColor,
                vec![first, 8, 15, 22, 29, 33],
                vec![7],
            ).unwrap(),
        }
    }

    #[test]
    fn test_insert_and_count() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        assert_eq!(count_draws(&conn, Variant::DoubleColor).unwrap(), 0);

        insert_draw(&conn, &test_draw("2024001", "2024-01-02", 1)).unwrap();
        assert_eq!(count_draws(&conn, Variant::DoubleColor).unwrap(), 1);
        assert_eq!(count_draws(&conn, Variant::SuperLotto).unwrap(), 0);
    }

    #[test]
    fn test_duplicate_ignored() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();

        let inserted = insert_draw(&conn, &test_draw("2024001", "2024-01-02", 1)).unwrap();
        assert!(inserted);
        let inserted = insert_draw(&conn, &test_draw("2024001", "2024-01-02", 1)).unwrap();
        assert!(!inserted);
        assert_eq!(count_draws(&conn, Variant::DoubleColor).unwrap(), 1);
    }

    #[test]
    fn test_fetch_order_most_recent_first() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();

        insert_draw(&conn, &test_draw("2024001", "2024-01-02", 1)).unwrap();
        insert_draw(&conn, &test_draw("2024003", "2024-01-07", 3)).unwrap();
        insert_draw(&conn, &test_draw("2024002", "2024-01-04", 2)).unwrap();

        let draws = fetch_last_draws(&conn, Variant::DoubleColor, 10).unwrap();
        assert_eq!(draws.len(), 3);
        assert_eq!(draws[0].date, "2024-01-07");
        assert_eq!(draws[1].date, "2024-01-04");
        assert_eq!(draws[2].date, "2024-01-02");

        let history = fetch_history(&conn, Variant::DoubleColor, 2).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].primary(), &[3, 8, 15, 22, 29, 33]);
        assert_eq!(history[0].secondary(), &[7]);
    }

    #[test]
    fn test_corrupted_row_is_an_error() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        conn.execute(
            "INSERT INTO draws VALUES ('double-color', 'x', '2024-01-01', '1 2 3', '7')",
            [],
        ).unwrap();
        assert!(fetch_last_draws(&conn, Variant::DoubleColor, 10).is_err());
    }
}
