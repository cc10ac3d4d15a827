//! SQLite database management for college football games

use crate::{CfbError, GameRecord, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

const GAME_COLUMNS: &str =
    "date, season, week, team_home, score_home, team_away, score_away";

/// Database connection and operations
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS games (
                date TEXT NOT NULL,
                season INTEGER NOT NULL,
                week INTEGER NOT NULL,
                team_home TEXT NOT NULL,
                score_home INTEGER NOT NULL,
                team_away TEXT NOT NULL,
                score_away INTEGER NOT NULL,
                UNIQUE(date, team_home, team_away)
            );

            CREATE INDEX IF NOT EXISTS idx_games_date ON games(date);
            CREATE INDEX IF NOT EXISTS idx_games_season ON games(season);
            "#,
        )?;
        Ok(())
    }

    // ==================== Game Operations ====================

    /// Insert a game unless one with the same (date, home, away) exists.
    /// Returns true if the row is new.
    pub fn insert_game(&self, record: &GameRecord) -> Result<bool> {
        let inserted = self.conn.execute(
            r#"
            INSERT OR IGNORE INTO games (date, season, week, team_home, score_home,
                                         team_away, score_away)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                record.date.format("%Y-%m-%d").to_string(),
                record.season,
                record.week,
                record.home_team,
                record.home_points,
                record.away_team,
                record.away_points,
            ],
        )?;
        Ok(inserted > 0)
    }

    /// Insert multiple games in one transaction, returning how many were new
    pub fn insert_games(&mut self, records: &[GameRecord]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT OR IGNORE INTO games (date, season, week, team_home, score_home,
                                             team_away, score_away)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )?;
            for record in records {
                count += stmt.execute(params![
                    record.date.format("%Y-%m-%d").to_string(),
                    record.season,
                    record.week,
                    record.home_team,
                    record.home_points,
                    record.away_team,
                    record.away_points,
                ])?;
            }
        }
        tx.commit()?;
        Ok(count)
    }

    /// Get all games in chronological order
    pub fn get_all_games(&self) -> Result<Vec<GameRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM games ORDER BY date, rowid",
            GAME_COLUMNS
        ))?;

        let games = stmt
            .query_map([], Self::row_to_game)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        games.into_iter().collect()
    }

    /// Season of the most recent game, if any
    pub fn last_season(&self) -> Result<Option<i32>> {
        let season = self
            .conn
            .query_row(
                "SELECT season FROM games ORDER BY date DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(season)
    }

    /// Map one row to a game. Date parsing is deferred to the caller so a
    /// malformed date surfaces as a parse error instead of a silent default.
    fn row_to_game(row: &rusqlite::Row) -> rusqlite::Result<Result<GameRecord>> {
        let date_str: String = row.get(0)?;
        let date = match NaiveDate::parse_from_str(&date_str, "%Y-%m-%d") {
            Ok(d) => d,
            Err(e) => {
                return Ok(Err(CfbError::Parse(format!(
                    "bad game date '{}': {}",
                    date_str, e
                ))))
            }
        };

        Ok(Ok(GameRecord {
            date,
            season: row.get(1)?,
            week: row.get(2)?,
            home_team: row.get(3)?,
            home_points: row.get(4)?,
            away_team: row.get(5)?,
            away_points: row.get(6)?,
        }))
    }

    // ==================== Statistics ====================

    /// Get database statistics
    pub fn get_stats(&self) -> Result<DatabaseStats> {
        let game_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM games", [], |row| row.get(0))?;

        let team_count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM (SELECT team_home FROM games UNION SELECT team_away FROM games)",
            [],
            |row| row.get(0),
        )?;

        let season_count: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT season) FROM games",
            [],
            |row| row.get(0),
        )?;

        let min_date: Option<String> = self
            .conn
            .query_row("SELECT MIN(date) FROM games", [], |row| row.get(0))
            .optional()?
            .flatten();

        let max_date: Option<String> = self
            .conn
            .query_row("SELECT MAX(date) FROM games", [], |row| row.get(0))
            .optional()?
            .flatten();

        Ok(DatabaseStats {
            team_count: team_count as usize,
            game_count: game_count as usize,
            season_count: season_count as usize,
            earliest_game: min_date.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
            latest_game: max_date.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
        })
    }
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub team_count: usize,
    pub game_count: usize,
    pub season_count: usize,
    pub earliest_game: Option<NaiveDate>,
    pub latest_game: Option<NaiveDate>,
}
