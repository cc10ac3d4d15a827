//! CSV game import
//!
//! Expects a header row followed by `date,season,week,home,home_pts,away,away_pts`
//! with ISO dates. Team names may be quoted; blank lines are skipped.

use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::{CfbError, GameRecord, Result};

const HEADER: [&str; 7] = ["date", "season", "week", "home", "home_pts", "away", "away_pts"];

/// One CSV row, in column order
#[derive(Debug, Deserialize)]
struct GameRow {
    date: NaiveDate,
    season: i32,
    week: u32,
    home: String,
    home_pts: u32,
    away: String,
    away_pts: u32,
}

impl From<GameRow> for GameRecord {
    fn from(row: GameRow) -> Self {
        GameRecord {
            date: row.date,
            season: row.season,
            week: row.week,
            home_team: row.home,
            home_points: row.home_pts,
            away_team: row.away,
            away_points: row.away_pts,
        }
    }
}

/// Read games from a CSV file
pub fn read_games_csv<P: AsRef<Path>>(path: P) -> Result<Vec<GameRecord>> {
    let file = std::fs::File::open(path.as_ref())?;
    parse_games_csv(file)
}

/// Parse games from any reader
pub fn parse_games_csv<R: Read>(reader: R) -> Result<Vec<GameRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    if headers.is_empty() {
        return Ok(Vec::new());
    }
    check_header(&headers)?;

    let mut games = Vec::new();
    for record in reader.records() {
        let record = record.map_err(row_error)?;
        let row: GameRow = record.deserialize(None).map_err(row_error)?;
        if row.home.is_empty() || row.away.is_empty() {
            let line = record.position().map_or(0, |p| p.line());
            return Err(CfbError::Parse(format!("line {}: missing team name", line)));
        }
        games.push(GameRecord::from(row));
    }

    log::debug!("Parsed {} games from CSV", games.len());
    Ok(games)
}

/// Games from `last_season` onward. Earlier seasons already in the store
/// are final, so an incremental import only refreshes the latest one.
pub fn since_season(games: Vec<GameRecord>, last_season: Option<i32>) -> Vec<GameRecord> {
    match last_season {
        Some(season) => games.into_iter().filter(|g| g.season >= season).collect(),
        None => games,
    }
}

fn check_header(headers: &csv::StringRecord) -> Result<()> {
    let columns: Vec<String> = headers.iter().map(str::to_lowercase).collect();
    if columns != HEADER {
        return Err(CfbError::Parse(format!(
            "unexpected header '{}', expected '{}'",
            headers.iter().collect::<Vec<_>>().join(","),
            HEADER.join(",")
        )));
    }
    Ok(())
}

fn row_error(e: csv::Error) -> CfbError {
    match e.position() {
        Some(pos) => CfbError::Parse(format!("line {}: {}", pos.line(), e)),
        None => CfbError::Parse(e.to_string()),
    }
}
