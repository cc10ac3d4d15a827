//! Game storage
//!
//! SQLite game store, CSV import, and the `GameSource` seam the calibration
//! pipeline reads games through.

pub mod database;
pub mod import;

pub use database::Database;

use crate::{GameRecord, Result};

/// Supplies deduplicated games in chronological order
pub trait GameSource {
    /// All games, sorted by date ascending
    fn all_games(&self) -> Result<Vec<GameRecord>>;
}

impl GameSource for Database {
    fn all_games(&self) -> Result<Vec<GameRecord>> {
        self.get_all_games()
    }
}

impl<T: GameSource + ?Sized> GameSource for &T {
    fn all_games(&self) -> Result<Vec<GameRecord>> {
        (**self).all_games()
    }
}

impl GameSource for Vec<GameRecord> {
    fn all_games(&self) -> Result<Vec<GameRecord>> {
        let mut games = self.clone();
        // Stable sort keeps same-day games in insertion order
        games.sort_by_key(|g| g.date);
        Ok(games)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn game(day: u32, home: &str, away: &str) -> GameRecord {
        GameRecord {
            date: NaiveDate::from_ymd_opt(2018, 9, day).unwrap(),
            season: 2018,
            week: 1,
            home_team: home.to_string(),
            home_points: 21,
            away_team: away.to_string(),
            away_points: 14,
        }
    }

    #[test]
    fn test_vec_source_sorts_by_date() {
        let games = vec![game(15, "Ohio State", "TCU"), game(1, "Alabama", "Louisville")];
        let sorted = games.all_games().unwrap();
        assert_eq!(sorted[0].home_team, "Alabama");
        assert_eq!(sorted[1].home_team, "Ohio State");
    }

    #[test]
    fn test_borrowed_database_source() {
        let db = Database::in_memory().unwrap();
        db.insert_game(&game(8, "Clemson", "Auburn")).unwrap();
        db.insert_game(&game(1, "Alabama", "Louisville")).unwrap();

        let source = &db;
        let games = source.all_games().unwrap();
        assert_eq!(games.len(), 2);
        assert_eq!(games[0].home_team, "Alabama");
    }
}
