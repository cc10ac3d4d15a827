//! College football point-spread and point-total predictions
//!
//! Calibrates a margin-dependent Elo model against historical game results
//! and caches the calibrated model per prediction mode.

pub mod data;
pub mod features;
pub mod model;
pub mod predict;
pub mod training;

#[cfg(test)]
mod testing;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// What the model predicts: home minus away points, or home plus away points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Spread,
    Total,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Spread => "spread",
            Mode::Total => "total",
        }
    }

    /// Combine a home and an away quantity the way the target is defined
    pub fn combine(&self, home: f64, away: f64) -> f64 {
        match self {
            Mode::Spread => home - away,
            Mode::Total => home + away,
        }
    }

    /// True when swapping home and away leaves the target unchanged
    pub fn commutes(&self) -> bool {
        matches!(self, Mode::Total)
    }

    /// Outcome lines the rating model tracks, half-point offsets so no
    /// integer result ever lands on a line
    pub fn lines(&self) -> Vec<f64> {
        let (lo, hi) = match self {
            Mode::Total => (-0.5, 145.5),
            Mode::Spread => (-85.5, 85.5),
        };
        let n = (hi - lo) as usize + 1;
        (0..n).map(|i| lo + i as f64).collect()
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Mode {
    type Err = CfbError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "spread" => Ok(Mode::Spread),
            "total" => Ok(Mode::Total),
            other => Err(CfbError::InvalidMode(other.to_string())),
        }
    }
}

/// A single completed game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub date: NaiveDate,
    pub season: i32,
    pub week: u32,
    pub home_team: String,
    pub home_points: u32,
    pub away_team: String,
    pub away_points: u32,
}

impl GameRecord {
    /// Returns the point margin (positive = home win)
    pub fn margin(&self) -> i64 {
        self.home_points as i64 - self.away_points as i64
    }

    /// Returns the combined score of both teams
    pub fn total(&self) -> i64 {
        self.home_points as i64 + self.away_points as i64
    }

    /// Training target for a prediction mode
    pub fn target(&self, mode: Mode) -> f64 {
        mode.combine(self.home_points as f64, self.away_points as f64)
    }
}

/// One point in the calibration search space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hyperparameters {
    /// Rating update step per game
    pub kfactor: f64,
    /// Home-field advantage in rating units
    pub home_field: f64,
    /// Years for a rating to regress halfway back to the prior
    pub halflife: f64,
    /// Fatigue penalty for a team with no rest
    pub fatigue: f64,
}

impl Hyperparameters {
    pub const NAMES: [&'static str; 4] = ["kfactor", "home_field", "halflife", "fatigue"];

    /// Search bounds, in the same order as `NAMES`
    pub const BOUNDS: [(f64, f64); 4] = [(0.0, 1.0), (0.0, 0.5), (0.0, 40.0), (0.0, 1.0)];

    pub fn to_array(&self) -> [f64; 4] {
        [self.kfactor, self.home_field, self.halflife, self.fatigue]
    }

    pub fn from_array(v: [f64; 4]) -> Self {
        Hyperparameters {
            kfactor: v[0],
            home_field: v[1],
            halflife: v[2],
            fatigue: v[3],
        }
    }
}

impl fmt::Display for Hyperparameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "kfactor={:.4} home_field={:.4} halflife={:.2} fatigue={:.4}",
            self.kfactor, self.home_field, self.halflife, self.fatigue
        )
    }
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum CfbError {
    #[error("Unknown mode '{0}'; valid options are 'spread' and 'total'")]
    InvalidMode(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Hyperparameter search needs at least one trial")]
    NoTrials,

    #[error("No games in store - run `cfbmodel data import` first")]
    NoGames,

    #[error("Only {games} games available, need more than the {burnin} burn-in games")]
    InsufficientGames { games: usize, burnin: usize },

    #[error("Rating fit failed: {0}")]
    FitFailed(String),

    #[error("Unknown team: {0}")]
    UnknownTeam(String),
}

pub type Result<T> = std::result::Result<T, CfbError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub calibration: CalibrationConfig,
    pub search: SearchConfig,
    pub model: ModelConfig,
    pub data: DataConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationConfig {
    pub trials: usize,
    /// Early residuals excluded from the loss while ratings converge
    pub burnin: usize,
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub startup_trials: usize,
    pub candidates: usize,
    pub gamma: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub sigma: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub database_path: String,
    pub cache_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            calibration: CalibrationConfig {
                trials: 200,
                burnin: 2183,
                seed: 2017,
            },
            search: SearchConfig {
                startup_trials: 20,
                candidates: 24,
                gamma: 0.25,
            },
            model: ModelConfig { sigma: 1.0 },
            data: DataConfig {
                database_path: "data/cfb.db".to_string(),
                cache_dir: "cache".to_string(),
            },
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CfbError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        toml::from_str(&content)
            .map_err(|e| CfbError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| CfbError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
