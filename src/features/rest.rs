//! Rest and fatigue features
//!
//! Days since each side's previous game, and the home bias that folds
//! home-field advantage and relative fatigue into one scalar per game.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::{GameRecord, Mode};

/// Rest assigned to a team with no earlier game (season opener, new program)
pub const RESTED_DAYS: i64 = 255;

/// Fatigue decays by a factor of e every this many days of rest
const FATIGUE_DECAY_DAYS: f64 = 7.0;

/// Every date each team played, home or away, sorted ascending.
///
/// Built once per game set and read-only afterwards; lookups are binary
/// searches, so deriving rest for n games costs O(n log n).
#[derive(Debug, Clone, Default)]
pub struct TeamTimeline {
    dates: HashMap<String, Vec<NaiveDate>>,
}

impl TeamTimeline {
    pub fn from_games(games: &[GameRecord]) -> Self {
        let mut dates: HashMap<String, Vec<NaiveDate>> = HashMap::new();
        for game in games {
            dates.entry(game.home_team.clone()).or_default().push(game.date);
            dates.entry(game.away_team.clone()).or_default().push(game.date);
        }
        for series in dates.values_mut() {
            series.sort_unstable();
            series.dedup();
        }
        TeamTimeline { dates }
    }

    /// Latest date strictly before `date` on which `team` played
    pub fn previous_game(&self, team: &str, date: NaiveDate) -> Option<NaiveDate> {
        let series = self.dates.get(team)?;
        let idx = series.partition_point(|d| *d < date);
        idx.checked_sub(1).map(|i| series[i])
    }

    /// Days since the previous game, or `RESTED_DAYS` if there is none
    pub fn rest_days(&self, team: &str, date: NaiveDate) -> i64 {
        self.previous_game(team, date)
            .map(|prev| (date - prev).num_days())
            .unwrap_or(RESTED_DAYS)
    }

    pub fn team_count(&self) -> usize {
        self.dates.len()
    }
}

/// Days of rest for both sides of one game
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestState {
    pub home_rest_days: i64,
    pub away_rest_days: i64,
}

/// Fatigue penalty for a team with `rest_days` of rest
pub fn fatigue(coefficient: f64, rest_days: i64) -> f64 {
    coefficient * (-(rest_days as f64) / FATIGUE_DECAY_DAYS).exp()
}

/// Home bias: home-field advantage minus the fatigue differential.
///
/// Fatigues are combined with the same operator that builds the training
/// target, so the bias moves the prediction in the direction the target
/// moves.
pub fn home_bias(mode: Mode, home_field: f64, fatigue_coefficient: f64, rest: RestState) -> f64 {
    let home = fatigue(fatigue_coefficient, rest.home_rest_days);
    let away = fatigue(fatigue_coefficient, rest.away_rest_days);
    home_field - mode.combine(home, away)
}

/// One game with its derived training columns
#[derive(Debug, Clone, PartialEq)]
pub struct GameFeatures {
    pub date: NaiveDate,
    pub home_team: String,
    pub away_team: String,
    pub target: f64,
    pub rest: RestState,
    pub bias: f64,
}

/// Derives rest, bias and target columns for a chronological game set
pub struct FeatureEngineer {
    mode: Mode,
    home_field: f64,
    fatigue: f64,
}

impl FeatureEngineer {
    pub fn new(mode: Mode, home_field: f64, fatigue: f64) -> Self {
        FeatureEngineer {
            mode,
            home_field,
            fatigue,
        }
    }

    /// Rest for both sides of every game, against one shared timeline
    pub fn rest_states(games: &[GameRecord]) -> Vec<RestState> {
        let timeline = TeamTimeline::from_games(games);
        games
            .iter()
            .map(|g| RestState {
                home_rest_days: timeline.rest_days(&g.home_team, g.date),
                away_rest_days: timeline.rest_days(&g.away_team, g.date),
            })
            .collect()
    }

    pub fn build(&self, games: &[GameRecord]) -> Vec<GameFeatures> {
        self.build_with_rest(games, &Self::rest_states(games))
    }

    /// Same as `build`, reusing rest states already derived for `games`.
    /// Rest depends only on the schedule, so a search computes it once.
    pub fn build_with_rest(&self, games: &[GameRecord], rest: &[RestState]) -> Vec<GameFeatures> {
        debug_assert_eq!(games.len(), rest.len());
        rest.iter()
            .copied()
            .zip(games)
            .map(|(rest, game)| GameFeatures {
                date: game.date,
                home_team: game.home_team.clone(),
                away_team: game.away_team.clone(),
                target: game.target(self.mode),
                rest,
                bias: home_bias(self.mode, self.home_field, self.fatigue, rest),
            })
            .collect()
    }
}
