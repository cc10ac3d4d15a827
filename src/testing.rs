//! Test fixtures: a synthetic schedule and a stub rating model

use std::cell::Cell;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::features::GameFeatures;
use crate::model::{Fitted, Predict, RatingModel, RatingParams};
use crate::{CfbError, GameRecord, Result};

const TEAMS: [&str; 6] = ["Alabama", "Clemson", "Georgia", "Oregon", "Texas", "Wisconsin"];
const STRENGTH: [i32; 6] = [14, 10, 7, 3, 0, -4];

/// Round-robin seasons of six teams, twelve weeks each, three games a week
pub(crate) fn synthetic_games(seasons: i32) -> Vec<GameRecord> {
    let mut games = Vec::new();
    for s in 0..seasons {
        let season = 2010 + s;
        let opener = NaiveDate::from_ymd_opt(season, 9, 1).unwrap();
        for week in 0..12usize {
            // Circle method: team 0 fixed, the rest rotate
            let mut order = vec![0usize];
            order.extend((0..5).map(|i| 1 + (i + week) % 5));
            for slot in 0..3usize {
                let (mut h, mut a) = (order[slot], order[5 - slot]);
                if (week + slot) % 2 == 1 {
                    std::mem::swap(&mut h, &mut a);
                }
                let noise = ((season as usize * 31 + week * 17 + slot * 7) % 13) as i32 - 6;
                let edge = (STRENGTH[h] - STRENGTH[a]) / 2;
                games.push(GameRecord {
                    date: opener + Duration::days((week * 7 + slot % 2) as i64),
                    season,
                    week: week as u32 + 1,
                    home_team: TEAMS[h].to_string(),
                    home_points: (27 + edge + noise).max(0) as u32,
                    away_team: TEAMS[a].to_string(),
                    away_points: (24 - edge - noise / 2).max(0) as u32,
                });
            }
        }
    }
    games.sort_by_key(|g| g.date);
    games
}

/// Predicts `10 * kfactor + bias` for every game and counts its fits
#[derive(Default)]
pub(crate) struct StubFitter {
    fits: Cell<usize>,
    fail: bool,
}

impl StubFitter {
    pub(crate) fn failing() -> Self {
        StubFitter {
            fits: Cell::new(0),
            fail: true,
        }
    }

    pub(crate) fn fit_count(&self) -> usize {
        self.fits.get()
    }
}

impl RatingModel for StubFitter {
    type Model = StubModel;

    fn fit(&self, params: &RatingParams, rows: &[GameFeatures]) -> Result<Fitted<StubModel>> {
        self.fits.set(self.fits.get() + 1);
        if self.fail {
            return Err(CfbError::FitFailed("stub failure".to_string()));
        }

        let center = 10.0 * params.kfactor;
        Ok(Fitted {
            model: StubModel {
                lines: params.mode.lines(),
                center,
            },
            residuals: rows.iter().map(|r| r.target - (center + r.bias)).collect(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct StubModel {
    lines: Vec<f64>,
    center: f64,
}

impl Predict for StubModel {
    fn lines(&self) -> &[f64] {
        &self.lines
    }

    fn survival(&self, _date: NaiveDate, home: &str, away: &str, bias: f64) -> Vec<f64> {
        let center = self.center + bias + home.len() as f64 - away.len() as f64;
        self.lines
            .iter()
            .map(|l| if *l < center { 0.9 } else { 0.1 })
            .collect()
    }
}
