//! Margin-dependent Elo ratings
//!
//! Every team carries one rating per outcome line. The probability that a
//! game's value (spread or total) exceeds a line is a normal CDF of the two
//! teams' ratings at that line plus the game's bias, and each result nudges
//! both teams' ratings on every line toward what actually happened.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::dist;
use super::{Fitted, Predict, RatingModel, RatingParams};
use crate::features::GameFeatures;
use crate::{CfbError, Mode, Result};

const DAYS_PER_YEAR: f64 = 365.25;

/// Keeps the prior away from infinite ratings on lines no game ever crossed
const MIN_LINE_PROB: f64 = 1e-6;

/// Margin-dependent Elo fitter
#[derive(Debug, Clone)]
pub struct Melo {
    /// Scale of the rating-to-probability link
    pub sigma: f64,
}

impl Default for Melo {
    fn default() -> Self {
        Melo { sigma: 1.0 }
    }
}

impl Melo {
    pub fn new(sigma: f64) -> Self {
        Melo { sigma }
    }

    /// Rating per line that reproduces the empirical exceedance rate when
    /// two prior-rated teams meet with no bias
    fn prior_ratings(&self, lines: &[f64], values: &[f64]) -> Vec<f64> {
        lines
            .iter()
            .map(|line| {
                let p = if values.is_empty() {
                    0.5
                } else {
                    values.iter().filter(|v| *v > line).count() as f64 / values.len() as f64
                };
                let p = p.clamp(MIN_LINE_PROB, 1.0 - MIN_LINE_PROB);
                self.sigma * dist::norm_ppf(p) / 2.0
            })
            .collect()
    }
}

impl RatingModel for Melo {
    type Model = MeloModel;

    fn fit(&self, params: &RatingParams, rows: &[GameFeatures]) -> Result<Fitted<MeloModel>> {
        if !(self.sigma > 0.0) {
            return Err(CfbError::FitFailed(format!(
                "sigma must be positive, got {}",
                self.sigma
            )));
        }

        let lines = params.mode.lines();
        let values: Vec<f64> = rows.iter().map(|r| r.target).collect();
        let prior = self.prior_ratings(&lines, &values);

        let mut model = MeloModel {
            mode: params.mode,
            lines,
            sigma: self.sigma,
            kfactor: params.kfactor,
            halflife: params.halflife,
            prior,
            ratings: BTreeMap::new(),
        };

        let mut residuals = Vec::with_capacity(rows.len());
        let mut last_date: Option<NaiveDate> = None;

        for row in rows {
            if let Some(prev) = last_date {
                if row.date < prev {
                    return Err(CfbError::FitFailed(format!(
                        "games out of order: {} follows {}",
                        row.date, prev
                    )));
                }
            }
            last_date = Some(row.date);

            let home = model.rating_at(&row.home_team, row.date);
            let away = model.rating_at(&row.away_team, row.date);

            // Residual is taken before this game's result is absorbed
            let probs = model.line_probabilities(&home, &away, row.bias);
            let survival = dist::monotone_survival(probs.clone());
            let median = dist::quantile(&model.lines, &survival, 0.5);
            residuals.push(row.target - median);

            let (home, away) = model.updated(home, away, &probs, row.target);

            if home.iter().chain(away.iter()).any(|r| !r.is_finite()) {
                return Err(CfbError::FitFailed(format!(
                    "ratings diverged at {} {} vs {}",
                    row.date, row.home_team, row.away_team
                )));
            }

            model.ratings.insert(
                row.home_team.clone(),
                TeamRating {
                    last_played: row.date,
                    values: home,
                },
            );
            model.ratings.insert(
                row.away_team.clone(),
                TeamRating {
                    last_played: row.date,
                    values: away,
                },
            );
        }

        log::debug!(
            "Fit {} mode ratings for {} teams over {} games",
            params.mode,
            model.ratings.len(),
            rows.len()
        );

        Ok(Fitted { model, residuals })
    }
}

/// One team's ratings as of its last game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRating {
    pub last_played: NaiveDate,
    pub values: Vec<f64>,
}

/// Fitted margin-dependent Elo ratings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeloModel {
    mode: Mode,
    lines: Vec<f64>,
    sigma: f64,
    kfactor: f64,
    halflife: f64,
    prior: Vec<f64>,
    ratings: BTreeMap<String, TeamRating>,
}

impl MeloModel {
    pub fn has_team(&self, team: &str) -> bool {
        self.ratings.contains_key(team)
    }

    /// Fraction of a rating's deviation from the prior kept after `years`
    /// without a game
    fn retention(&self, years: f64) -> f64 {
        if years <= 0.0 {
            1.0
        } else if self.halflife <= 0.0 {
            0.0
        } else {
            0.5f64.powf(years / self.halflife)
        }
    }

    /// Ratings for `team` on `date`, regressed toward the prior for the
    /// time since its last game (prior ratings for an unknown team)
    pub fn rating_at(&self, team: &str, date: NaiveDate) -> Vec<f64> {
        match self.ratings.get(team) {
            None => self.prior.clone(),
            Some(rating) => {
                let years = (date - rating.last_played).num_days() as f64 / DAYS_PER_YEAR;
                let keep = self.retention(years);
                rating
                    .values
                    .iter()
                    .zip(&self.prior)
                    .map(|(r, p)| p + (r - p) * keep)
                    .collect()
            }
        }
    }

    /// Raw P(value > line) per line. For spreads the away team is read on
    /// the mirrored line, since home margin > x means away margin < -x.
    fn line_probabilities(&self, home: &[f64], away: &[f64], bias: f64) -> Vec<f64> {
        let n = self.lines.len();
        (0..n)
            .map(|j| {
                let x = if self.mode.commutes() {
                    home[j] + away[j]
                } else {
                    home[j] - away[n - 1 - j]
                };
                dist::norm_cdf((x + bias) / self.sigma)
            })
            .collect()
    }

    fn updated(
        &self,
        mut home: Vec<f64>,
        mut away: Vec<f64>,
        probs: &[f64],
        value: f64,
    ) -> (Vec<f64>, Vec<f64>) {
        let n = self.lines.len();
        for j in 0..n {
            let observed = if value > self.lines[j] { 1.0 } else { 0.0 };
            let delta = self.kfactor * (observed - probs[j]);
            home[j] += delta;
            if self.mode.commutes() {
                away[j] += delta;
            } else {
                away[n - 1 - j] -= delta;
            }
        }
        (home, away)
    }
}

impl Predict for MeloModel {
    fn lines(&self) -> &[f64] {
        &self.lines
    }

    fn survival(&self, date: NaiveDate, home: &str, away: &str, bias: f64) -> Vec<f64> {
        let home = self.rating_at(home, date);
        let away = self.rating_at(away, date);
        dist::monotone_survival(self.line_probabilities(&home, &away, bias))
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::features::RestState;

    fn day(n: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2010, 9, 4).unwrap() + chrono::Duration::days(n)
    }

    fn row(d: i64, home: &str, away: &str, target: f64) -> GameFeatures {
        GameFeatures {
            date: day(d),
            home_team: home.to_string(),
            away_team: away.to_string(),
            target,
            rest: RestState {
                home_rest_days: 7,
                away_rest_days: 7,
            },
            bias: 0.0,
        }
    }

    fn params(mode: Mode) -> RatingParams {
        RatingParams {
            mode,
            kfactor: 0.2,
            halflife: 5.0,
        }
    }

    /// "Strong" beats everyone by 21 at home, in rotation with two others
    fn season() -> Vec<GameFeatures> {
        let mut rows = Vec::new();
        for week in 0..30 {
            let d = week * 7;
            match week % 3 {
                0 => rows.push(row(d, "Strong", "Weak", 21.0)),
                1 => rows.push(row(d, "Middle", "Weak", 7.0)),
                _ => rows.push(row(d, "Strong", "Middle", 14.0)),
            }
        }
        rows
    }

    #[test]
    fn test_residual_per_game() {
        let rows = season();
        let fitted = Melo::default().fit(&params(Mode::Spread), &rows).unwrap();
        assert_eq!(fitted.residuals.len(), rows.len());
        assert!(fitted.residuals.iter().all(|r| r.is_finite()));
    }

    #[test]
    fn test_learns_strength() {
        let fitted = Melo::default()
            .fit(&params(Mode::Spread), &season())
            .unwrap();
        let model = fitted.model;
        let date = day(220);

        let strong = model.median(date, "Strong", "Weak", 0.0);
        let reverse = model.median(date, "Weak", "Strong", 0.0);
        assert!(strong > 5.0, "strong={}", strong);
        assert!(reverse < -5.0, "reverse={}", reverse);
        assert!(model.probability(date, "Strong", "Weak", 0.0, 0.0) > 0.6);
    }

    #[test]
    fn test_residuals_shrink_as_ratings_converge() {
        let rows = season();
        let fitted = Melo::default().fit(&params(Mode::Spread), &rows).unwrap();
        let early: f64 = fitted.residuals[..6].iter().map(|r| r.abs()).sum::<f64>() / 6.0;
        let late: f64 = fitted.residuals[24..].iter().map(|r| r.abs()).sum::<f64>() / 6.0;
        assert!(late < early, "early={} late={}", early, late);
    }

    #[test]
    fn test_deterministic_fit() {
        let rows = season();
        let a = Melo::default().fit(&params(Mode::Total), &rows).unwrap();
        let b = Melo::default().fit(&params(Mode::Total), &rows).unwrap();
        assert_eq!(a.residuals, b.residuals);
        assert_eq!(a.model, b.model);
    }

    #[test]
    fn test_out_of_order_rejected() {
        let rows = vec![row(7, "A", "B", 3.0), row(0, "A", "B", 3.0)];
        let err = Melo::default().fit(&params(Mode::Spread), &rows).unwrap_err();
        assert!(matches!(err, CfbError::FitFailed(_)));
    }

    #[test]
    fn test_bad_sigma_rejected() {
        let err = Melo::new(0.0)
            .fit(&params(Mode::Spread), &season())
            .unwrap_err();
        assert!(matches!(err, CfbError::FitFailed(_)));
    }

    #[test]
    fn test_regression_to_prior() {
        let mut p = params(Mode::Spread);
        p.halflife = 1.0;
        let model = Melo::default().fit(&p, &season()).unwrap().model;

        let now = day(203);
        let later = day(203 + 3650);
        let prior = model.rating_at("Nobody", now);

        let gap_now: f64 = model
            .rating_at("Strong", now)
            .iter()
            .zip(&prior)
            .map(|(r, p)| (r - p).abs())
            .sum();
        let gap_later: f64 = model
            .rating_at("Strong", later)
            .iter()
            .zip(&prior)
            .map(|(r, p)| (r - p).abs())
            .sum();
        assert!(gap_later < gap_now * 0.01);
    }

    #[test]
    fn test_zero_halflife_forgets_between_games() {
        let mut p = params(Mode::Spread);
        p.halflife = 0.0;
        let model = Melo::default().fit(&p, &season()).unwrap().model;

        assert_eq!(
            model.rating_at("Strong", day(400)),
            model.rating_at("Nobody", day(400))
        );
    }

    #[test]
    fn test_bias_shifts_prediction() {
        let model = Melo::default()
            .fit(&params(Mode::Spread), &season())
            .unwrap()
            .model;
        let date = day(220);
        let neutral = model.mean(date, "Middle", "Middle2", 0.0);
        let home_edge = model.mean(date, "Middle", "Middle2", 0.5);
        assert!(home_edge > neutral);
    }

    #[test]
    fn test_serde_roundtrip_predictions() {
        let model = Melo::default()
            .fit(&params(Mode::Spread), &season())
            .unwrap()
            .model;
        let json = serde_json::to_string(&model).unwrap();
        let restored: MeloModel = serde_json::from_str(&json).unwrap();

        assert_eq!(restored, model);
        let date = day(250);
        for (home, away) in [("Strong", "Weak"), ("Weak", "Middle"), ("New", "Strong")] {
            assert_eq!(
                restored.survival(date, home, away, 0.1),
                model.survival(date, home, away, 0.1)
            );
        }
    }

    #[test]
    fn test_sample_within_lines() {
        let model = Melo::default()
            .fit(&params(Mode::Total), &season())
            .unwrap()
            .model;
        let mut rng = StdRng::seed_from_u64(7);
        let draws = model.sample(day(220), "Strong", "Weak", 0.0, 200, &mut rng);
        assert_eq!(draws.len(), 200);
        assert!(draws.iter().all(|d| (-0.5..=145.5).contains(d)));
    }
}
