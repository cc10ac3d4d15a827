//! Calibrated model: fitted ratings plus the hyperparameters behind them

use chrono::NaiveDate;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::features::rest::{home_bias, RestState};
use crate::model::Predict;
use crate::training::CalibrationResult;
use crate::{Hyperparameters, Mode};

/// Ready-to-use predictor for one mode. Every prediction takes an optional
/// bias, defaulting to the calibrated home-field advantage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibratedModel<M> {
    pub mode: Mode,
    pub hyperparameters: Hyperparameters,
    pub loss: f64,
    pub model: M,
}

impl<M> CalibratedModel<M> {
    pub fn from_result(mode: Mode, result: CalibrationResult<M>) -> Self {
        CalibratedModel {
            mode,
            hyperparameters: result.hyperparameters,
            loss: result.loss,
            model: result.model,
        }
    }

    /// Circumstantial bias for a game given each side's days of rest
    pub fn bias(&self, home_rest_days: i64, away_rest_days: i64) -> f64 {
        home_bias(
            self.mode,
            self.hyperparameters.home_field,
            self.hyperparameters.fatigue,
            RestState {
                home_rest_days,
                away_rest_days,
            },
        )
    }

    fn bias_or_default(&self, bias: Option<f64>) -> f64 {
        bias.unwrap_or(self.hyperparameters.home_field)
    }
}

impl<M: Predict> CalibratedModel<M> {
    /// P(value > line)
    pub fn probability(
        &self,
        date: NaiveDate,
        home: &str,
        away: &str,
        bias: Option<f64>,
        line: f64,
    ) -> f64 {
        self.model
            .probability(date, home, away, self.bias_or_default(bias), line)
    }

    pub fn quantile(
        &self,
        date: NaiveDate,
        home: &str,
        away: &str,
        bias: Option<f64>,
        q: f64,
    ) -> f64 {
        self.model
            .quantile(date, home, away, self.bias_or_default(bias), q)
    }

    pub fn percentile(
        &self,
        date: NaiveDate,
        home: &str,
        away: &str,
        bias: Option<f64>,
        p: f64,
    ) -> f64 {
        self.model
            .percentile(date, home, away, self.bias_or_default(bias), p)
    }

    pub fn mean(&self, date: NaiveDate, home: &str, away: &str, bias: Option<f64>) -> f64 {
        self.model.mean(date, home, away, self.bias_or_default(bias))
    }

    pub fn median(&self, date: NaiveDate, home: &str, away: &str, bias: Option<f64>) -> f64 {
        self.model.median(date, home, away, self.bias_or_default(bias))
    }

    pub fn sample<R: Rng + ?Sized>(
        &self,
        date: NaiveDate,
        home: &str,
        away: &str,
        bias: Option<f64>,
        size: usize,
        rng: &mut R,
    ) -> Vec<f64> {
        self.model
            .sample(date, home, away, self.bias_or_default(bias), size, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureEngineer;
    use crate::model::{Melo, MeloModel, RatingModel, RatingParams};
    use crate::testing::synthetic_games;

    fn calibrated(mode: Mode) -> CalibratedModel<MeloModel> {
        let hyperparameters = Hyperparameters {
            kfactor: 0.15,
            home_field: 0.2,
            halflife: 8.0,
            fatigue: 0.4,
        };
        let games = synthetic_games(3);
        let rows = FeatureEngineer::new(mode, hyperparameters.home_field, hyperparameters.fatigue)
            .build(&games);
        let fitted = Melo::default()
            .fit(
                &RatingParams {
                    mode,
                    kfactor: hyperparameters.kfactor,
                    halflife: hyperparameters.halflife,
                },
                &rows,
            )
            .unwrap();
        CalibratedModel {
            mode,
            hyperparameters,
            loss: 0.0,
            model: fitted.model,
        }
    }

    #[test]
    fn test_default_bias_is_home_field() {
        let model = calibrated(Mode::Spread);
        let date = NaiveDate::from_ymd_opt(2013, 9, 1).unwrap();

        assert_eq!(
            model.median(date, "Alabama", "Texas", None),
            model.median(date, "Alabama", "Texas", Some(0.2))
        );
        assert_eq!(
            model.probability(date, "Alabama", "Texas", None, 3.0),
            model.model.probability(date, "Alabama", "Texas", 0.2, 3.0)
        );
        assert!(
            model.mean(date, "Alabama", "Texas", Some(0.0))
                < model.mean(date, "Alabama", "Texas", None)
        );
    }

    #[test]
    fn test_percentile_matches_quantile() {
        let model = calibrated(Mode::Total);
        let date = NaiveDate::from_ymd_opt(2013, 9, 1).unwrap();
        assert_eq!(
            model.percentile(date, "Georgia", "Oregon", None, 80.0),
            model.quantile(date, "Georgia", "Oregon", None, 0.8)
        );
        assert!(
            model.quantile(date, "Georgia", "Oregon", None, 0.2)
                <= model.quantile(date, "Georgia", "Oregon", None, 0.8)
        );
    }

    #[test]
    fn test_rest_bias() {
        let model = calibrated(Mode::Spread);
        // Equal rest cancels out for spreads
        assert!((model.bias(7, 7) - 0.2).abs() < 1e-12);
        // A short week at home costs some home edge
        assert!(model.bias(5, 12) < model.bias(12, 5));
    }
}
