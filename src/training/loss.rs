//! Calibration loss: one feature build plus one full rating fit

use crate::features::{FeatureEngineer, RestState};
use crate::model::{RatingModel, RatingParams};
use crate::{CfbError, GameRecord, Hyperparameters, Mode, Result};

use super::{CalibrationResult, Objective};

/// Mean absolute value of `residuals[burnin..]`
pub fn mean_absolute_error(residuals: &[f64], burnin: usize) -> Option<f64> {
    let tail = residuals.get(burnin..)?;
    if tail.is_empty() {
        return None;
    }
    Some(tail.iter().map(|r| r.abs()).sum::<f64>() / tail.len() as f64)
}

/// Scores hyperparameter vectors against a fixed, chronological game set
pub struct LossEvaluator<'a, R> {
    games: &'a [GameRecord],
    rest: Vec<RestState>,
    mode: Mode,
    fitter: &'a R,
    burnin: usize,
}

impl<'a, R: RatingModel> LossEvaluator<'a, R> {
    pub fn new(games: &'a [GameRecord], mode: Mode, fitter: &'a R, burnin: usize) -> Result<Self> {
        if games.len() <= burnin {
            return Err(CfbError::InsufficientGames {
                games: games.len(),
                burnin,
            });
        }

        let rest = FeatureEngineer::rest_states(games);
        log::debug!(
            "Derived rest for {} games ({} scored after burn-in)",
            games.len(),
            games.len() - burnin
        );

        Ok(LossEvaluator {
            games,
            rest,
            mode,
            fitter,
            burnin,
        })
    }
}

impl<'a, R: RatingModel> Objective for LossEvaluator<'a, R> {
    type Model = R::Model;

    fn evaluate(&self, params: &Hyperparameters) -> Result<CalibrationResult<R::Model>> {
        let rows = FeatureEngineer::new(self.mode, params.home_field, params.fatigue)
            .build_with_rest(self.games, &self.rest);

        let fitted = self.fitter.fit(
            &RatingParams {
                mode: self.mode,
                kfactor: params.kfactor,
                halflife: params.halflife,
            },
            &rows,
        )?;

        if fitted.residuals.len() != rows.len() {
            return Err(CfbError::FitFailed(format!(
                "expected {} residuals, got {}",
                rows.len(),
                fitted.residuals.len()
            )));
        }

        let loss = mean_absolute_error(&fitted.residuals, self.burnin).ok_or(
            CfbError::InsufficientGames {
                games: fitted.residuals.len(),
                burnin: self.burnin,
            },
        )?;
        if !loss.is_finite() {
            return Err(CfbError::FitFailed(format!("non-finite loss for {}", params)));
        }

        Ok(CalibrationResult {
            hyperparameters: *params,
            model: fitted.model,
            loss,
        })
    }
}
