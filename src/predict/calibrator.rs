//! Calibration entry point
//!
//! Ties the game store, the loss evaluator, the hyperparameter search and
//! the model cache together behind `calibrate(mode, trials, force_retrain)`.

use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::data::GameSource;
use crate::model::RatingModel;
use crate::training::report::write_trials_csv;
use crate::training::{HyperparameterSearch, LossEvaluator, TpeConfig};
use crate::{CfbError, Config, Mode, Result};

use super::{CalibratedModel, ModelCache};

pub struct Calibrator<S, R> {
    source: S,
    fitter: R,
    cache: ModelCache,
    burnin: usize,
    search: TpeConfig,
    report_dir: Option<PathBuf>,
}

impl<S, R> Calibrator<S, R>
where
    S: GameSource,
    R: RatingModel,
    R::Model: Serialize + DeserializeOwned,
{
    /// Calibrator caching under `config.data.cache_dir`, without trial reports
    pub fn new(source: S, fitter: R, config: &Config) -> Self {
        Calibrator {
            source,
            fitter,
            cache: ModelCache::new(&config.data.cache_dir),
            burnin: config.calibration.burnin,
            search: TpeConfig::from(config),
            report_dir: None,
        }
    }

    /// Write `<dir>/<mode>_params.csv` after every fresh search
    pub fn with_reports<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.report_dir = Some(dir.into());
        self
    }

    pub fn cache(&self) -> &ModelCache {
        &self.cache
    }

    pub fn fitter(&self) -> &R {
        &self.fitter
    }

    /// Calibrated model for `mode`, from the cache when possible.
    ///
    /// `mode` must be `"spread"` or `"total"` and `trial_budget` positive;
    /// both are checked before the store or the cache is touched. With
    /// `force_retrain` the cache is bypassed and overwritten.
    pub fn calibrate(
        &self,
        mode: &str,
        trial_budget: usize,
        force_retrain: bool,
    ) -> Result<CalibratedModel<R::Model>> {
        let mode: Mode = mode.parse()?;
        if trial_budget == 0 {
            return Err(CfbError::NoTrials);
        }

        self.cache
            .get_or_train(mode, force_retrain, || self.train(mode, trial_budget))
    }

    fn train(&self, mode: Mode, trials: usize) -> Result<CalibratedModel<R::Model>> {
        let games = self.source.all_games()?;
        if games.is_empty() {
            return Err(CfbError::NoGames);
        }

        log::info!(
            "Calibrating {} model: {} trials over {} games ({} to {})",
            mode,
            trials,
            games.len(),
            games[0].date,
            games[games.len() - 1].date
        );

        let objective = LossEvaluator::new(&games, mode, &self.fitter, self.burnin)?;
        let outcome = HyperparameterSearch::new(self.search.clone()).run(&objective, trials)?;

        log::info!(
            "Best {} loss {:.4} with {}",
            mode,
            outcome.best.loss,
            outcome.best.hyperparameters
        );

        if let Some(dir) = &self.report_dir {
            let path = dir.join(format!("{}_params.csv", mode));
            if let Err(e) = write_trials_csv(&outcome.history, &path) {
                log::warn!("Could not write trial report {}: {}", path.display(), e);
            }
        }

        Ok(CalibratedModel::from_result(mode, outcome.best))
    }
}
