//! Rating models
//!
//! The calibration pipeline only talks to the `RatingModel` and `Predict`
//! traits; `Melo` is the margin-dependent Elo implementation shipped with
//! the crate.

pub mod dist;
pub mod melo;

pub use melo::{Melo, MeloModel};

use chrono::NaiveDate;
use rand::Rng;

use crate::features::GameFeatures;
use crate::{Mode, Result};

/// Rating-model hyperparameters that do not enter through the bias column
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingParams {
    pub mode: Mode,
    pub kfactor: f64,
    pub halflife: f64,
}

/// A fitted model and its per-game residuals, in input order
#[derive(Debug, Clone)]
pub struct Fitted<M> {
    pub model: M,
    pub residuals: Vec<f64>,
}

/// Fits a pairwise rating model to a chronological game sequence
pub trait RatingModel {
    type Model: Predict;

    /// Each row supplies the date, both team labels, the target value and
    /// the bias for one game. Residuals come back one per row.
    fn fit(&self, params: &RatingParams, rows: &[GameFeatures]) -> Result<Fitted<Self::Model>>;
}

/// Outcome distribution for a future game between two teams
pub trait Predict {
    /// Lines the survival function is evaluated on, ascending
    fn lines(&self) -> &[f64];

    /// P(value > line) for every line, non-increasing
    fn survival(&self, date: NaiveDate, home: &str, away: &str, bias: f64) -> Vec<f64>;

    /// P(value > line)
    fn probability(&self, date: NaiveDate, home: &str, away: &str, bias: f64, line: f64) -> f64 {
        let survival = self.survival(date, home, away, bias);
        dist::survival_at(self.lines(), &survival, line)
    }

    fn quantile(&self, date: NaiveDate, home: &str, away: &str, bias: f64, q: f64) -> f64 {
        let survival = self.survival(date, home, away, bias);
        dist::quantile(self.lines(), &survival, q)
    }

    fn percentile(&self, date: NaiveDate, home: &str, away: &str, bias: f64, p: f64) -> f64 {
        self.quantile(date, home, away, bias, p / 100.0)
    }

    fn mean(&self, date: NaiveDate, home: &str, away: &str, bias: f64) -> f64 {
        let survival = self.survival(date, home, away, bias);
        dist::mean(self.lines(), &survival)
    }

    fn median(&self, date: NaiveDate, home: &str, away: &str, bias: f64) -> f64 {
        self.quantile(date, home, away, bias, 0.5)
    }

    /// Inverse-CDF draws from the outcome distribution
    fn sample<R: Rng + ?Sized>(
        &self,
        date: NaiveDate,
        home: &str,
        away: &str,
        bias: f64,
        size: usize,
        rng: &mut R,
    ) -> Vec<f64>
    where
        Self: Sized,
    {
        let survival = self.survival(date, home, away, bias);
        (0..size)
            .map(|_| dist::quantile(self.lines(), &survival, rng.gen::<f64>()))
            .collect()
    }
}
