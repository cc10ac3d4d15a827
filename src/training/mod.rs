//! Model calibration
//!
//! Loss evaluation for one hyperparameter vector, the sequential search
//! over the hyperparameter space, and trial reporting.

pub mod loss;
pub mod report;
pub mod tuning;

pub use loss::LossEvaluator;
pub use tuning::{HyperparameterSearch, SearchOutcome, TpeConfig, Trial, TrialHistory};

use crate::{Hyperparameters, Result};

/// Outcome of one complete fit
#[derive(Debug, Clone)]
pub struct CalibrationResult<M> {
    pub hyperparameters: Hyperparameters,
    pub model: M,
    /// Mean absolute residual after the burn-in period
    pub loss: f64,
}

/// Anything the search can minimise
pub trait Objective {
    type Model;

    fn evaluate(&self, params: &Hyperparameters) -> Result<CalibrationResult<Self::Model>>;
}
