//! Sequential hyperparameter search
//!
//! Tree-structured Parzen estimator: after a handful of uniform draws, each
//! proposal models the good and the bad trials seen so far as two kernel
//! densities per dimension and picks the candidate most likely to be good.
//! Every proposal depends on every earlier loss, so trials run strictly in
//! sequence.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Normal;

use crate::model::dist::{norm_cdf, norm_pdf};
use crate::{CfbError, Config, Hyperparameters, Result};

use super::{CalibrationResult, Objective};

/// Search settings
#[derive(Debug, Clone)]
pub struct TpeConfig {
    /// Uniform draws before the density model takes over
    pub startup_trials: usize,
    /// Candidates drawn from the good-trial density per proposal
    pub candidates: usize,
    /// Share of trials (scaled by sqrt(n)) counted as good
    pub gamma: f64,
    pub seed: u64,
}

impl Default for TpeConfig {
    fn default() -> Self {
        TpeConfig {
            startup_trials: 20,
            candidates: 24,
            gamma: 0.25,
            seed: 0,
        }
    }
}

impl From<&Config> for TpeConfig {
    fn from(config: &Config) -> Self {
        TpeConfig {
            startup_trials: config.search.startup_trials,
            candidates: config.search.candidates,
            gamma: config.search.gamma,
            seed: config.calibration.seed,
        }
    }
}

/// One evaluated hyperparameter vector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trial {
    pub params: Hyperparameters,
    pub loss: f64,
}

/// Every trial so far, in evaluation order
#[derive(Debug, Clone, Default)]
pub struct TrialHistory {
    trials: Vec<Trial>,
}

impl TrialHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, trial: Trial) {
        self.trials.push(trial);
    }

    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    pub fn trials(&self) -> &[Trial] {
        &self.trials
    }

    /// Index of the lowest loss (earliest on ties)
    pub fn best_index(&self) -> Option<usize> {
        self.trials
            .iter()
            .enumerate()
            .min_by(|(i, a), (j, b)| a.loss.total_cmp(&b.loss).then(i.cmp(j)))
            .map(|(i, _)| i)
    }

    pub fn best(&self) -> Option<&Trial> {
        self.best_index().map(|i| &self.trials[i])
    }

    pub fn losses(&self) -> Vec<f64> {
        self.trials.iter().map(|t| t.loss).collect()
    }

    /// (value, loss) pairs for hyperparameter `dim` (index into
    /// `Hyperparameters::NAMES`)
    pub fn scatter(&self, dim: usize) -> Vec<(f64, f64)> {
        self.trials
            .iter()
            .map(|t| (t.params.to_array()[dim], t.loss))
            .collect()
    }
}

/// Truncated Gaussian mixture over one bounded dimension
struct Parzen {
    mus: Vec<f64>,
    sigmas: Vec<f64>,
    low: f64,
    high: f64,
}

impl Parzen {
    /// One component per observation, each as wide as the larger gap to
    /// its neighbours, plus one broad prior component over the whole range
    fn fit(observations: &[f64], low: f64, high: f64) -> Self {
        let width = high - low;
        let mut sorted = observations.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let n = sorted.len();
        let min_sigma = width / (n as f64 + 1.0).min(100.0);
        let mut mus = Vec::with_capacity(n + 1);
        let mut sigmas = Vec::with_capacity(n + 1);

        for i in 0..n {
            let left = if i > 0 { sorted[i] - sorted[i - 1] } else { sorted[i] - low };
            let right = if i + 1 < n { sorted[i + 1] - sorted[i] } else { high - sorted[i] };
            mus.push(sorted[i]);
            sigmas.push(left.max(right).clamp(min_sigma, width));
        }

        mus.push(low + 0.5 * width);
        sigmas.push(width);

        Parzen {
            mus,
            sigmas,
            low,
            high,
        }
    }

    /// Draw from one component, redrawing until the value falls in range
    fn sample(&self, rng: &mut StdRng) -> f64 {
        let k = rng.gen_range(0..self.mus.len());
        let (mu, sigma) = (self.mus[k], self.sigmas[k]);
        let normal = match Normal::new(mu, sigma) {
            Ok(normal) => normal,
            Err(_) => return mu.clamp(self.low, self.high),
        };
        for _ in 0..64 {
            let x = rng.sample(normal);
            if x >= self.low && x <= self.high {
                return x;
            }
        }
        mu.clamp(self.low, self.high)
    }

    fn log_pdf(&self, x: f64) -> f64 {
        let weight = 1.0 / self.mus.len() as f64;
        let density: f64 = self
            .mus
            .iter()
            .zip(&self.sigmas)
            .map(|(mu, sigma)| {
                let mass = norm_cdf((self.high - mu) / sigma) - norm_cdf((self.low - mu) / sigma);
                weight * norm_pdf((x - mu) / sigma) / (sigma * mass.max(1e-12))
            })
            .sum();
        density.max(f64::MIN_POSITIVE).ln()
    }
}

/// Proposes the next hyperparameter vector from the trial history
pub struct TpeSampler {
    config: TpeConfig,
    rng: StdRng,
}

impl TpeSampler {
    pub fn new(config: TpeConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        TpeSampler { config, rng }
    }

    pub fn propose(&mut self, history: &TrialHistory) -> Hyperparameters {
        if history.len() < self.config.startup_trials.max(2) {
            return self.uniform();
        }

        let n = history.len();
        let n_good = ((self.config.gamma * (n as f64).sqrt()).ceil() as usize).clamp(1, n - 1);

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&i, &j| {
            history.trials[i]
                .loss
                .total_cmp(&history.trials[j].loss)
                .then(i.cmp(&j))
        });

        let mut next = [0.0; 4];
        for (dim, (low, high)) in Hyperparameters::BOUNDS.iter().copied().enumerate() {
            let values = |idx: &[usize]| -> Vec<f64> {
                idx.iter()
                    .map(|&i| history.trials[i].params.to_array()[dim])
                    .collect()
            };
            let good = Parzen::fit(&values(&order[..n_good]), low, high);
            let bad = Parzen::fit(&values(&order[n_good..]), low, high);

            let mut best = (f64::NEG_INFINITY, low);
            for _ in 0..self.config.candidates.max(1) {
                let x = good.sample(&mut self.rng);
                let score = good.log_pdf(x) - bad.log_pdf(x);
                if score > best.0 {
                    best = (score, x);
                }
            }
            next[dim] = best.1;
        }

        Hyperparameters::from_array(next)
    }

    fn uniform(&mut self) -> Hyperparameters {
        let mut next = [0.0; 4];
        for (dim, (low, high)) in Hyperparameters::BOUNDS.iter().copied().enumerate() {
            next[dim] = self.rng.gen_range(low..=high);
        }
        Hyperparameters::from_array(next)
    }
}

/// Best result of a search and the full trial history behind it
#[derive(Debug)]
pub struct SearchOutcome<M> {
    pub best: CalibrationResult<M>,
    pub history: TrialHistory,
}

/// Runs a fixed number of sequential trials against an objective
pub struct HyperparameterSearch {
    config: TpeConfig,
}

impl HyperparameterSearch {
    pub fn new(config: TpeConfig) -> Self {
        HyperparameterSearch { config }
    }

    /// Evaluate exactly `trials` proposals. Any failed trial aborts the
    /// search; the best model seen is returned, not the last one.
    pub fn run<O: Objective>(
        &self,
        objective: &O,
        trials: usize,
    ) -> Result<SearchOutcome<O::Model>> {
        if trials == 0 {
            return Err(CfbError::NoTrials);
        }

        let mut sampler = TpeSampler::new(self.config.clone());
        let mut history = TrialHistory::new();
        let mut best: Option<CalibrationResult<O::Model>> = None;

        for k in 0..trials {
            let params = sampler.propose(&history);
            let result = objective.evaluate(&params)?;

            log::debug!("Trial {}/{}: {} loss={:.4}", k + 1, trials, params, result.loss);
            history.push(Trial {
                params,
                loss: result.loss,
            });

            if best.as_ref().map_or(true, |b| result.loss < b.loss) {
                log::info!("  trial {}: new best loss {:.4} ({})", k + 1, result.loss, params);
                best = Some(result);
            }
        }

        let best = best.ok_or(CfbError::NoTrials)?;
        Ok(SearchOutcome { best, history })
    }
}
