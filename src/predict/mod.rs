//! Calibrated models and the calibration entry point
//!
//! Wraps a fitted rating model with its hyperparameters, persists it per
//! mode, and runs the search only when no usable cached model exists.

pub mod cache;
pub mod calibrated;
pub mod calibrator;

pub use cache::ModelCache;
pub use calibrated::CalibratedModel;
pub use calibrator::Calibrator;
