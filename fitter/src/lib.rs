//! Incremental robust curve fitting against a remote fitting oracle.
//!
//! The assimilator grows a trusted prefix of the dataset one point at a
//! time. Each step asks the device to fit the prefix, predicts the next
//! point from the returned coefficients and either trusts the point or
//! excludes it as an anomaly. Excluded points are never reconsidered.

pub mod assimilator;
pub mod config;
pub mod dataset;
pub mod error;
pub mod metrics;
pub mod residual;

pub use assimilator::{Assimilator, FitOutcome};
pub use config::{RunConfig, ShapeConfig};
pub use dataset::{AnomalySet, Point, WorkingSet};
pub use error::FitterErr;
pub use metrics::RunMetrics;

/// The fitter module's result type.
pub type Result<T> = std::result::Result<T, FitterErr>;
