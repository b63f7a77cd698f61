//! Run configuration, validated before anything touches the device.

use std::time::Duration;

use devlink::fit::{GeneticParams, SessionShape};
use serde::Deserialize;

use crate::{FitterErr, Result};

/// Which protocol shape the session speaks, as configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeConfig {
    Genetic,
    Direct,
}

/// Everything one assimilation run needs besides the dataset and the port.
///
/// Defaults are the values the original host scripts drove the board with.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub shape: ShapeConfig,
    pub epsilon: f32,
    pub mutation_rate: f32,
    pub population_size: u16,
    pub tourney_size: u16,
    pub max_iterations: u16,
    pub degree: u16,
    pub elite_count: u16,
    /// Absolute limit per coefficient; must have `degree + 1` entries.
    pub limits: Vec<f32>,
    /// Number of leading points trusted without a residual test.
    pub seed_window: usize,
    /// A probe point is an anomaly when both its absolute and its percentage
    /// residual exceed this.
    pub cutoff: f64,
    /// Per-read deadline in milliseconds; absent means wait forever.
    pub read_deadline_ms: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            shape: ShapeConfig::Genetic,
            epsilon: 0.0,
            mutation_rate: 0.1,
            population_size: 50,
            tourney_size: 5,
            max_iterations: 25,
            degree: 2,
            elite_count: 2,
            limits: vec![8.0, 8.0, 8.0],
            seed_window: 3,
            cutoff: 10.0,
            read_deadline_ms: None,
        }
    }
}

impl RunConfig {
    /// Checks every constraint that can be checked without the dataset.
    ///
    /// # Errors
    /// `FitterErr::InvalidConfig` naming the violated constraint. Runs before
    /// any device exchange, so a bad config never reaches the transport.
    pub fn validate(&self) -> Result<()> {
        let degree_plus_one = self.degree as usize + 1;

        if self.seed_window < degree_plus_one {
            return Err(FitterErr::InvalidConfig(format!(
                "seed window {} is too small for degree {}: a well-posed fit needs at least {} points",
                self.seed_window, self.degree, degree_plus_one
            )));
        }
        if self.limits.len() != degree_plus_one {
            return Err(FitterErr::InvalidConfig(format!(
                "expected {} coefficient limits for degree {}, got {}",
                degree_plus_one,
                self.degree,
                self.limits.len()
            )));
        }
        if self.population_size == 0 {
            return Err(FitterErr::InvalidConfig(
                "population size must be positive".into(),
            ));
        }
        if self.tourney_size == 0 {
            return Err(FitterErr::InvalidConfig(
                "tourney size must be positive".into(),
            ));
        }
        if self.max_iterations == 0 {
            return Err(FitterErr::InvalidConfig(
                "max iterations must be positive".into(),
            ));
        }
        if !(self.cutoff.is_finite() && self.cutoff > 0.0) {
            return Err(FitterErr::InvalidConfig(format!(
                "cutoff must be a positive finite number, got {}",
                self.cutoff
            )));
        }

        Ok(())
    }

    pub fn shape(&self) -> SessionShape {
        match self.shape {
            ShapeConfig::Genetic => SessionShape::Genetic,
            ShapeConfig::Direct => SessionShape::Direct,
        }
    }

    pub fn genetic_params(&self) -> GeneticParams {
        GeneticParams {
            epsilon: self.epsilon,
            mutation_rate: self.mutation_rate,
            population_size: self.population_size,
            tourney_size: self.tourney_size,
            max_iterations: self.max_iterations,
            degree: self.degree,
            elite_count: self.elite_count,
            limits: self.limits.clone(),
        }
    }

    pub fn read_deadline(&self) -> Option<Duration> {
        self.read_deadline_ms.map(Duration::from_millis)
    }
}
