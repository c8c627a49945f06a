//! Run configuration with YAML schema and validation.
//!
//! Mistake-proofing happens in three layers: type-safe structs, schema
//! validation via serde (`deny_unknown_fields`), and runtime semantic
//! validation for the constraints the schema cannot express.

use serde::{Deserialize, Serialize};
use std::path::Path;
use validator::Validate;

use crate::error::{AmsError, AmsResult};

/// Criterion deciding when a run has converged.
///
/// The algorithm does not pin this down on its own, so it is an explicit
/// configuration choice rather than a hard-coded rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Convergence {
    /// Every particle's level strictly exceeds the target.
    #[default]
    AllParticles,
    /// At least one particle's level strictly exceeds the target.
    MaxLevel,
}

/// Configuration for a TAMS run.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct TamsConfig {
    /// Ensemble size N.
    #[validate(range(min = 2))]
    pub n_particles: usize,

    /// Number of distinct level values eliminated per iteration.
    #[serde(default = "default_npart")]
    #[validate(range(min = 1))]
    pub npart: usize,

    /// Score level defining the rare event of interest.
    pub target_level: f64,

    /// Trajectory horizon (duration of every sample path).
    pub duration: f64,

    /// Sampling step of the shared time grid.
    pub step: f64,

    /// Initial state shared by every particle.
    #[serde(default)]
    pub initial_state: f64,

    /// Start time of every trajectory.
    #[serde(default)]
    pub initial_time: f64,

    /// Iteration budget before the run is cut off.
    #[serde(default = "default_max_iterations")]
    #[validate(range(min = 1))]
    pub max_iterations: usize,

    /// Convergence criterion.
    #[serde(default)]
    pub convergence: Convergence,

    /// Master seed for all randomness (noise and donor choice).
    #[serde(default = "default_seed")]
    pub seed: u64,
}

const fn default_npart() -> usize {
    1
}

const fn default_max_iterations() -> usize {
    10_000
}

const fn default_seed() -> u64 {
    42
}

impl Default for TamsConfig {
    fn default() -> Self {
        Self {
            n_particles: 100,
            npart: default_npart(),
            target_level: 1.0,
            duration: 1.0,
            step: 0.01,
            initial_state: 0.0,
            initial_time: 0.0,
            max_iterations: default_max_iterations(),
            convergence: Convergence::default(),
            seed: default_seed(),
        }
    }
}

impl TamsConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, YAML parsing fails, or
    /// validation fails.
    pub fn load<P: AsRef<Path>>(path: P) -> AmsResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns error if parsing or validation fails.
    pub fn from_yaml(yaml: &str) -> AmsResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.check()?;
        Ok(config)
    }

    /// Create a builder for configuration.
    #[must_use]
    pub fn builder() -> TamsConfigBuilder {
        TamsConfigBuilder::default()
    }

    /// Run schema and semantic validation.
    ///
    /// # Errors
    ///
    /// Returns error on any invalid parameter.
    pub fn check(&self) -> AmsResult<()> {
        self.validate()?;
        self.validate_semantic()
    }

    /// Validate semantic constraints beyond the schema.
    fn validate_semantic(&self) -> AmsResult<()> {
        if !(self.step.is_finite() && self.step > 0.0) {
            return Err(AmsError::config("step must be positive and finite"));
        }
        if !(self.duration.is_finite() && self.duration >= self.step) {
            return Err(AmsError::config(
                "duration must be finite and cover at least one step",
            ));
        }
        if !self.target_level.is_finite() {
            return Err(AmsError::config("target_level must be finite"));
        }
        if self.npart >= self.n_particles {
            return Err(AmsError::config(format!(
                "npart ({}) must be smaller than n_particles ({})",
                self.npart, self.n_particles
            )));
        }
        if !(self.initial_state.is_finite() && self.initial_time.is_finite()) {
            return Err(AmsError::config("initial condition must be finite"));
        }
        Ok(())
    }
}

/// Configuration builder for programmatic construction.
#[derive(Debug, Default)]
pub struct TamsConfigBuilder {
    config: TamsConfig,
}

impl TamsConfigBuilder {
    /// Set the ensemble size.
    #[must_use]
    pub const fn n_particles(mut self, n: usize) -> Self {
        self.config.n_particles = n;
        self
    }

    /// Set the number of distinct levels eliminated per iteration.
    #[must_use]
    pub const fn npart(mut self, npart: usize) -> Self {
        self.config.npart = npart;
        self
    }

    /// Set the target score level.
    #[must_use]
    pub const fn target_level(mut self, level: f64) -> Self {
        self.config.target_level = level;
        self
    }

    /// Set the trajectory horizon.
    #[must_use]
    pub const fn duration(mut self, duration: f64) -> Self {
        self.config.duration = duration;
        self
    }

    /// Set the sampling step.
    #[must_use]
    pub const fn step(mut self, step: f64) -> Self {
        self.config.step = step;
        self
    }

    /// Set the shared initial condition.
    #[must_use]
    pub const fn initial_condition(mut self, state: f64, time: f64) -> Self {
        self.config.initial_state = state;
        self.config.initial_time = time;
        self
    }

    /// Set the iteration budget.
    #[must_use]
    pub const fn max_iterations(mut self, budget: usize) -> Self {
        self.config.max_iterations = budget;
        self
    }

    /// Set the convergence criterion.
    #[must_use]
    pub const fn convergence(mut self, convergence: Convergence) -> Self {
        self.config.convergence = convergence;
        self
    }

    /// Set the master seed.
    #[must_use]
    pub const fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns error if any parameter is invalid.
    pub fn build(self) -> AmsResult<TamsConfig> {
        self.config.check()?;
        Ok(self.config)
    }
}
