//! Error types for raresim.
//!
//! All fallible operations return `Result<T, AmsError>` instead of
//! panicking. Contract violations (crossing lookups that cannot succeed,
//! malformed noise arrays) fail loudly with a distinguishable variant;
//! degenerate selection is deliberately NOT an error; it is the `Extinct`
//! terminal state reported by the controller.

use thiserror::Error;

/// Result type alias for raresim operations.
pub type AmsResult<T> = Result<T, AmsError>;

/// Unified error type for all raresim operations.
#[derive(Debug, Error)]
pub enum AmsError {
    // ===== Trajectory Errors =====
    /// Level is undefined on an empty trajectory.
    #[error("empty trajectory: level is undefined")]
    EmptyTrajectory,

    /// Paired time/state arrays of different lengths.
    #[error("trajectory arrays disagree: {times} times vs {states} states")]
    LengthMismatch {
        /// Number of time samples.
        times: usize,
        /// Number of state samples.
        states: usize,
    },

    /// Crossing-time lookup on a trajectory that never exceeds the level.
    ///
    /// The lookup is only legal when the caller knows a priori that the
    /// trajectory crosses; hitting this variant means the caller broke
    /// that contract.
    #[error("no sample strictly exceeds level {threshold}")]
    NoCrossing {
        /// The level that was never exceeded.
        threshold: f64,
    },

    /// Numerical instability detected (NaN or Inf).
    #[error("non-finite value detected at {location}")]
    NonFiniteValue {
        /// Location where the non-finite value was detected.
        location: String,
    },

    // ===== Grid / Noise Errors =====
    /// Step-ratio or noise-shape mismatch in resampling or coarse-step
    /// integration. Never silently truncated or rounded.
    #[error("grid mismatch: {message}")]
    GridMismatch {
        /// Description of the mismatch.
        message: String,
    },

    // ===== Configuration Errors =====
    /// Invalid configuration parameter.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// YAML parsing error.
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// Validation error.
    #[error("validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // ===== Engine Errors =====
    /// Operation requires an initialized ensemble.
    #[error("ensemble has not been initialized")]
    NotInitialized,

    /// Mutation step invoked with an empty donor pool.
    #[error("no surviving particles to clone from")]
    NoSurvivors,
}

impl AmsError {
    /// Create a configuration error with a message.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a grid-mismatch error with a message.
    #[must_use]
    pub fn grid_mismatch(message: impl Into<String>) -> Self {
        Self::GridMismatch {
            message: message.into(),
        }
    }

    /// Create a non-finite-value error for a named location.
    #[must_use]
    pub fn non_finite(location: impl Into<String>) -> Self {
        Self::NonFiniteValue {
            location: location.into(),
        }
    }
}
