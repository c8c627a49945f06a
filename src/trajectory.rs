//! Trajectory container and level tracking.
//!
//! A trajectory is a materialized sample path: paired `(time, state)`
//! samples on a fixed grid shared by every member of an ensemble. The level
//! tracker ranks trajectories by the maximum value a score function (the
//! reaction coordinate) reaches along them, and locates the first grid
//! sample where the score strictly exceeds a given threshold.

use serde::{Deserialize, Serialize};

use crate::error::{AmsError, AmsResult};

/// A materialized 1-D sample path on a fixed time grid.
///
/// Built once and never mutated: resampling replaces whole trajectories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    times: Vec<f64>,
    states: Vec<f64>,
}

impl Trajectory {
    /// Create a trajectory from paired time/state samples.
    ///
    /// # Errors
    ///
    /// Returns `AmsError::LengthMismatch` if the arrays disagree in length.
    pub fn new(times: Vec<f64>, states: Vec<f64>) -> AmsResult<Self> {
        if times.len() != states.len() {
            return Err(AmsError::LengthMismatch {
                times: times.len(),
                states: states.len(),
            });
        }
        Ok(Self { times, states })
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Whether the trajectory holds no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// The time grid.
    #[must_use]
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// The state samples.
    #[must_use]
    pub fn states(&self) -> &[f64] {
        &self.states
    }

    /// Time at sample `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i` is out of bounds.
    #[must_use]
    pub fn time(&self, i: usize) -> f64 {
        self.times[i]
    }

    /// State at sample `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i` is out of bounds.
    #[must_use]
    pub fn state(&self, i: usize) -> f64 {
        self.states[i]
    }

    /// Final grid time (the horizon), if any samples exist.
    #[must_use]
    pub fn last_time(&self) -> Option<f64> {
        self.times.last().copied()
    }

    /// Iterate over `(time, state)` pairs.
    pub fn samples(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.times
            .iter()
            .copied()
            .zip(self.states.iter().copied())
    }

    /// Whether two trajectories share a bit-identical time grid.
    #[must_use]
    pub fn same_grid(&self, other: &Self) -> bool {
        self.times == other.times
    }
}

/// Maximum score reached along a trajectory (the trajectory's level).
///
/// # Errors
///
/// Returns `AmsError::EmptyTrajectory` on an empty trajectory, or
/// `AmsError::NonFiniteValue` if the score produces NaN or Inf anywhere
/// along the path.
pub fn max_level<S>(score: &S, traj: &Trajectory) -> AmsResult<f64>
where
    S: Fn(f64, f64) -> f64,
{
    if traj.is_empty() {
        return Err(AmsError::EmptyTrajectory);
    }

    let mut max = f64::NEG_INFINITY;
    for (t, x) in traj.samples() {
        let s = score(t, x);
        if !s.is_finite() {
            return Err(AmsError::non_finite(format!("score at t = {t}")));
        }
        if s > max {
            max = s;
        }
    }
    Ok(max)
}

/// First grid index where the score strictly exceeds `threshold`, together
/// with the score there.
///
/// Only legal on a trajectory known a priori to cross the threshold (a
/// donor whose level exceeds it); a trajectory that never crosses is a
/// caller contract violation.
///
/// # Errors
///
/// Returns `AmsError::NoCrossing` when no sample strictly exceeds the
/// threshold, never a silent sentinel.
pub fn first_crossing<S>(score: &S, threshold: f64, traj: &Trajectory) -> AmsResult<(usize, f64)>
where
    S: Fn(f64, f64) -> f64,
{
    for (i, (t, x)) in traj.samples().enumerate() {
        let s = score(t, x);
        if s > threshold {
            return Ok((i, s));
        }
    }
    Err(AmsError::NoCrossing { threshold })
}
