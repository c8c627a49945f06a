//! Stochastic process dynamics.
//!
//! The splitting engine consumes sample paths through the narrow
//! [`TrajectoryProvider`] contract; anything that can produce a
//! reproducible path on a fixed grid can drive it. The [`diffusion`]
//! module supplies concrete 1-D diffusions integrated with Euler–Maruyama.

pub mod diffusion;

pub use diffusion::{
    integrate_brownian_path, EulerMaruyama, OrnsteinUhlenbeck, Wiener,
};

use crate::engine::rng::SimRng;
use crate::error::AmsResult;
use crate::trajectory::Trajectory;

/// Source of sample paths for the splitting engine.
///
/// `simulate` produces a path from `(x0, t0)` over `duration`, sampled on
/// the grid `t0 + i * step`. When `noise` is supplied it must be replayed
/// exactly (deterministic reproduction of a path); when `None`, fresh
/// independent noise is drawn from `rng`. Providers with a native noise
/// resolution finer than `step` must integrate fine increments and
/// aggregate, and must reject non-multiple step ratios or malformed noise
/// arrays rather than truncating.
pub trait TrajectoryProvider {
    /// Produce one sample path.
    ///
    /// # Errors
    ///
    /// Returns `AmsError::GridMismatch` on step-ratio or noise-shape
    /// violations, `AmsError::NonFiniteValue` if integration diverges.
    fn simulate(
        &self,
        x0: f64,
        t0: f64,
        duration: f64,
        step: f64,
        noise: Option<&[f64]>,
        rng: &mut SimRng,
    ) -> AmsResult<Trajectory>;
}
