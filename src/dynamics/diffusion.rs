//! One-dimensional diffusion processes.
//!
//! Implements `dX = b(X, t) dt + σ(X, t) dW` integrated with the
//! Euler–Maruyama scheme. The stepper is a restartable finite lazy
//! iterator yielding `(time, state)` pairs on demand; `simulate`
//! materializes it onto the requested grid.
//!
//! A process may carry a native Brownian resolution finer than the
//! requested sampling step, in which case fine increments are integrated
//! and aggregated chunk-by-chunk onto the coarse grid. Non-multiple step
//! ratios and malformed noise arrays are rejected, never rounded.

use serde::{Deserialize, Serialize};

use crate::dynamics::TrajectoryProvider;
use crate::engine::rng::SimRng;
use crate::error::{AmsError, AmsResult};
use crate::trajectory::Trajectory;

/// Drift and diffusion coefficients of a 1-D diffusion.
pub trait Diffusion1d {
    /// Drift coefficient `b(x, t)`.
    fn drift(&self, x: f64, t: f64) -> f64;

    /// Diffusion coefficient `σ(x, t)`.
    fn diffusion(&self, x: f64, t: f64) -> f64;
}

/// Lazy Euler–Maruyama stepper over pre-drawn Brownian increments.
///
/// Yields the initial sample first, then one sample per increment:
/// `x_{i+1} = x_i + b(x_i, t_i) h + σ(x_i, t_i) ΔW_i`. Finite by
/// construction; restart by building a new stepper from the same inputs.
pub struct EulerMaruyama<'a, D> {
    process: &'a D,
    t0: f64,
    step: f64,
    x: f64,
    index: usize,
    increments: &'a [f64],
}

impl<'a, D: Diffusion1d> EulerMaruyama<'a, D> {
    /// Create a stepper from `(x0, t0)` over the given increments.
    #[must_use]
    pub fn new(process: &'a D, x0: f64, t0: f64, step: f64, increments: &'a [f64]) -> Self {
        Self {
            process,
            t0,
            step,
            x: x0,
            index: 0,
            increments,
        }
    }
}

impl<D: Diffusion1d> Iterator for EulerMaruyama<'_, D> {
    type Item = (f64, f64);

    fn next(&mut self) -> Option<Self::Item> {
        if self.index > self.increments.len() {
            return None;
        }
        let t = self.t0 + self.index as f64 * self.step;
        if self.index > 0 {
            let dw = self.increments[self.index - 1];
            let t_prev = self.t0 + (self.index - 1) as f64 * self.step;
            self.x += self.process.drift(self.x, t_prev) * self.step
                + self.process.diffusion(self.x, t_prev) * dw;
        }
        self.index += 1;
        Some((t, self.x))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.increments.len() + 1 - self.index.min(self.increments.len() + 1);
        (remaining, Some(remaining))
    }
}

/// Sum consecutive `ratio`-sized chunks of fine Brownian increments into
/// the coarse increments for an output grid of `num_points` samples.
///
/// # Errors
///
/// Returns `AmsError::GridMismatch` when `ratio` is zero or when
/// `dw.len() != (num_points - 1) * ratio`: an insufficient or oversized
/// raw sample array is reported, never truncated.
pub fn integrate_brownian_path(
    dw: &[f64],
    num_points: usize,
    ratio: usize,
) -> AmsResult<Vec<f64>> {
    if ratio == 0 {
        return Err(AmsError::grid_mismatch("step ratio must be at least 1"));
    }
    let needed = num_points.saturating_sub(1) * ratio;
    if dw.len() != needed {
        return Err(AmsError::grid_mismatch(format!(
            "expected {needed} raw increments for {num_points} grid points at ratio {ratio}, got {}",
            dw.len()
        )));
    }
    Ok(dw.chunks_exact(ratio).map(|c| c.iter().sum()).collect())
}

/// Integrate a diffusion onto the grid `t0 + i * step`, `i = 0..=n`.
///
/// `native_step` finer than `step` triggers fine-increment aggregation;
/// supplied noise is always interpreted at the native resolution.
fn simulate_diffusion<D: Diffusion1d>(
    process: &D,
    native_step: Option<f64>,
    x0: f64,
    t0: f64,
    duration: f64,
    step: f64,
    noise: Option<&[f64]>,
    rng: &mut SimRng,
) -> AmsResult<Trajectory> {
    if !(step.is_finite() && step > 0.0) {
        return Err(AmsError::grid_mismatch(format!("invalid step {step}")));
    }
    if !(duration.is_finite() && duration > 0.0) {
        return Err(AmsError::grid_mismatch(format!(
            "invalid duration {duration}"
        )));
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let n = (duration / step).round() as usize;
    if n == 0 {
        return Err(AmsError::grid_mismatch(
            "duration is shorter than one step",
        ));
    }

    let dw = match native_step {
        Some(h) if h != step => {
            let ratio = step / h;
            let rounded = ratio.round();
            if rounded < 1.0 || (ratio - rounded).abs() > 1e-9 * rounded {
                return Err(AmsError::grid_mismatch(format!(
                    "sampling step {step} is not an integer multiple of native step {h}"
                )));
            }
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let ratio = rounded as usize;
            let fine = match noise {
                Some(dw_fine) => dw_fine.to_vec(),
                None => rng.brownian_increments(n * ratio, h),
            };
            integrate_brownian_path(&fine, n + 1, ratio)?
        }
        _ => match noise {
            Some(dw) => {
                if dw.len() != n {
                    return Err(AmsError::grid_mismatch(format!(
                        "expected {n} increments, got {}",
                        dw.len()
                    )));
                }
                dw.to_vec()
            }
            None => rng.brownian_increments(n, step),
        },
    };

    let mut times = Vec::with_capacity(n + 1);
    let mut states = Vec::with_capacity(n + 1);
    for (t, x) in EulerMaruyama::new(process, x0, t0, step, &dw) {
        if !x.is_finite() {
            return Err(AmsError::non_finite(format!("state at t = {t}")));
        }
        times.push(t);
        states.push(x);
    }

    Trajectory::new(times, states)
}

/// Ornstein–Uhlenbeck process: `dX = θ(μ − X) dt + √(2 D₀) dW`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrnsteinUhlenbeck {
    /// Mean-reversion target.
    pub mu: f64,
    /// Mean-reversion rate.
    pub theta: f64,
    /// Noise amplitude.
    pub d0: f64,
    /// Native Brownian resolution, if finer than the sampling grid.
    pub native_step: Option<f64>,
}

impl OrnsteinUhlenbeck {
    /// Create an Ornstein–Uhlenbeck process.
    #[must_use]
    pub const fn new(mu: f64, theta: f64, d0: f64) -> Self {
        Self {
            mu,
            theta,
            d0,
            native_step: None,
        }
    }

    /// Set a native Brownian resolution finer than the sampling grid.
    #[must_use]
    pub const fn with_native_step(mut self, h: f64) -> Self {
        self.native_step = Some(h);
        self
    }
}

impl Diffusion1d for OrnsteinUhlenbeck {
    fn drift(&self, x: f64, _t: f64) -> f64 {
        self.theta * (self.mu - x)
    }

    fn diffusion(&self, _x: f64, _t: f64) -> f64 {
        (2.0 * self.d0).sqrt()
    }
}

impl TrajectoryProvider for OrnsteinUhlenbeck {
    fn simulate(
        &self,
        x0: f64,
        t0: f64,
        duration: f64,
        step: f64,
        noise: Option<&[f64]>,
        rng: &mut SimRng,
    ) -> AmsResult<Trajectory> {
        simulate_diffusion(self, self.native_step, x0, t0, duration, step, noise, rng)
    }
}

/// Wiener process (Brownian motion): `dX = √(2 D₀) dW`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wiener {
    /// Noise amplitude.
    pub d0: f64,
    /// Native Brownian resolution, if finer than the sampling grid.
    pub native_step: Option<f64>,
}

impl Wiener {
    /// Create a Wiener process.
    #[must_use]
    pub const fn new(d0: f64) -> Self {
        Self {
            d0,
            native_step: None,
        }
    }

    /// Set a native Brownian resolution finer than the sampling grid.
    #[must_use]
    pub const fn with_native_step(mut self, h: f64) -> Self {
        self.native_step = Some(h);
        self
    }
}

impl Diffusion1d for Wiener {
    fn drift(&self, _x: f64, _t: f64) -> f64 {
        0.0
    }

    fn diffusion(&self, _x: f64, _t: f64) -> f64 {
        (2.0 * self.d0).sqrt()
    }
}

impl TrajectoryProvider for Wiener {
    fn simulate(
        &self,
        x0: f64,
        t0: f64,
        duration: f64,
        step: f64,
        noise: Option<&[f64]>,
        rng: &mut SimRng,
    ) -> AmsResult<Trajectory> {
        simulate_diffusion(self, self.native_step, x0, t0, duration, step, noise, rng)
    }
}
