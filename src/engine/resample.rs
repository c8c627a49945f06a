//! Trajectory resampling: exact-prefix reuse plus fresh-noise continuation.
//!
//! A replacement trajectory copies its donor bit-for-bit up to the branch
//! point (no resimulation of the shared history), then continues from the
//! branch state with independent fresh noise, aligned onto the donor's
//! fixed grid. The branch point is always an exact grid sample, since it
//! comes from a crossing index, and anything else is rejected.

use crate::dynamics::TrajectoryProvider;
use crate::engine::rng::SimRng;
use crate::error::{AmsError, AmsResult};
use crate::trajectory::Trajectory;

/// Build a replacement trajectory on the donor's grid.
///
/// Samples at times `<= branch_time` are copied from the donor exactly;
/// the remaining suffix is produced by `provider` from
/// `(branch_time, branch_state)` with fresh noise at `step`.
///
/// # Errors
///
/// Returns `AmsError::GridMismatch` if `branch_time` is not one of the
/// donor's grid points, or if the provider returns a suffix that does not
/// align with the donor's grid.
pub fn resample<P: TrajectoryProvider>(
    provider: &P,
    rng: &mut SimRng,
    branch_time: f64,
    branch_state: f64,
    donor: &Trajectory,
    step: f64,
) -> AmsResult<Trajectory> {
    let branch = donor
        .times()
        .iter()
        .position(|&t| t == branch_time)
        .ok_or_else(|| {
            AmsError::grid_mismatch(format!(
                "branch time {branch_time} is not a grid point of the donor"
            ))
        })?;

    let suffix = donor.len() - branch - 1;
    if suffix == 0 {
        // Branch at the horizon: nothing left to simulate.
        return Trajectory::new(donor.times().to_vec(), donor.states().to_vec());
    }

    let horizon = donor.time(donor.len() - 1);
    let tail = provider.simulate(
        branch_state,
        branch_time,
        horizon - branch_time,
        step,
        None,
        rng,
    )?;
    if tail.len() != suffix + 1 {
        return Err(AmsError::grid_mismatch(format!(
            "provider returned {} samples for a {} point suffix",
            tail.len(),
            suffix + 1
        )));
    }

    let mut states = Vec::with_capacity(donor.len());
    states.extend_from_slice(&donor.states()[..=branch]);
    states.extend_from_slice(&tail.states()[1..]);

    Trajectory::new(donor.times().to_vec(), states)
}
