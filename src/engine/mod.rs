//! Adaptive multilevel splitting engine.
//!
//! Implements the TAMS ensemble lifecycle:
//! - Deterministic RNG (PCG, partitionable streams)
//! - Distinct-level cohort selection with exact-tie inclusion
//! - Cloning with exact-prefix reuse and fresh-noise continuation
//! - Unbiased multiplicative weight accounting

pub mod resample;
pub mod rng;
pub mod selection;

use serde::{Deserialize, Serialize};

pub use resample::resample;
pub use rng::SimRng;
pub use selection::selection_step;

use crate::config::{Convergence, TamsConfig};
use crate::dynamics::TrajectoryProvider;
use crate::error::{AmsError, AmsResult};
use crate::trajectory::{first_crossing, max_level, Trajectory};

/// Lifecycle state of a splitting run.
///
/// `Extinct` and `BudgetExceeded` are informative non-convergence
/// outcomes, distinct from `Converged` so callers cannot mistake an
/// under-resolved estimate for a converged one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// No ensemble drawn yet.
    Uninitialized,
    /// Ensemble initialized, no iteration performed.
    Ready,
    /// Iterating.
    Running,
    /// The configured convergence criterion is satisfied.
    Converged,
    /// Selection degenerated: every remaining distinct level would have
    /// to be eliminated, leaving no donors.
    Extinct,
    /// Iteration budget exhausted before convergence.
    BudgetExceeded,
}

/// One ensemble member: a trajectory plus its cached level.
///
/// Replaced wholesale on resampling, never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    /// The sample path, on the grid shared by the whole ensemble.
    pub trajectory: Trajectory,
    /// Maximum score along the trajectory.
    pub level: f64,
}

/// Result surface of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TamsResult {
    /// Rare-event probability estimate. Zero when extinct.
    pub probability: f64,
    /// Final ensemble weight (the probability-mass estimator).
    pub weight: f64,
    /// Terminal status of the run.
    pub status: RunStatus,
    /// Number of selection/mutation iterations performed.
    pub iterations: usize,
}

/// TAMS controller: owns the ensemble and drives the splitting loop.
///
/// Construction performs no simulation; `initialize_ensemble` draws the
/// initial ensemble, and `run` iterates selection and mutation until a
/// terminal status. The intermediate operations are public so callers can
/// drive iterations by hand.
pub struct TamsEngine<P, S>
where
    P: TrajectoryProvider,
    S: Fn(f64, f64) -> f64,
{
    provider: P,
    score: S,
    config: TamsConfig,
    rng: SimRng,
    ensemble: Vec<Particle>,
    weight: f64,
    status: RunStatus,
    iterations: usize,
}

impl<P, S> TamsEngine<P, S>
where
    P: TrajectoryProvider,
    S: Fn(f64, f64) -> f64,
{
    /// Create a controller from a trajectory provider, a score function
    /// and a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid.
    pub fn new(provider: P, score: S, config: TamsConfig) -> AmsResult<Self> {
        config.check()?;
        let rng = SimRng::new(config.seed);
        Ok(Self {
            provider,
            score,
            config,
            rng,
            ensemble: Vec::new(),
            weight: 1.0,
            status: RunStatus::Uninitialized,
            iterations: 0,
        })
    }

    /// Draw the initial ensemble: N independent fresh-noise trajectories
    /// from the shared initial condition, on a common grid.
    ///
    /// Every particle draws its noise from its own partitioned RNG stream,
    /// so the initial ensemble is identical no matter in which order the
    /// trajectories are produced.
    ///
    /// Resets the weight to 1 and the iteration count to 0.
    ///
    /// # Errors
    ///
    /// Returns error if the provider fails or produces mismatched grids.
    pub fn initialize_ensemble(&mut self) -> AmsResult<()> {
        let mut streams = self.rng.partition(self.config.n_particles);
        let mut ensemble: Vec<Particle> = Vec::with_capacity(self.config.n_particles);
        for stream in &mut streams {
            let trajectory = self.provider.simulate(
                self.config.initial_state,
                self.config.initial_time,
                self.config.duration,
                self.config.step,
                None,
                stream,
            )?;
            if let Some(first) = ensemble.first() {
                if !trajectory.same_grid(&first.trajectory) {
                    return Err(AmsError::grid_mismatch(
                        "provider produced trajectories on different grids",
                    ));
                }
            }
            let level = max_level(&self.score, &trajectory)?;
            ensemble.push(Particle { trajectory, level });
        }

        self.ensemble = ensemble;
        self.weight = 1.0;
        self.iterations = 0;
        self.status = RunStatus::Ready;
        Ok(())
    }

    /// Current per-particle levels, in ensemble order.
    #[must_use]
    pub fn levels(&self) -> Vec<f64> {
        self.ensemble.iter().map(|p| p.level).collect()
    }

    /// Pure selection: delegate to the selection engine with the
    /// configured `npart`. Does not mutate the ensemble.
    #[must_use]
    pub fn selection_step(&self, levels: &[f64]) -> (Vec<usize>, Vec<usize>) {
        selection::selection_step(levels, self.config.npart)
    }

    /// Replace every killed particle by a clone of a random donor,
    /// branched at the donor's first crossing of the killed level, and
    /// apply the weight update `weight *= 1 - |kill| / N` once.
    ///
    /// Replacements are computed against the old ensemble and committed
    /// as a single batch, so a donor is never read after being
    /// overwritten within the same iteration.
    ///
    /// An empty kill set is the degenerate-selection signal and
    /// transitions the run to `Extinct`.
    ///
    /// # Errors
    ///
    /// Returns error if the ensemble is uninitialized, the donor pool is
    /// empty while the kill set is not, or resampling fails.
    pub fn mutation_step(&mut self, kill: &[usize], survive: &[usize]) -> AmsResult<()> {
        if self.ensemble.is_empty() {
            return Err(AmsError::NotInitialized);
        }
        if kill.is_empty() {
            self.status = RunStatus::Extinct;
            return Ok(());
        }
        if survive.is_empty() {
            return Err(AmsError::NoSurvivors);
        }

        let mut replacements = Vec::with_capacity(kill.len());
        for &k in kill {
            let threshold = self.ensemble[k].level;
            let donor_index = survive[self.rng.choose_index(survive.len())];
            let donor = &self.ensemble[donor_index];

            // The donor survived, so its level strictly exceeds the
            // eliminated threshold and the crossing is guaranteed.
            let (cross, _) = first_crossing(&self.score, threshold, &donor.trajectory)?;
            let branch_time = donor.trajectory.time(cross);
            let branch_state = donor.trajectory.state(cross);

            let trajectory = resample(
                &self.provider,
                &mut self.rng,
                branch_time,
                branch_state,
                &donor.trajectory,
                self.config.step,
            )?;
            let level = max_level(&self.score, &trajectory)?;
            replacements.push((k, Particle { trajectory, level }));
        }

        for (k, particle) in replacements {
            self.ensemble[k] = particle;
        }

        #[allow(clippy::cast_precision_loss)]
        {
            self.weight *= 1.0 - kill.len() as f64 / self.ensemble.len() as f64;
        }
        self.iterations += 1;
        Ok(())
    }

    /// Drive the selection/mutation loop to a terminal status.
    ///
    /// # Errors
    ///
    /// Returns `AmsError::NotInitialized` unless `initialize_ensemble`
    /// ran first; otherwise propagates provider/scoring failures.
    pub fn run(&mut self) -> AmsResult<TamsResult> {
        if self.ensemble.is_empty() {
            return Err(AmsError::NotInitialized);
        }
        self.status = RunStatus::Running;

        loop {
            if self.converged() {
                self.status = RunStatus::Converged;
                break;
            }
            if self.iterations >= self.config.max_iterations {
                self.status = RunStatus::BudgetExceeded;
                break;
            }

            let levels = self.levels();
            let (kill, survive) = self.selection_step(&levels);
            self.mutation_step(&kill, &survive)?;
            if self.status == RunStatus::Extinct {
                break;
            }
        }

        Ok(self.result())
    }

    /// Result surface for the current status.
    #[must_use]
    pub fn result(&self) -> TamsResult {
        let probability = match self.status {
            RunStatus::Extinct => 0.0,
            _ => self.weight * self.fraction_above_target(),
        };
        TamsResult {
            probability,
            weight: self.weight,
            status: self.status,
            iterations: self.iterations,
        }
    }

    /// Current ensemble, for callers that analyze surviving trajectories.
    #[must_use]
    pub fn ensemble(&self) -> &[Particle] {
        &self.ensemble
    }

    /// Current ensemble weight.
    #[must_use]
    pub const fn weight(&self) -> f64 {
        self.weight
    }

    /// Current lifecycle status.
    #[must_use]
    pub const fn status(&self) -> RunStatus {
        self.status
    }

    /// Iterations performed so far.
    #[must_use]
    pub const fn iterations(&self) -> usize {
        self.iterations
    }

    /// The run configuration.
    #[must_use]
    pub const fn config(&self) -> &TamsConfig {
        &self.config
    }

    fn converged(&self) -> bool {
        let target = self.config.target_level;
        match self.config.convergence {
            Convergence::AllParticles => self.ensemble.iter().all(|p| p.level > target),
            Convergence::MaxLevel => self.ensemble.iter().any(|p| p.level > target),
        }
    }

    fn fraction_above_target(&self) -> f64 {
        let above = self
            .ensemble
            .iter()
            .filter(|p| p.level > self.config.target_level)
            .count();
        #[allow(clippy::cast_precision_loss)]
        {
            above as f64 / self.ensemble.len() as f64
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::dynamics::{OrnsteinUhlenbeck, Wiener};

    fn score_state(_t: f64, x: f64) -> f64 {
        x
    }

    fn ou_engine(
        n: usize,
        target: f64,
        seed: u64,
    ) -> TamsEngine<OrnsteinUhlenbeck, fn(f64, f64) -> f64> {
        let config = TamsConfig::builder()
            .n_particles(n)
            .target_level(target)
            .duration(1.0)
            .step(0.01)
            .seed(seed)
            .build()
            .unwrap();
        TamsEngine::new(
            OrnsteinUhlenbeck::new(0.0, 1.0, 0.5),
            score_state as fn(f64, f64) -> f64,
            config,
        )
        .unwrap()
    }

    #[test]
    fn test_initialize_ensemble_invariants() {
        let mut engine = ou_engine(10, 1.0, 42);
        engine.initialize_ensemble().unwrap();

        assert_eq!(engine.status(), RunStatus::Ready);
        assert_eq!(engine.weight(), 1.0);
        assert_eq!(engine.levels().len(), 10);
        assert_eq!(engine.iterations(), 0);

        let first = &engine.ensemble()[0].trajectory;
        assert_eq!(first.len(), 101);
        for particle in engine.ensemble() {
            assert!(particle.trajectory.same_grid(first));
            assert_eq!(particle.trajectory.len(), 101);
        }
        // Independent noise: no two trajectories coincide
        assert_ne!(
            engine.ensemble()[0].trajectory.states(),
            engine.ensemble()[1].trajectory.states()
        );
    }

    #[test]
    fn test_initialization_reproducible_per_seed() {
        let build = |seed| {
            let mut engine = ou_engine(10, 1.0, seed);
            engine.initialize_ensemble().unwrap();
            engine
        };

        // Per-particle noise streams derive from the master seed alone
        let a = build(42);
        let b = build(42);
        for (pa, pb) in a.ensemble().iter().zip(b.ensemble()) {
            assert_eq!(pa, pb);
        }

        let c = build(43);
        assert_ne!(a.ensemble()[0], c.ensemble()[0]);
    }

    #[test]
    fn test_weight_after_one_mutation_step() {
        let mut engine = ou_engine(10, 1.0, 42);
        engine.initialize_ensemble().unwrap();

        let levels = engine.levels();
        let (kill, survive) = engine.selection_step(&levels);
        let killed = kill.len();
        assert!(killed >= 1);

        engine.mutation_step(&kill, &survive).unwrap();
        assert_eq!(engine.weight(), 1.0 - killed as f64 / 10.0);
        assert_eq!(engine.iterations(), 1);
    }

    #[test]
    fn test_weight_multiplies_across_iterations() {
        let mut engine = ou_engine(10, 1.0, 42);
        engine.initialize_ensemble().unwrap();

        let mut expected = 1.0;
        for _ in 0..3 {
            let levels = engine.levels();
            let (kill, survive) = engine.selection_step(&levels);
            assert!(!kill.is_empty());
            engine.mutation_step(&kill, &survive).unwrap();
            expected *= 1.0 - kill.len() as f64 / 10.0;
            assert_eq!(engine.weight(), expected);
        }
    }

    #[test]
    fn test_minimum_level_strictly_increases() {
        let mut engine = ou_engine(10, 1.0, 42);
        engine.initialize_ensemble().unwrap();

        let min_of = |levels: &[f64]| levels.iter().copied().fold(f64::INFINITY, f64::min);

        let mut previous = min_of(&engine.levels());
        for _ in 0..5 {
            let levels = engine.levels();
            let (kill, survive) = engine.selection_step(&levels);
            engine.mutation_step(&kill, &survive).unwrap();
            let current = min_of(&engine.levels());
            assert!(current > previous, "{current} <= {previous}");
            previous = current;
        }
    }

    #[test]
    fn test_replacement_exceeds_eliminated_level() {
        let mut engine = ou_engine(10, 1.0, 42);
        engine.initialize_ensemble().unwrap();

        let levels = engine.levels();
        let (kill, survive) = engine.selection_step(&levels);
        engine.mutation_step(&kill, &survive).unwrap();

        // The branch sample itself scores above the eliminated level, so
        // every replacement must too.
        for &k in &kill {
            assert!(engine.ensemble()[k].level > levels[k]);
        }
    }

    #[test]
    fn test_converged_immediately_when_target_below_start() {
        // Every trajectory starts at x = 0, so a target below 0 is
        // exceeded by the whole initial ensemble.
        let mut engine = ou_engine(10, -0.5, 42);
        engine.initialize_ensemble().unwrap();
        let result = engine.run().unwrap();

        assert_eq!(result.status, RunStatus::Converged);
        assert_eq!(result.iterations, 0);
        assert_eq!(result.probability, 1.0);
        assert_eq!(result.weight, 1.0);
    }

    #[test]
    fn test_extinct_on_degenerate_ensemble() {
        // Zero noise: every particle is the constant path x = 0, a single
        // shared level. Selection degenerates on the first iteration.
        let config = TamsConfig::builder()
            .n_particles(10)
            .target_level(1.0)
            .duration(1.0)
            .step(0.01)
            .build()
            .unwrap();
        let mut engine = TamsEngine::new(Wiener::new(0.0), score_state, config).unwrap();
        engine.initialize_ensemble().unwrap();
        let result = engine.run().unwrap();

        assert_eq!(result.status, RunStatus::Extinct);
        assert_eq!(result.probability, 0.0);
        assert_eq!(result.iterations, 0);
    }

    #[test]
    fn test_budget_exceeded_for_unreachable_target() {
        let config = TamsConfig::builder()
            .n_particles(10)
            .target_level(100.0)
            .duration(1.0)
            .step(0.01)
            .max_iterations(3)
            .seed(42)
            .build()
            .unwrap();
        let mut engine =
            TamsEngine::new(OrnsteinUhlenbeck::new(0.0, 1.0, 0.5), score_state, config).unwrap();
        engine.initialize_ensemble().unwrap();
        let result = engine.run().unwrap();

        assert_eq!(result.status, RunStatus::BudgetExceeded);
        assert_eq!(result.iterations, 3);
        assert!(result.weight < 1.0);
        assert_eq!(result.probability, 0.0);
    }

    #[test]
    fn test_run_requires_initialization() {
        let mut engine = ou_engine(10, 1.0, 42);
        let err = engine.run().unwrap_err();
        assert!(matches!(err, AmsError::NotInitialized));
    }

    #[test]
    fn test_empty_kill_set_means_extinct() {
        let mut engine = ou_engine(10, 1.0, 42);
        engine.initialize_ensemble().unwrap();
        engine.mutation_step(&[], &[]).unwrap();
        assert_eq!(engine.status(), RunStatus::Extinct);
        // A degenerate step leaves the weight untouched
        assert_eq!(engine.weight(), 1.0);
    }

    #[test]
    fn test_max_level_convergence_criterion() {
        // Target reachable by the best particle long before the whole
        // ensemble: max_level converges in fewer iterations.
        let build = |convergence| {
            let config = TamsConfig::builder()
                .n_particles(10)
                .target_level(1.2)
                .duration(1.0)
                .step(0.01)
                .convergence(convergence)
                .seed(42)
                .build()
                .unwrap();
            let mut engine =
                TamsEngine::new(OrnsteinUhlenbeck::new(0.0, 1.0, 0.5), score_state, config)
                    .unwrap();
            engine.initialize_ensemble().unwrap();
            engine.run().unwrap()
        };

        let any = build(Convergence::MaxLevel);
        let all = build(Convergence::AllParticles);

        assert_eq!(any.status, RunStatus::Converged);
        assert_eq!(all.status, RunStatus::Converged);
        assert!(any.iterations <= all.iterations);
        // Identical seeds walk identical kill sequences up to the point
        // where the looser criterion stops first.
        assert!(any.weight >= all.weight);
    }

    #[test]
    fn test_estimate_between_zero_and_one() {
        let mut engine = ou_engine(20, 1.0, 7);
        engine.initialize_ensemble().unwrap();
        let result = engine.run().unwrap();

        assert_eq!(result.status, RunStatus::Converged);
        assert!(result.probability > 0.0);
        assert!(result.probability <= 1.0);
        assert!(result.weight > 0.0 && result.weight <= 1.0);
    }
}
