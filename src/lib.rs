//! # raresim
//!
//! Rare-event probability estimation via adaptive multilevel splitting.
//!
//! Maintains a weighted ensemble of trajectories, repeatedly discards the
//! worst-ranked members, clones survivors from the branch point with fresh
//! randomness, and tracks an unbiased probability-weight estimator. Far
//! cheaper than naive repeated simulation for events with tiny probability.
//!
//! ## Example
//!
//! ```rust
//! use raresim::prelude::*;
//!
//! let config = TamsConfig::builder()
//!     .n_particles(10)
//!     .target_level(0.8)
//!     .duration(1.0)
//!     .step(0.01)
//!     .seed(42)
//!     .build()?;
//!
//! let process = OrnsteinUhlenbeck::new(0.0, 1.0, 0.5);
//! let mut engine = TamsEngine::new(process, |_t, x| x, config)?;
//! engine.initialize_ensemble()?;
//! let result = engine.run()?;
//!
//! assert!(result.probability <= 1.0);
//! # Ok::<(), raresim::AmsError>(())
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::similar_names,
    clippy::cast_precision_loss,
    clippy::float_cmp,              // Bit-exact prefix reuse is part of the contract
    clippy::suboptimal_flops,       // Numerical code choices are intentional
    clippy::many_single_char_names, // Mathematical notation
    clippy::missing_const_for_fn,   // Many functions can't be const in stable Rust
    clippy::needless_range_loop     // Sometimes range loops are clearer
)]

pub mod config;
pub mod dynamics;
pub mod engine;
pub mod error;
pub mod trajectory;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::{Convergence, TamsConfig, TamsConfigBuilder};
    pub use crate::dynamics::{OrnsteinUhlenbeck, TrajectoryProvider, Wiener};
    pub use crate::engine::rng::SimRng;
    pub use crate::engine::{Particle, RunStatus, TamsEngine, TamsResult};
    pub use crate::error::{AmsError, AmsResult};
    pub use crate::trajectory::Trajectory;
}

/// Re-export for public API
pub use error::{AmsError, AmsResult};
