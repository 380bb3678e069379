//! An agent-based random-walk substrate for epidemic visualizations
//!
//! Epiwalk simulates a closed population of agents moving through the unit square. Each
//! agent carries a health state (`Healthy`, `Infected`, `Cured` or `Deceased`) and a
//! position that is perturbed once per discrete tick. At every tick an immutable
//! [`Snapshot`](crate::population::Snapshot) of the population is handed to a frame
//! callback, which typically partitions it by health state and draws it.
//!
//! The central object is the [`Simulation`](crate::driver::Simulation), which owns:
//! * The [`Population`](crate::population::Population) of agents
//! * The [`MovementModel`](crate::movement::MovementModel) that advances positions
//! * The named [`RandomStreams`](crate::random::RandomStreams) that make runs reproducible
//!
//! A minimal headless run looks like this:
//!
//! ```rust
//! use epiwalk::prelude::*;
//!
//! let parameters = Parameters {
//!     population_size: 50,
//!     seed: Some(7),
//!     max_ticks: Some(10),
//!     tick_interval_ms: None,
//!     ..Parameters::default()
//! };
//! let mut simulation = Simulation::new(&parameters).unwrap();
//! let summary = simulation
//!     .run(|snapshot| {
//!         let partition = partition_by_state(&snapshot);
//!         assert_eq!(partition.total(), 50);
//!         Ok::<(), EpiwalkError>(())
//!     })
//!     .unwrap();
//! assert_eq!(summary.ticks, 10);
//! ```
//!
//! Health-state transitions are not modeled: every agent keeps its initial state for
//! the whole run. A transmission policy would plug in between the movement step and
//! the frame callback.
pub mod classifier;
pub mod driver;
pub mod error;
pub mod hashing;
pub mod log;
pub mod movement;
pub mod parameters;
pub mod population;
pub mod random;
pub mod report;
pub mod runner;

pub mod prelude;

pub use error::EpiwalkError;
pub use crate::log::{debug, error, info, trace, warn};

// Re-exports for use in macros
pub use paste;
pub use rand;
