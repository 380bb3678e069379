//! The movement model: a bounded 2-D random walk (or constant drift) over the unit square.
//!
//! Every call to [`MovementModel::step`] adds a perturbation to each agent's position and then
//! folds the result back into `[0, 1]` according to the configured [`BoundaryPolicy`].
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::define_rng;
use crate::error::EpiwalkError;
use crate::log::trace;
use crate::parameters::{validate_displacement_limit, Parameters};
use crate::population::{Population, Position};
use crate::rand::distr::Uniform;
use crate::random::RandomStreams;

define_rng!(MovementRng);

/// How perturbation vectors are chosen from tick to tick.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum MovementMode {
    /// A fresh perturbation is drawn for every agent on every tick.
    #[default]
    Resampled,
    /// One perturbation per agent is drawn up front and reused every tick, so each agent
    /// travels in a straight line until it meets a wall.
    FixedDrift,
}

/// How a coordinate that leaves `[0, 1]` is brought back in.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum BoundaryPolicy {
    /// `c > 1` becomes `2 - c`, then `c` becomes `|c|`.
    ///
    /// The lower wall is handled only by the absolute value, so `-ε` maps to `ε`. This mirrors
    /// the upper wall for single excursions, but it is a consequence of the formula rather than
    /// a separately modeled reflection; revisit it before relying on the lower-wall law.
    #[default]
    Reflective,
    /// `c > 1` becomes exactly `0`, `c < 0` becomes exactly `1`.
    WrapToZero,
}

/// A per-agent perturbation vector.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Displacement {
    pub dx: f64,
    pub dy: f64,
}

impl Displacement {
    #[must_use]
    pub fn new(dx: f64, dy: f64) -> Displacement {
        Displacement { dx, dy }
    }
}

/// Folds a single coordinate back into `[0, 1]`.
///
/// Coordinates already in range are returned unchanged. For `Reflective`, the coordinate is
/// folded modulo 2 so excursions of any size land in range in constant time.
///
/// # Panics
///
/// Panics if `coordinate` is not finite.
#[must_use]
pub fn apply_boundary(policy: BoundaryPolicy, coordinate: f64) -> f64 {
    assert!(
        coordinate.is_finite(),
        "coordinate must be finite, got {coordinate}"
    );
    match policy {
        BoundaryPolicy::Reflective => {
            let folded = coordinate.abs().rem_euclid(2.0);
            if folded > 1.0 {
                2.0 - folded
            } else {
                folded
            }
        }
        BoundaryPolicy::WrapToZero => {
            if coordinate > 1.0 {
                0.0
            } else if coordinate < 0.0 {
                1.0
            } else {
                coordinate
            }
        }
    }
}

enum Perturbations {
    Resampled(Uniform<f64>),
    FixedDrift(Vec<Displacement>),
}

/// Advances every agent's position by one discrete step.
pub struct MovementModel {
    displacement_limit: f64,
    boundary_policy: BoundaryPolicy,
    perturbations: Perturbations,
}

impl MovementModel {
    /// Creates a movement model for a population of `population_size` agents. For
    /// `FixedDrift` the per-agent drift vectors are drawn here, from the movement stream.
    ///
    /// # Errors
    ///
    /// Returns `EpiwalkError::InvalidConfiguration` if `displacement_limit` is negative or
    /// not finite.
    pub fn new(
        displacement_limit: f64,
        mode: MovementMode,
        boundary_policy: BoundaryPolicy,
        population_size: usize,
        streams: &RandomStreams,
    ) -> Result<MovementModel, EpiwalkError> {
        validate_displacement_limit(displacement_limit)?;
        let uniform = Uniform::new_inclusive(-displacement_limit, displacement_limit)
            .map_err(|e| EpiwalkError::InvalidConfiguration(e.to_string()))?;

        let perturbations = match mode {
            MovementMode::Resampled => Perturbations::Resampled(uniform),
            MovementMode::FixedDrift => {
                trace!("drawing fixed drift for {population_size} agents");
                let drift = (0..population_size)
                    .map(|_| draw_displacement(streams, uniform))
                    .collect();
                Perturbations::FixedDrift(drift)
            }
        };

        Ok(MovementModel {
            displacement_limit,
            boundary_policy,
            perturbations,
        })
    }

    /// Creates a movement model from run parameters.
    ///
    /// # Errors
    ///
    /// Returns `EpiwalkError::InvalidConfiguration` if the displacement limit is invalid.
    pub fn from_parameters(
        parameters: &Parameters,
        streams: &RandomStreams,
    ) -> Result<MovementModel, EpiwalkError> {
        MovementModel::new(
            parameters.displacement_limit,
            parameters.movement_mode,
            parameters.boundary_policy,
            parameters.population_size,
            streams,
        )
    }

    #[must_use]
    pub fn mode(&self) -> MovementMode {
        match self.perturbations {
            Perturbations::Resampled(_) => MovementMode::Resampled,
            Perturbations::FixedDrift(_) => MovementMode::FixedDrift,
        }
    }

    #[must_use]
    pub fn boundary_policy(&self) -> BoundaryPolicy {
        self.boundary_policy
    }

    #[must_use]
    pub fn displacement_limit(&self) -> f64 {
        self.displacement_limit
    }

    /// The per-agent drift vectors, for `FixedDrift` models.
    #[must_use]
    pub fn drift(&self) -> Option<&[Displacement]> {
        match &self.perturbations {
            Perturbations::Resampled(_) => None,
            Perturbations::FixedDrift(drift) => Some(drift),
        }
    }

    /// Moves every agent by one step. Afterwards every coordinate lies in `[0, 1]`.
    ///
    /// # Panics
    ///
    /// Panics if a `FixedDrift` model is stepped with a population of a different size
    /// than the one it was created for.
    pub fn step(&self, population: &mut Population, streams: &RandomStreams) {
        match &self.perturbations {
            Perturbations::Resampled(uniform) => {
                let policy = self.boundary_policy;
                population.update_positions(|_, position| {
                    let displacement = draw_displacement(streams, *uniform);
                    *position = move_within_bounds(policy, *position, displacement);
                });
            }
            Perturbations::FixedDrift(drift) => self.displace(population, drift),
        }
    }

    /// Moves every agent by the given perturbation, one entry per agent in index order, and
    /// applies this model's boundary policy.
    ///
    /// # Panics
    ///
    /// Panics if `perturbations` does not have one entry per agent, or if an entry is not
    /// finite.
    pub fn displace(&self, population: &mut Population, perturbations: &[Displacement]) {
        assert_eq!(
            perturbations.len(),
            population.len(),
            "one perturbation per agent is required"
        );
        let policy = self.boundary_policy;
        population.update_positions(|index, position| {
            *position = move_within_bounds(policy, *position, perturbations[index]);
        });
    }
}

fn draw_displacement(streams: &RandomStreams, uniform: Uniform<f64>) -> Displacement {
    let dx = streams.sample_distr(MovementRng, uniform);
    let dy = streams.sample_distr(MovementRng, uniform);
    Displacement { dx, dy }
}

fn move_within_bounds(
    policy: BoundaryPolicy,
    position: Position,
    displacement: Displacement,
) -> Position {
    Position {
        x: apply_boundary(policy, position.x + displacement.dx),
        y: apply_boundary(policy, position.y + displacement.dy),
    }
}
