//! The agent population: positions and health states of a closed, fixed-size set of agents.
//!
//! Agents are identified by their index in `[0, N)`. Positions and states are stored as two
//! parallel vectors. The only way to move agents is through
//! [`MovementModel`](crate::movement::MovementModel), which rewrites every position as one
//! whole-population transform; observers read through a borrowed [`Snapshot`] and so can
//! never see a partially updated tick.
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoEnumIterator};

use crate::define_rng;
use crate::error::EpiwalkError;
use crate::log::{debug, trace};
use crate::parameters::validate_population_size;
use crate::random::RandomStreams;

define_rng!(PlacementRng);
define_rng!(PatientZeroRng);

/// The health state of an agent. The declaration order is the canonical display order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIter, Serialize, Deserialize,
)]
pub enum HealthState {
    Healthy,
    Infected,
    Cured,
    Deceased,
}

impl HealthState {
    /// The marker color used for this state when drawing a frame.
    #[must_use]
    pub fn color(self) -> &'static str {
        match self {
            HealthState::Healthy => "#81cc95",
            HealthState::Infected => "#ff8282",
            HealthState::Cured => "#8ceaff",
            HealthState::Deceased => "#000000",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            HealthState::Healthy => "healthy",
            HealthState::Infected => "infected",
            HealthState::Cured => "cured",
            HealthState::Deceased => "deceased",
        }
    }
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A point in the unit square.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Position {
        Position { x, y }
    }

    #[must_use]
    pub fn in_unit_square(&self) -> bool {
        (0.0..=1.0).contains(&self.x) && (0.0..=1.0).contains(&self.y)
    }
}

/// Number of agents in each health state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StateCounts {
    pub healthy: usize,
    pub infected: usize,
    pub cured: usize,
    pub deceased: usize,
}

impl StateCounts {
    pub fn from_states<'a>(states: impl IntoIterator<Item = &'a HealthState>) -> StateCounts {
        let mut counts = StateCounts::default();
        for state in states {
            *counts.get_mut(*state) += 1;
        }
        counts
    }

    #[must_use]
    pub fn get(&self, state: HealthState) -> usize {
        match state {
            HealthState::Healthy => self.healthy,
            HealthState::Infected => self.infected,
            HealthState::Cured => self.cured,
            HealthState::Deceased => self.deceased,
        }
    }

    fn get_mut(&mut self, state: HealthState) -> &mut usize {
        match state {
            HealthState::Healthy => &mut self.healthy,
            HealthState::Infected => &mut self.infected,
            HealthState::Cured => &mut self.cured,
            HealthState::Deceased => &mut self.deceased,
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        HealthState::iter().map(|state| self.get(state)).sum()
    }
}

/// The canonical, mutable state of all agents.
#[derive(Debug, Clone, PartialEq)]
pub struct Population {
    positions: Vec<Position>,
    health_states: Vec<HealthState>,
    patient_zero: Option<usize>,
    /// Number of movement steps applied since initialization.
    tick: u64,
}

impl Population {
    /// Creates `n` agents with uniform random positions in the unit square. One agent, chosen
    /// uniformly at random, starts `Infected`; all others start `Healthy`. Without a seed, one
    /// is drawn from OS entropy.
    ///
    /// # Errors
    ///
    /// Returns `EpiwalkError::InvalidConfiguration` if `n` is zero.
    pub fn initialize(n: usize, seed: Option<u64>) -> Result<Population, EpiwalkError> {
        let streams = RandomStreams::from_optional_seed(seed);
        debug!("initializing population with seed {}", streams.base_seed());
        Population::initialize_with(n, &streams)
    }

    /// Like [`Population::initialize`], but draws from the given random streams.
    ///
    /// # Errors
    ///
    /// Returns `EpiwalkError::InvalidConfiguration` if `n` is zero.
    pub fn initialize_with(n: usize, streams: &RandomStreams) -> Result<Population, EpiwalkError> {
        validate_population_size(n)?;

        let positions = streams.sample(PlacementRng, |rng| {
            (0..n)
                .map(|_| Position::new(rng.random(), rng.random()))
                .collect::<Vec<_>>()
        });
        let patient_zero = streams.sample_range(PatientZeroRng, 0..n);
        let mut health_states = vec![HealthState::Healthy; n];
        health_states[patient_zero] = HealthState::Infected;
        trace!("patient zero is agent {patient_zero}");

        Ok(Population {
            positions,
            health_states,
            patient_zero: Some(patient_zero),
            tick: 0,
        })
    }

    /// Builds a population from explicit agent data. The first `Infected` agent, if any, is
    /// reported as patient zero.
    ///
    /// # Errors
    ///
    /// Returns `EpiwalkError::InvalidConfiguration` if the population is empty, the two
    /// vectors differ in length, or a position lies outside the unit square.
    pub fn from_parts(
        positions: Vec<Position>,
        health_states: Vec<HealthState>,
    ) -> Result<Population, EpiwalkError> {
        validate_population_size(positions.len())?;
        if positions.len() != health_states.len() {
            return Err(EpiwalkError::InvalidConfiguration(format!(
                "{} positions but {} health states",
                positions.len(),
                health_states.len()
            )));
        }
        if let Some(index) = positions.iter().position(|p| !p.in_unit_square()) {
            return Err(EpiwalkError::InvalidConfiguration(format!(
                "agent {index} starts outside the unit square at {:?}",
                positions[index]
            )));
        }
        let patient_zero = health_states
            .iter()
            .position(|state| *state == HealthState::Infected);
        Ok(Population {
            positions,
            health_states,
            patient_zero,
            tick: 0,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    #[must_use]
    pub fn patient_zero(&self) -> Option<usize> {
        self.patient_zero
    }

    #[must_use]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    #[must_use]
    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    #[must_use]
    pub fn health_states(&self) -> &[HealthState] {
        &self.health_states
    }

    #[must_use]
    pub fn counts(&self) -> StateCounts {
        StateCounts::from_states(&self.health_states)
    }

    /// A read-only view of the current tick.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            tick: self.tick,
            positions: &self.positions,
            health_states: &self.health_states,
        }
    }

    /// Rewrites every agent's position and advances the tick counter.
    pub(crate) fn update_positions(&mut self, mut update: impl FnMut(usize, &mut Position)) {
        for (index, position) in self.positions.iter_mut().enumerate() {
            update(index, position);
        }
        self.tick += 1;
    }
}

/// An immutable, whole-population view of positions and states as of one tick.
///
/// A snapshot borrows the population, so the population cannot be stepped while a snapshot
/// is alive. Copy the data out (for example with `positions().to_vec()`) to keep it longer.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    tick: u64,
    positions: &'a [Position],
    health_states: &'a [HealthState],
}

impl<'a> Snapshot<'a> {
    /// Number of movement steps applied before this snapshot was taken.
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    #[must_use]
    pub fn positions(&self) -> &'a [Position] {
        self.positions
    }

    #[must_use]
    pub fn health_states(&self) -> &'a [HealthState] {
        self.health_states
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<(Position, HealthState)> {
        Some((*self.positions.get(index)?, *self.health_states.get(index)?))
    }

    /// Iterates over `(position, health_state)` pairs in agent index order.
    pub fn iter(&self) -> impl Iterator<Item = (Position, HealthState)> + 'a {
        self.positions
            .iter()
            .copied()
            .zip(self.health_states.iter().copied())
    }

    #[must_use]
    pub fn counts(&self) -> StateCounts {
        StateCounts::from_states(self.health_states)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_rejects_empty_population() {
        assert!(matches!(
            Population::initialize(0, Some(1)),
            Err(EpiwalkError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn initialize_has_single_patient_zero() {
        let population = Population::initialize(100, Some(42)).unwrap();
        assert_eq!(population.len(), 100);
        assert_eq!(population.tick(), 0);

        let counts = population.counts();
        assert_eq!(counts.infected, 1);
        assert_eq!(counts.healthy, 99);
        assert_eq!(counts.cured, 0);
        assert_eq!(counts.deceased, 0);

        let patient_zero = population.patient_zero().unwrap();
        assert_eq!(
            population.health_states()[patient_zero],
            HealthState::Infected
        );
    }

    #[test]
    fn initialize_places_agents_in_unit_square() {
        let population = Population::initialize(1000, Some(3)).unwrap();
        assert!(population.positions().iter().all(Position::in_unit_square));
    }

    #[test]
    fn single_agent_is_patient_zero() {
        let population = Population::initialize(1, None).unwrap();
        assert_eq!(population.patient_zero(), Some(0));
        assert_eq!(population.health_states(), &[HealthState::Infected]);
    }

    #[test]
    fn initialize_is_deterministic_with_seed() {
        let a = Population::initialize(50, Some(11)).unwrap();
        let b = Population::initialize(50, Some(11)).unwrap();
        assert_eq!(a, b);

        let c = Population::initialize(50, Some(12)).unwrap();
        assert_ne!(a.positions(), c.positions());
    }

    #[test]
    fn from_parts_validates() {
        assert!(Population::from_parts(vec![], vec![]).is_err());
        assert!(Population::from_parts(
            vec![Position::new(0.5, 0.5)],
            vec![HealthState::Healthy, HealthState::Cured]
        )
        .is_err());
        assert!(Population::from_parts(
            vec![Position::new(1.5, 0.5)],
            vec![HealthState::Healthy]
        )
        .is_err());

        let population = Population::from_parts(
            vec![Position::new(0.1, 0.2), Position::new(0.3, 0.4)],
            vec![HealthState::Cured, HealthState::Infected],
        )
        .unwrap();
        assert_eq!(population.patient_zero(), Some(1));
    }

    #[test]
    fn snapshot_reflects_population() {
        let population = Population::from_parts(
            vec![Position::new(0.1, 0.2), Position::new(0.3, 0.4)],
            vec![HealthState::Healthy, HealthState::Deceased],
        )
        .unwrap();
        let snapshot = population.snapshot();
        assert_eq!(snapshot.tick(), 0);
        assert_eq!(snapshot.len(), 2);
        assert_eq!(
            snapshot.get(1),
            Some((Position::new(0.3, 0.4), HealthState::Deceased))
        );
        assert_eq!(snapshot.get(2), None);
        let pairs: Vec<_> = snapshot.iter().collect();
        assert_eq!(pairs[0], (Position::new(0.1, 0.2), HealthState::Healthy));
        assert_eq!(snapshot.counts().total(), 2);
    }

    #[test]
    fn update_positions_advances_tick() {
        let mut population = Population::initialize(5, Some(1)).unwrap();
        population.update_positions(|_, position| *position = Position::new(0.5, 0.5));
        assert_eq!(population.tick(), 1);
        assert!(population
            .positions()
            .iter()
            .all(|p| *p == Position::new(0.5, 0.5)));
    }

    #[test]
    fn health_state_palette() {
        let colors: Vec<_> = HealthState::iter().map(HealthState::color).collect();
        assert_eq!(colors, vec!["#81cc95", "#ff8282", "#8ceaff", "#000000"]);
        assert_eq!(HealthState::Infected.to_string(), "infected");
    }

    // Patient zero must be uniform over the population. 10,000 seeds over 100 agents gives an
    // expected count of 100 per index; the chi-square statistic has 99 degrees of freedom, and
    // its 99.99th percentile is about 160.
    #[test]
    fn patient_zero_is_uniform() {
        let n = 100;
        let trials = 10_000_u64;
        let mut observed = vec![0_u64; n];
        for seed in 0..trials {
            let population = Population::initialize(n, Some(seed)).unwrap();
            observed[population.patient_zero().unwrap()] += 1;
        }
        #[allow(clippy::cast_precision_loss)]
        let expected = trials as f64 / n as f64;
        #[allow(clippy::cast_precision_loss)]
        let chi_square: f64 = observed
            .iter()
            .map(|&count| {
                let diff = count as f64 - expected;
                diff * diff / expected
            })
            .sum();
        assert!(chi_square < 160.0, "chi-square statistic {chi_square}");
    }
}
