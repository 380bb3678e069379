//! Groups a [`Snapshot`] by health state.
//!
//! The result is sparse: a state with no agents has no entry at all, so a consumer iterating
//! the partition never issues an empty draw call.
use std::collections::BTreeMap;

use crate::population::{HealthState, Position, Snapshot, StateCounts};

/// Agent positions grouped by health state. Iteration follows the canonical state order
/// (`Healthy`, `Infected`, `Cured`, `Deceased`); within a group, positions follow agent index
/// order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatePartition {
    groups: BTreeMap<HealthState, Vec<Position>>,
}

impl StatePartition {
    /// Positions of the agents in `state`, or `None` if no agent is in that state.
    #[must_use]
    pub fn get(&self, state: HealthState) -> Option<&[Position]> {
        self.groups.get(&state).map(Vec::as_slice)
    }

    #[must_use]
    pub fn contains(&self, state: HealthState) -> bool {
        self.groups.contains_key(&state)
    }

    pub fn iter(&self) -> impl Iterator<Item = (HealthState, &[Position])> {
        self.groups
            .iter()
            .map(|(state, positions)| (*state, positions.as_slice()))
    }

    pub fn states(&self) -> impl Iterator<Item = HealthState> + '_ {
        self.groups.keys().copied()
    }

    /// Number of non-empty groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total number of agents across all groups.
    #[must_use]
    pub fn total(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn counts(&self) -> StateCounts {
        let mut counts = StateCounts::default();
        for (state, positions) in &self.groups {
            match state {
                HealthState::Healthy => counts.healthy = positions.len(),
                HealthState::Infected => counts.infected = positions.len(),
                HealthState::Cured => counts.cured = positions.len(),
                HealthState::Deceased => counts.deceased = positions.len(),
            }
        }
        counts
    }
}

impl<'a> IntoIterator for &'a StatePartition {
    type Item = (&'a HealthState, &'a Vec<Position>);
    type IntoIter = std::collections::btree_map::Iter<'a, HealthState, Vec<Position>>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.iter()
    }
}

/// Groups agent positions by their current health state, preserving index order within each
/// group and omitting states with no members.
#[must_use]
pub fn partition_by_state(snapshot: &Snapshot) -> StatePartition {
    let mut groups: BTreeMap<HealthState, Vec<Position>> = BTreeMap::new();
    for (position, state) in snapshot.iter() {
        groups.entry(state).or_default().push(position);
    }
    StatePartition { groups }
}
