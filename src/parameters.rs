//! Run configuration.
//!
//! [`Parameters`] collects every input accepted at simulation start. It can be built in code,
//! loaded from a JSON file, or assembled by the command line runner. Fields missing from a file
//! take their default values.
//!
//! ```json
//! {
//!     "population_size": 200,
//!     "displacement_limit": 0.01,
//!     "movement_mode": "FixedDrift",
//!     "boundary_policy": "WrapToZero",
//!     "seed": 42
//! }
//! ```
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::EpiwalkError;
use crate::movement::{BoundaryPolicy, MovementMode};

pub const DEFAULT_POPULATION_SIZE: usize = 100;
pub const DEFAULT_DISPLACEMENT_LIMIT: f64 = 0.005;
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 25;

/// What the tick driver does when the frame callback returns an error.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallbackFailurePolicy {
    /// End the run and return the callback's error.
    #[default]
    Abort,
    /// Log the failure and continue with the next tick.
    LogAndContinue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Parameters {
    pub population_size: usize,
    /// Each perturbation component is drawn from `[-displacement_limit, displacement_limit]`.
    pub displacement_limit: f64,
    pub movement_mode: MovementMode,
    pub boundary_policy: BoundaryPolicy,
    /// Wall-clock time between ticks. `None` runs as fast as possible.
    pub tick_interval_ms: Option<u64>,
    /// Base seed for every random stream. `None` draws one from OS entropy.
    pub seed: Option<u64>,
    /// Stop after this many ticks. `None` runs until cancelled.
    pub max_ticks: Option<u64>,
    pub callback_failure_policy: CallbackFailurePolicy,
}

impl Default for Parameters {
    fn default() -> Self {
        Parameters {
            population_size: DEFAULT_POPULATION_SIZE,
            displacement_limit: DEFAULT_DISPLACEMENT_LIMIT,
            movement_mode: MovementMode::default(),
            boundary_policy: BoundaryPolicy::default(),
            tick_interval_ms: Some(DEFAULT_TICK_INTERVAL_MS),
            seed: None,
            max_ticks: None,
            callback_failure_policy: CallbackFailurePolicy::default(),
        }
    }
}

impl Parameters {
    /// Reads parameters from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an `EpiwalkError` if the file cannot be read or parsed, or if the
    /// parameters it contains are invalid.
    pub fn load(path: &Path) -> Result<Parameters, EpiwalkError> {
        let contents = fs::read_to_string(path)?;
        let parameters: Parameters = serde_json::from_str(&contents)?;
        parameters.validate()?;
        Ok(parameters)
    }

    /// Checks the parameters that would otherwise make a run meaningless.
    ///
    /// # Errors
    ///
    /// Returns `EpiwalkError::InvalidConfiguration` if the population is empty or the
    /// displacement limit is negative or not finite.
    pub fn validate(&self) -> Result<(), EpiwalkError> {
        validate_population_size(self.population_size)?;
        validate_displacement_limit(self.displacement_limit)?;
        Ok(())
    }

    #[must_use]
    pub fn tick_interval(&self) -> Option<Duration> {
        self.tick_interval_ms.map(Duration::from_millis)
    }
}

pub(crate) fn validate_population_size(population_size: usize) -> Result<(), EpiwalkError> {
    if population_size == 0 {
        return Err(EpiwalkError::InvalidConfiguration(
            "population size must be positive".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn validate_displacement_limit(displacement_limit: f64) -> Result<(), EpiwalkError> {
    if !displacement_limit.is_finite() || displacement_limit < 0.0 {
        return Err(EpiwalkError::InvalidConfiguration(format!(
            "displacement limit must be a non-negative number, got {displacement_limit}"
        )));
    }
    Ok(())
}
