//! The simulation clock.
//!
//! A [`Simulation`] owns the population, the movement model and the random streams, and
//! drives the tick loop. Each tick fully completes (movement, then the frame callback) before
//! the next begins. The loop ends when `max_ticks` is reached or when a [`StopHandle`] is
//! triggered; cancellation is checked between ticks, never in the middle of one.
use std::fmt::{self, Display};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use humantime::format_duration;
use serde::Serialize;

use crate::error::EpiwalkError;
use crate::log::{debug, info, trace, warn};
use crate::movement::MovementModel;
use crate::parameters::{CallbackFailurePolicy, Parameters};
use crate::population::{Population, Snapshot};
use crate::random::RandomStreams;

/// A cloneable, thread-safe cancellation flag for a running simulation.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    stopped: Arc<AtomicBool>,
}

impl StopHandle {
    #[must_use]
    pub fn new() -> StopHandle {
        StopHandle::default()
    }

    /// Requests that the loop end before its next tick.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// Controls the cadence and termination of [`Simulation::run`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunOptions {
    /// Minimum wall-clock time between the starts of consecutive ticks. `None` runs the loop
    /// as fast as possible.
    pub interval: Option<Duration>,
    pub max_ticks: Option<u64>,
    pub callback_failure_policy: CallbackFailurePolicy,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions::from(&Parameters::default())
    }
}

impl From<&Parameters> for RunOptions {
    fn from(parameters: &Parameters) -> Self {
        RunOptions {
            interval: parameters.tick_interval(),
            max_ticks: parameters.max_ticks,
            callback_failure_policy: parameters.callback_failure_policy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopReason {
    MaxTicks,
    Cancelled,
}

/// Returned by [`Simulation::run`] when the loop ends without an aborting callback failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Ticks executed by this call to `run`.
    pub ticks: u64,
    pub stop_reason: StopReason,
    /// Callback failures that were logged and skipped.
    pub isolated_failures: u64,
    pub wall_time: Duration,
}

impl Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} ticks in {} ({:?}",
            self.ticks,
            format_duration(self.wall_time),
            self.stop_reason
        )?;
        if self.isolated_failures > 0 {
            write!(f, ", {} failed frames skipped", self.isolated_failures)?;
        }
        write!(f, ")")
    }
}

pub struct Simulation {
    population: Population,
    movement: MovementModel,
    streams: RandomStreams,
    options: RunOptions,
    stop_handle: StopHandle,
}

impl Simulation {
    /// Builds a simulation from run parameters. Nothing is started if the parameters are
    /// invalid.
    ///
    /// # Errors
    ///
    /// Returns `EpiwalkError::InvalidConfiguration` if the parameters fail validation.
    pub fn new(parameters: &Parameters) -> Result<Simulation, EpiwalkError> {
        parameters.validate()?;
        let streams = RandomStreams::from_optional_seed(parameters.seed);
        info!(
            "starting simulation of {} agents with seed {}",
            parameters.population_size,
            streams.base_seed()
        );
        let population = Population::initialize_with(parameters.population_size, &streams)?;
        let movement = MovementModel::from_parameters(parameters, &streams)?;
        Ok(Simulation::from_parts(
            population,
            movement,
            streams,
            RunOptions::from(parameters),
        ))
    }

    /// Assembles a simulation from already constructed parts.
    #[must_use]
    pub fn from_parts(
        population: Population,
        movement: MovementModel,
        streams: RandomStreams,
        options: RunOptions,
    ) -> Simulation {
        Simulation {
            population,
            movement,
            streams,
            options,
            stop_handle: StopHandle::new(),
        }
    }

    #[must_use]
    pub fn population(&self) -> &Population {
        &self.population
    }

    #[must_use]
    pub fn movement(&self) -> &MovementModel {
        &self.movement
    }

    #[must_use]
    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    #[must_use]
    pub fn base_seed(&self) -> u64 {
        self.streams.base_seed()
    }

    #[must_use]
    pub fn snapshot(&self) -> Snapshot<'_> {
        self.population.snapshot()
    }

    /// A handle that stops [`Simulation::run`] before its next tick. It may be moved into the
    /// frame callback or to another thread.
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        self.stop_handle.clone()
    }

    /// Advances one tick and returns the resulting snapshot.
    pub fn step(&mut self) -> Snapshot<'_> {
        self.movement.step(&mut self.population, &self.streams);
        trace!("tick {} complete", self.population.tick());
        self.population.snapshot()
    }

    /// Runs the tick loop, calling `on_tick` with the post-movement snapshot of every tick.
    ///
    /// A slow callback delays the next tick; ticks are never skipped or run back to back to
    /// catch up.
    ///
    /// # Errors
    ///
    /// Returns `EpiwalkError::CallbackFailed` if `on_tick` fails and the callback failure
    /// policy is `Abort`.
    pub fn run<F, E>(&mut self, mut on_tick: F) -> Result<RunSummary, EpiwalkError>
    where
        F: FnMut(Snapshot<'_>) -> Result<(), E>,
        E: Display,
    {
        let RunOptions {
            interval,
            max_ticks,
            callback_failure_policy,
        } = self.options;
        debug!("running with interval {interval:?} and max ticks {max_ticks:?}");

        let start = Instant::now();
        let mut next_tick_at = start;
        let mut ticks: u64 = 0;
        let mut isolated_failures: u64 = 0;

        let stop_reason = loop {
            if max_ticks.is_some_and(|max_ticks| ticks >= max_ticks) {
                break StopReason::MaxTicks;
            }
            if let Some(interval) = interval {
                let now = Instant::now();
                if next_tick_at > now {
                    thread::sleep(next_tick_at - now);
                }
                next_tick_at = next_tick_at.max(Instant::now()) + interval;
            }
            if self.stop_handle.is_stopped() {
                break StopReason::Cancelled;
            }

            let snapshot = self.step();
            let tick = snapshot.tick();
            ticks += 1;
            if let Err(e) = on_tick(snapshot) {
                match callback_failure_policy {
                    CallbackFailurePolicy::Abort => {
                        return Err(EpiwalkError::CallbackFailed {
                            tick,
                            message: e.to_string(),
                        });
                    }
                    CallbackFailurePolicy::LogAndContinue => {
                        warn!("frame callback failed at tick {tick}: {e}");
                        isolated_failures += 1;
                    }
                }
            }
        };

        let summary = RunSummary {
            ticks,
            stop_reason,
            isolated_failures,
            wall_time: start.elapsed(),
        };
        info!("simulation finished: {summary}");
        Ok(summary)
    }
}
