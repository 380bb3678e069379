pub use crate::classifier::{partition_by_state, StatePartition};
pub use crate::driver::{RunOptions, RunSummary, Simulation, StopHandle, StopReason};
pub use crate::error::EpiwalkError;
pub use crate::log::{debug, error, info, trace, warn};
pub use crate::movement::{BoundaryPolicy, Displacement, MovementMode, MovementModel};
pub use crate::parameters::{CallbackFailurePolicy, Parameters};
pub use crate::population::{HealthState, Population, Position, Snapshot, StateCounts};
pub use crate::random::RandomStreams;
pub use crate::report::{FrameReport, Reports, StateCountReport};
pub use crate::{define_report, define_rng};
