use std::path::PathBuf;

use clap::{Args, Command, FromArgMatches as _};

use crate::driver::{RunSummary, Simulation};
use crate::error::EpiwalkError;
use crate::log::{debug, LogLevelSpec};
use crate::movement::{BoundaryPolicy, MovementMode};
use crate::parameters::{CallbackFailurePolicy, Parameters};
use crate::population::Snapshot;
use crate::report::{FrameReport, ReportOptions, Reports, StateCountReport};

/// A frame callback registered by the setup function passed to the runner.
pub type FrameCallback = Box<dyn FnMut(Snapshot<'_>) -> Result<(), EpiwalkError>>;

/// Default cli arguments for the epiwalk runner. Values given here override the config file.
#[derive(Args, Debug, Default)]
pub struct BaseArgs {
    /// Random seed. Drawn from OS entropy if omitted
    #[arg(short, long)]
    pub random_seed: Option<u64>,

    /// Optional path for a JSON parameters file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Optional directory for report output. Reports are only written when this is set
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Optional prefix for report files
    #[arg(long, default_value = "")]
    pub file_prefix: String,

    /// Overwrite existing report files
    #[arg(short, long)]
    pub force_overwrite: bool,

    /// Also write one report row per agent per tick
    #[arg(long)]
    pub frames: bool,

    /// Enable logging: a level (`info`) or module filters (`epiwalk::driver=trace,warn`)
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Stop after this many ticks
    #[arg(short = 't', long)]
    pub max_ticks: Option<u64>,

    /// Number of agents
    #[arg(short = 'n', long)]
    pub population_size: Option<usize>,

    /// Largest perturbation per coordinate per tick
    #[arg(long)]
    pub displacement: Option<f64>,

    #[arg(long, value_enum)]
    pub movement_mode: Option<MovementMode>,

    #[arg(long, value_enum)]
    pub boundary_policy: Option<BoundaryPolicy>,

    /// Milliseconds between ticks
    #[arg(long, conflicts_with = "no_pacing")]
    pub interval_ms: Option<u64>,

    /// Run ticks back to back with no pacing
    #[arg(long)]
    pub no_pacing: bool,

    /// Log frame callback failures and keep running instead of stopping
    #[arg(long)]
    pub continue_on_callback_error: bool,
}

impl BaseArgs {
    /// Resolves the run parameters: the config file (or defaults) with command line overrides
    /// applied on top.
    ///
    /// # Errors
    ///
    /// Returns an `EpiwalkError` if the config file cannot be loaded or the resulting
    /// parameters are invalid.
    pub fn parameters(&self) -> Result<Parameters, EpiwalkError> {
        let mut parameters = match &self.config {
            Some(path) => {
                println!("Loading parameters from: {}", path.display());
                Parameters::load(path)?
            }
            None => Parameters::default(),
        };

        if let Some(seed) = self.random_seed {
            parameters.seed = Some(seed);
        }
        if let Some(max_ticks) = self.max_ticks {
            parameters.max_ticks = Some(max_ticks);
        }
        if let Some(population_size) = self.population_size {
            parameters.population_size = population_size;
        }
        if let Some(displacement) = self.displacement {
            parameters.displacement_limit = displacement;
        }
        if let Some(movement_mode) = self.movement_mode {
            parameters.movement_mode = movement_mode;
        }
        if let Some(boundary_policy) = self.boundary_policy {
            parameters.boundary_policy = boundary_policy;
        }
        if let Some(interval_ms) = self.interval_ms {
            parameters.tick_interval_ms = Some(interval_ms);
        }
        if self.no_pacing {
            parameters.tick_interval_ms = None;
        }
        if self.continue_on_callback_error {
            parameters.callback_failure_policy = CallbackFailurePolicy::LogAndContinue;
        }

        parameters.validate()?;
        Ok(parameters)
    }

    fn report_options(&self) -> Option<ReportOptions> {
        let directory = self.output_dir.clone()?;
        Some(ReportOptions {
            file_prefix: self.file_prefix.clone(),
            directory,
            overwrite: self.force_overwrite,
        })
    }
}

#[derive(Args)]
pub struct PlaceholderCustom {}

fn create_epiwalk_cli() -> Command {
    let cli = Command::new("epiwalk");
    BaseArgs::augment_args(cli)
}

/// Runs a simulation with custom cli arguments.
///
/// This function allows you to define custom arguments and a setup function
///
/// # Parameters
/// - `setup_fn`: A function that takes a mutable reference to the `Simulation`, the `BaseArgs`
///   struct, and an `Option<A>` where `A` is the custom cli arguments struct. It may return a
///   frame callback that is invoked after the built-in reports every tick.
///
/// # Errors
/// Returns an error if argument parsing, setup, or the run fails
pub fn run_with_custom_args<A, F>(setup_fn: F) -> Result<RunSummary, Box<dyn std::error::Error>>
where
    A: Args,
    F: FnOnce(&mut Simulation, &BaseArgs, Option<A>) -> Result<Option<FrameCallback>, EpiwalkError>,
{
    let mut cli = create_epiwalk_cli();
    cli = A::augment_args(cli);
    let matches = cli.get_matches();

    let base_args_matches = BaseArgs::from_arg_matches(&matches)?;
    let custom_matches = A::from_arg_matches(&matches)?;
    run_with_args_internal(&base_args_matches, Some(custom_matches), setup_fn)
}

/// Runs a simulation with default cli arguments
///
/// # Errors
/// Returns an error if argument parsing, setup, or the run fails
pub fn run_with_args<F>(setup_fn: F) -> Result<RunSummary, Box<dyn std::error::Error>>
where
    F: FnOnce(
        &mut Simulation,
        &BaseArgs,
        Option<PlaceholderCustom>,
    ) -> Result<Option<FrameCallback>, EpiwalkError>,
{
    let cli = create_epiwalk_cli();
    let matches = cli.get_matches();

    let base_args_matches = BaseArgs::from_arg_matches(&matches)?;
    run_with_args_internal(&base_args_matches, None, setup_fn)
}

fn run_with_args_internal<A, F>(
    args: &BaseArgs,
    custom_args: Option<A>,
    setup_fn: F,
) -> Result<RunSummary, Box<dyn std::error::Error>>
where
    F: FnOnce(&mut Simulation, &BaseArgs, Option<A>) -> Result<Option<FrameCallback>, EpiwalkError>,
{
    if let Some(log_level) = &args.log_level {
        log_level.parse::<LogLevelSpec>()?.apply();
    }

    let parameters = args.parameters()?;
    let mut simulation = Simulation::new(&parameters)?;

    // Optionally set up reports
    let mut reports = Reports::default();
    if let Some(options) = args.report_options() {
        reports = Reports::new(options);
        reports.add_report::<StateCountReport>("state_counts")?;
        if args.frames {
            reports.add_report::<FrameReport>("frames")?;
        }
    }

    // Run the provided Fn
    let mut frame_callback = setup_fn(&mut simulation, args, custom_args)?;

    let summary = simulation.run(|snapshot| -> Result<(), EpiwalkError> {
        debug!("tick {}: {:?}", snapshot.tick(), snapshot.counts());
        reports.record_tick(&snapshot)?;
        match frame_callback.as_mut() {
            Some(callback) => callback(snapshot),
            None => Ok(()),
        }
    })?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::StopReason;
    use std::cell::Cell;
    use std::io::Write;
    use std::rc::Rc;
    use tempfile::{tempdir, NamedTempFile};

    fn headless_args() -> BaseArgs {
        BaseArgs {
            random_seed: Some(42),
            max_ticks: Some(5),
            population_size: Some(20),
            no_pacing: true,
            ..BaseArgs::default()
        }
    }

    #[test]
    fn test_run_with_overrides() {
        let args = headless_args();
        let summary = run_with_args_internal(&args, None, |simulation, _, _: Option<()>| {
            assert_eq!(simulation.population().len(), 20);
            assert_eq!(simulation.base_seed(), 42);
            assert_eq!(simulation.options().interval, None);
            Ok(None)
        })
        .unwrap();
        assert_eq!(summary.ticks, 5);
        assert_eq!(summary.stop_reason, StopReason::MaxTicks);
    }

    #[test]
    fn test_run_with_frame_callback() {
        let args = headless_args();
        let frames = Rc::new(Cell::new(0));
        let counter = Rc::clone(&frames);
        run_with_args_internal(&args, None, move |_, _, _: Option<()>| {
            let callback: FrameCallback = Box::new(move |snapshot: Snapshot<'_>| {
                assert_eq!(snapshot.len(), 20);
                counter.set(counter.get() + 1);
                Ok(())
            });
            Ok(Some(callback))
        })
        .unwrap();
        assert_eq!(frames.get(), 5);
    }

    #[test]
    fn test_run_with_custom() {
        #[derive(Debug)]
        struct Custom {
            field: u32,
        }
        let args = headless_args();
        let result = run_with_args_internal(&args, Some(Custom { field: 42 }), |_, _, c| {
            assert_eq!(c.unwrap().field, 42);
            Ok(None)
        });
        assert!(result.is_ok());
    }

    #[test]
    fn test_setup_error_stops_run() {
        let args = headless_args();
        let result = run_with_args_internal(&args, None, |_, _, _: Option<()>| {
            Err(EpiwalkError::from("setup failed"))
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_run_with_config_path() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(br#"{ "population_size": 7, "boundary_policy": "WrapToZero" }"#)
            .unwrap();
        let args = BaseArgs {
            config: Some(file.path().to_path_buf()),
            ..headless_args()
        };
        let parameters = args.parameters().unwrap();
        // Command line values win over the file
        assert_eq!(parameters.population_size, 20);
        assert_eq!(parameters.boundary_policy, BoundaryPolicy::WrapToZero);
        assert_eq!(parameters.seed, Some(42));
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let args = BaseArgs {
            displacement: Some(-1.0),
            ..headless_args()
        };
        assert!(matches!(
            args.parameters(),
            Err(EpiwalkError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_run_with_output_dir() {
        let temp_dir = tempdir().unwrap();
        let args = BaseArgs {
            output_dir: Some(temp_dir.path().to_path_buf()),
            file_prefix: "test_".to_string(),
            frames: true,
            ..headless_args()
        };
        run_with_args_internal(&args, None, |_, _, _: Option<()>| Ok(None)).unwrap();

        let mut reader =
            csv::Reader::from_path(temp_dir.path().join("test_state_counts.csv")).unwrap();
        let rows: Vec<StateCountReport> = reader.deserialize().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 5);
        assert!(rows.iter().all(|row| row.infected == 1 && row.healthy == 19));

        let mut reader = csv::Reader::from_path(temp_dir.path().join("test_frames.csv")).unwrap();
        assert_eq!(reader.deserialize::<FrameReport>().count(), 100);
    }

    #[test]
    fn test_bad_log_level() {
        let args = BaseArgs {
            log_level: Some("chatty".to_string()),
            ..headless_args()
        };
        assert!(run_with_args_internal(&args, None, |_, _, _: Option<()>| Ok(None)).is_err());
    }
}
