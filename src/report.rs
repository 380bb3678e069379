//! CSV reports of per-tick simulation data.
//!
//! A report is a `Serialize` row type registered with [`define_report!`]. Each registered
//! report type is written to its own file, `<directory>/<file_prefix><short_name>.csv`.
//! Two reports are provided: [`StateCountReport`] (one row per tick) and [`FrameReport`]
//! (one row per agent per tick).
use std::any::TypeId;
use std::cell::RefCell;
use std::fs::{create_dir_all, File};
use std::path::{Path, PathBuf};

use csv::Writer;
use serde::{Deserialize, Serialize};

use crate::error::EpiwalkError;
use crate::hashing::HashMap;
use crate::log::{info, trace};
use crate::population::{HealthState, Snapshot};

pub trait Report: 'static {
    // Returns report type
    fn type_id(&self) -> TypeId;
    // Serializes the data with the correct writer
    fn serialize(&self, writer: &mut Writer<File>) -> Result<(), EpiwalkError>;
}

/// Use this macro to define a unique report type
#[macro_export]
macro_rules! define_report {
    ($name:ident) => {
        impl $crate::report::Report for $name {
            fn type_id(&self) -> std::any::TypeId {
                std::any::TypeId::of::<$name>()
            }

            fn serialize(
                &self,
                writer: &mut csv::Writer<std::fs::File>,
            ) -> Result<(), $crate::error::EpiwalkError> {
                writer.serialize(self)?;
                Ok(())
            }
        }
    };
}
pub use define_report;

/// One row per tick with the number of agents in each state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateCountReport {
    pub tick: u64,
    pub healthy: usize,
    pub infected: usize,
    pub cured: usize,
    pub deceased: usize,
}
define_report!(StateCountReport);

impl StateCountReport {
    #[must_use]
    pub fn from_snapshot(snapshot: &Snapshot) -> StateCountReport {
        let counts = snapshot.counts();
        StateCountReport {
            tick: snapshot.tick(),
            healthy: counts.healthy,
            infected: counts.infected,
            cured: counts.cured,
            deceased: counts.deceased,
        }
    }
}

/// One row per agent per tick, enough for an external renderer to replay the run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameReport {
    pub tick: u64,
    pub agent: usize,
    pub x: f64,
    pub y: f64,
    pub state: HealthState,
}
define_report!(FrameReport);

#[derive(Debug, Clone, PartialEq)]
pub struct ReportOptions {
    pub file_prefix: String,
    pub directory: PathBuf,
    pub overwrite: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        ReportOptions {
            file_prefix: String::new(),
            directory: PathBuf::from("."),
            overwrite: false,
        }
    }
}

impl ReportOptions {
    pub fn file_prefix(&mut self, file_prefix: String) -> &mut ReportOptions {
        self.file_prefix = file_prefix;
        self
    }

    pub fn directory(&mut self, directory: PathBuf) -> &mut ReportOptions {
        self.directory = directory;
        self
    }

    pub fn overwrite(&mut self, overwrite: bool) -> &mut ReportOptions {
        self.overwrite = overwrite;
        self
    }
}

// Checks that the path is valid. Creates the file and all parent directories if
// they do not exist. Returns the file if successful.
fn generate_validate_filepath(path: &Path, overwrite: bool) -> Result<File, EpiwalkError> {
    if path.extension().and_then(|ext| ext.to_str()) != Some("csv") {
        return Err(EpiwalkError::ReportError(
            "Report output files must be CSVs at this time".to_string(),
        ));
    }
    if path.exists() && !overwrite {
        return Err(EpiwalkError::ReportError(format!(
            "{} already exists; set overwrite to replace it",
            path.display()
        )));
    }
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    Ok(File::create(path)?)
}

/// Open report writers, keyed by report type.
#[derive(Default)]
pub struct Reports {
    options: ReportOptions,
    file_writers: RefCell<HashMap<TypeId, Writer<File>>>,
}

impl Reports {
    #[must_use]
    pub fn new(options: ReportOptions) -> Reports {
        Reports {
            options,
            file_writers: RefCell::new(HashMap::default()),
        }
    }

    pub fn options(&mut self) -> &mut ReportOptions {
        &mut self.options
    }

    /// The path a report registered under `short_name` is written to.
    #[must_use]
    pub fn report_path(&self, short_name: &str) -> PathBuf {
        self.options
            .directory
            .join(format!("{}{short_name}.csv", self.options.file_prefix))
    }

    /// Opens the output file for report type `T`.
    ///
    /// # Errors
    ///
    /// Returns an `EpiwalkError` if the file exists and overwriting is off, or if it cannot
    /// be created.
    pub fn add_report<T: Report>(&mut self, short_name: &str) -> Result<(), EpiwalkError> {
        let path = self.report_path(short_name);
        trace!("adding report {short_name} at {}", path.display());
        let file = generate_validate_filepath(&path, self.options.overwrite)?;
        self.file_writers
            .get_mut()
            .insert(TypeId::of::<T>(), Writer::from_writer(file));
        info!("writing {short_name} report to {}", path.display());
        Ok(())
    }

    #[must_use]
    pub fn has_report<T: Report>(&self) -> bool {
        self.file_writers.borrow().contains_key(&TypeId::of::<T>())
    }

    /// Writes one row to the file associated with the report's type.
    ///
    /// # Errors
    ///
    /// Returns an `EpiwalkError` if no report of this type was added or the write fails.
    pub fn send_report<T: Report>(&self, report: T) -> Result<(), EpiwalkError> {
        let mut writers = self.file_writers.borrow_mut();
        let writer = writers
            .get_mut(&report.type_id())
            .ok_or_else(|| {
                EpiwalkError::ReportError("No writer found for the report type".into())
            })?;
        report.serialize(writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Writes one `FrameReport` row per agent in `snapshot`.
    ///
    /// # Errors
    ///
    /// Returns an `EpiwalkError` if `FrameReport` was not added or the write fails.
    pub fn send_frame(&self, snapshot: &Snapshot) -> Result<(), EpiwalkError> {
        let mut writers = self.file_writers.borrow_mut();
        let writer = writers
            .get_mut(&TypeId::of::<FrameReport>())
            .ok_or_else(|| {
                EpiwalkError::ReportError("No writer found for the report type".into())
            })?;
        for (agent, (position, state)) in snapshot.iter().enumerate() {
            let row = FrameReport {
                tick: snapshot.tick(),
                agent,
                x: position.x,
                y: position.y,
                state,
            };
            Report::serialize(&row, writer)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Records every registered built-in report for one tick.
    ///
    /// # Errors
    ///
    /// Returns an `EpiwalkError` if a write fails.
    pub fn record_tick(&self, snapshot: &Snapshot) -> Result<(), EpiwalkError> {
        if self.has_report::<StateCountReport>() {
            self.send_report(StateCountReport::from_snapshot(snapshot))?;
        }
        if self.has_report::<FrameReport>() {
            self.send_frame(snapshot)?;
        }
        Ok(())
    }
}
