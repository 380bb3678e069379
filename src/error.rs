use std::fmt::{self, Debug, Display};
use std::io;

/// Provides `EpiwalkError` and maps other errors to
/// convert to an `EpiwalkError`
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub enum EpiwalkError {
    IoError(io::Error),
    JsonError(serde_json::Error),
    CsvError(csv::Error),
    /// The simulation cannot start with the supplied parameters.
    InvalidConfiguration(String),
    ReportError(String),
    /// A frame callback returned an error and the run was configured to abort.
    CallbackFailed {
        tick: u64,
        message: String,
    },
    EpiwalkError(String),
}

impl From<io::Error> for EpiwalkError {
    fn from(error: io::Error) -> Self {
        EpiwalkError::IoError(error)
    }
}

impl From<serde_json::Error> for EpiwalkError {
    fn from(error: serde_json::Error) -> Self {
        EpiwalkError::JsonError(error)
    }
}

impl From<csv::Error> for EpiwalkError {
    fn from(error: csv::Error) -> Self {
        EpiwalkError::CsvError(error)
    }
}

impl From<String> for EpiwalkError {
    fn from(error: String) -> Self {
        EpiwalkError::EpiwalkError(error)
    }
}

impl From<&str> for EpiwalkError {
    fn from(error: &str) -> Self {
        EpiwalkError::EpiwalkError(error.to_string())
    }
}

impl std::error::Error for EpiwalkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EpiwalkError::IoError(error) => Some(error),
            EpiwalkError::JsonError(error) => Some(error),
            EpiwalkError::CsvError(error) => Some(error),
            _ => None,
        }
    }
}

impl Display for EpiwalkError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EpiwalkError::InvalidConfiguration(message) => {
                write!(f, "Invalid configuration: {message}")
            }
            EpiwalkError::ReportError(message) => write!(f, "Report error: {message}"),
            EpiwalkError::CallbackFailed { tick, message } => {
                write!(f, "Frame callback failed at tick {tick}: {message}")
            }
            _ => write!(f, "Error: {self:?}"),
        }
    }
}
