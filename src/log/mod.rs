//! The `log` module defines an interface to Epiwalk's logging facilities. Log messages describe
//! the internal behavior of a run (seeding, pacing, isolated callback failures). This is not to
//! be confused with _reporting_, which records per-tick simulation data to CSV files.
//!
//! This module (re)exports the five logging macros: `error!`, `warn!`, `info!`, `debug!` and
//! `trace!` where `error!` represents the highest-priority log messages and `trace!` the lowest.
//!
//! ```rust
//! use epiwalk::info;
//!
//! pub fn announce(tick: u64) {
//!     info!("tick {tick} rendered");
//! }
//! ```
//!
//! Logging is _disabled_ by default. The `epiwalk` binary enables it with the command line
//! option `--log-level <level>`. Logging can also be controlled from code:
//!
//!  - `enable_logging()`: turns on all log messages
//!  - `disable_logging()`: turns off all log messages
//!  - `set_log_level(level: LevelFilter)`: enables only log messages with priority at least `level`
//!
//! Per-module filtering is configured with `set_module_filter()` / `set_module_filters()` and
//! `remove_module_filter()`:
//!
//! ```rust
//! use epiwalk::log::{set_module_filter, set_log_level, LevelFilter};
//!
//! pub fn setup_logging() {
//!     // Enable `info` log messages globally.
//!     set_log_level(LevelFilter::Info);
//!     // Silence per-stream seeding messages.
//!     set_module_filter("epiwalk::random", LevelFilter::Off);
//! }
//! ```
#[cfg(feature = "logging")]
mod standard_logger;

#[cfg(not(feature = "logging"))]
mod null_logger;

use std::collections::hash_map::Entry;
use std::str::FromStr;
use std::sync::LazyLock;
use std::sync::{Mutex, MutexGuard};

pub use log::{debug, error, info, trace, warn, LevelFilter};
#[cfg(feature = "logging")]
use log4rs::Handle;

use crate::error::EpiwalkError;
use crate::hashing::HashMap;

// Logging disabled
const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Off;

/// A global instance of the logging configuration.
static LOG_CONFIGURATION: LazyLock<Mutex<LogConfiguration>> = LazyLock::new(Mutex::default);

/// Different log level filters can be applied to the log messages emitted from different modules
/// according to the module path (e.g. `"epiwalk::driver"`). These are stored in the global
/// `LogConfiguration`.
#[derive(Debug, PartialEq)]
struct ModuleLogConfiguration {
    /// The module path this configuration applies to
    module: String,
    /// The maximum log level for this module path
    level: LevelFilter,
}

impl From<(&str, LevelFilter)> for ModuleLogConfiguration {
    fn from((module, level): (&str, LevelFilter)) -> Self {
        Self {
            module: module.to_string(),
            level,
        }
    }
}

/// Holds logging configuration. Its primary responsibility is to keep track of the filter levels
/// of modules and hold a handle to the global logger.
///
/// Because loggers are globally installed, only one instance of this struct should exist. The
/// public API are free functions which fetch the singleton and call the appropriate member
/// function.
#[derive(Debug)]
pub(in crate::log) struct LogConfiguration {
    /// The "default" level filter for modules ("targets") without an explicitly set filter. A
    /// global filter level of `LevelFilter::Off` disables logging.
    pub(in crate::log) global_log_level: LevelFilter,
    pub(in crate::log) module_configurations: HashMap<String, ModuleLogConfiguration>,

    #[cfg(feature = "logging")]
    /// Handle to the `log4rs` logger.
    root_handle: Option<Handle>,
}

impl Default for LogConfiguration {
    fn default() -> Self {
        Self {
            global_log_level: DEFAULT_LOG_LEVEL,
            module_configurations: HashMap::default(),

            #[cfg(feature = "logging")]
            root_handle: None,
        }
    }
}

impl LogConfiguration {
    pub(in crate::log) fn set_log_level(&mut self, level: LevelFilter) {
        self.global_log_level = level;
        self.set_config();
    }

    /// Returns true if the configuration was mutated, false otherwise.
    fn insert_module_filter(&mut self, module: &str, level: LevelFilter) -> bool {
        match self.module_configurations.entry(module.to_string()) {
            Entry::Occupied(mut entry) => {
                let module_config = entry.get_mut();
                if module_config.level == level {
                    // Don't bother building a new config
                    return false;
                }
                module_config.level = level;
            }

            Entry::Vacant(entry) => {
                entry.insert((module, level).into());
            }
        }
        true
    }

    pub(in crate::log) fn set_module_filter(&mut self, module: &str, level: LevelFilter) {
        if self.insert_module_filter(module, level) {
            self.set_config();
        }
    }

    pub(in crate::log) fn set_module_filters(&mut self, module_filters: &[(&str, LevelFilter)]) {
        let mut mutated: bool = false;
        for (module, level) in module_filters {
            mutated |= self.insert_module_filter(module, *level);
        }
        if mutated {
            self.set_config();
        }
    }

    pub(in crate::log) fn remove_module_filter(&mut self, module: &str) {
        if self.module_configurations.remove(module).is_some() {
            self.set_config();
        }
    }
}

// The public API

/// Enables the logger with no global level filter / full logging. Equivalent to
/// `set_log_level(LevelFilter::Trace)`.
pub fn enable_logging() {
    set_log_level(LevelFilter::Trace);
}

/// Disables logging completely. Equivalent to `set_log_level(LevelFilter::Off)`.
pub fn disable_logging() {
    set_log_level(LevelFilter::Off);
}

/// Sets the global log level. A global filter level of `LevelFilter::Off` disables logging.
pub fn set_log_level(level: LevelFilter) {
    let mut log_configuration = get_log_configuration();
    log_configuration.set_log_level(level);
}

/// Sets a level filter for the given module path.
pub fn set_module_filter(module_path: &str, level_filter: LevelFilter) {
    let mut log_configuration = get_log_configuration();
    log_configuration.set_module_filter(module_path, level_filter);
}

/// Removes a module-specific level filter for the given module path. The global level filter will
/// apply to the module.
pub fn remove_module_filter(module_path: &str) {
    let mut log_configuration = get_log_configuration();
    log_configuration.remove_module_filter(module_path);
}

/// Sets the level filters for a set of modules. Use this instead of `set_module_filter()` to set
/// filters in bulk.
pub fn set_module_filters(module_filters: &[(&str, LevelFilter)]) {
    let mut log_configuration = get_log_configuration();
    log_configuration.set_module_filters(module_filters);
}

/// A parsed `--log-level` argument: an optional global level plus per-module levels.
#[derive(Debug, Default, PartialEq)]
pub struct LogLevelSpec {
    pub global: Option<LevelFilter>,
    pub modules: Vec<(String, LevelFilter)>,
}

impl FromStr for LogLevelSpec {
    type Err = EpiwalkError;

    /// Accepts `LEVEL`, `module=LEVEL`, or a comma separated mix of both, e.g.
    /// `info,epiwalk::random=trace`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut spec = LogLevelSpec::default();
        for item in s.split(',').map(str::trim).filter(|item| !item.is_empty()) {
            let parse_level = |level: &str| {
                LevelFilter::from_str(level.trim()).map_err(|_| {
                    EpiwalkError::InvalidConfiguration(format!("unknown log level `{level}`"))
                })
            };
            match item.split_once('=') {
                Some((module, level)) => {
                    spec.modules
                        .push((module.trim().to_string(), parse_level(level)?));
                }
                None => spec.global = Some(parse_level(item)?),
            }
        }
        Ok(spec)
    }
}

impl LogLevelSpec {
    /// Installs this specification. Naming only modules implies a global level of `Error`
    /// so that other modules are not silenced entirely.
    pub fn apply(&self) {
        let global = match (self.global, self.modules.is_empty()) {
            (Some(level), _) => level,
            (None, false) => LevelFilter::Error,
            (None, true) => return,
        };
        let mut log_configuration = get_log_configuration();
        let filters: Vec<(&str, LevelFilter)> = self
            .modules
            .iter()
            .map(|(module, level)| (module.as_str(), *level))
            .collect();
        log_configuration.set_module_filters(&filters);
        log_configuration.set_log_level(global);
    }
}

/// Fetches a mutable reference to the global `LogConfiguration`.
fn get_log_configuration() -> MutexGuard<'static, LogConfiguration> {
    LOG_CONFIGURATION.lock().expect("Mutex poisoned")
}

#[cfg(test)]
mod tests {
    use super::{
        get_log_configuration, remove_module_filter, set_log_level, set_module_filters,
        LogLevelSpec, DEFAULT_LOG_LEVEL,
    };
    use log::{error, trace, LevelFilter};
    use std::str::FromStr;
    use std::sync::{LazyLock, Mutex};

    // Force logging tests to run serially for consistent behavior.
    static TEST_MUTEX: LazyLock<Mutex<()>> = LazyLock::new(Mutex::default);

    #[test]
    fn default_is_off() {
        assert_eq!(DEFAULT_LOG_LEVEL, LevelFilter::Off);
    }

    #[test]
    fn test_set_log_level() {
        let _guard = TEST_MUTEX.lock().expect("Mutex poisoned");
        set_log_level(LevelFilter::Trace);
        set_log_level(LevelFilter::Error);
        {
            let config = get_log_configuration();
            assert_eq!(config.global_log_level, LevelFilter::Error);
            error!("test_set_log_level: global set to error");
            trace!("test_set_log_level: NOT EMITTED");
        }
        set_log_level(LevelFilter::Trace);
        {
            let config = get_log_configuration();
            assert_eq!(config.global_log_level, LevelFilter::Trace);
            trace!("test_set_log_level: global set to trace");
        }
    }

    #[test]
    fn test_set_remove_module_filters() {
        let _guard = TEST_MUTEX.lock().expect("Mutex poisoned");
        set_log_level(LevelFilter::Trace);

        let filters: [(&str, LevelFilter); 2] = [
            ("epiwalk::random", LevelFilter::Error),
            ("epiwalk::driver", LevelFilter::Debug),
        ];
        set_module_filters(&filters);
        {
            let config = get_log_configuration();
            for (module_path, level) in &filters {
                assert_eq!(
                    config.module_configurations.get(*module_path),
                    Some(&((*module_path, *level).into()))
                );
            }
        }

        remove_module_filter("epiwalk::random");
        {
            let config = get_log_configuration();
            assert!(config.module_configurations.get("epiwalk::random").is_none());
            assert_eq!(
                config.module_configurations.get("epiwalk::driver"),
                Some(&("epiwalk::driver", LevelFilter::Debug).into())
            );
        }
        remove_module_filter("epiwalk::driver");
    }

    #[test]
    fn parse_global_level() {
        let spec = LogLevelSpec::from_str("info").unwrap();
        assert_eq!(spec.global, Some(LevelFilter::Info));
        assert!(spec.modules.is_empty());
    }

    #[test]
    fn parse_module_levels() {
        let spec =
            LogLevelSpec::from_str("warn, epiwalk::driver=Trace,epiwalk::random=off").unwrap();
        assert_eq!(spec.global, Some(LevelFilter::Warn));
        assert_eq!(
            spec.modules,
            vec![
                ("epiwalk::driver".to_string(), LevelFilter::Trace),
                ("epiwalk::random".to_string(), LevelFilter::Off),
            ]
        );
    }

    #[test]
    fn parse_rejects_unknown_level() {
        assert!(LogLevelSpec::from_str("loud").is_err());
        assert!(LogLevelSpec::from_str("epiwalk=loud").is_err());
    }
}
