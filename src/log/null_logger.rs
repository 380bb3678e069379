/*!

A "logger" for builds without the `logging` feature. It outputs nothing but satisfies the
public API.

*/

use crate::log::LogConfiguration;

impl LogConfiguration {
    /// Sets the global logger to conform to this `LogConfiguration`.
    pub(in crate::log) fn set_config(&mut self) {
        // No global logger. Only the max level is tracked.
        log::set_max_level(self.global_log_level);
    }
}
