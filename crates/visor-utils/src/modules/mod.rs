//! Module lifecycle and single-instance coordination.
//!
//! A module binary hands its work to [`module_main`]. The coordinator claims
//! the module's run slot with a marker file, backs off when another live
//! instance holds it, loads and persists the module's state, and runs the
//! work inside a failure boundary that reports errors and panics by email.
//! All coordination happens through files in the module's user-data
//! directory; no OS locks are taken.

use std::time::Duration;

use visor_config::Config;

mod context;
mod errors;
mod ids;
mod marker;
mod notifier;
mod probe;
mod startup;
mod state;

pub use context::ModuleContext;
pub use errors::ModuleError;
pub use ids::{INVALID_MODULE_NAME, ModuleId};
pub use marker::RunMarker;
pub use notifier::{EmailErrorNotifier, ErrorNotifier};
pub use probe::{ProcessProbe, SystemProcessProbe};
pub use startup::{
    Collaborators, ModuleExit, StartupCheck, check_startup, is_module_running, module_main,
    report_config_failure, run_module, run_module_with, write_shutdown_banner,
    write_startup_banner,
};
pub use state::{ModuleRecord, ModuleState, RunInfo};

pub(crate) const MODULES_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::modules");

/// Exit code of a module whose startup or work failed.
pub const MODULE_ERROR_EXIT_CODE: i32 = 3234;

/// Time limits of the liveness protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Maximum age of a marker that still counts as a live claim.
    pub liveness_window: Duration,
    /// Upper bound of a single [`ModuleState::loop_sleep`] delay.
    pub max_wait: Duration,
}

impl Timing {
    /// Reads the limits from `config`.
    #[must_use]
    pub const fn from_config(config: &Config) -> Self {
        Self {
            liveness_window: config.liveness_window(),
            max_wait: config.max_wait(),
        }
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
