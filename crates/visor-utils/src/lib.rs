//! Shared utilities of the V.I.S.O.R. background modules.
//!
//! Every module is a separate, periodically started process. The
//! [`modules`] coordinator makes sure at most one instance of each runs at a
//! time, persists the module's state between runs and reports fatal errors
//! by email. The remaining modules are small services the coordinator and the
//! modules themselves build on:
//!
//! - [`paths`] and [`files`] for path composition and atomic file writes;
//! - [`json`] for tab-indented output and forgiving input;
//! - [`shell`] and [`processes`] for running commands and probing PIDs;
//! - [`email`] for rendering, queuing and sending messages;
//! - [`timedate`] and [`webpages`] for timestamps and page fetches;
//! - [`general`] for random strings and error rendering.
//!
//! Configuration comes from [`visor_config::Config`], built once at process
//! entry and passed down by reference.
//!
//! A module binary is a single call:
//!
//! ```rust,ignore
//! use visor_utils::modules::{ModuleId, module_main};
//!
//! fn main() {
//!     module_main::<Vec<String>, _>(ModuleId::RSS_FEED_NOTIFIER, |context, state| {
//!         loop {
//!             // ... check feeds, queue emails through context.mailer() ...
//!             state.loop_sleep(60)?;
//!         }
//!     })
//! }
//! ```

pub mod email;
pub mod files;
pub mod general;
pub mod json;
pub mod modules;
pub mod paths;
pub mod processes;
pub mod shell;
pub mod telemetry;
pub mod timedate;
pub mod webpages;

pub use modules::{
    MODULE_ERROR_EXIT_CODE, ModuleContext, ModuleError, ModuleExit, ModuleId, ModuleState,
    StartupCheck, module_main,
};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
