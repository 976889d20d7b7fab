//! Structured telemetry for module processes.
//!
//! Every module is its own short-lived process, and they all log to the same
//! stderr sink (usually the scheduler's log). [`module_span`] tags each record
//! with the module that wrote it; the failure boundary enters it for the whole
//! run.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::{Span, Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::{self, MakeWriter};

use visor_config::{Config, LogFormat};

use crate::modules::ModuleId;

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

/// Proof that the process-wide subscriber is installed.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryHandle;

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The configured log filter expression did not parse.
    #[error("invalid log filter '{filter}': {message}")]
    Filter {
        /// Filter expression taken from the configuration.
        filter: String,
        /// Parser diagnostic.
        message: String,
    },
    /// Another subscriber was already installed by someone else.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Installs the stderr subscriber on first use.
///
/// Later calls return a fresh [`TelemetryHandle`] without touching the global
/// state, so module binaries and tests may both call it.
pub fn initialise(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    TELEMETRY_GUARD
        .get_or_try_init(|| {
            let ansi = io::stderr().is_terminal();
            let subscriber = build_subscriber(config, io::stderr, ansi)?;
            tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)
        })
        .map(|_| TelemetryHandle)
}

/// Root span of a module run, carrying `module`, `module_name` and `pid`.
///
/// Created at error level so it survives any filter that lets events
/// through.
#[must_use]
pub fn module_span(module_id: ModuleId) -> Span {
    tracing::error_span!(
        "module",
        module = module_id.get(),
        module_name = module_id.name(),
        pid = std::process::id(),
    )
}

/// Builds the subscriber described by `config`, writing to `writer`.
pub(crate) fn build_subscriber<W>(
    config: &Config,
    writer: W,
    ansi: bool,
) -> Result<Box<dyn Subscriber + Send + Sync>, TelemetryError>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let filter = EnvFilter::try_new(config.log_filter()).map_err(|error| TelemetryError::Filter {
        filter: config.log_filter().to_owned(),
        message: error.to_string(),
    })?;

    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(writer)
        .with_ansi(ansi)
        .with_timer(fmt::time::UtcTime::rfc_3339());

    Ok(match config.log_format() {
        // Only the innermost span is kept; the module span is the root anyway.
        LogFormat::Json => Box::new(
            builder
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .with_span_list(false)
                .finish(),
        ),
        LogFormat::Compact => Box::new(builder.compact().finish()),
    })
}
