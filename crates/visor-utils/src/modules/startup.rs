//! Startup protocol and failure boundary of a module process.

use std::io::{self, Write};

use anyhow::Context as _;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{error, info};
use visor_config::{Config, ConfigError, ModuleDirs};

use super::errors::ModuleError;
use super::marker::{self, Reconciliation, RunClaim, RunMarker};
use super::notifier::{EmailErrorNotifier, ErrorNotifier};
use super::probe::{ProcessProbe, SystemProcessProbe};
use super::state::ModuleState;
use super::{MODULE_ERROR_EXIT_CODE, MODULES_TARGET, ModuleContext, ModuleId, Timing};
use crate::{general, telemetry, timedate};

/// Outcome of the single-instance check.
#[derive(Debug)]
pub enum StartupCheck<T> {
    /// The run slot is ours; the loaded state carries the claim.
    ShouldRun(ModuleState<T>),
    /// Another live instance owns the slot.
    AlreadyRunning {
        /// Process holding the live claim.
        pid: u32,
    },
}

/// How a module process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleExit {
    /// `main` ran and returned successfully.
    Normal,
    /// Another instance was already running, so `main` never ran.
    AlreadyRunning {
        /// Process holding the live claim.
        pid: u32,
    },
    /// Startup or `main` failed.
    Failed,
}

impl ModuleExit {
    /// Process exit code for this outcome.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Normal | Self::AlreadyRunning { .. } => 0,
            Self::Failed => MODULE_ERROR_EXIT_CODE,
        }
    }
}

/// Collaborators consulted by the failure boundary.
#[derive(Debug, Clone)]
pub struct Collaborators<P, N> {
    /// Liveness oracle for other instances' run markers.
    pub probe: P,
    /// Receiver of fatal error reports.
    pub notifier: N,
}

/// Claims the run slot of `module_id` and loads its state.
///
/// Creates this process's marker, reaps dead, stale and corrupt markers, and
/// backs off when another live instance is found, removing the new marker
/// again. On success the state is stamped with this run and persisted.
pub fn check_startup<T, P>(
    module_id: ModuleId,
    dirs: &ModuleDirs,
    timing: Timing,
    probe: &P,
) -> Result<StartupCheck<T>, ModuleError>
where
    T: Serialize + DeserializeOwned + Default,
    P: ProcessProbe,
{
    dirs.prepare()?;
    let pid = std::process::id();
    let now_ns = timedate::now_nanos();
    let claim = RunClaim::create(dirs.user_data_dir(), RunMarker::new(pid, now_ns))?;

    let reconciliation = marker::reconcile(
        dirs.user_data_dir(),
        claim.marker(),
        now_ns,
        timing.liveness_window,
        probe,
    )?;
    if let Reconciliation::Conflict { pid: other } = reconciliation {
        info!(
            target: MODULES_TARGET,
            module = module_id.get(),
            pid = other,
            "module already running; backing off"
        );
        return Ok(StartupCheck::AlreadyRunning { pid: other });
    }

    let mut state = ModuleState::load(module_id, dirs.clone(), timing);
    state.begin_run(pid, now_ns);
    state.update()?;
    state.attach_claim(claim);
    info!(
        target: MODULES_TARGET,
        module = module_id.get(),
        pid,
        "run slot claimed"
    );
    Ok(StartupCheck::ShouldRun(state))
}

/// Reports whether a live instance of `module_id` exists, without touching
/// any marker.
#[must_use]
pub fn is_module_running(config: &Config, module_id: ModuleId) -> bool {
    let dirs = ModuleDirs::derive(config, module_id.get());
    marker::any_live(
        dirs.user_data_dir(),
        timedate::now_nanos(),
        config.liveness_window(),
        &SystemProcessProbe,
    )
}

/// Entry point of a module binary. Never returns.
///
/// Loads the configuration, installs telemetry, runs `main` through
/// [`run_module`] with stdout as the report sink and exits with the
/// outcome's code.
pub fn module_main<T, F>(module_id: ModuleId, main: F) -> !
where
    T: Serialize + DeserializeOwned + Default,
    F: FnOnce(&ModuleContext<'_>, &mut ModuleState<T>) -> anyhow::Result<()>,
{
    let mut stdout = io::stdout();
    let exit = match Config::load_validated() {
        Ok(config) => {
            if let Err(telemetry_error) = telemetry::initialise(&config) {
                let _ = writeln!(stdout, "Telemetry unavailable: {telemetry_error}");
            }
            run_module(&config, module_id, &mut stdout, main)
        }
        Err(config_error) => report_config_failure(&mut stdout, module_id, config_error),
    };
    let _ = stdout.flush();
    std::process::exit(exit.code())
}

/// Reports a configuration that failed to load, framed by the run banners.
///
/// No email is attempted: the email settings are part of the configuration
/// that is unavailable.
pub fn report_config_failure(
    out: &mut impl Write,
    module_id: ModuleId,
    config_error: ConfigError,
) -> ModuleExit {
    let span = telemetry::module_span(module_id);
    let _entered = span.enter();
    write_startup_banner(out, module_id.name());
    let failure = anyhow::Error::from(ModuleError::from(config_error));
    let report = general::full_error_message(&failure);
    error!(target: MODULES_TARGET, module = module_id.get(), "configuration unavailable");
    let _ = writeln!(out, "CRITICAL ERROR: {report}");
    write_shutdown_banner(out, module_id, true);
    ModuleExit::Failed
}

/// Runs `main` with the production probe and the email notifier.
pub fn run_module<T, F, W>(config: &Config, module_id: ModuleId, out: &mut W, main: F) -> ModuleExit
where
    T: Serialize + DeserializeOwned + Default,
    F: FnOnce(&ModuleContext<'_>, &mut ModuleState<T>) -> anyhow::Result<()>,
    W: Write,
{
    let collaborators = Collaborators {
        probe: SystemProcessProbe,
        notifier: EmailErrorNotifier::new(config),
    };
    run_module_with(config, module_id, &collaborators, out, main)
}

/// Runs the startup protocol and `main` inside the failure boundary.
///
/// Errors and panics from startup or `main` are written to `out` with a
/// stack trace and passed to the notifier; a failing notifier is reported on
/// `out` too. Banners frame the run, and every record logged meanwhile is
/// attributed to the module through [`telemetry::module_span`].
pub fn run_module_with<T, F, W, P, N>(
    config: &Config,
    module_id: ModuleId,
    collaborators: &Collaborators<P, N>,
    out: &mut W,
    main: F,
) -> ModuleExit
where
    T: Serialize + DeserializeOwned + Default,
    F: FnOnce(&ModuleContext<'_>, &mut ModuleState<T>) -> anyhow::Result<()>,
    W: Write,
    P: ProcessProbe,
    N: ErrorNotifier,
{
    let span = telemetry::module_span(module_id);
    let _entered = span.enter();
    write_startup_banner(out, module_id.name());

    let outcome =
        general::catch_panic(|| run_guarded(config, module_id, &collaborators.probe, main));
    let report = match outcome {
        Ok(Ok(exit)) => {
            write_shutdown_banner(out, module_id, false);
            return exit;
        }
        Ok(Err(failure)) => general::full_error_message(&failure),
        Err(panic_report) => format!("module panicked: {panic_report}"),
    };

    error!(
        target: MODULES_TARGET,
        module = module_id.get(),
        "module failed"
    );
    let _ = writeln!(out, "{report}");
    if let Err(notify_error) = collaborators.notifier.notify(module_id, &report) {
        error!(
            target: MODULES_TARGET,
            module = module_id.get(),
            error = %notify_error,
            "failed to send error report"
        );
        let detail = general::full_error_message(&anyhow::Error::new(notify_error));
        let _ = writeln!(out, "Error sending email with error:\n{detail}\n-----\n{report}");
    }
    write_shutdown_banner(out, module_id, true);
    ModuleExit::Failed
}

fn run_guarded<T, F, P>(
    config: &Config,
    module_id: ModuleId,
    probe: &P,
    main: F,
) -> anyhow::Result<ModuleExit>
where
    T: Serialize + DeserializeOwned + Default,
    F: FnOnce(&ModuleContext<'_>, &mut ModuleState<T>) -> anyhow::Result<()>,
    P: ProcessProbe,
{
    let context = ModuleContext::new(module_id, config);
    let timing = Timing::from_config(config);
    let check = check_startup(module_id, context.dirs(), timing, probe)
        .with_context(|| format!("startup of module \"{}\" failed", module_id.name()))?;
    let mut state = match check {
        StartupCheck::ShouldRun(state) => state,
        StartupCheck::AlreadyRunning { pid } => return Ok(ModuleExit::AlreadyRunning { pid }),
    };
    main(&context, &mut state)?;
    Ok(ModuleExit::Normal)
}

/// Writes the banner opening a module run.
pub fn write_startup_banner(out: &mut impl Write, name: &str) {
    let _ = writeln!(
        out,
        "//------------------------------------------\\\\\n--- {name} ---\nV.I.S.O.R. Systems\n------------------\n"
    );
}

/// Writes the banner closing a module run.
pub fn write_shutdown_banner(out: &mut impl Write, module_id: ModuleId, errors: bool) {
    let how = if errors { "with ERRORS" } else { "normally" };
    let _ = writeln!(
        out,
        "\n---------\nExiting {how} the module \"{}\" (number {module_id})...\n\\\\------------------------------------------//",
        module_id.name()
    );
}
