//! End-to-end checks of the single-instance protocol against real processes.

use std::fs;
use std::process::{Child, Command};

use camino::Utf8PathBuf;
use tempfile::TempDir;
use visor_config::{Config, ModuleDirs};
use visor_utils::email::EmailError;
use visor_utils::modules::{
    Collaborators, ErrorNotifier, ModuleExit, ModuleId, ModuleState, RunMarker,
    SystemProcessProbe, is_module_running, run_module_with,
};
use visor_utils::timedate;

struct SilentNotifier;

impl ErrorNotifier for SilentNotifier {
    fn notify(&self, _module: ModuleId, _report: &str) -> Result<(), EmailError> {
        Ok(())
    }
}

/// Child process killed when dropped.
struct Sleeper(Child);

impl Sleeper {
    fn spawn() -> Self {
        Self(
            Command::new("sleep")
                .arg("30")
                .spawn()
                .expect("spawn sleep"),
        )
    }

    fn pid(&self) -> u32 {
        self.0.id()
    }
}

impl Drop for Sleeper {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

fn config_in(root: &TempDir) -> Config {
    Config {
        visor_dir: Utf8PathBuf::from_path_buf(root.path().to_path_buf()).expect("UTF-8 temp dir"),
        ..Config::default()
    }
}

fn run(config: &Config, module: ModuleId, counter: &mut u32) -> ModuleExit {
    let collaborators = Collaborators {
        probe: SystemProcessProbe,
        notifier: SilentNotifier,
    };
    let mut out = Vec::new();
    run_module_with(
        config,
        module,
        &collaborators,
        &mut out,
        |_context, state: &mut ModuleState<u32>| {
            *state.payload_mut() += 1;
            *counter = *state.payload();
            state.update()?;
            Ok(())
        },
    )
}

fn seed_marker(config: &Config, module: ModuleId, marker: RunMarker) {
    let dirs = ModuleDirs::derive(config, module.get());
    fs::create_dir_all(dirs.user_data_dir()).expect("run dir");
    fs::write(dirs.user_data_dir().join(marker.file_name()), b"").expect("seed marker");
}

#[cfg(unix)]
#[test]
fn live_process_blocks_a_second_instance() {
    let root = TempDir::new().expect("temp dir");
    let config = config_in(&root);
    let module = ModuleId::WEATHER_CHECKER;
    let other = Sleeper::spawn();
    seed_marker(&config, module, RunMarker::new(other.pid(), timedate::now_nanos()));

    assert!(is_module_running(&config, module));
    let mut counter = 0;
    let exit = run(&config, module, &mut counter);

    assert_eq!(exit, ModuleExit::AlreadyRunning { pid: other.pid() });
    assert_eq!(counter, 0);
}

#[cfg(unix)]
#[test]
fn exited_process_leaves_a_reclaimable_slot() {
    let root = TempDir::new().expect("temp dir");
    let config = config_in(&root);
    let module = ModuleId::WEATHER_CHECKER;
    let dead_pid = {
        let mut child = Command::new("true").spawn().expect("spawn true");
        child.wait().expect("wait for true");
        child.id()
    };
    seed_marker(&config, module, RunMarker::new(dead_pid, timedate::now_nanos()));

    assert!(!is_module_running(&config, module));
    let mut counter = 0;
    assert_eq!(run(&config, module, &mut counter), ModuleExit::Normal);
    assert_eq!(counter, 1);
}

#[test]
fn payload_survives_between_runs() {
    let root = TempDir::new().expect("temp dir");
    let config = config_in(&root);
    let module = ModuleId::SMART_CHECKER;
    let mut counter = 0;

    assert_eq!(run(&config, module, &mut counter), ModuleExit::Normal);
    assert_eq!(run(&config, module, &mut counter), ModuleExit::Normal);
    assert_eq!(counter, 2);
    assert!(!is_module_running(&config, module));
}
