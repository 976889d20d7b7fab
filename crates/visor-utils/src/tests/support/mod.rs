//! Shared fixtures for the coordinator suites.

mod logs;
mod notifier;

use std::fs;
use std::path::Path;
use std::time::Duration;

use camino::Utf8PathBuf;
use mockall::mock;
use rstest::fixture;
use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use visor_config::{Config, ModuleDirs};

use crate::modules::{ModuleId, ProcessProbe, RunMarker, Timing};

pub use logs::CapturedLogs;
pub use notifier::RecordingNotifier;

mock! {
    pub Probe {}
    impl ProcessProbe for Probe {
        fn is_running(&self, pid: u32) -> bool;
    }
}

/// Probe reporting only `alive` as running.
pub fn probe_with_alive(alive: Vec<u32>) -> MockProbe {
    let mut probe = MockProbe::new();
    probe
        .expect_is_running()
        .returning(move |pid| alive.contains(&pid));
    probe
}

/// Payload used by the suites.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedPayload {
    pub seen: Vec<String>,
    pub checks: u32,
}

/// A throwaway installation with one module's directories.
pub struct ModuleWorld {
    _root: TempDir,
    pub config: Config,
    pub module: ModuleId,
    pub dirs: ModuleDirs,
}

impl ModuleWorld {
    pub fn new(module: ModuleId) -> Self {
        let root = TempDir::new().expect("temp dir");
        let config = Config {
            visor_dir: Utf8PathBuf::from_path_buf(root.path().to_path_buf())
                .expect("temp dir should be UTF-8"),
            ..Config::default()
        };
        let dirs = ModuleDirs::derive(&config, module.get());
        Self {
            _root: root,
            config,
            module,
            dirs,
        }
    }

    /// Short limits so sleeping tests stay quick.
    pub const fn fast_timing() -> Timing {
        Timing {
            liveness_window: Duration::from_secs(5),
            max_wait: Duration::from_millis(200),
        }
    }

    pub fn run_dir(&self) -> &Path {
        self.dirs.user_data_dir()
    }

    /// Drops a marker file into the run directory.
    pub fn seed_marker(&self, marker: RunMarker) {
        self.seed_run_entry(&marker.file_name());
    }

    pub fn seed_run_entry(&self, name: &str) {
        fs::create_dir_all(self.run_dir()).expect("run dir");
        fs::write(self.run_dir().join(name), b"").expect("seed marker");
    }

    /// Sorted names of the `PID=` entries in the run directory.
    pub fn marker_names(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(self.run_dir()) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with("PID="))
            .collect();
        names.sort();
        names
    }

    pub fn own_markers(&self) -> Vec<RunMarker> {
        self.marker_names()
            .iter()
            .filter_map(|name| RunMarker::parse(name))
            .filter(|marker| marker.pid() == std::process::id())
            .collect()
    }
}

#[fixture]
pub fn world() -> ModuleWorld {
    ModuleWorld::new(ModuleId::RSS_FEED_NOTIFIER)
}
