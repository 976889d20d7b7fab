//! Layering order of configuration sources: defaults, file, environment, CLI.

use std::ffi::{OsStr, OsString};
use std::fs;
use std::sync::{Mutex, MutexGuard};

use once_cell::sync::Lazy;
use ortho_config::OrthoConfig;
use rstest::{fixture, rstest};
use tempfile::TempDir;

use visor_config::{
    Config, DEFAULT_LIVENESS_WINDOW_SECS, DEFAULT_MAX_WAIT_SECS, LogFormat, default_log_filter,
    default_log_format,
};

static ENV_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

struct Harness {
    temp_dir: TempDir,
    args: Vec<OsString>,
    env_overrides: Vec<(&'static str, Option<OsString>)>,
    _guard: MutexGuard<'static, ()>,
}

impl Harness {
    fn new() -> Self {
        let guard = ENV_MUTEX
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Self {
            temp_dir: TempDir::new().expect("failed to create temporary directory"),
            args: vec![OsString::from("visor-module")],
            env_overrides: Vec::new(),
            _guard: guard,
        }
    }

    fn write_config(&mut self, contents: &str) {
        let path = self.temp_dir.path().join("visor.toml");
        fs::write(&path, contents).expect("failed to write configuration");
        self.args.push(OsString::from("--config-path"));
        self.args.push(path.into_os_string());
    }

    fn set_env(&mut self, key: &'static str, value: &str) {
        let previous = std::env::var_os(key);
        // Restored in `Drop`; the mutex keeps concurrent tests from observing
        // the override.
        unsafe { std::env::set_var(key, value) };
        self.env_overrides.push((key, previous));
    }

    fn push_args<I, S>(&mut self, args: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|arg| arg.as_ref().to_os_string()));
    }

    fn load(&self) -> Config {
        Config::load_from_iter(self.args.clone()).expect("configuration should load")
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        while let Some((key, value)) = self.env_overrides.pop() {
            match value {
                Some(previous) => unsafe { std::env::set_var(key, previous) },
                None => unsafe { std::env::remove_var(key) },
            }
        }
    }
}

#[fixture]
fn harness() -> Harness {
    Harness::new()
}

#[rstest]
fn built_in_defaults_apply_without_sources(harness: Harness) {
    let config = harness.load();
    assert_eq!(config.log_filter(), default_log_filter());
    assert_eq!(config.log_format(), default_log_format());
    assert_eq!(config.liveness_window_secs, DEFAULT_LIVENESS_WINDOW_SECS);
    assert_eq!(config.max_wait_secs, DEFAULT_MAX_WAIT_SECS);
}

#[rstest]
fn file_values_override_defaults(mut harness: Harness) {
    harness.write_config(
        "visor_dir = \"/srv/visor\"\nlog_format = \"json\"\nmy_email_addr = \"me@example.com\"\n",
    );
    let config = harness.load();
    assert_eq!(config.visor_dir.as_str(), "/srv/visor");
    assert_eq!(config.log_format(), LogFormat::Json);
    assert_eq!(config.my_email_addr, "me@example.com");
}

#[rstest]
fn environment_overrides_file(mut harness: Harness) {
    harness.write_config("visor_dir = \"/srv/visor\"\n");
    harness.set_env("VISOR_VISOR_DIR", "/var/lib/visor");
    let config = harness.load();
    assert_eq!(config.visor_dir.as_str(), "/var/lib/visor");
}

#[rstest]
fn cli_overrides_environment(mut harness: Harness) {
    harness.set_env("VISOR_LOG_FILTER", "debug");
    harness.push_args(["--log-filter", "warn"]);
    let config = harness.load();
    assert_eq!(config.log_filter(), "warn");
}
