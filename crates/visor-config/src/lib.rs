//! Shared configuration for V.I.S.O.R. utility modules.
//!
//! Every module process builds exactly one [`Config`] at entry and passes it
//! by reference to the lifecycle coordinator and the leaf services. Values are
//! layered by `ortho_config`: built-in defaults, then an optional
//! configuration file (`--config-path` or `VISOR_CONFIG_PATH`), then `VISOR_*`
//! environment variables, and finally command-line flags.

use std::sync::Arc;
use std::time::Duration;

use camino::Utf8PathBuf;
use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod defaults;
mod logging;
mod runtime;

pub use defaults::{
    DEFAULT_LIVENESS_WINDOW_SECS, DEFAULT_LOG_FILTER, DEFAULT_MAX_WAIT_SECS, DEFAULT_SMTP_URL,
    default_liveness_window_secs, default_log_filter, default_log_filter_string,
    default_log_format, default_max_wait_secs, default_smtp_url, default_visor_dir,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use runtime::{ModuleDirs, ModuleDirsError};

/// Personal configuration consumed by every module.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "VISOR")]
pub struct Config {
    /// Root directory of the V.I.S.O.R. installation.
    #[serde(default = "default_visor_dir")]
    pub visor_dir: Utf8PathBuf,
    /// Address the modules send email from.
    #[serde(default)]
    pub visor_email_addr: String,
    /// Password of the sending address.
    #[serde(default)]
    pub visor_email_pw: String,
    /// Address receiving notifications and error reports.
    #[serde(default)]
    pub my_email_addr: String,
    /// SMTP endpoint handed to `curl`.
    #[serde(default = "default_smtp_url")]
    pub smtp_url: String,
    /// `tracing` filter expression.
    #[serde(default = "default_log_filter_string")]
    pub log_filter: String,
    /// Log output format.
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,
    /// Maximum age, in seconds, of a run marker still considered live.
    #[serde(default = "default_liveness_window_secs")]
    pub liveness_window_secs: u64,
    /// Upper bound, in seconds, of a single `loop_sleep` delay.
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            visor_dir: default_visor_dir(),
            visor_email_addr: String::new(),
            visor_email_pw: String::new(),
            my_email_addr: String::new(),
            smtp_url: default_smtp_url(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            liveness_window_secs: default_liveness_window_secs(),
            max_wait_secs: default_max_wait_secs(),
        }
    }
}

impl Config {
    /// Loads and validates the configuration from the process arguments and
    /// environment.
    pub fn load_validated() -> Result<Self, ConfigError> {
        let config = Self::load().map_err(|source| ConfigError::Load { source })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the invariants the lifecycle coordinator relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.visor_dir.as_str().trim().is_empty() {
            return Err(ConfigError::MissingVisorDir);
        }
        if self.liveness_window_secs < self.max_wait_secs {
            return Err(ConfigError::LivenessWindowTooShort {
                liveness_window_secs: self.liveness_window_secs,
                max_wait_secs: self.max_wait_secs,
            });
        }
        Ok(())
    }

    /// Root directory of the installation.
    #[must_use]
    pub fn visor_dir(&self) -> &camino::Utf8Path {
        self.visor_dir.as_path()
    }

    /// Returns the configured log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Returns the configured log format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Liveness window as a [`Duration`].
    #[must_use]
    pub const fn liveness_window(&self) -> Duration {
        Duration::from_secs(self.liveness_window_secs)
    }

    /// Sleep clamp as a [`Duration`].
    #[must_use]
    pub const fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }
}

/// Errors raised while loading or validating the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The layered loader failed.
    #[error("failed to load configuration: {source}")]
    Load {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// No installation directory was configured.
    #[error("the V.I.S.O.R. directory is not configured")]
    MissingVisorDir,
    /// A live instance could be reaped between two refreshes.
    #[error(
        "liveness window ({liveness_window_secs}s) must not be shorter than the loop sleep \
         clamp ({max_wait_secs}s)"
    )]
    LivenessWindowTooShort {
        /// Configured liveness window.
        liveness_window_secs: u64,
        /// Configured sleep clamp.
        max_wait_secs: u64,
    },
}
