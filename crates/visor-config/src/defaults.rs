use camino::Utf8PathBuf;
use std::env;

#[cfg(unix)]
use dirs::data_dir;

/// Default log filter expression used by the modules.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default SMTP endpoint used when sending email through `curl`.
pub const DEFAULT_SMTP_URL: &str = "smtp://smtp.gmail.com:587";

/// Default age, in seconds, after which a run marker is considered stale.
pub const DEFAULT_LIVENESS_WINDOW_SECS: u64 = 5;

/// Default upper bound, in seconds, of a single loop sleep.
pub const DEFAULT_MAX_WAIT_SECS: u64 = 5;

/// Default log filter expression used by the modules.
#[must_use]
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the modules.
#[must_use]
pub fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Compact
}

/// Owned SMTP endpoint for serde defaults.
#[must_use]
pub fn default_smtp_url() -> String {
    DEFAULT_SMTP_URL.to_owned()
}

/// Liveness window default for serde.
#[must_use]
pub const fn default_liveness_window_secs() -> u64 {
    DEFAULT_LIVENESS_WINDOW_SECS
}

/// Sleep clamp default for serde.
#[must_use]
pub const fn default_max_wait_secs() -> u64 {
    DEFAULT_MAX_WAIT_SECS
}

/// Computes the default installation directory.
#[must_use]
pub fn default_visor_dir() -> Utf8PathBuf {
    let mut base = base_directory();
    base.push("visor");
    base
}

#[cfg(unix)]
fn base_directory() -> Utf8PathBuf {
    data_dir()
        .and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
        .unwrap_or_else(fallback_base_directory)
}

#[cfg(not(unix))]
fn base_directory() -> Utf8PathBuf {
    fallback_base_directory()
}

fn fallback_base_directory() -> Utf8PathBuf {
    let candidate = env::temp_dir();
    Utf8PathBuf::from_path_buf(candidate).unwrap_or_else(|_| Utf8PathBuf::from("/tmp"))
}
