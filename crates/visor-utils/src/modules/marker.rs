//! Run markers: body-less files named `PID=<pid>_TS=<unix ns>`.
//!
//! Each running instance keeps exactly one marker in its module's user-data
//! directory and renames it to a newer timestamp as it makes progress. A
//! marker is a live claim only while its process exists and its timestamp is
//! younger than the liveness window; anything else found during a scan is
//! garbage and gets removed.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, warn};

use super::MODULES_TARGET;
use super::errors::ModuleError;
use super::probe::ProcessProbe;
use crate::files;

const PID_PREFIX: &str = "PID=";
const TS_SEPARATOR: &str = "_TS=";

/// Claim of a single process, as encoded in a marker file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunMarker {
    pid: u32,
    timestamp_ns: i64,
}

impl RunMarker {
    /// Describes the claim of `pid` made at `timestamp_ns`.
    #[must_use]
    pub const fn new(pid: u32, timestamp_ns: i64) -> Self {
        Self { pid, timestamp_ns }
    }

    /// Claiming process.
    #[must_use]
    pub const fn pid(&self) -> u32 {
        self.pid
    }

    /// Nanoseconds since the Unix epoch at the last refresh.
    #[must_use]
    pub const fn timestamp_ns(&self) -> i64 {
        self.timestamp_ns
    }

    /// File name encoding this marker.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{PID_PREFIX}{}{TS_SEPARATOR}{}", self.pid, self.timestamp_ns)
    }

    /// Decodes a marker file name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let (pid, timestamp) = name.strip_prefix(PID_PREFIX)?.split_once(TS_SEPARATOR)?;
        Some(Self {
            pid: pid.parse().ok()?,
            timestamp_ns: timestamp.parse().ok()?,
        })
    }

    /// Whether the marker was refreshed less than `window` before `now_ns`.
    #[must_use]
    pub fn is_fresh(&self, now_ns: i64, window: Duration) -> bool {
        let window_ns = i64::try_from(window.as_nanos()).unwrap_or(i64::MAX);
        now_ns.saturating_sub(self.timestamp_ns) < window_ns
    }
}

/// A `PID=` entry found in a run-state directory.
#[derive(Debug)]
pub(crate) enum MarkerEntry {
    /// Well-formed marker.
    Valid { marker: RunMarker, path: PathBuf },
    /// Name that starts like a marker but does not decode.
    Corrupt { path: PathBuf },
}

/// Lists the marker entries of `dir`. A missing directory has none.
pub(crate) fn list_markers(dir: &Path) -> Result<Vec<MarkerEntry>, ModuleError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(ModuleError::ListRunDir {
                path: dir.to_path_buf(),
                source,
            });
        }
    };

    let mut markers = Vec::new();
    for item in entries {
        let entry = item.map_err(|source| ModuleError::ListRunDir {
            path: dir.to_path_buf(),
            source,
        })?;
        let file_name = entry.file_name();
        let name = file_name.to_string_lossy();
        if !name.starts_with(PID_PREFIX) {
            continue;
        }
        let path = entry.path();
        markers.push(match RunMarker::parse(&name) {
            Some(marker) => MarkerEntry::Valid { marker, path },
            None => MarkerEntry::Corrupt { path },
        });
    }
    Ok(markers)
}

/// Result of scanning the run-state directory against our own claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Reconciliation {
    /// No other live claim remains.
    Clear,
    /// Another instance holds a live claim.
    Conflict { pid: u32 },
}

/// Removes every dead, stale or corrupt marker besides `own`, stopping at
/// the first live claim of another process.
pub(crate) fn reconcile(
    dir: &Path,
    own: RunMarker,
    now_ns: i64,
    liveness_window: Duration,
    probe: &impl ProcessProbe,
) -> Result<Reconciliation, ModuleError> {
    for entry in list_markers(dir)? {
        let (marker, path) = match entry {
            MarkerEntry::Valid { marker, path } => (marker, path),
            MarkerEntry::Corrupt { path } => {
                reap(&path, "corrupt");
                continue;
            }
        };
        if marker == own {
            continue;
        }
        let live = marker.pid() != own.pid()
            && probe.is_running(marker.pid())
            && marker.is_fresh(now_ns, liveness_window);
        if live {
            info!(
                target: MODULES_TARGET,
                pid = marker.pid(),
                file = %path.display(),
                "live run marker found"
            );
            return Ok(Reconciliation::Conflict { pid: marker.pid() });
        }
        reap(&path, "stale");
    }
    Ok(Reconciliation::Clear)
}

/// Reports whether any marker in `dir` is a live claim. Nothing is removed.
pub(crate) fn any_live(
    dir: &Path,
    now_ns: i64,
    liveness_window: Duration,
    probe: &impl ProcessProbe,
) -> bool {
    let Ok(entries) = list_markers(dir) else {
        return false;
    };
    entries.into_iter().any(|entry| match entry {
        MarkerEntry::Valid { marker, .. } => {
            probe.is_running(marker.pid()) && marker.is_fresh(now_ns, liveness_window)
        }
        MarkerEntry::Corrupt { .. } => false,
    })
}

fn reap(path: &Path, reason: &str) {
    match files::remove(path) {
        Ok(()) => debug!(
            target: MODULES_TARGET,
            file = %path.display(),
            reason,
            "removed run marker"
        ),
        Err(error) => warn!(
            target: MODULES_TARGET,
            file = %path.display(),
            %error,
            "failed to remove run marker"
        ),
    }
}

/// This process's marker. Removed again when dropped.
#[derive(Debug)]
pub(crate) struct RunClaim {
    dir: PathBuf,
    marker: RunMarker,
}

impl RunClaim {
    /// Creates the marker file in `dir`, creating `dir` when missing.
    pub(crate) fn create(dir: &Path, marker: RunMarker) -> Result<Self, ModuleError> {
        let path = dir.join(marker.file_name());
        files::create_file(&path).map_err(|source| ModuleError::MarkerCreate {
            path: path.clone(),
            source,
        })?;
        debug!(target: MODULES_TARGET, file = %path.display(), "run marker created");
        Ok(Self {
            dir: dir.to_path_buf(),
            marker,
        })
    }

    pub(crate) const fn marker(&self) -> RunMarker {
        self.marker
    }

    fn path(&self) -> PathBuf {
        self.dir.join(self.marker.file_name())
    }

    /// Moves the marker to `timestamp_ns`.
    ///
    /// A missing marker means a newer instance judged this one stale and
    /// reaped it; the slot is then lost and [`ModuleError::ClaimLost`] is
    /// returned without recreating anything.
    pub(crate) fn refresh(&mut self, timestamp_ns: i64) -> Result<(), ModuleError> {
        let next = RunMarker::new(self.marker.pid, timestamp_ns.max(self.marker.timestamp_ns));
        if next == self.marker {
            return Ok(());
        }
        let from = self.path();
        let to = self.dir.join(next.file_name());
        match fs::rename(&from, &to) {
            Ok(()) => {}
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                warn!(
                    target: MODULES_TARGET,
                    file = %from.display(),
                    "run marker reaped by another instance; giving up the slot"
                );
                return Err(ModuleError::ClaimLost { path: from });
            }
            Err(source) => return Err(ModuleError::MarkerRefresh { path: from, source }),
        }
        self.marker = next;
        Ok(())
    }
}

impl Drop for RunClaim {
    fn drop(&mut self) {
        let path = self.path();
        if let Err(error) = files::remove(&path) {
            warn!(
                target: MODULES_TARGET,
                file = %path.display(),
                %error,
                "failed to remove run marker"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    const SECOND_NS: i64 = 1_000_000_000;

    struct Alive(Vec<u32>);

    impl ProcessProbe for Alive {
        fn is_running(&self, pid: u32) -> bool {
            self.0.contains(&pid)
        }
    }

    fn names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .expect("list dir")
            .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[rstest]
    #[case("PID=42_TS=1700000000000000000", Some(RunMarker::new(42, 1_700_000_000_000_000_000)))]
    #[case("PID=42_TS=-5", Some(RunMarker::new(42, -5)))]
    #[case("PID=x_TS=1", None)]
    #[case("PID=42_TS=", None)]
    #[case("PID=42", None)]
    #[case("mod_gen_info.json", None)]
    fn parses_marker_names(#[case] name: &str, #[case] expected: Option<RunMarker>) {
        assert_eq!(RunMarker::parse(name), expected);
    }

    #[test]
    fn file_name_round_trips() {
        let marker = RunMarker::new(7, 123);
        assert_eq!(marker.file_name(), "PID=7_TS=123");
        assert_eq!(RunMarker::parse(&marker.file_name()), Some(marker));
    }

    #[rstest]
    #[case(0, true)]
    #[case(4 * SECOND_NS, true)]
    #[case(5 * SECOND_NS, false)]
    #[case(-SECOND_NS, true)]
    fn freshness_is_strictly_inside_window(#[case] age_ns: i64, #[case] fresh: bool) {
        let now = 100 * SECOND_NS;
        let marker = RunMarker::new(1, now - age_ns);
        assert_eq!(marker.is_fresh(now, Duration::from_secs(5)), fresh);
    }

    #[test]
    fn reconcile_reaps_everything_but_own_and_live() {
        let dir = TempDir::new().expect("temp dir");
        let now = 100 * SECOND_NS;
        let own = RunMarker::new(10, now);
        for name in [
            own.file_name(),
            String::from("PID=10_TS=1"),
            String::from("PID=11_TS=9900000000"),
            RunMarker::new(12, now - 60 * SECOND_NS).file_name(),
            String::from("PID=garbage"),
            String::from("mod_user_info.json"),
        ] {
            files::create_file(&dir.path().join(name)).expect("seed");
        }

        let outcome =
            reconcile(dir.path(), own, now, Duration::from_secs(5), &Alive(vec![12])).expect("scan");

        assert_eq!(outcome, Reconciliation::Clear);
        assert_eq!(names(dir.path()), vec![own.file_name(), String::from("mod_user_info.json")]);
    }

    #[test]
    fn reconcile_stops_at_live_claim() {
        let dir = TempDir::new().expect("temp dir");
        let now = 100 * SECOND_NS;
        let own = RunMarker::new(10, now);
        let other = RunMarker::new(11, now - SECOND_NS);
        files::create_file(&dir.path().join(own.file_name())).expect("seed own");
        files::create_file(&dir.path().join(other.file_name())).expect("seed other");

        let outcome =
            reconcile(dir.path(), own, now, Duration::from_secs(5), &Alive(vec![11])).expect("scan");

        assert_eq!(outcome, Reconciliation::Conflict { pid: 11 });
        assert!(dir.path().join(other.file_name()).exists());
    }

    #[test]
    fn any_live_ignores_dead_and_stale_markers() {
        let dir = TempDir::new().expect("temp dir");
        let now = 100 * SECOND_NS;
        files::create_file(&dir.path().join(RunMarker::new(1, now).file_name())).expect("seed");
        files::create_file(&dir.path().join(RunMarker::new(2, 0).file_name())).expect("seed");

        assert!(!any_live(dir.path(), now, Duration::from_secs(5), &Alive(vec![2])));
        assert!(any_live(dir.path(), now, Duration::from_secs(5), &Alive(vec![1])));
        assert!(!any_live(&dir.path().join("missing"), now, Duration::from_secs(5), &Alive(vec![1])));
        assert_eq!(names(dir.path()).len(), 2);
    }

    #[test]
    fn claim_refreshes_forward_and_cleans_up_on_drop() {
        let dir = TempDir::new().expect("temp dir");
        let mut claim = RunClaim::create(dir.path(), RunMarker::new(3, 50)).expect("claim");

        claim.refresh(80).expect("refresh");
        assert_eq!(names(dir.path()), vec![String::from("PID=3_TS=80")]);

        claim.refresh(60).expect("refresh backwards");
        assert_eq!(claim.marker().timestamp_ns(), 80);

        drop(claim);
        assert!(names(dir.path()).is_empty());
    }

    #[test]
    fn reaped_claim_is_reported_lost_and_not_recreated() {
        let dir = TempDir::new().expect("temp dir");
        let mut claim = RunClaim::create(dir.path(), RunMarker::new(3, 50)).expect("claim");
        fs::remove_file(dir.path().join("PID=3_TS=50")).expect("reap marker");

        let error = claim.refresh(90).expect_err("claim is gone");

        assert!(matches!(
            error,
            ModuleError::ClaimLost { ref path } if path.ends_with("PID=3_TS=50")
        ));
        assert!(names(dir.path()).is_empty());
        assert_eq!(claim.marker().timestamp_ns(), 50);
    }
}
