//! Durable per-module state.
//!
//! The record lives in `mod_gen_info.json` and is rewritten through the
//! sibling `mod_gen_info.json_tmp`, so the canonical document is always
//! either the previous or the next complete version. A leftover temporary
//! document means the last write never reached its rename; it is preferred
//! on load because it is the newest thing the module managed to save.

use std::path::Path;
use std::thread;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use visor_config::ModuleDirs;

use super::errors::ModuleError;
use super::marker::RunClaim;
use super::{MODULES_TARGET, ModuleId, Timing};
use crate::{files, json, timedate};

/// Bookkeeping about the latest run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunInfo {
    /// Process that last started the module, if any ever did.
    #[serde(default)]
    pub last_pid: Option<u32>,
    /// Last liveness timestamp, in nanoseconds since the Unix epoch.
    #[serde(default)]
    pub last_timestamp_ns: i64,
}

/// The persisted document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRecord<T> {
    /// Owning module.
    pub module_id: ModuleId,
    /// Run bookkeeping maintained by the coordinator.
    #[serde(default)]
    pub run_info: RunInfo,
    /// Data owned by the module itself.
    #[serde(default)]
    pub payload: T,
}

impl<T: Default> ModuleRecord<T> {
    /// The zero-value record used when nothing was saved before.
    #[must_use]
    pub fn new(module_id: ModuleId) -> Self {
        Self {
            module_id,
            run_info: RunInfo::default(),
            payload: T::default(),
        }
    }
}

/// A module's record together with the means to persist it.
///
/// While a module runs, the state also holds the process's run marker and
/// keeps it fresh from [`loop_sleep`](Self::loop_sleep); dropping the state
/// releases the claim.
#[derive(Debug)]
pub struct ModuleState<T> {
    record: ModuleRecord<T>,
    dirs: ModuleDirs,
    timing: Timing,
    claim: Option<RunClaim>,
}

impl<T> ModuleState<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    /// Loads the state of `module_id`, falling back from the temporary
    /// document to the canonical one and then to a zero-value record.
    /// Unreadable or undecodable documents count as absent.
    #[must_use]
    pub fn load(module_id: ModuleId, dirs: ModuleDirs, timing: Timing) -> Self {
        let mut record = read_record(&dirs.gen_info_tmp_path())
            .or_else(|| read_record(&dirs.gen_info_path()))
            .unwrap_or_else(|| {
                debug!(
                    target: MODULES_TARGET,
                    module = module_id.get(),
                    "no saved module state; starting fresh"
                );
                ModuleRecord::new(module_id)
            });
        record.module_id = module_id;
        Self {
            record,
            dirs,
            timing,
            claim: None,
        }
    }

    /// The whole record.
    pub const fn record(&self) -> &ModuleRecord<T> {
        &self.record
    }

    /// Run bookkeeping.
    pub const fn run_info(&self) -> &RunInfo {
        &self.record.run_info
    }

    /// Module-owned data.
    pub const fn payload(&self) -> &T {
        &self.record.payload
    }

    /// Mutable access to the module-owned data. Call [`update`](Self::update)
    /// to persist changes.
    pub const fn payload_mut(&mut self) -> &mut T {
        &mut self.record.payload
    }

    /// Directories of the owning module.
    pub const fn dirs(&self) -> &ModuleDirs {
        &self.dirs
    }

    /// Persists the record: temporary sibling first, then a rename over the
    /// canonical document.
    pub fn update(&self) -> Result<(), ModuleError> {
        self.stage()?;
        let staged = self.dirs.gen_info_tmp_path();
        let canonical = self.dirs.gen_info_path();
        files::commit_staged(&staged, &canonical)
            .map_err(|source| ModuleError::StateCommit {
                path: canonical,
                source,
            })
    }

    /// Writes the temporary document only.
    pub(crate) fn stage(&self) -> Result<(), ModuleError> {
        let text = json::to_json(&self.record)
            .map_err(|source| ModuleError::StateSerialise { source })?;
        let staged = self.dirs.gen_info_tmp_path();
        files::write_staged(&staged, text.as_bytes()).map_err(|source| ModuleError::StateWrite {
            path: staged,
            source,
        })
    }

    /// Records a new liveness timestamp, persists the record, then sleeps
    /// for `seconds`, capped at the configured maximum wait.
    ///
    /// The timestamp never moves backwards. The sleep happens even when
    /// persisting failed; the failure is returned afterwards. When another
    /// instance has taken over the run slot, [`ModuleError::ClaimLost`] is
    /// returned at once and nothing is written, so the module can stop.
    pub fn loop_sleep(&mut self, seconds: u64) -> Result<(), ModuleError> {
        let outcome = self.heartbeat(timedate::now_nanos());
        if matches!(outcome, Err(ModuleError::ClaimLost { .. })) {
            return outcome;
        }
        thread::sleep(Duration::from_secs(seconds).min(self.timing.max_wait));
        outcome
    }

    fn heartbeat(&mut self, now_ns: i64) -> Result<(), ModuleError> {
        let timestamp = now_ns.max(self.record.run_info.last_timestamp_ns);
        self.record.run_info.last_timestamp_ns = timestamp;
        if let Some(claim) = self.claim.as_mut() {
            // A lost slot belongs to the newer instance, including the state file.
            claim.refresh(timestamp)?;
        }
        self.update()
    }

    /// Stamps the record with the run that is starting.
    pub(crate) fn begin_run(&mut self, pid: u32, now_ns: i64) {
        self.record.run_info.last_pid = Some(pid);
        self.record.run_info.last_timestamp_ns = now_ns;
    }

    pub(crate) fn attach_claim(&mut self, claim: RunClaim) {
        self.claim = Some(claim);
    }
}

fn read_record<T>(path: &Path) -> Option<ModuleRecord<T>>
where
    T: DeserializeOwned + Default,
{
    let text = files::read_text(path)?;
    let record = json::from_json(&text);
    if record.is_none() {
        warn!(
            target: MODULES_TARGET,
            file = %path.display(),
            "ignoring undecodable module state"
        );
    }
    record
}
