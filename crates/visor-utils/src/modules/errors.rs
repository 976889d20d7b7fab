//! Error surface of the lifecycle coordinator.

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use visor_config::{ConfigError, ModuleDirsError};

/// Errors raised while claiming a run slot or persisting module state.
#[derive(Debug, Error)]
pub enum ModuleError {
    /// Configuration failed to load or validate.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The module directories could not be prepared.
    #[error(transparent)]
    Dirs(#[from] ModuleDirsError),
    /// The run marker of this process could not be created.
    #[error("failed to create run marker '{path}': {source}")]
    MarkerCreate {
        /// Marker path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The run marker could not be moved to a newer timestamp.
    #[error("failed to refresh run marker '{path}': {source}")]
    MarkerRefresh {
        /// Marker path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Another instance reaped this process's marker and took over the run
    /// slot. The module should stop.
    #[error("run marker '{path}' was reaped by another instance; the run slot is lost")]
    ClaimLost {
        /// Marker path that disappeared.
        path: PathBuf,
    },
    /// The run-state directory could not be listed.
    #[error("failed to list run markers in '{path}': {source}")]
    ListRunDir {
        /// Directory being scanned.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The state document could not be encoded.
    #[error("failed to encode module state: {source}")]
    StateSerialise {
        /// Underlying encoder error.
        #[source]
        source: serde_json::Error,
    },
    /// Writing the temporary state document failed.
    #[error("failed to write module state to '{path}': {source}")]
    StateWrite {
        /// Temporary document path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Renaming the temporary document over the canonical one failed.
    #[error("failed to commit module state to '{path}': {source}")]
    StateCommit {
        /// Canonical document path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}
