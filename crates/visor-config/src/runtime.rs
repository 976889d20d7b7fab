//! Derives the private directories of a module.
//!
//! Every module owns three directories below the installation root: program
//! data (files the module itself produces for other programs), user data (the
//! run markers, the generated state document and the user-supplied
//! configuration) and a scratch directory. All binaries must agree on this
//! layout so one module can reach another's files, e.g. to queue an email for
//! the Email Sender.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::Config;

const DATA_REL_DIR: &str = "data";
const PROGRAM_DATA_DIR: &str = "ProgramData";
const USER_DATA_DIR: &str = "UserData";
const TEMP_DIR: &str = "Temp";
const MODULE_DIR_PREFIX: &str = "MOD_";

const GEN_INFO_JSON: &str = "mod_gen_info.json";
const GEN_INFO_JSON_TMP: &str = "mod_gen_info.json_tmp";
const USER_INFO_JSON: &str = "mod_user_info.json";

/// Canonical paths of a module's private files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDirs {
    program_data_dir: PathBuf,
    user_data_dir: PathBuf,
    temp_dir: PathBuf,
}

impl ModuleDirs {
    /// Derives the directories of module `module_num` without touching the
    /// filesystem.
    #[must_use]
    pub fn derive(config: &Config, module_num: u32) -> Self {
        Self::under(config.visor_dir().as_std_path(), module_num)
    }

    /// Derives the directories of module `module_num` below `root`.
    #[must_use]
    pub fn under(root: &Path, module_num: u32) -> Self {
        let module_dir = format!("{MODULE_DIR_PREFIX}{module_num}");
        let data = root.join(DATA_REL_DIR);
        Self {
            program_data_dir: data.join(PROGRAM_DATA_DIR).join(&module_dir),
            user_data_dir: data.join(USER_DATA_DIR).join(&module_dir),
            temp_dir: data.join(TEMP_DIR).join(&module_dir),
        }
    }

    /// Creates the three directories if they are missing.
    pub fn prepare(&self) -> Result<(), ModuleDirsError> {
        for dir in [&self.program_data_dir, &self.user_data_dir, &self.temp_dir] {
            fs::create_dir_all(dir).map_err(|source| ModuleDirsError::Create {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Directory of files the module produces for other programs.
    pub fn program_data_dir(&self) -> &Path {
        self.program_data_dir.as_path()
    }

    /// Directory of run markers, generated state and user configuration.
    pub fn user_data_dir(&self) -> &Path {
        self.user_data_dir.as_path()
    }

    /// Scratch directory.
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.as_path()
    }

    /// Path to the generated state document.
    #[must_use]
    pub fn gen_info_path(&self) -> PathBuf {
        self.user_data_dir.join(GEN_INFO_JSON)
    }

    /// Path to the in-flight copy of the generated state document.
    #[must_use]
    pub fn gen_info_tmp_path(&self) -> PathBuf {
        self.user_data_dir.join(GEN_INFO_JSON_TMP)
    }

    /// Path to the read-only user configuration of the module.
    #[must_use]
    pub fn user_info_path(&self) -> PathBuf {
        self.user_data_dir.join(USER_INFO_JSON)
    }
}

/// Errors raised while preparing module directories.
#[derive(Debug, Error)]
pub enum ModuleDirsError {
    /// Creating a directory failed.
    #[error("failed to prepare module directory '{path}': {source}")]
    Create {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}
