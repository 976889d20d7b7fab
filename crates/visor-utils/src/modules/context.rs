use std::path::Path;

use serde::de::DeserializeOwned;
use visor_config::{Config, ModuleDirs};

use super::ModuleId;
use crate::email::Mailer;
use crate::{files, json};

/// What a running module knows about itself.
#[derive(Debug, Clone)]
pub struct ModuleContext<'a> {
    id: ModuleId,
    dirs: ModuleDirs,
    config: &'a Config,
}

impl<'a> ModuleContext<'a> {
    /// Context of module `id` under `config`'s installation.
    #[must_use]
    pub fn new(id: ModuleId, config: &'a Config) -> Self {
        Self {
            id,
            dirs: ModuleDirs::derive(config, id.get()),
            config,
        }
    }

    /// Module number.
    #[must_use]
    pub const fn id(&self) -> ModuleId {
        self.id
    }

    /// Module display name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.id.name()
    }

    /// All private directories.
    #[must_use]
    pub const fn dirs(&self) -> &ModuleDirs {
        &self.dirs
    }

    /// Directory of files the module produces for other programs.
    #[must_use]
    pub fn program_data_dir(&self) -> &Path {
        self.dirs.program_data_dir()
    }

    /// Directory of run markers, generated state and user configuration.
    #[must_use]
    pub fn user_data_dir(&self) -> &Path {
        self.dirs.user_data_dir()
    }

    /// Scratch directory.
    #[must_use]
    pub fn temp_dir(&self) -> &Path {
        self.dirs.temp_dir()
    }

    /// Process configuration.
    #[must_use]
    pub const fn config(&self) -> &'a Config {
        self.config
    }

    /// Parses `mod_user_info.json` into the module's own settings type.
    ///
    /// Returns `None` when the file is missing or does not decode.
    #[must_use]
    pub fn user_info<U: DeserializeOwned>(&self) -> Option<U> {
        json::from_json(&files::read_text(&self.dirs.user_info_path())?)
    }

    /// Mailer sending with the configured account.
    #[must_use]
    pub fn mailer(&self) -> Mailer<'a> {
        Mailer::new(self.config)
    }
}
