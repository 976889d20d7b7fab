use tracing::info;
use visor_config::Config;

use super::{MODULES_TARGET, ModuleId};
use crate::email::{EmailError, Mailer};

/// Receives the fatal error reports of the failure boundary.
pub trait ErrorNotifier {
    /// Delivers `report`, the rendered fatal error of `module`.
    fn notify(&self, module: ModuleId, report: &str) -> Result<(), EmailError>;
}

/// Emails reports straight to the configured owner.
#[derive(Debug, Clone)]
pub struct EmailErrorNotifier<'a> {
    mailer: Mailer<'a>,
}

impl<'a> EmailErrorNotifier<'a> {
    /// Builds a notifier sending through `config`'s mail account.
    #[must_use]
    pub fn new(config: &'a Config) -> Self {
        Self {
            mailer: Mailer::new(config),
        }
    }
}

impl ErrorNotifier for EmailErrorNotifier<'_> {
    fn notify(&self, module: ModuleId, report: &str) -> Result<(), EmailError> {
        info!(target: MODULES_TARGET, module = module.get(), "emailing module error report");
        self.mailer.send_module_error_email(module, report)
    }
}
