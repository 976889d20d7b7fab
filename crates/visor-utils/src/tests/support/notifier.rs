use std::cell::RefCell;

use crate::email::EmailError;
use crate::modules::{ErrorNotifier, ModuleId};

/// Notifier that records every report and optionally fails delivery.
#[derive(Default)]
pub struct RecordingNotifier {
    reports: RefCell<Vec<(ModuleId, String)>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn reports(&self) -> Vec<(ModuleId, String)> {
        self.reports.borrow().clone()
    }
}

impl ErrorNotifier for RecordingNotifier {
    fn notify(&self, module: ModuleId, report: &str) -> Result<(), EmailError> {
        self.reports.borrow_mut().push((module, report.to_owned()));
        if self.fail {
            Err(EmailError::MissingRecipient)
        } else {
            Ok(())
        }
    }
}
