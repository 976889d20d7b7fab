use std::fmt;

use serde::{Deserialize, Serialize};

/// Name reported for ids missing from the module table.
pub const INVALID_MODULE_NAME: &str = "INVALID MODULE NUMBER";

/// Stable number identifying a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleId(u32);

impl ModuleId {
    /// Modules Manager.
    pub const MOD_MANAGER: Self = Self(1);
    /// S.M.A.R.T. Checker.
    pub const SMART_CHECKER: Self = Self(2);
    /// RSS Feed Notifier.
    pub const RSS_FEED_NOTIFIER: Self = Self(4);
    /// Email Sender.
    pub const EMAIL_SENDER: Self = Self(5);
    /// Weather Checker.
    pub const WEATHER_CHECKER: Self = Self(6);

    /// Wraps a raw module number. Unknown numbers are accepted and simply
    /// have no name.
    #[must_use]
    pub const fn new(number: u32) -> Self {
        Self(number)
    }

    /// Raw module number.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Display name, or [`INVALID_MODULE_NAME`] for unknown ids.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self.0 {
            1 => "Modules Manager",
            2 => "S.M.A.R.T. Checker",
            4 => "RSS Feed Notifier",
            5 => "Email Sender",
            6 => "Weather Checker",
            _ => INVALID_MODULE_NAME,
        }
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
