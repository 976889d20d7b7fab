//! Behavioural suites for the module lifecycle coordinator.

pub(crate) mod support;
