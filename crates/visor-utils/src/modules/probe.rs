use crate::processes;

/// Answers whether the process behind a run marker still exists.
pub trait ProcessProbe {
    /// Returns `true` while `pid` names a running process.
    fn is_running(&self, pid: u32) -> bool;
}

/// Probes the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcessProbe;

impl ProcessProbe for SystemProcessProbe {
    fn is_running(&self, pid: u32) -> bool {
        processes::is_pid_running(i64::from(pid))
    }
}
