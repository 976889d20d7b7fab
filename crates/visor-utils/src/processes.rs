//! Process probing and detached launches.

use std::io;
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::debug;

const PROCESSES_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::processes");

/// Reports whether a process with `pid` exists.
///
/// A process owned by another user still counts as running. Non-positive and
/// out-of-range ids never do.
#[cfg(unix)]
#[must_use]
pub fn is_pid_running(pid: i64) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    if raw <= 0 {
        return false;
    }
    match kill(Pid::from_raw(raw), None) {
        Ok(()) | Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

/// Reports whether a process with `pid` exists.
///
/// Without a signal probe every positive id is assumed to be running, which
/// errs on the side of not stealing a live claim.
#[cfg(not(unix))]
#[must_use]
pub fn is_pid_running(pid: i64) -> bool {
    pid > 0 && u32::try_from(pid).is_ok()
}

/// Starts the program at `path` as a separate process that outlives the
/// caller.
pub fn start_process(path: &Path) -> io::Result<()> {
    debug!(target: PROCESSES_TARGET, path = %path.display(), "starting detached process");
    let status = launcher(path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()?;
    if status.success() {
        Ok(())
    } else {
        Err(io::Error::other(format!(
            "launcher for '{}' exited with {status}",
            path.display()
        )))
    }
}

// The intermediate shell backgrounds the program and exits straight away, so
// the program is reparented instead of lingering as our child.
#[cfg(not(windows))]
fn launcher(path: &Path) -> Command {
    let mut command = Command::new("sh");
    command.arg("-c").arg("\"$0\" &").arg(path);
    command
}

#[cfg(windows)]
fn launcher(path: &Path) -> Command {
    let mut command = Command::new("powershell.exe");
    command.arg("/C").arg("start").arg(path);
    command
}
