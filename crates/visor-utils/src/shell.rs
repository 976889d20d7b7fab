//! Shell command execution.
//!
//! Commands run through `bash -c` on Unix and `powershell.exe` on Windows.
//! Write `{{EXE}}` straight after a program name to call the program itself
//! rather than a PowerShell alias of the same name: the placeholder expands
//! to `.exe` on Windows and to nothing elsewhere.

use std::process::{Command, ExitStatus, Output};

use thiserror::Error;
use tracing::debug;

/// Tracing target for shell operations.
const SHELL_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::shell");

/// Placeholder expanded to the platform's executable suffix.
pub const EXE_PLACEHOLDER: &str = "{{EXE}}";

/// Captured output of a finished command, with `\n` line breaks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CmdOutput {
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
}

/// Errors raised by [`exec_cmd`].
#[derive(Debug, Error)]
pub enum ShellError {
    /// The shell could not be started.
    #[error("failed to spawn the shell: {source}")]
    Spawn {
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// The command ran but exited unsuccessfully.
    #[error("command exited with {status}")]
    NonZeroExit {
        /// Exit status reported by the shell.
        status: ExitStatus,
        /// Whatever the command printed before failing.
        output: CmdOutput,
    },
}

/// Runs `command` in the platform shell and captures its output.
pub fn exec_cmd(command: &str) -> Result<CmdOutput, ShellError> {
    let expanded = expand_exe_placeholder(command);
    debug!(target: SHELL_TARGET, command = %expanded, "running shell command");

    let Output {
        status,
        stdout,
        stderr,
    } = shell_command(&expanded)
        .output()
        .map_err(|source| ShellError::Spawn { source })?;

    let output = CmdOutput {
        stdout: normalise_line_breaks(&String::from_utf8_lossy(&stdout)),
        stderr: normalise_line_breaks(&String::from_utf8_lossy(&stderr)),
    };
    if status.success() {
        Ok(output)
    } else {
        debug!(target: SHELL_TARGET, %status, "shell command failed");
        Err(ShellError::NonZeroExit { status, output })
    }
}

/// Replaces every [`EXE_PLACEHOLDER`] with the platform's executable suffix.
#[must_use]
pub fn expand_exe_placeholder(command: &str) -> String {
    let suffix = if cfg!(windows) { ".exe" } else { "" };
    command.replace(EXE_PLACEHOLDER, suffix)
}

#[cfg(windows)]
fn shell_command(command: &str) -> Command {
    let mut shell = Command::new("powershell.exe");
    shell.arg(command);
    shell
}

#[cfg(not(windows))]
fn shell_command(command: &str) -> Command {
    let mut shell = Command::new("bash");
    shell.arg("-c").arg(command);
    shell
}

fn normalise_line_breaks(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}
