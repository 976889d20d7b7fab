//! Error surface for composing, queuing and sending email.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::shell::ShellError;

/// Errors raised by the [`Mailer`](super::Mailer).
#[derive(Debug, Error)]
pub enum EmailError {
    /// An email model file is missing or unreadable.
    #[error("email model '{path}' is missing or unreadable")]
    ModelMissing {
        /// Expected location of the model.
        path: PathBuf,
    },
    /// The message has nobody to go to.
    #[error("email has no recipient")]
    MissingRecipient,
    /// Writing the message to disk failed.
    #[error("failed to write email to '{path}': {source}")]
    Write {
        /// Destination of the message.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The mail transfer command failed.
    #[error("failed to send email: {source}")]
    Send {
        /// Failure reported by the shell.
        #[source]
        source: ShellError,
    },
}
