//! Email composition, queuing and delivery.
//!
//! Messages are rendered from model files kept in the Email Sender module's
//! program-data directory. Other modules queue rendered messages into the
//! Email Sender's `to_send/` directory; only the Email Sender itself (and the
//! failure boundary, which cannot rely on anyone else) hands messages to
//! `curl` directly.

mod errors;
mod quoted_printable;

use std::path::PathBuf;

use tracing::{debug, info};
use visor_config::{Config, ModuleDirs};

use crate::modules::ModuleId;
use crate::{files, general, shell, timedate};

pub use errors::EmailError;
pub use quoted_printable::to_quoted_printable;

const EMAIL_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::email");

/// Model for informational messages.
pub const MODEL_FILE_INFO: &str = "model_email_info.html";
/// Model for RSS feed notifications.
pub const MODEL_FILE_RSS: &str = "model_email_rss.html";
/// Model for YouTube video notifications.
pub const MODEL_FILE_YT_VIDEO: &str = "model_email_video_YouTube.html";
/// Model for disk health reports.
pub const MODEL_FILE_DISKS_SMART: &str = "model_email_disks_smart.html";
const MODEL_FILE_MESSAGE_EML: &str = "model_message.eml";

/// Placeholder for the body of [`MODEL_FILE_INFO`].
pub const MODEL_INFO_MSG_BODY: &str = "|3234_MSG_BODY|";
/// Placeholder for the date and time of [`MODEL_FILE_INFO`].
pub const MODEL_INFO_DATE_TIME: &str = "|3234_DATE_TIME|";

const PH_HTML: &str = "|3234_MSG_HTML|";
const PH_SUBJECT: &str = "|3234_MSG_SUBJECT|";
const PH_SENDER_NAME: &str = "|3234_MSG_SENDER_NAME|";
const PH_MULTIPARTS: &str = "|3234_MSG_MULTIPARTS|";
const PH_BOUNDARY: &str = "|3234_MSG_BOUNDARY|";

const EMAIL_MODELS_DIR: &str = "email_models";
/// Queue directory below the Email Sender's program-data directory.
pub const TO_SEND_DIR: &str = "to_send";
const TEMP_EML_FILE: &str = "msg_temp.eml";

/// Length of the random prefix of queued file names.
pub const RAND_STR_LEN: usize = 10;
const BOUNDARY_LEN: usize = 25;

/// Sender name used for messages built from models.
pub const DEFAULT_SENDER_NAME: &str = "V.I.S.O.R. Systems";

/// What a message says and to whom.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailInfo {
    /// Display name of the sender.
    pub sender: String,
    /// Recipient address.
    pub mail_to: String,
    /// Subject line.
    pub subject: String,
    /// HTML body.
    pub html: String,
    /// Extra MIME parts, such as inline images.
    pub multiparts: Vec<Multipart>,
}

/// An extra MIME part (RFC 1521) attached next to the HTML body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Multipart {
    /// `Content-Type` header value.
    pub content_type: String,
    /// `Content-Transfer-Encoding` header value.
    pub content_transfer_encoding: String,
    /// `Content-ID`, without angle brackets.
    pub content_id: String,
    /// Already encoded body.
    pub body: String,
}

/// Composes and delivers messages on behalf of a module.
#[derive(Debug, Clone)]
pub struct Mailer<'a> {
    config: &'a Config,
    email_sender: ModuleDirs,
}

impl<'a> Mailer<'a> {
    /// Creates a mailer working with the Email Sender's directories.
    #[must_use]
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            email_sender: ModuleDirs::derive(config, ModuleId::EMAIL_SENDER.get()),
        }
    }

    /// Reads a model file from the Email Sender's `email_models/` directory.
    pub fn model_file(&self, name: &str) -> Result<String, EmailError> {
        let path = self
            .email_sender
            .program_data_dir()
            .join(EMAIL_MODELS_DIR)
            .join(name);
        files::read_text(&path).ok_or(EmailError::ModelMissing { path })
    }

    /// Builds a message addressed to the configured owner from a model file,
    /// applying each `(placeholder, value)` replacement to its HTML.
    pub fn model_email(
        &self,
        model: &str,
        replacements: &[(&str, &str)],
    ) -> Result<EmailInfo, EmailError> {
        let html = replacements
            .iter()
            .fold(self.model_file(model)?, |html, (placeholder, value)| {
                html.replace(placeholder, value)
            });
        Ok(EmailInfo {
            sender: DEFAULT_SENDER_NAME.to_owned(),
            mail_to: self.config.my_email_addr.clone(),
            subject: String::new(),
            html,
            multiparts: Vec::new(),
        })
    }

    /// Renders the complete EML document of `info`.
    pub fn prepare_eml(&self, info: &EmailInfo) -> Result<String, EmailError> {
        let template = self.model_file(MODEL_FILE_MESSAGE_EML)?;
        Ok(render_eml(&template, info))
    }

    /// Queues `info` for the Email Sender and returns the queued file.
    ///
    /// The file name is a random prefix followed by the recipient; a name
    /// already in the queue is never overwritten.
    pub fn queue_email(&self, info: &EmailInfo) -> Result<PathBuf, EmailError> {
        if info.mail_to.is_empty() {
            return Err(EmailError::MissingRecipient);
        }
        let message = self.prepare_eml(info)?;
        let queue = self.email_sender.program_data_dir().join(TO_SEND_DIR);
        loop {
            let name = format!(
                "{}{}.eml",
                general::rand_string(RAND_STR_LEN),
                info.mail_to
            );
            let path = queue.join(name);
            match files::write_text_new(&path, &message) {
                Ok(()) => {
                    debug!(target: EMAIL_TARGET, file = %path.display(), "email queued");
                    return Ok(path);
                }
                Err(error) if error.kind() == std::io::ErrorKind::AlreadyExists => {}
                Err(source) => return Err(EmailError::Write { path, source }),
            }
        }
    }

    /// Sends a rendered EML document to `mail_to` through `curl`.
    pub fn send_email(&self, message_eml: &str, mail_to: &str) -> Result<(), EmailError> {
        if mail_to.is_empty() {
            return Err(EmailError::MissingRecipient);
        }
        let path = self.email_sender.temp_dir().join(TEMP_EML_FILE);
        files::write_text(&path, message_eml).map_err(|source| EmailError::Write {
            path: path.clone(),
            source,
        })?;

        // The command line carries the password, so only the recipient is
        // logged.
        info!(target: EMAIL_TARGET, mail_to, "sending email");
        shell::exec_cmd(&self.curl_command(mail_to, &path.display().to_string()))
            .map_err(|source| EmailError::Send { source })?;
        Ok(())
    }

    /// Emails the owner the fatal error `report` of `module`.
    pub fn send_module_error_email(
        &self,
        module: ModuleId,
        report: &str,
    ) -> Result<(), EmailError> {
        let date_time = timedate::date_time_str();
        let mut info = self.model_email(
            MODEL_FILE_INFO,
            &[
                (MODEL_INFO_MSG_BODY, report),
                (MODEL_INFO_DATE_TIME, &date_time),
            ],
        )?;
        info.subject = format!("Error in module: {}", module.name());
        let message = self.prepare_eml(&info)?;
        self.send_email(&message, &info.mail_to)
    }

    fn curl_command(&self, mail_to: &str, eml_path: &str) -> String {
        format!(
            "curl{exe} --location --connect-timeout 4294967295 \"{url}\" --user \"{user}:{password}\" \
             --mail-rcpt \"{mail_to}\" --upload-file \"{eml_path}\" --ssl",
            exe = shell::EXE_PLACEHOLDER,
            url = self.config.smtp_url,
            user = self.config.visor_email_addr,
            password = self.config.visor_email_pw,
        )
    }
}

/// Fills the EML `template` with the contents of `info`.
///
/// The subject and sender name are substituted into the HTML before it is
/// quoted-printable encoded. The MIME boundary is a random string chosen so
/// it occurs nowhere else in the message.
#[must_use]
pub fn render_eml(template: &str, info: &EmailInfo) -> String {
    let html = info
        .html
        .replace(PH_SUBJECT, &info.subject)
        .replace(PH_SENDER_NAME, &info.sender);

    let multiparts: String = info
        .multiparts
        .iter()
        .map(|part| {
            format!(
                "\n--{PH_BOUNDARY}\nContent-Type: {}\nContent-Transfer-Encoding: {}\n\
                 Content-ID: <{}>\n\n{}\n\n",
                part.content_type, part.content_transfer_encoding, part.content_id, part.body
            )
        })
        .collect();

    let message = template
        .replace(PH_HTML, &to_quoted_printable(&html))
        .replace(PH_SUBJECT, &info.subject)
        .replace(PH_SENDER_NAME, &info.sender)
        .replace(PH_MULTIPARTS, &multiparts);

    let boundary = loop {
        let candidate = general::rand_string(BOUNDARY_LEN);
        if !message.contains(&candidate) {
            break candidate;
        }
    };
    message.replace(PH_BOUNDARY, &boundary)
}
