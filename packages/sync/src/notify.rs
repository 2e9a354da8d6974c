//! Delivery of the end-of-run summary.
//!
//! [`SendmailNotifier`] mails the summary through the local `sendmail`
//! binary. [`LogNotifier`] is used when no recipient is configured. The
//! summary has already been logged by the time a notifier runs.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt as _;

/// Errors delivering a notification. Never fatal to the run.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The mail program could not be started or written to.
    #[error("Failed to run {}: {source}", program.display())]
    Spawn {
        /// Program that was invoked.
        program: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The mail program exited unsuccessfully.
    #[error("{} exited with {status}", program.display())]
    Exit {
        /// Program that was invoked.
        program: PathBuf,
        /// Exit status.
        status: ExitStatus,
    },
}

/// Receives the summary once per run.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers `body` under `subject`.
    async fn notify(&self, subject: &str, body: &str) -> Result<(), NotifyError>;
}

/// Notifier for runs without a mail recipient. The summary already went to
/// the log, so this only notes that nothing was sent.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, subject: &str, _body: &str) -> Result<(), NotifyError> {
        log::debug!("No notification recipient configured; '{subject}' not sent");
        Ok(())
    }
}

/// Pipes the summary into `sendmail -t`.
pub struct SendmailNotifier {
    recipient: String,
    program: PathBuf,
}

impl SendmailNotifier {
    /// Default location of the `sendmail` binary.
    pub const DEFAULT_PROGRAM: &'static str = "/usr/sbin/sendmail";

    /// Mails `recipient` through [`Self::DEFAULT_PROGRAM`].
    #[must_use]
    pub fn new(recipient: impl Into<String>) -> Self {
        Self::with_program(recipient, Self::DEFAULT_PROGRAM)
    }

    /// Mails `recipient` through a specific `sendmail`-compatible program.
    #[must_use]
    pub fn with_program(recipient: impl Into<String>, program: impl Into<PathBuf>) -> Self {
        Self {
            recipient: recipient.into(),
            program: program.into(),
        }
    }

    fn message(&self, subject: &str, body: &str) -> String {
        format!("To: {}\nSubject: {subject}\n\n{body}\n", self.recipient)
    }

    fn spawn_error(&self, source: std::io::Error) -> NotifyError {
        NotifyError::Spawn {
            program: self.program.clone(),
            source,
        }
    }
}

#[async_trait]
impl Notifier for SendmailNotifier {
    async fn notify(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        let mut child = tokio::process::Command::new(&self.program)
            .arg("-t")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(self.message(subject, body).as_bytes())
                .await
                .map_err(|e| self.spawn_error(e))?;
        }

        let status = child.wait().await.map_err(|e| self.spawn_error(e))?;
        if !status.success() {
            return Err(NotifyError::Exit {
                program: self.program.clone(),
                status,
            });
        }

        log::info!("Sent '{subject}' to {}", self.recipient);
        Ok(())
    }
}
