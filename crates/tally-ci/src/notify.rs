//! Report delivery over SMTP.

use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{info, warn};
use uuid::Uuid;

use tally_core::config::SmtpConfig;
use tally_core::domain::error::{Result, TallyError};
use tally_core::domain::report::Report;
use tally_core::report_html::{render_html, render_text};

/// Sends one multipart message per run: To = the fixed manager address,
/// Cc = the commit author when resolvable.
pub struct Mailer {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    sender: String,
    manager: String,
}

impl Mailer {
    /// Build an authenticated STARTTLS mailer from configuration.
    pub fn from_config(config: &SmtpConfig) -> Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.relay)
            .map_err(|e| TallyError::Mail(format!("relay {}: {e}", config.relay)))?
            .port(config.port)
            .credentials(Credentials::new(
                config.sender.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self {
            transport: Some(transport),
            sender: config.sender.clone(),
            manager: config.manager.clone(),
        })
    }

    /// A mailer that renders and logs but never connects. For tests and
    /// dry runs.
    pub fn disabled(sender: impl Into<String>, manager: impl Into<String>) -> Self {
        Self {
            transport: None,
            sender: sender.into(),
            manager: manager.into(),
        }
    }

    /// Deliver the report. Failures are logged and swallowed; the run is
    /// complete whether or not the relay confirms delivery.
    pub async fn deliver(&self, report: &Report) {
        match self.send(report).await {
            Ok(true) => {
                info!(subject = %report.subject(), to = %self.manager, "report delivered")
            }
            Ok(false) => {
                info!(subject = %report.subject(), "mail transport disabled, report not sent")
            }
            Err(e) => warn!(error = %e, "report delivery failed"),
        }
    }

    async fn send(&self, report: &Report) -> Result<bool> {
        let from: Mailbox = self
            .sender
            .parse()
            .map_err(|e| TallyError::Mail(format!("sender address: {e}")))?;
        let to: Mailbox = self
            .manager
            .parse()
            .map_err(|e| TallyError::Mail(format!("manager address: {e}")))?;

        let mut builder = Message::builder()
            .from(from)
            .to(to)
            .subject(report.subject())
            .message_id(Some(format!("<{}@tally>", Uuid::new_v4())));

        // Cc the author on a best-effort basis; an unparseable address
        // only downgrades delivery to manager-only.
        if let Some(author) = &report.author_email {
            match author.parse::<Mailbox>() {
                Ok(cc) => builder = builder.cc(cc),
                Err(e) => warn!(author = %author, error = %e, "skipping unparseable author address"),
            }
        }

        let message = builder
            .multipart(MultiPart::alternative_plain_html(
                render_text(report),
                render_html(report),
            ))
            .map_err(|e| TallyError::Mail(format!("building message: {e}")))?;

        match &self.transport {
            Some(transport) => {
                transport
                    .send(message)
                    .await
                    .map_err(|e| TallyError::Mail(e.to_string()))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
