use std::fmt;
use std::path::Path;

use log::{info, warn};

use crate::credentials::Credential;
use crate::error::MailError;
use crate::mail_reader::imap::search_mailbox;
use crate::mail_reader::{ParsedMessage, SearchCriteria};
use crate::mail_sender::{smtp, OutboundMessage};
use crate::settings::Settings;

/// Sends mail over SMTP and searches one IMAP mailbox, both on the same host.
///
/// Holds no connection: every call opens its own session and closes it before
/// returning, so one client can be reused freely.
#[derive(Debug, Clone)]
pub struct MailClient {
    sender: String,
    credential: Credential,
    settings: Settings,
}

/// Returned by a successful [`MailClient::send`].
#[derive(Debug, Clone, PartialEq)]
pub struct SendReport {
    pub recipients: usize,
    pub reply: String,
}

impl fmt::Display for SendReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Email sent successfully.")
    }
}

impl MailClient {
    pub fn new(sender: impl Into<String>, credential: Credential, settings: Settings) -> Self {
        MailClient {
            sender: sender.into(),
            credential,
            settings,
        }
    }

    /// Resolve the credential from `settings.password_env` once, now.
    pub fn from_env(sender: impl Into<String>, settings: Settings) -> Result<Self, MailError> {
        let credential = Credential::from_env(&settings.password_env)?;
        Ok(Self::new(sender, credential, settings))
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub async fn send(
        &self,
        recipients: &[&str],
        subject: &str,
        body: &str,
        attachment: Option<&Path>,
    ) -> Result<SendReport, MailError> {
        let mut message = OutboundMessage::new(recipients.iter().copied(), subject, body);
        if let Some(path) = attachment {
            message = message.with_attachment(path);
        }
        self.send_message(&message).await
    }

    /// Compose and submit `message`; every failure comes back as an `Err`.
    pub async fn send_message(&self, message: &OutboundMessage) -> Result<SendReport, MailError> {
        let result = self.try_send(message).await;
        match &result {
            Ok(report) => info!("{} ({} recipients)", report, report.recipients),
            Err(e) => warn!("Send to {} recipients failed: {}", message.recipients.len(), e),
        }
        result
    }

    async fn try_send(&self, message: &OutboundMessage) -> Result<SendReport, MailError> {
        let composed = message.compose(&self.sender)?;
        let response = smtp::submit(&self.settings, &self.sender, &self.credential, composed).await?;

        Ok(SendReport {
            recipients: message.recipients.len(),
            reply: response.message().collect::<Vec<_>>().join(" "),
        })
    }

    /// Run one search against the configured mailbox.
    pub async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<ParsedMessage>, MailError> {
        search_mailbox(&self.settings, &self.sender, &self.credential, criteria).await
    }

    pub async fn get_emails_by_subject(&self, subject: &str) -> Result<Vec<ParsedMessage>, MailError> {
        self.search(&SearchCriteria::Subject(subject.to_string())).await
    }

    pub async fn get_emails_by_sender(&self, sender: &str) -> Result<Vec<ParsedMessage>, MailError> {
        self.search(&SearchCriteria::Sender(sender.to_string())).await
    }

    pub async fn get_emails_by_recipient(&self, recipient: &str) -> Result<Vec<ParsedMessage>, MailError> {
        self.search(&SearchCriteria::Recipient(recipient.to_string())).await
    }

    /// Fetches every message in the mailbox, then keeps those whose raw payload
    /// contains `body`.
    pub async fn get_emails_by_body(&self, body: &str) -> Result<Vec<ParsedMessage>, MailError> {
        self.search(&SearchCriteria::Body(body.to_string())).await
    }

    /// Fetches every message in the mailbox, then keeps those whose `Date`
    /// header contains `date`.
    pub async fn get_emails_by_date(&self, date: &str) -> Result<Vec<ParsedMessage>, MailError> {
        self.search(&SearchCriteria::Date(date.to_string())).await
    }
}
