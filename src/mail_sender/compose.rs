use std::fs;
use std::path::{Path, PathBuf};

use lettre::message::header::{ContentTransferEncoding, ContentType};
use lettre::message::{Attachment, Body, Mailbox, MultiPart, SinglePart};
use lettre::Message;
use log::debug;

use crate::error::MailError;

/// One message to submit: recipients in order, a plain-text body and at most
/// one attachment read from disk at send time.
///
/// Line endings in `body` are sent as CRLF whatever the caller used, so a
/// body written with `\n` comes back from the mailbox with `\r\n`.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
    pub attachment: Option<PathBuf>,
}

impl OutboundMessage {
    pub fn new<I, S>(recipients: I, subject: impl Into<String>, body: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        OutboundMessage {
            recipients: recipients.into_iter().map(Into::into).collect(),
            subject: subject.into(),
            body: body.into(),
            attachment: None,
        }
    }

    pub fn with_attachment(mut self, path: impl Into<PathBuf>) -> Self {
        self.attachment = Some(path.into());
        self
    }

    /// Build the `multipart/mixed` message sent on behalf of `sender`.
    ///
    /// Fails with [`MailError::NoRecipients`] before touching the filesystem when
    /// the recipient list is empty.
    pub fn compose(&self, sender: &str) -> Result<Message, MailError> {
        if self.recipients.is_empty() {
            return Err(MailError::NoRecipients);
        }

        let mut builder = Message::builder()
            .from(parse_mailbox(sender)?)
            .subject(self.subject.as_str());

        for recipient in &self.recipients {
            builder = builder.to(parse_mailbox(recipient)?);
        }

        let mut multipart = MultiPart::mixed().singlepart(SinglePart::plain(self.body.clone()));

        if let Some(path) = &self.attachment {
            multipart = multipart.singlepart(attachment_part(path)?);
        }

        builder
            .multipart(multipart)
            .map_err(|e| MailError::Build(e.to_string()))
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address.parse().map_err(|e: lettre::address::AddressError| MailError::InvalidAddress {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

/// Last path segment, or the whole path when it has none.
pub fn attachment_filename(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// Always base64, whatever the bytes look like
fn attachment_part(path: &Path) -> Result<SinglePart, MailError> {
    let data = fs::read(path).map_err(|source| MailError::LocalIo {
        path: path.to_path_buf(),
        source,
    })?;
    let filename = attachment_filename(path);
    debug!("Adding attachment {} ({} bytes)", filename, data.len());

    let body = Body::new_with_encoding(data, ContentTransferEncoding::Base64)
        .map_err(|_| MailError::Build(format!("Cannot base64-encode {}", filename)))?;
    let content_type = ContentType::parse("application/octet-stream")
        .map_err(|e| MailError::Build(e.to_string()))?;

    Ok(Attachment::new(filename).body(body, content_type))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail_reader::message::ParsedMessage;
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

    fn round_trip(message: &OutboundMessage) -> ParsedMessage {
        let composed = message.compose("sender@example.com").unwrap();
        ParsedMessage::parse(&composed.formatted()).unwrap()
    }

    #[test]
    fn test_headers_and_body() {
        let outbound = OutboundMessage::new(
            ["bob@example.com", "carol@example.com", "dave@example.com"],
            "Quarterly numbers",
            "See the figures below.",
        );
        let parsed = round_trip(&outbound);

        assert_eq!(parsed.sender(), Some("sender@example.com"));
        assert_eq!(
            parsed.recipient(),
            Some("bob@example.com, carol@example.com, dave@example.com")
        );
        assert_eq!(parsed.subject(), Some("Quarterly numbers"));
        assert_eq!(parsed.content_type(), "multipart/mixed");

        let body = parsed.body_text().unwrap();
        assert_eq!(body.trim_end_matches(['\r', '\n']), "See the figures below.");
        assert!(parsed.attachments().is_empty());
    }

    #[test]
    fn test_body_line_endings_become_crlf() {
        let text = "line one\nline two\n\nlast line";
        let outbound = OutboundMessage::new(["bob@example.com"], "Lines", text);
        let formatted = outbound.compose("sender@example.com").unwrap().formatted();

        let wire = String::from_utf8_lossy(&formatted);
        assert!(wire.contains("line one\r\nline two\r\n\r\nlast line"));
        assert!(formatted
            .iter()
            .enumerate()
            .all(|(i, &b)| b != b'\n' || (i > 0 && formatted[i - 1] == b'\r')));

        let parsed = ParsedMessage::parse(&formatted).unwrap();
        let body = parsed.body_text().unwrap().replace("\r\n", "\n");
        assert_eq!(body.trim_end_matches('\n'), text);
    }

    #[test]
    fn test_recipient_order_is_preserved() {
        let outbound = OutboundMessage::new(["z@example.com", "a@example.com"], "", "");
        let parsed = round_trip(&outbound);
        assert_eq!(parsed.recipient(), Some("z@example.com, a@example.com"));
    }

    #[test]
    fn test_empty_recipients_rejected() {
        let outbound = OutboundMessage::new(Vec::<String>::new(), "Test", "body")
            .with_attachment("/definitely/not/here.bin");
        let err = outbound.compose("sender@example.com").unwrap_err();
        assert!(matches!(err, MailError::NoRecipients));
    }

    #[test]
    fn test_invalid_recipient_rejected() {
        let outbound = OutboundMessage::new(["not an address"], "Test", "body");
        let err = outbound.compose("sender@example.com").unwrap_err();
        assert!(matches!(err, MailError::InvalidAddress { ref address, .. } if address == "not an address"));
    }

    #[test]
    fn test_missing_attachment_is_local_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let outbound = OutboundMessage::new(["bob@example.com"], "Test", "body")
            .with_attachment(dir.path().join("missing.txt"));
        let err = outbound.compose("sender@example.com").unwrap_err();
        assert!(err.is_local_io());
    }

    #[test]
    fn test_text_attachment_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.txt");
        fs::write(&path, [0x48u8, 0x65, 0x6C, 0x6C, 0x6F]).unwrap();

        let outbound = OutboundMessage::new(["bob@example.com"], "Test", "This is a test email.")
            .with_attachment(&path);
        let parsed = round_trip(&outbound);

        assert_eq!(parsed.subject(), Some("Test"));
        let attachments = parsed.attachments();
        assert_eq!(attachments.len(), 1);

        let attachment = attachments[0];
        assert_eq!(attachment.filename(), Some("test.txt"));
        assert_eq!(attachment.content_type, "application/octet-stream");
        assert_eq!(
            attachment.headers.get("Content-Transfer-Encoding").map(str::to_ascii_lowercase),
            Some("base64".to_string())
        );

        let encoded: String = attachment.raw.chars().filter(|c| !c.is_whitespace()).collect();
        assert_eq!(BASE64.decode(encoded).unwrap(), vec![0x48, 0x65, 0x6C, 0x6C, 0x6F]);
        assert_eq!(attachment.content, b"Hello".to_vec());
    }

    #[test]
    fn test_binary_attachment_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.bin");
        let data: Vec<u8> = (0..=255u8).cycle().take(3000).collect();
        fs::write(&path, &data).unwrap();

        let outbound = OutboundMessage::new(["bob@example.com"], "Data", "attached")
            .with_attachment(&path);
        let parsed = round_trip(&outbound);

        let attachments = parsed.attachments();
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].content, data);
    }

    #[test]
    fn test_attachment_filename_is_last_segment() {
        assert_eq!(attachment_filename(Path::new("/tmp/reports/q3.pdf")), "q3.pdf");
        assert_eq!(attachment_filename(Path::new("test.txt")), "test.txt");
    }
}
