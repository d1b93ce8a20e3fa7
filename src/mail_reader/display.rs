use crate::mail_reader::message::ParsedMessage;
use log::{info, error};
use serde::Serialize;

const BODY_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Serialize, PartialEq)]
pub struct MessageSummary<'a> {
    pub message_id: Option<&'a str>,
    pub subject: Option<&'a str>,
    pub from: Option<&'a str>,
    pub to: Option<&'a str>,
    pub date: Option<&'a str>,
    pub content_type: &'a str,
    pub body: Option<String>,
    pub attachments: Vec<&'a str>,
}

impl<'a> From<&'a ParsedMessage> for MessageSummary<'a> {
    fn from(message: &'a ParsedMessage) -> Self {
        MessageSummary {
            message_id: message.message_id(),
            subject: message.subject(),
            from: message.sender(),
            to: message.recipient(),
            date: message.date(),
            content_type: message.content_type(),
            body: message
                .body_text()
                .map(|text| text.chars().take(BODY_PREVIEW_CHARS).collect()),
            attachments: message
                .attachments()
                .into_iter()
                .filter_map(|part| part.filename())
                .collect(),
        }
    }
}

pub fn display_messages(messages: &[ParsedMessage]) {
    messages
        .iter()
        .for_each(|message| {
            match serde_json::to_string_pretty(&MessageSummary::from(message)) {
                Ok(json) => info!("{}", json),
                Err(e) => error!("Error converting to JSON: {}", e),
            }
            info!("---");
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_of_message_with_attachment() {
        let raw = concat!(
            "From: alice@example.com\r\n",
            "To: bob@example.com\r\n",
            "Subject: Report\r\n",
            "Content-Type: multipart/mixed; boundary=\"b\"\r\n",
            "\r\n",
            "--b\r\n",
            "Content-Type: text/plain\r\n",
            "\r\n",
            "numbers inside\r\n",
            "--b\r\n",
            "Content-Type: application/octet-stream\r\n",
            "Content-Disposition: attachment; filename=\"q3.xlsx\"\r\n",
            "\r\n",
            "xx\r\n",
            "--b--\r\n",
        );
        let message = ParsedMessage::parse(raw.as_bytes()).unwrap();
        let summary = MessageSummary::from(&message);

        assert_eq!(summary.subject, Some("Report"));
        assert_eq!(summary.from, Some("alice@example.com"));
        assert_eq!(summary.content_type, "multipart/mixed");
        assert_eq!(summary.attachments, vec!["q3.xlsx"]);
        assert!(summary.body.unwrap().starts_with("numbers inside"));

        let json = serde_json::to_value(MessageSummary::from(&message)).unwrap();
        assert_eq!(json["to"], "bob@example.com");
        assert_eq!(json["message_id"], serde_json::Value::Null);
    }
}
