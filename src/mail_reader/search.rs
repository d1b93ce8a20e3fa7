use std::fmt;

use crate::error::MailError;
use crate::mail_reader::message::ParsedMessage;

/// The canned mailbox searches.
///
/// Subject, sender and recipient are answered by the server (IMAP `SEARCH`
/// substring matching, case-insensitive on every common server). Body and date
/// fetch the whole mailbox and filter locally with a case-sensitive substring
/// test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchCriteria {
    Subject(String),
    Sender(String),
    Recipient(String),
    Body(String),
    Date(String),
}

impl SearchCriteria {
    /// The IMAP `SEARCH` key sent to the server.
    ///
    /// Text containing CR or LF is rejected: a quoted string cannot carry line
    /// breaks and the command line would end early.
    pub fn server_query(&self) -> Result<String, MailError> {
        let query = match self {
            SearchCriteria::Subject(text) => format!("SUBJECT {}", quote(text)?),
            SearchCriteria::Sender(text) => format!("FROM {}", quote(text)?),
            SearchCriteria::Recipient(text) => format!("TO {}", quote(text)?),
            SearchCriteria::Body(_) | SearchCriteria::Date(_) => "ALL".to_string(),
        };
        Ok(query)
    }

    pub fn is_server_side(&self) -> bool {
        !matches!(self, SearchCriteria::Body(_) | SearchCriteria::Date(_))
    }

    /// Client-side filter applied to each fetched message.
    pub fn matches(&self, message: &ParsedMessage) -> bool {
        match self {
            SearchCriteria::Body(text) => message.raw_payload().contains(text.as_str()),
            SearchCriteria::Date(text) => message
                .date()
                .is_some_and(|date| date.contains(text.as_str())),
            _ => true,
        }
    }
}

impl fmt::Display for SearchCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (field, text) = match self {
            SearchCriteria::Subject(text) => ("subject", text),
            SearchCriteria::Sender(text) => ("sender", text),
            SearchCriteria::Recipient(text) => ("recipient", text),
            SearchCriteria::Body(text) => ("body", text),
            SearchCriteria::Date(text) => ("date", text),
        };
        write!(f, "{} contains {:?}", field, text)
    }
}

// IMAP quoted string: backslash and double quote are escaped, CR and LF refused
fn quote(text: &str) -> Result<String, MailError> {
    if text.contains(['\r', '\n']) {
        return Err(MailError::InvalidQuery(text.to_string()));
    }
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for c in text.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    Ok(quoted)
}
