use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by every [`MailClient`](crate::MailClient) operation.
#[derive(Debug, Error)]
pub enum MailError {
    /// The credential environment variable is unset or empty
    #[error("Missing environment variable: {0}")]
    MissingCredential(String),

    /// Settings could not be loaded or are invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// A send was requested with an empty recipient list
    #[error("At least one recipient is required")]
    NoRecipients,

    /// A sender or recipient address could not be parsed
    #[error("Invalid email address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    /// Reading the attachment file failed
    #[error("Failed to read attachment {}: {source}", .path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The server rejected the credentials
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Connection, TLS or I/O failure while talking to the server
    #[error("Network failure: {0}")]
    Network(String),

    /// The server refused a command or answered with something unexpected
    #[error("Server error: {0}")]
    Protocol(String),

    /// Search text that cannot be sent as an IMAP quoted string
    #[error("Invalid search text {0:?}: line breaks are not allowed")]
    InvalidQuery(String),

    /// A fetched message could not be decoded
    #[error("Failed to parse message {id}: {reason}")]
    Parse { id: u32, reason: String },

    /// The outbound message could not be assembled
    #[error("Failed to build email: {0}")]
    Build(String),
}

impl MailError {
    pub fn is_authentication(&self) -> bool {
        matches!(self, MailError::Authentication(_))
    }

    pub fn is_network(&self) -> bool {
        matches!(self, MailError::Network(_))
    }

    pub fn is_local_io(&self) -> bool {
        matches!(self, MailError::LocalIo { .. })
    }
}

impl From<native_tls::Error> for MailError {
    fn from(err: native_tls::Error) -> Self {
        MailError::Network(format!("TLS error: {}", err))
    }
}

impl From<async_imap::error::Error> for MailError {
    fn from(err: async_imap::error::Error) -> Self {
        match err {
            async_imap::error::Error::Io(e) => MailError::Network(e.to_string()),
            other => MailError::Protocol(other.to_string()),
        }
    }
}
