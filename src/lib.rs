//! # postbox
//!
//! A thin mail client: send one message over SMTP, search an IMAP mailbox, and
//! pick fields and attachments out of the parsed results.
//!
//! ```no_run
//! use postbox::{MailClient, Settings};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), postbox::MailError> {
//!     let client = MailClient::from_env("me@example.com", Settings::for_server("mail.example.com"))?;
//!
//!     client.send(&["you@example.com"], "Hello", "Just checking in.", None).await?;
//!
//!     for message in client.get_emails_by_subject("Hello").await? {
//!         println!("{:?} from {:?}", message.subject(), message.sender());
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod credentials;
pub mod error;
pub mod logging;
pub mod mail_reader;
pub mod mail_sender;
pub mod settings;


pub use client::{MailClient, SendReport};
pub use credentials::Credential;
pub use error::MailError;
pub use mail_reader::{Headers, LeafPart, ParsedMessage, Payload, SearchCriteria};
pub use mail_sender::OutboundMessage;
pub use settings::Settings;
