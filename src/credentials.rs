use secrecy::{ExposeSecret, SecretString};
use std::env;

use crate::error::MailError;

/// Account secret shared by the SMTP and IMAP logins.
///
/// Resolved once, usually from the environment, and handed to
/// [`MailClient`](crate::MailClient). The `Debug` output is redacted.
#[derive(Debug, Clone)]
pub struct Credential {
    password: SecretString,
}

impl Credential {
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: SecretString::from(password.into()),
        }
    }

    /// Read the secret from `var`. Unset and empty values are both rejected.
    pub fn from_env(var: &str) -> Result<Self, MailError> {
        match env::var(var) {
            Ok(value) if !value.is_empty() => Ok(Self::new(value)),
            _ => Err(MailError::MissingCredential(var.to_string())),
        }
    }

    pub(crate) fn password(&self) -> &str {
        self.password.expose_secret()
    }
}
