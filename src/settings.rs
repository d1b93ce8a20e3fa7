use serde::Deserialize;

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use backtrace::Backtrace;
use log::error;

use crate::error::MailError;

pub const DEFAULT_SMTP_PORT: u16 = 587;
pub const DEFAULT_IMAP_PORT: u16 = 993;
pub const DEFAULT_MAILBOX: &str = "INBOX";
pub const DEFAULT_PASSWORD_ENV: &str = "EMAIL_PASSWORD";
pub const DEFAULT_SERVER: &str = "smtp.gmail.com";
pub const DEFAULT_SETTINGS_PATH: &str = "resources/settings.yaml";

// One host serves both roles, the port picks the protocol
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Settings {
    pub server: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default = "default_imap_port")]
    pub imap_port: u16,
    #[serde(default = "default_mailbox")]
    pub mailbox: String,
    #[serde(default = "default_password_env")]
    pub password_env: String,
}

fn default_smtp_port() -> u16 {
    DEFAULT_SMTP_PORT
}

fn default_imap_port() -> u16 {
    DEFAULT_IMAP_PORT
}

fn default_mailbox() -> String {
    DEFAULT_MAILBOX.to_string()
}

fn default_password_env() -> String {
    DEFAULT_PASSWORD_ENV.to_string()
}

impl Settings {
    pub fn for_server(server: impl Into<String>) -> Self {
        Settings {
            server: server.into(),
            smtp_port: DEFAULT_SMTP_PORT,
            imap_port: DEFAULT_IMAP_PORT,
            mailbox: default_mailbox(),
            password_env: default_password_env(),
        }
    }
}

pub fn parse_settings(yaml: &str) -> Result<Settings, MailError> {
    let settings: Settings = serde_yaml::from_str(yaml)
        .map_err(|e| MailError::Config(format!("Cannot deserialize settings: {}", e)))?;
    validate(settings)
}

pub fn load_settings(path: &Path) -> Result<Settings, MailError> {
    // Open the YAML file
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) => {
            error!("Error: {}", err);

            // Capture and print the backtrace
            let backtrace = Backtrace::new();
            error!("Backtrace:\n{:?}", backtrace);
            return Err(MailError::Config(format!(
                "Cannot find settings at {}: {}",
                path.display(),
                err
            )));
        }
    };

    let reader = BufReader::new(file);

    // Parse the YAML file into the Settings struct
    let settings: Settings = match serde_yaml::from_reader(reader) {
        Ok(settings) => settings,
        Err(err) => {
            error!("Error: {}", err);

            let backtrace = Backtrace::new();
            error!("Backtrace:\n{:?}", backtrace);
            return Err(MailError::Config(format!("Cannot deserialize settings: {}", err)));
        }
    };

    validate(settings)
}

/// Pick the settings for one run.
///
/// An explicit file wins, then an explicit server. With neither, the file at
/// `default_path` is used when it exists, otherwise [`DEFAULT_SERVER`].
pub fn resolve_settings(
    config: Option<&Path>,
    server: Option<&str>,
    default_path: &Path,
) -> Result<Settings, MailError> {
    match (config, server) {
        (Some(path), _) => load_settings(path),
        (None, Some(server)) => validate(Settings::for_server(server)),
        (None, None) if default_path.is_file() => load_settings(default_path),
        (None, None) => Ok(Settings::for_server(DEFAULT_SERVER)),
    }
}

fn validate(settings: Settings) -> Result<Settings, MailError> {
    if settings.server.trim().is_empty() {
        return Err(MailError::Config("server must not be empty".to_string()));
    }
    Ok(settings)
}
