use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::Parser;
use log::info;

use postbox::logging::{level_for_verbosity, setup_logger};
use postbox::mail_reader::display::display_messages;
use postbox::settings::{resolve_settings, DEFAULT_SETTINGS_PATH};
use postbox::MailClient;

/// Send a test message, then look for it by subject.
#[derive(Debug, Parser)]
#[command(name = "postbox", version)]
struct Cli {
    /// The email address of the sender.
    #[arg(long = "from_email")]
    from_email: Option<String>,

    /// The email address of the recipient.
    #[arg(long = "to_email")]
    to_email: Option<String>,

    /// Host serving both SMTP and IMAP [default: smtp.gmail.com].
    #[arg(long)]
    server: Option<String>,

    /// YAML settings file; overrides --server. Without either flag,
    /// resources/settings.yaml is read when present.
    #[arg(long)]
    config: Option<PathBuf>,

    /// File attached to the test message.
    #[arg(long, default_value = "test.txt")]
    attachment: PathBuf,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logger(level_for_verbosity(cli.verbose))?;

    let Some(from_email) = cli.from_email else {
        bail!("Please provide the email address of the sender.");
    };
    let Some(to_email) = cli.to_email else {
        bail!("Please provide the email address of the recipient.");
    };

    let settings = resolve_settings(
        cli.config.as_deref(),
        cli.server.as_deref(),
        Path::new(DEFAULT_SETTINGS_PATH),
    )?;
    let client = MailClient::from_env(from_email, settings)?;

    match client
        .send(&[to_email.as_str()], "Test", "This is a test email.", Some(cli.attachment.as_path()))
        .await
    {
        Ok(report) => println!("{}", report),
        Err(e) => println!("Failed to send email. Error: {}", e),
    }

    let messages = client.get_emails_by_subject("Test").await?;
    info!("Found {} messages with subject \"Test\"", messages.len());
    display_messages(&messages);

    Ok(())
}
