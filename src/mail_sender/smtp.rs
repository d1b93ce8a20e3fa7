use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::response::Response;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use log::{debug, info};

use crate::credentials::Credential;
use crate::error::MailError;
use crate::settings::Settings;

// 530 auth required, 534 mechanism too weak, 535 credentials rejected
const AUTH_FAILURE_CODES: [&str; 3] = ["530", "534", "535"];

/// Submit `message` over a fresh STARTTLS session.
///
/// The transport is built for this one call; lettre connects, authenticates,
/// sends and quits, and drops the connection if any step fails.
pub(crate) async fn submit(
    settings: &Settings,
    username: &str,
    credential: &Credential,
    message: Message,
) -> Result<Response, MailError> {
    let creds = Credentials::new(username.to_string(), credential.password().to_string());

    let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.server)
        .map_err(|e| MailError::Network(e.to_string()))?
        .port(settings.smtp_port)
        .credentials(creds)
        .build();

    debug!("-- submitting to {}:{}", settings.server, settings.smtp_port);
    let response = transport.send(message).await.map_err(classify)?;

    info!("-- {} accepted the message ({})", settings.server, response.code());
    Ok(response)
}

fn classify(err: lettre::transport::smtp::Error) -> MailError {
    let code = err.status().map(|code| code.to_string());
    classify_code(code.as_deref(), err.is_client(), err.to_string())
}

// Reply code first; without one, a client-side failure is still a protocol error
fn classify_code(code: Option<&str>, is_client: bool, detail: String) -> MailError {
    match code {
        Some(code) if AUTH_FAILURE_CODES.contains(&code) => MailError::Authentication(detail),
        Some(_) => MailError::Protocol(detail),
        None if is_client => MailError::Protocol(detail),
        None => MailError::Network(detail),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detail() -> String {
        "rejected".to_string()
    }

    #[test]
    fn test_auth_reply_codes_are_authentication_failures() {
        for code in AUTH_FAILURE_CODES {
            let err = classify_code(Some(code), false, detail());
            assert!(err.is_authentication(), "{} should be an auth failure", code);
        }
    }

    #[test]
    fn test_other_reply_codes_are_protocol_errors() {
        assert!(matches!(
            classify_code(Some("550"), false, detail()),
            MailError::Protocol(_)
        ));
        assert!(matches!(
            classify_code(Some("421"), false, detail()),
            MailError::Protocol(_)
        ));
    }

    #[test]
    fn test_no_reply_code() {
        assert!(classify_code(None, false, detail()).is_network());
        assert!(matches!(
            classify_code(None, true, detail()),
            MailError::Protocol(_)
        ));
    }

    #[test]
    fn test_detail_is_kept() {
        let err = classify_code(Some("535"), false, "5.7.8 Bad credentials".to_string());
        assert_eq!(err.to_string(), "Authentication failed: 5.7.8 Bad credentials");
    }
}
