use async_imap::{Client, Session};
use futures::TryStreamExt;
use tokio::net::TcpStream;
use tokio_native_tls::TlsStream;
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};

use crate::credentials::Credential;
use crate::error::MailError;
use crate::mail_reader::message::ParsedMessage;
use crate::mail_reader::search::SearchCriteria;
use crate::settings::Settings;
use log::{debug, info, warn};

type ImapStream = Compat<TlsStream<TcpStream>>;

/// The handful of mailbox-access commands a search needs.
pub(crate) trait MailboxSession: Sized {
    /// Select `mailbox`, returning its message count.
    async fn select(&mut self, mailbox: &str) -> Result<u32, MailError>;

    /// Run a `SEARCH` and return the matching sequence numbers, ascending.
    async fn search(&mut self, query: &str) -> Result<Vec<u32>, MailError>;

    /// Full RFC 822 bytes of one message.
    async fn fetch_raw(&mut self, id: u32) -> Result<Vec<u8>, MailError>;

    async fn logout(self) -> Result<(), MailError>;
}

pub(crate) struct ImapMailbox {
    session: Session<ImapStream>,
}

// Establish a TLS-encrypted connection to the IMAP server
async fn connect_to_server(server: &str, port: u16) -> Result<TlsStream<TcpStream>, MailError> {
    let tcp_stream = TcpStream::connect((server, port))
        .await
        .map_err(|e| MailError::Network(format!("Failed to connect to {}:{}: {}", server, port, e)))?;
    let tls = tokio_native_tls::TlsConnector::from(native_tls::TlsConnector::new()?);
    let tls_stream = tls.connect(server, tcp_stream).await?;

    info!("-- connected to {}:{}", server, port);
    Ok(tls_stream)
}

// Login to the IMAP server and return an authenticated session
async fn login_to_server(
    client: Client<ImapStream>,
    username: &str,
    credential: &Credential,
) -> Result<Session<ImapStream>, MailError> {
    let imap_session = client
        .login(username, credential.password())
        .await
        .map_err(|(err, _client)| match err {
            async_imap::error::Error::No(msg) | async_imap::error::Error::Bad(msg) => {
                MailError::Authentication(msg)
            }
            other => MailError::from(other),
        })?;

    info!("-- logged in as {}", username);
    Ok(imap_session)
}

impl ImapMailbox {
    pub(crate) async fn connect(
        settings: &Settings,
        username: &str,
        credential: &Credential,
    ) -> Result<Self, MailError> {
        let tls_stream = connect_to_server(&settings.server, settings.imap_port).await?;
        let client = Client::new(tls_stream.compat());
        let session = login_to_server(client, username, credential).await?;
        Ok(ImapMailbox { session })
    }
}

impl MailboxSession for ImapMailbox {
    async fn select(&mut self, mailbox: &str) -> Result<u32, MailError> {
        let mailbox_data = self.session.select(mailbox).await?;
        info!("-- {} selected", mailbox);
        Ok(mailbox_data.exists)
    }

    async fn search(&mut self, query: &str) -> Result<Vec<u32>, MailError> {
        let ids = self.session.search(query).await?;
        let mut ids: Vec<u32> = ids.into_iter().collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn fetch_raw(&mut self, id: u32) -> Result<Vec<u8>, MailError> {
        let messages_stream = self.session.fetch(id.to_string(), "RFC822").await?;
        let messages: Vec<_> = messages_stream.try_collect().await?;

        messages
            .iter()
            .find_map(|message| message.body())
            .map(<[u8]>::to_vec)
            .ok_or_else(|| MailError::Protocol(format!("Message {} came back without a body", id)))
    }

    async fn logout(mut self) -> Result<(), MailError> {
        self.session.logout().await?;
        Ok(())
    }
}

// Select, search, fetch each hit and apply the local filter
pub(crate) async fn run_search<S: MailboxSession>(
    session: &mut S,
    mailbox: &str,
    criteria: &SearchCriteria,
) -> Result<Vec<ParsedMessage>, MailError> {
    let query = criteria.server_query()?;
    let exists = session.select(mailbox).await?;
    debug!("{} holds {} messages", mailbox, exists);

    let ids = session.search(&query).await?;
    debug!("SEARCH {} returned {} ids", query, ids.len());

    let mut messages = Vec::with_capacity(ids.len());
    for id in ids {
        let raw = session.fetch_raw(id).await?;
        let message = ParsedMessage::parse(&raw).map_err(|e| MailError::Parse {
            id,
            reason: e.to_string(),
        })?;
        if criteria.matches(&message) {
            messages.push(message);
        }
    }

    info!("{} messages matched {}", messages.len(), criteria);
    Ok(messages)
}

/// Run the search, then log out whether it worked or not.
pub(crate) async fn search_then_logout<S: MailboxSession>(
    mut session: S,
    mailbox: &str,
    criteria: &SearchCriteria,
) -> Result<Vec<ParsedMessage>, MailError> {
    let result = run_search(&mut session, mailbox, criteria).await;

    // Be nice to the server and log out
    match session.logout().await {
        Ok(()) => debug!("-- logged out"),
        Err(e) if result.is_ok() => warn!("Logout failed after a completed search: {}", e),
        Err(e) => debug!("Logout after a failed search also failed: {}", e),
    }

    result
}

pub async fn search_mailbox(
    settings: &Settings,
    username: &str,
    credential: &Credential,
    criteria: &SearchCriteria,
) -> Result<Vec<ParsedMessage>, MailError> {
    // Refuse an unsendable query before opening a connection
    criteria.server_query()?;
    let session = ImapMailbox::connect(settings, username, credential).await?;
    search_then_logout(session, &settings.mailbox, criteria).await
}
