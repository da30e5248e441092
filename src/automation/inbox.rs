//! Read-only IMAP inbox access

use mail_parser::MessageParser;
use secrecy::{ExposeSecret, SecretString};

use crate::config::EmailSettings;
use crate::{Error, Result};

type TlsSession = imap::Session<native_tls::TlsStream<std::net::TcpStream>>;

/// Lists the newest messages of one mailbox over IMAPS
pub struct ImapInbox {
    host: String,
    port: u16,
    user: String,
    password: SecretString,
    mailbox: String,
}

impl ImapInbox {
    /// Create an inbox reader from settings
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if host, user or password is missing
    pub fn new(settings: &EmailSettings) -> Result<Self> {
        let host = settings
            .host
            .clone()
            .ok_or_else(|| Error::Config("email.host is not configured".to_string()))?;
        if settings.user.is_empty() {
            return Err(Error::Config("email.user is not configured".to_string()));
        }
        let password = settings
            .password
            .clone()
            .ok_or_else(|| Error::Config("email password is not configured".to_string()))?;

        Ok(Self {
            host,
            port: settings.port,
            user: settings.user.clone(),
            password,
            mailbox: settings.mailbox.clone(),
        })
    }

    fn connect(&self) -> Result<TlsSession> {
        let tls = native_tls::TlsConnector::builder()
            .build()
            .map_err(|e| Error::Email(format!("TLS connector build failed: {e}")))?;

        let client = imap::connect((self.host.as_str(), self.port), &self.host, &tls)
            .map_err(|e| Error::Email(format!("IMAP connection failed: {e}")))?;

        client
            .login(&self.user, self.password.expose_secret())
            .map_err(|e| Error::Email(format!("IMAP login failed: {}", e.0)))
    }

    /// Summaries of the newest `limit` messages, newest first
    ///
    /// # Errors
    ///
    /// Returns [`Error::Email`] on connection, login or fetch failure
    pub fn recent(&self, limit: usize) -> Result<Vec<String>> {
        let mut session = self.connect()?;

        // EXAMINE keeps the mailbox read-only so nothing is marked seen
        let mailbox = session
            .examine(&self.mailbox)
            .map_err(|e| Error::Email(format!("IMAP EXAMINE {} failed: {e}", self.mailbox)))?;

        let exists = mailbox.exists;
        let limit = u32::try_from(limit).unwrap_or(u32::MAX);
        if exists == 0 || limit == 0 {
            session.logout().ok();
            return Ok(Vec::new());
        }

        let first = exists.saturating_sub(limit - 1).max(1);
        let fetches = session
            .fetch(format!("{first}:{exists}"), "RFC822.HEADER")
            .map_err(|e| Error::Email(format!("IMAP FETCH failed: {e}")))?;

        let mut summaries: Vec<(u32, String)> = fetches
            .iter()
            .filter_map(|fetch| {
                let header = fetch.header()?;
                summarize_header(header).map(|s| (fetch.message, s))
            })
            .collect();
        summaries.sort_by(|a, b| b.0.cmp(&a.0));

        session.logout().ok();
        tracing::debug!(count = summaries.len(), mailbox = %self.mailbox, "inbox fetched");
        Ok(summaries.into_iter().map(|(_, s)| s).collect())
    }
}

/// Format raw message headers as `From: {sender}, Subject: {subject}`
#[must_use]
pub fn summarize_header(raw: &[u8]) -> Option<String> {
    let message = MessageParser::default().parse(raw)?;

    let sender = message
        .from()
        .and_then(|from| from.first())
        .and_then(|addr| addr.name().or_else(|| addr.address()))
        .unwrap_or("Unknown sender")
        .to_string();
    let subject = message.subject().unwrap_or("(no subject)");

    Some(format!("From: {sender}, Subject: {subject}"))
}
