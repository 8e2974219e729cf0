//! Email collaborator.
//!
//! The payment core only ever calls [`Mailer::send`]. Delivery failures are
//! reported back as [`MailError`] and callers log and drop them; a mail
//! problem never blocks or reverses a payment state change.

pub mod templates;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

/// A rendered plain-text message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingMail {
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub body: String,
}

/// Mail delivery failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MailError {
    /// The relay could not be reached.
    #[error("mail transport failed: {0}")]
    Transport(String),
    /// The relay refused the message.
    #[error("mail relay rejected message with status {0}")]
    Rejected(u16),
}

/// Outgoing mail collaborator.
#[async_trait]
pub trait Mailer: Send + Sync + fmt::Debug {
    /// Sends `mail` on behalf of `sender` (the organizer's sender reference).
    ///
    /// # Errors
    ///
    /// Returns a [`MailError`] when delivery fails.
    async fn send(&self, sender: &str, mail: &OutgoingMail) -> Result<(), MailError>;
}

/// Mailer that only logs; used when no relay is configured.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, sender: &str, mail: &OutgoingMail) -> Result<(), MailError> {
        tracing::info!(
            sender,
            to = %mail.to,
            subject = %mail.subject,
            "mail relay disabled; message logged only"
        );
        Ok(())
    }
}

/// Mailer posting messages as JSON to an HTTP relay.
#[derive(Debug, Clone)]
pub struct RelayMailer {
    http: Client,
    endpoint: String,
    token: Option<String>,
}

#[derive(Serialize)]
struct RelayRequest<'a> {
    from: &'a str,
    #[serde(flatten)]
    mail: &'a OutgoingMail,
}

impl RelayMailer {
    /// Creates a relay mailer for `endpoint`, authenticating with `token`
    /// as a bearer credential when given.
    ///
    /// # Errors
    ///
    /// Returns [`MailError::Transport`] if the HTTP client cannot be built.
    pub fn new(
        endpoint: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, MailError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MailError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            token,
        })
    }
}

#[async_trait]
impl Mailer for RelayMailer {
    async fn send(&self, sender: &str, mail: &OutgoingMail) -> Result<(), MailError> {
        let mut request = self.http.post(&self.endpoint).json(&RelayRequest { from: sender, mail });
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(MailError::Rejected(status.as_u16()));
        }
        tracing::debug!(to = %mail.to, "mail handed to relay");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_mailer_always_succeeds() {
        let mail = OutgoingMail {
            to: "a@example.com".to_string(),
            subject: "s".to_string(),
            body: "b".to_string(),
        };
        assert!(LogMailer.send("organizer@example.com", &mail).await.is_ok());
    }

    #[test]
    fn relay_request_flattens_mail() {
        let mail = OutgoingMail {
            to: "a@example.com".to_string(),
            subject: "s".to_string(),
            body: "b".to_string(),
        };
        let json = serde_json::to_value(RelayRequest {
            from: "org@example.com",
            mail: &mail,
        })
        .unwrap_or_default();
        assert_eq!(json.get("from").and_then(|v| v.as_str()), Some("org@example.com"));
        assert_eq!(json.get("to").and_then(|v| v.as_str()), Some("a@example.com"));
    }
}
