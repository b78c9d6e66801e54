//! SMTP delivery over implicit TLS.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::{ExposeSecret, SecretString};
use tracing::{Instrument, Span};

use relay_common::config::SmtpSettings;

use crate::{Notifier, NotifyError};

pub struct SmtpNotifier {
    host: String,
    port: u16,
    sender: String,
    password: SecretString,
    timeout: Duration,
    span: Span,
}

impl SmtpNotifier {
    pub fn new(settings: &SmtpSettings) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
            sender: settings.sender.clone(),
            password: settings.password.clone(),
            timeout: settings.timeout,
            span: tracing::info_span!("notifier", transport = "smtp"),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Sender identity and credential must both be present before any
    /// connection is attempted.
    fn credentials(&self) -> Result<Credentials, NotifyError> {
        if self.sender.trim().is_empty() {
            return Err(NotifyError::Config("sender identity is not set".to_string()));
        }
        if self.password.expose_secret().is_empty() {
            return Err(NotifyError::Config("sender credential is not set".to_string()));
        }
        Ok(Credentials::new(
            self.sender.clone(),
            self.password.expose_secret().to_string(),
        ))
    }

    fn build_message(&self, to: &str, subject: &str, body: &str) -> Result<Message, String> {
        if subject.trim().is_empty() {
            return Err("email subject is empty".to_string());
        }
        if body.trim().is_empty() {
            return Err("email body is empty".to_string());
        }

        let from: Mailbox = self
            .sender
            .parse()
            .map_err(|e| format!("invalid sender address: {e}"))?;
        let to: Mailbox = to
            .parse()
            .map_err(|e| format!("invalid recipient address: {e}"))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| format!("failed to build email: {e}"))
    }

    async fn deliver(&self, credentials: Credentials, message: Message) -> Result<(), String> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&self.host)
            .map_err(|e| format!("SMTP relay error: {e}"))?
            .port(self.port)
            .credentials(credentials)
            .timeout(Some(self.timeout))
            .build();

        transport
            .send(message)
            .await
            .map_err(|e| format!("SMTP send failed: {e}"))?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        let credentials = self.credentials()?;

        async {
            let result = match self.build_message(to, subject, body) {
                Ok(message) => self.deliver(credentials, message).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(()) => tracing::info!(to, "Email sent"),
                Err(reason) => tracing::error!(
                    to,
                    host = %self.host,
                    port = self.port,
                    reason = %reason,
                    "Failed to send email"
                ),
            }
        }
        .instrument(self.span.clone())
        .await;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(sender: &str, password: &str) -> SmtpSettings {
        SmtpSettings {
            host: "127.0.0.1".to_string(),
            port: 1,
            sender: sender.to_string(),
            password: SecretString::from(password.to_string()),
            timeout: Duration::from_secs(2),
        }
    }

    #[test]
    fn test_build_message_plain_text() {
        let notifier = SmtpNotifier::new(&settings("relay@example.com", "pw"));
        let message = notifier
            .build_message("user@example.com", "Incident report", "hello")
            .unwrap();

        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("From: relay@example.com"));
        assert!(raw.contains("To: user@example.com"));
        assert!(raw.contains("Subject: Incident report"));
        assert!(raw.contains("Content-Type: text/plain"));
        assert!(raw.contains("hello"));
    }

    #[test]
    fn test_build_message_rejects_bad_recipient() {
        let notifier = SmtpNotifier::new(&settings("relay@example.com", "pw"));
        let err = notifier
            .build_message("not an address", "s", "b")
            .unwrap_err();
        assert!(err.contains("invalid recipient address"));
    }

    #[test]
    fn test_build_message_rejects_blank_subject_or_body() {
        let notifier = SmtpNotifier::new(&settings("relay@example.com", "pw"));

        let err = notifier.build_message("user@example.com", "  ", "hello").unwrap_err();
        assert!(err.contains("subject"));
        let err = notifier.build_message("user@example.com", "s", "").unwrap_err();
        assert!(err.contains("body"));
    }

    #[tokio::test]
    async fn test_blank_subject_is_absorbed() {
        let notifier = SmtpNotifier::new(&settings("relay@example.com", "pw"));
        let result = notifier.send("user@example.com", "", "b").await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_missing_sender_is_config_error() {
        let notifier = SmtpNotifier::new(&settings("", "pw"));
        let result = notifier.send("user@example.com", "s", "b").await;
        assert!(matches!(result, Err(NotifyError::Config(_))));
    }

    #[tokio::test]
    async fn test_missing_password_is_config_error() {
        let notifier = SmtpNotifier::new(&settings("relay@example.com", ""));
        let result = notifier.send("user@example.com", "s", "b").await;
        assert!(matches!(result, Err(NotifyError::Config(_))));
    }

    #[tokio::test]
    async fn test_transport_failure_is_absorbed() {
        let _ = rustls::crypto::ring::default_provider().install_default();

        // Nothing listens on port 1; the connection is refused and only logged.
        let notifier = SmtpNotifier::new(&settings("relay@example.com", "pw"));
        let result = notifier.send("user@example.com", "s", "b").await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_bad_recipient_is_absorbed() {
        let notifier = SmtpNotifier::new(&settings("relay@example.com", "pw"));
        let result = notifier.send("not an address", "s", "b").await;
        assert!(result.is_ok());
    }
}
