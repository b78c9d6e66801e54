//! Outcome notification delivery.
//!
//! A [`Notifier`] delivers one plain-text message to one address. Delivery is
//! best-effort: transport faults are logged inside the implementation and
//! never surface to the caller. The only error a caller sees is
//! [`NotifyError::Config`], which indicates a deployment defect.

pub mod smtp;

use async_trait::async_trait;
use thiserror::Error;

pub use smtp::SmtpNotifier;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notifier configuration error: {0}")]
    Config(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send `body` to `to`. Returns `Ok(())` both when the message was sent and
    /// when the transport failed (the failure is logged).
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError>;
}
