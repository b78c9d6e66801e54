//! Outcome notifier — tells the reporting user what happened to their request.
//!
//! On a 201 the recipient and details come from the API response; on any other
//! status the recipient comes from the original request payload and the body
//! is a fixed apology. A missing recipient suppresses the notification.

use std::sync::Arc;

use serde_json::Value;
use tracing::{Instrument, Span};

use relay_common::types::{ForwardResult, NOT_AVAILABLE, NotificationIntent};
use relay_notifier::{Notifier, NotifyError};

/// Status the incident API returns when an incident was recorded.
pub const SUCCESS_STATUS: u16 = 201;

pub const SUBJECT: &str = "Incident report status";

const FAILURE_BODY: &str = "
Hello,

We're sorry, but we could not process your incident report at this time.
Please try submitting it again later.
";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// Handed to the notifier. Transport failures are only visible in logs.
    Attempted,
    /// No usable recipient.
    Suppressed,
}

pub struct OutcomeNotifier {
    notifier: Arc<dyn Notifier>,
    span: Span,
}

impl OutcomeNotifier {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            notifier,
            span: tracing::info_span!("outcome"),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Decide recipient, subject and body for a forwarded request.
    pub fn compose(result: &ForwardResult, request_payload: &Value) -> NotificationIntent {
        let (recipient, body) = if result.status_code == SUCCESS_STATUS {
            let response = result.parsed_body.as_ref();
            let id = json_field(response, "id");
            let description = json_field(response, "description");
            let body = format!(
                "
Hello,

Your incident report has been registered successfully.

Incident ID: {id}
Description: {description}

Thank you for reporting it.
"
            );
            (json_field(response, "userEmail"), body)
        } else {
            (
                json_field(Some(request_payload), "userEmail"),
                FAILURE_BODY.to_string(),
            )
        };

        NotificationIntent {
            recipient: Some(recipient).filter(|r| r != NOT_AVAILABLE && !r.trim().is_empty()),
            subject: SUBJECT.to_string(),
            body: body.trim().to_string(),
        }
    }

    /// Compose and, when there is a recipient, send the notification.
    ///
    /// Only a notifier configuration error propagates.
    pub async fn notify(
        &self,
        result: &ForwardResult,
        request_payload: &Value,
    ) -> Result<NotifyOutcome, NotifyError> {
        self.deliver(Self::compose(result, request_payload), result.status_code)
            .instrument(self.span.clone())
            .await
    }

    async fn deliver(
        &self,
        intent: NotificationIntent,
        status: u16,
    ) -> Result<NotifyOutcome, NotifyError> {
        let Some(recipient) = intent.recipient.as_deref() else {
            tracing::info!(status, "No recipient available, notification suppressed");
            return Ok(NotifyOutcome::Suppressed);
        };

        tracing::debug!(to = recipient, status, "Sending notification");
        self.notifier
            .send(recipient, &intent.subject, &intent.body)
            .await?;
        Ok(NotifyOutcome::Attempted)
    }
}

/// String or numeric field of a JSON object, or the sentinel.
fn json_field(value: Option<&Value>, name: &str) -> String {
    match value.and_then(|v| v.get(name)) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => NOT_AVAILABLE.to_string(),
    }
}
