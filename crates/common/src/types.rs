use std::collections::HashMap;

/// Placeholder for any field missing from a JSON body. A recipient equal to
/// this value suppresses the notification.
pub const NOT_AVAILABLE: &str = "N/A";

/// Typed value record carried alongside a queue message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageAttribute {
    pub data_type: String,
    pub string_value: Option<String>,
}

impl MessageAttribute {
    pub fn string(value: impl Into<String>) -> Self {
        Self {
            data_type: "String".to_string(),
            string_value: Some(value.into()),
        }
    }
}

/// A message received from the queue, owned by the consumer for one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    pub message_id: Option<String>,
    /// Raw body, expected to be a JSON-encoded object
    pub body: String,
    /// `None` when the producer attached no attributes at all
    pub attributes: Option<HashMap<String, MessageAttribute>>,
    /// Opaque token required to delete the message
    pub receipt_handle: String,
}

/// HTTP verbs the incident API accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    /// Case-insensitive parse; `None` for any unsupported verb.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "post" => Some(HttpMethod::Post),
            "put" => Some(HttpMethod::Put),
            "delete" => Some(HttpMethod::Delete),
            _ => None,
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpMethod::Post => write!(f, "post"),
            HttpMethod::Put => write!(f, "put"),
            HttpMethod::Delete => write!(f, "delete"),
        }
    }
}

/// Validated routing metadata for one message. Derived, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingDecision {
    /// Lowercased event token (`incident` or `incidents`)
    pub event: String,
    pub url: String,
    pub method: HttpMethod,
}

/// Why a message was not actionable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    MissingAttributes,
    UnhandledEvent(String),
    MissingUrl,
    UnhandledMethod(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::MissingAttributes => write!(f, "message has no attributes"),
            SkipReason::UnhandledEvent(event) => write!(f, "unhandled event type: {:?}", event),
            SkipReason::MissingUrl => write!(f, "url was not defined"),
            SkipReason::UnhandledMethod(method) => write!(f, "unhandled method: {:?}", method),
        }
    }
}

/// Response from the incident API.
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardResult {
    pub status_code: u16,
    pub body_text: String,
    /// Present only when the body parsed as JSON
    pub parsed_body: Option<serde_json::Value>,
}

impl ForwardResult {
    pub fn new(status_code: u16, body_text: String) -> Self {
        let parsed_body = serde_json::from_str(&body_text).ok();
        Self {
            status_code,
            body_text,
            parsed_body,
        }
    }
}

/// A notification the outcome step decided to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationIntent {
    /// `None` suppresses sending
    pub recipient: Option<String>,
    pub subject: String,
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_method_parse_case_insensitive() {
        assert_eq!(HttpMethod::parse("POST"), Some(HttpMethod::Post));
        assert_eq!(HttpMethod::parse(" Put "), Some(HttpMethod::Put));
        assert_eq!(HttpMethod::parse("delete"), Some(HttpMethod::Delete));
        assert_eq!(HttpMethod::parse("patch"), None);
        assert_eq!(HttpMethod::parse(""), None);
    }

    #[test]
    fn test_forward_result_parses_json_opportunistically() {
        let ok = ForwardResult::new(201, r#"{"id":"42"}"#.to_string());
        assert_eq!(ok.parsed_body, Some(serde_json::json!({"id": "42"})));

        let html = ForwardResult::new(502, "<html>bad gateway</html>".to_string());
        assert!(html.parsed_body.is_none());
        assert_eq!(html.body_text, "<html>bad gateway</html>");
    }

    #[test]
    fn test_skip_reason_display() {
        assert_eq!(
            SkipReason::UnhandledEvent("deploy".into()).to_string(),
            "unhandled event type: \"deploy\""
        );
        assert_eq!(SkipReason::MissingUrl.to_string(), "url was not defined");
    }
}
