use thiserror::Error;

/// Per-message failures raised while forwarding to the incident API.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Malformed message body: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Incident API request failed: {0}")]
    Http(#[from] reqwest::Error),
}
