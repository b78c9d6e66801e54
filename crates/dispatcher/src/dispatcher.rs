//! Action dispatcher — turns one queue message into zero or one incident API call.

use std::collections::HashMap;

use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use tracing::{Instrument, Span};

use relay_common::config::DispatchSettings;
use relay_common::types::{
    ForwardResult, HttpMethod, MessageAttribute, RoutingDecision, SkipReason,
};

use crate::error::DispatchError;
use crate::routing::extract_routing;

/// What the dispatcher did with a message.
#[derive(Debug)]
pub enum Dispatch {
    /// Not actionable; no call was made.
    Skipped(SkipReason),
    /// Exactly one call was made. `payload` is the parsed request body.
    Forwarded {
        decision: RoutingDecision,
        payload: Value,
        result: ForwardResult,
    },
}

pub struct ActionDispatcher {
    client: Client,
    base_url: String,
    span: Span,
}

impl ActionDispatcher {
    pub fn new(settings: &DispatchSettings) -> Result<Self, DispatchError> {
        let client = Client::builder().timeout(settings.http_timeout).build()?;
        Ok(Self::with_client(client, settings.url_base_incidents.clone()))
    }

    pub fn with_client(client: Client, base_url: String) -> Self {
        Self {
            client,
            base_url,
            span: tracing::info_span!("dispatcher"),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Route and forward one message.
    ///
    /// Routing problems are returned as [`Dispatch::Skipped`]. A malformed body
    /// or a failed HTTP exchange is an error; in both cases at most one request
    /// has been attempted.
    pub async fn dispatch(
        &self,
        body: &str,
        attributes: Option<&HashMap<String, MessageAttribute>>,
    ) -> Result<Dispatch, DispatchError> {
        self.route_and_forward(body, attributes)
            .instrument(self.span.clone())
            .await
    }

    async fn route_and_forward(
        &self,
        body: &str,
        attributes: Option<&HashMap<String, MessageAttribute>>,
    ) -> Result<Dispatch, DispatchError> {
        tracing::debug!(body, ?attributes, "Processing message");

        let decision = match extract_routing(attributes, &self.base_url) {
            Ok(decision) => decision,
            Err(reason) => {
                match &reason {
                    SkipReason::UnhandledEvent(_) | SkipReason::UnhandledMethod(_) => {
                        tracing::warn!(reason = %reason, "Skipping message")
                    }
                    _ => tracing::error!(reason = %reason, "Skipping message"),
                }
                return Ok(Dispatch::Skipped(reason));
            }
        };

        let payload: Value = serde_json::from_str(body)?;
        let result = self.forward(&decision, body).await?;

        tracing::info!(
            method = %decision.method,
            url = %decision.url,
            status = result.status_code,
            response = %result.body_text,
            "Incident API responded"
        );

        Ok(Dispatch::Forwarded {
            decision,
            payload,
            result,
        })
    }

    /// Send the body verbatim; it has already been validated as JSON.
    async fn forward(
        &self,
        decision: &RoutingDecision,
        body: &str,
    ) -> Result<ForwardResult, reqwest::Error> {
        let request = match decision.method {
            HttpMethod::Post => self.client.post(&decision.url),
            HttpMethod::Put => self.client.put(&decision.url),
            HttpMethod::Delete => self.client.delete(&decision.url),
        };

        let response = request
            .header(CONTENT_TYPE, "application/json")
            .body(body.to_string())
            .send()
            .await?;

        let status_code = response.status().as_u16();
        let body_text = response.text().await?;
        Ok(ForwardResult::new(status_code, body_text))
    }
}
