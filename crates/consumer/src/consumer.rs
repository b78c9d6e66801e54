//! Consumer loop — poll, process, acknowledge.
//!
//! Every received message is deleted exactly once, right after its single
//! processing attempt, whatever the outcome. A crash between receive and
//! delete lets the queue redeliver the message after its visibility timeout,
//! which can repeat the API call and the notification; no deduplication is
//! done.

use std::time::Duration;

use tracing::{Instrument, Span};

use relay_common::types::QueueMessage;
use relay_dispatcher::outcome::NotifyOutcome;
use relay_dispatcher::pipeline::{Pipeline, PipelineOutcome};

use crate::queue::MessageQueue;

/// Result of one poll/process/ack iteration.
#[derive(Debug)]
pub enum Iteration {
    /// Nothing was waiting on the queue.
    Idle,
    /// The receive call itself failed.
    ReceiveFailed,
    /// A message went through the pipeline. `acknowledged` is false only if
    /// the delete call failed.
    Processed {
        message_id: Option<String>,
        outcome: PipelineOutcome,
        acknowledged: bool,
    },
}

pub struct Consumer<Q> {
    queue: Q,
    pipeline: Pipeline,
    receive_error_backoff: Duration,
    span: Span,
}

impl<Q: MessageQueue> Consumer<Q> {
    pub fn new(queue: Q, pipeline: Pipeline, receive_error_backoff: Duration) -> Self {
        Self {
            queue,
            pipeline,
            receive_error_backoff,
            span: tracing::info_span!("consumer"),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Poll forever. Only process shutdown stops the loop.
    pub async fn run(&self) {
        tracing::info!(parent: &self.span, "Consumer loop started");
        loop {
            if let Iteration::Idle = self.run_once().await {
                // Receive can complete without suspending; let the runtime breathe.
                tokio::task::yield_now().await;
            }
        }
    }

    /// One poll/process/ack iteration.
    pub async fn run_once(&self) -> Iteration {
        let message = match self.queue.receive().instrument(self.span.clone()).await {
            Ok(Some(message)) => message,
            Ok(None) => return Iteration::Idle,
            Err(e) => {
                tracing::error!(parent: &self.span, error = %format!("{e:#}"), "Failed to receive from queue");
                tokio::time::sleep(self.receive_error_backoff).await;
                return Iteration::ReceiveFailed;
            }
        };

        let span = tracing::info_span!(
            parent: &self.span,
            "message",
            message_id = message.message_id.as_deref().unwrap_or("unknown")
        );
        self.handle(message).instrument(span).await
    }

    async fn handle(&self, message: QueueMessage) -> Iteration {
        tracing::info!(body = %message.body, "Received message");

        let outcome = self.pipeline.process(&message).await;
        log_outcome(&outcome);

        let acknowledged = match self.queue.delete(&message.receipt_handle).await {
            Ok(()) => {
                tracing::debug!("Message deleted");
                true
            }
            Err(e) => {
                tracing::error!(
                    error = %format!("{e:#}"),
                    "Failed to delete message; it will be redelivered"
                );
                false
            }
        };

        Iteration::Processed {
            message_id: message.message_id,
            outcome,
            acknowledged,
        }
    }
}

fn log_outcome(outcome: &PipelineOutcome) {
    match outcome {
        PipelineOutcome::Delivered {
            status_code,
            notification: NotifyOutcome::Attempted,
        } => tracing::info!(status = status_code, "Message forwarded, reporter notified"),
        PipelineOutcome::Delivered {
            status_code,
            notification: NotifyOutcome::Suppressed,
        } => tracing::info!(status = status_code, "Message forwarded, no reporter to notify"),
        PipelineOutcome::Skipped(reason) => {
            tracing::info!(reason = %reason, "Message not actionable")
        }
        PipelineOutcome::PayloadError(e) => {
            tracing::error!(error = %e, "Exception while processing message: malformed body")
        }
        PipelineOutcome::CallError(e) => {
            tracing::error!(error = %e, "Exception while processing message: incident API call failed")
        }
        PipelineOutcome::NotifierMisconfigured { status_code, error } => tracing::error!(
            status = status_code,
            error = %error,
            "Message forwarded but the notifier is misconfigured"
        ),
    }
}
