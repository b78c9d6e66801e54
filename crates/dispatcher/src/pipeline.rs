//! Per-message pipeline: route → forward → notify.
//!
//! Every way a message can end is a [`PipelineOutcome`] variant, so the
//! consumer can log each case precisely while acknowledging all of them the
//! same way.

use relay_common::types::{QueueMessage, SkipReason};
use relay_notifier::NotifyError;

use crate::dispatcher::{ActionDispatcher, Dispatch};
use crate::error::DispatchError;
use crate::outcome::{NotifyOutcome, OutcomeNotifier};

#[derive(Debug)]
pub enum PipelineOutcome {
    /// The incident API was called and the outcome notification handled.
    Delivered {
        status_code: u16,
        notification: NotifyOutcome,
    },
    /// Not actionable; nothing was called.
    Skipped(SkipReason),
    /// Body was not valid JSON; nothing was called.
    PayloadError(serde_json::Error),
    /// The incident API could not be reached or its response not read.
    CallError(reqwest::Error),
    /// The API was called but the notifier is not configured to send.
    NotifierMisconfigured {
        status_code: u16,
        error: NotifyError,
    },
}

pub struct Pipeline {
    dispatcher: ActionDispatcher,
    outcome: OutcomeNotifier,
}

impl Pipeline {
    pub fn new(dispatcher: ActionDispatcher, outcome: OutcomeNotifier) -> Self {
        Self {
            dispatcher,
            outcome,
        }
    }

    /// Run one message through the pipeline. Never fails: every error is
    /// folded into the returned outcome.
    pub async fn process(&self, message: &QueueMessage) -> PipelineOutcome {
        let dispatch = match self
            .dispatcher
            .dispatch(&message.body, message.attributes.as_ref())
            .await
        {
            Ok(dispatch) => dispatch,
            Err(DispatchError::Payload(e)) => return PipelineOutcome::PayloadError(e),
            Err(DispatchError::Http(e)) => return PipelineOutcome::CallError(e),
        };

        let (payload, result) = match dispatch {
            Dispatch::Skipped(reason) => return PipelineOutcome::Skipped(reason),
            Dispatch::Forwarded {
                payload, result, ..
            } => (payload, result),
        };

        match self.outcome.notify(&result, &payload).await {
            Ok(notification) => PipelineOutcome::Delivered {
                status_code: result.status_code,
                notification,
            },
            Err(error) => PipelineOutcome::NotifierMisconfigured {
                status_code: result.status_code,
                error,
            },
        }
    }
}
