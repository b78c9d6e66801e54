//! Queue access.
//!
//! The consumer only needs two operations: receive at most one message (with
//! all of its attributes) and delete a message by receipt handle.

use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_sqs::Client;
use aws_sdk_sqs::config::Region;
use aws_sdk_sqs::types::{Message, MessageAttributeValue};

use relay_common::config::QueueSettings;
use relay_common::types::{MessageAttribute, QueueMessage};

#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Wait (bounded) for at most one message.
    async fn receive(&self) -> anyhow::Result<Option<QueueMessage>>;

    /// Acknowledge a message so it is never redelivered.
    async fn delete(&self, receipt_handle: &str) -> anyhow::Result<()>;
}

/// AWS SQS queue resolved by name.
pub struct SqsQueue {
    client: Client,
    queue_url: String,
    wait_seconds: i32,
}

impl SqsQueue {
    /// Build a client for the configured region and resolve the queue URL.
    pub async fn connect(settings: &QueueSettings) -> anyhow::Result<Self> {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()))
            .load()
            .await;
        let client = Client::new(&sdk_config);

        let output = client
            .get_queue_url()
            .queue_name(&settings.queue_name)
            .send()
            .await
            .with_context(|| format!("failed to resolve queue {}", settings.queue_name))?;
        let queue_url = output
            .queue_url()
            .map(str::to_string)
            .with_context(|| format!("queue {} has no URL", settings.queue_name))?;

        tracing::info!(queue = %settings.queue_name, url = %queue_url, "Resolved queue");

        Ok(Self {
            client,
            queue_url,
            wait_seconds: settings.wait_seconds,
        })
    }
}

#[async_trait]
impl MessageQueue for SqsQueue {
    async fn receive(&self) -> anyhow::Result<Option<QueueMessage>> {
        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(1)
            .wait_time_seconds(self.wait_seconds)
            .message_attribute_names("All")
            .send()
            .await
            .context("receive_message failed")?;

        output.messages().first().map(convert_message).transpose()
    }

    async fn delete(&self, receipt_handle: &str) -> anyhow::Result<()> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .context("delete_message failed")?;
        Ok(())
    }
}

fn convert_message(message: &Message) -> anyhow::Result<QueueMessage> {
    let receipt_handle = message
        .receipt_handle()
        .context("received a message without a receipt handle")?
        .to_string();

    Ok(QueueMessage {
        message_id: message.message_id().map(str::to_string),
        body: message.body().unwrap_or_default().to_string(),
        attributes: message.message_attributes().map(convert_attributes),
        receipt_handle,
    })
}

fn convert_attributes(
    attributes: &HashMap<String, MessageAttributeValue>,
) -> HashMap<String, MessageAttribute> {
    attributes
        .iter()
        .map(|(name, value)| {
            (
                name.clone(),
                MessageAttribute {
                    data_type: value.data_type().to_string(),
                    string_value: value.string_value().map(str::to_string),
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attribute(value: &str) -> MessageAttributeValue {
        MessageAttributeValue::builder()
            .data_type("String")
            .string_value(value)
            .build()
            .unwrap()
    }

    #[test]
    fn test_convert_message_with_attributes() {
        let message = Message::builder()
            .message_id("m-1")
            .receipt_handle("rh-1")
            .body(r#"{"userEmail":"a@x.com"}"#)
            .message_attributes("event", attribute("incident"))
            .message_attributes("method", attribute("POST"))
            .build();

        let converted = convert_message(&message).unwrap();
        assert_eq!(converted.message_id.as_deref(), Some("m-1"));
        assert_eq!(converted.receipt_handle, "rh-1");
        assert_eq!(converted.body, r#"{"userEmail":"a@x.com"}"#);

        let attributes = converted.attributes.unwrap();
        assert_eq!(attributes.len(), 2);
        assert_eq!(attributes["event"], MessageAttribute::string("incident"));
        assert_eq!(attributes["method"].string_value.as_deref(), Some("POST"));
    }

    #[test]
    fn test_convert_message_without_attributes() {
        let message = Message::builder().receipt_handle("rh-2").body("{}").build();

        let converted = convert_message(&message).unwrap();
        assert!(converted.attributes.is_none());
        assert!(converted.message_id.is_none());
    }

    #[test]
    fn test_convert_message_requires_receipt_handle() {
        let message = Message::builder().body("{}").build();
        assert!(convert_message(&message).is_err());
    }
}
