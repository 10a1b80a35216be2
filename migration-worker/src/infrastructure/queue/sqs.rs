//! SQS 队列适配器

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_sqs::Client;
use aws_sdk_sqs::config::Region;
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::types::{Message, MessageSystemAttributeName};
use tracing::{debug, info};

use crate::domain::{Envelope, FetchOptions, MessageQueue};
use crate::error::QueueError;

pub struct SqsMessageQueue {
    client: Client,
    queue_url: String,
}

impl SqsMessageQueue {
    pub fn new(client: Client, queue_url: impl Into<String>) -> Self {
        Self {
            client,
            queue_url: queue_url.into(),
        }
    }

    /// 从默认凭据链构建客户端，可选指定区域与自定义端点
    pub async fn connect(
        queue_url: impl Into<String>,
        region: Option<String>,
        endpoint: Option<String>,
    ) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region));
        }
        if let Some(endpoint) = endpoint.as_deref() {
            loader = loader.endpoint_url(endpoint);
        }
        let config = loader.load().await;
        let queue_url = queue_url.into();

        info!(queue_url = %queue_url, endpoint = ?endpoint, "SQS client initialised");
        Self::new(Client::new(&config), queue_url)
    }
}

fn seconds(duration: Duration) -> i32 {
    i32::try_from(duration.as_secs()).unwrap_or(i32::MAX)
}

fn to_envelope(message: &Message) -> Envelope {
    let receive_count = message
        .attributes()
        .and_then(|attrs| attrs.get(&MessageSystemAttributeName::ApproximateReceiveCount))
        .and_then(|count| count.parse().ok());

    Envelope {
        message_id: message.message_id().map(str::to_string),
        receipt_handle: message.receipt_handle().map(str::to_string),
        body: message.body().map(str::to_string),
        receive_count,
    }
}

#[async_trait]
impl MessageQueue for SqsMessageQueue {
    async fn fetch(&self, options: &FetchOptions) -> Result<Vec<Envelope>, QueueError> {
        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(i32::try_from(options.max_messages).unwrap_or(1))
            .visibility_timeout(seconds(options.visibility_timeout))
            .wait_time_seconds(seconds(options.wait_time))
            .message_system_attribute_names(MessageSystemAttributeName::ApproximateReceiveCount)
            .send()
            .await
            .map_err(|err| QueueError::Receive(DisplayErrorContext(&err).to_string()))?;

        let envelopes: Vec<Envelope> = output.messages().iter().map(to_envelope).collect();
        debug!(count = envelopes.len(), "Received messages from SQS");
        Ok(envelopes)
    }

    async fn acknowledge(&self, envelope: &Envelope) -> Result<(), QueueError> {
        let receipt_handle =
            envelope
                .receipt_handle
                .as_deref()
                .ok_or_else(|| QueueError::MissingReceiptHandle {
                    message_id: envelope.message_id_or_unknown().to_string(),
                })?;

        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|err| QueueError::Delete(DisplayErrorContext(&err).to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_keeps_transport_metadata() {
        let message = Message::builder()
            .message_id("m-1")
            .receipt_handle("rh-1")
            .body(r#"{"method":"DELETE_BLOB"}"#)
            .attributes(MessageSystemAttributeName::ApproximateReceiveCount, "3")
            .build();

        let envelope = to_envelope(&message);
        assert_eq!(envelope.message_id.as_deref(), Some("m-1"));
        assert_eq!(envelope.receipt_handle.as_deref(), Some("rh-1"));
        assert_eq!(envelope.body.as_deref(), Some(r#"{"method":"DELETE_BLOB"}"#));
        assert_eq!(envelope.receive_count, Some(3));
    }

    #[test]
    fn seconds_saturate() {
        assert_eq!(seconds(Duration::from_secs(60)), 60);
        assert_eq!(seconds(Duration::from_secs(u64::MAX)), i32::MAX);
    }

    #[tokio::test]
    async fn acknowledge_without_receipt_handle_fails_before_calling_sqs() {
        let config = aws_sdk_sqs::Config::builder()
            .behavior_version(aws_sdk_sqs::config::BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .build();
        let queue = SqsMessageQueue::new(Client::from_conf(config), "http://localhost/queue");
        let envelope = Envelope {
            message_id: Some("m-1".to_string()),
            ..Envelope::default()
        };

        let err = queue.acknowledge(&envelope).await.unwrap_err();
        assert!(matches!(
            err,
            QueueError::MissingReceiptHandle { ref message_id } if message_id == "m-1"
        ));
    }
}
