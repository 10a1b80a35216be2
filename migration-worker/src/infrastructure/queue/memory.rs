//! 内存队列实现（本地调试与测试使用）
//!
//! 语义与远端队列保持一致：拉取后的消息进入 in-flight 状态，
//! 确认后永久删除；未确认的消息在 [`InMemoryMessageQueue::expire_visibility`]
//! 之后重新可见。

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{Envelope, FetchOptions, MessageQueue};
use crate::error::QueueError;

#[derive(Debug, Clone)]
struct StoredMessage {
    message_id: String,
    body: String,
    receive_count: u32,
    receipt_handle: Option<String>,
}

#[derive(Debug, Default)]
struct QueueState {
    ready: VecDeque<StoredMessage>,
    in_flight: Vec<StoredMessage>,
    acknowledged: Vec<String>,
    next_id: u64,
    fetch_calls: usize,
    fetch_failure: Option<String>,
    acknowledge_failure: Option<String>,
}

#[derive(Debug, Default)]
pub struct InMemoryMessageQueue {
    state: Mutex<QueueState>,
}

impl InMemoryMessageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// 入队一条消息，返回消息 ID
    pub async fn push(&self, body: impl Into<String>) -> String {
        let mut state = self.state.lock().await;
        state.next_id += 1;
        let message_id = format!("msg-{}", state.next_id);
        state.ready.push_back(StoredMessage {
            message_id: message_id.clone(),
            body: body.into(),
            receive_count: 0,
            receipt_handle: None,
        });
        message_id
    }

    /// 让所有未确认的消息重新可见
    pub async fn expire_visibility(&self) {
        let mut state = self.state.lock().await;
        let expired: Vec<StoredMessage> = state.in_flight.drain(..).collect();
        for mut message in expired.into_iter().rev() {
            message.receipt_handle = None;
            state.ready.push_front(message);
        }
    }

    /// 之后的拉取都返回错误；传 None 恢复
    pub async fn fail_fetch(&self, reason: Option<&str>) {
        self.state.lock().await.fetch_failure = reason.map(str::to_string);
    }

    /// 之后的确认都返回错误；传 None 恢复
    pub async fn fail_acknowledge(&self, reason: Option<&str>) {
        self.state.lock().await.acknowledge_failure = reason.map(str::to_string);
    }

    pub async fn acknowledged(&self) -> Vec<String> {
        self.state.lock().await.acknowledged.clone()
    }

    /// 尚未删除的消息数（可见 + in-flight）
    pub async fn pending(&self) -> usize {
        let state = self.state.lock().await;
        state.ready.len() + state.in_flight.len()
    }

    pub async fn in_flight(&self) -> usize {
        self.state.lock().await.in_flight.len()
    }

    pub async fn fetch_calls(&self) -> usize {
        self.state.lock().await.fetch_calls
    }
}

#[async_trait]
impl MessageQueue for InMemoryMessageQueue {
    async fn fetch(&self, options: &FetchOptions) -> Result<Vec<Envelope>, QueueError> {
        let mut state = self.state.lock().await;
        state.fetch_calls += 1;
        if let Some(reason) = &state.fetch_failure {
            return Err(QueueError::Receive(reason.clone()));
        }

        let mut envelopes = Vec::new();
        while envelopes.len() < options.max_messages as usize {
            let Some(mut message) = state.ready.pop_front() else {
                break;
            };
            message.receive_count += 1;
            let receipt_handle = format!("{}-r{}", message.message_id, message.receive_count);
            message.receipt_handle = Some(receipt_handle.clone());

            envelopes.push(Envelope {
                message_id: Some(message.message_id.clone()),
                receipt_handle: Some(receipt_handle),
                body: Some(message.body.clone()),
                receive_count: Some(message.receive_count),
            });
            state.in_flight.push(message);
        }
        Ok(envelopes)
    }

    async fn acknowledge(&self, envelope: &Envelope) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        if let Some(reason) = &state.acknowledge_failure {
            return Err(QueueError::Delete(reason.clone()));
        }
        let receipt_handle =
            envelope
                .receipt_handle
                .as_deref()
                .ok_or_else(|| QueueError::MissingReceiptHandle {
                    message_id: envelope.message_id_or_unknown().to_string(),
                })?;

        let position = state
            .in_flight
            .iter()
            .position(|message| message.receipt_handle.as_deref() == Some(receipt_handle))
            .ok_or_else(|| {
                QueueError::Delete(format!("receipt handle {receipt_handle} is not valid"))
            })?;
        let message = state.in_flight.remove(position);
        state.acknowledged.push(message.message_id);
        Ok(())
    }
}
