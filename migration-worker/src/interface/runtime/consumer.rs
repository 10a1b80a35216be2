//! 队列消费运行时
//!
//! 一次调用：拉取（最多一条）→ 解码 → 分发 → 确认。
//! 解码失败的消息不确认，等待可见性超时后重新投递；
//! 其余结果是否确认由 [`AckPolicy`] 决定。

use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use crate::application::{CommandDispatcher, DispatchOutcome};
use crate::domain::{AckPolicy, Envelope, FetchOptions, MessageQueue};
use crate::error::DecodeError;

/// 单条消息的处理结果
#[derive(Debug)]
pub enum MessageOutcome {
    /// 消息体结构非法，未进入分发
    DecodeFailed(DecodeError),
    /// 没有 method 字段，跳过分发
    NoMethod,
    Dispatched(DispatchOutcome),
}

#[derive(Debug)]
pub struct MessageReport {
    pub message_id: Option<String>,
    pub outcome: MessageOutcome,
    pub acknowledged: bool,
}

impl MessageReport {
    /// 命令已成功送达下游（或无需下游调用）
    pub fn is_success(&self) -> bool {
        matches!(&self.outcome, MessageOutcome::Dispatched(outcome) if outcome.is_success())
    }
}

/// 一次调用的汇总
#[derive(Debug, Default)]
pub struct InvocationReport {
    pub fetch_failed: bool,
    pub messages: Vec<MessageReport>,
}

impl InvocationReport {
    pub fn fetched(&self) -> usize {
        self.messages.len()
    }

    pub fn acknowledged(&self) -> usize {
        self.messages.iter().filter(|m| m.acknowledged).count()
    }
}

pub struct MigrationQueueConsumer {
    queue: Arc<dyn MessageQueue>,
    dispatcher: CommandDispatcher,
    fetch_options: FetchOptions,
    ack_policy: AckPolicy,
}

impl MigrationQueueConsumer {
    pub fn new(
        queue: Arc<dyn MessageQueue>,
        dispatcher: CommandDispatcher,
        fetch_options: FetchOptions,
        ack_policy: AckPolicy,
    ) -> Self {
        Self {
            queue,
            dispatcher,
            fetch_options,
            ack_policy,
        }
    }

    /// 执行一次完整的消费流程，所有错误都在内部记录，不向外传播
    #[instrument(skip(self), fields(ack_policy = ?self.ack_policy))]
    pub async fn run_once(&self) -> InvocationReport {
        let envelopes = match self.queue.fetch(&self.fetch_options).await {
            Ok(envelopes) => envelopes,
            Err(err) => {
                error!(error = %err, "Error receiving messages from queue");
                return InvocationReport {
                    fetch_failed: true,
                    messages: Vec::new(),
                };
            }
        };

        if envelopes.is_empty() {
            debug!("No messages available");
        }

        let mut report = InvocationReport::default();
        for envelope in &envelopes {
            report.messages.push(self.handle_envelope(envelope).await);
        }

        info!(
            fetched = report.fetched(),
            acknowledged = report.acknowledged(),
            "Invocation finished"
        );
        report
    }

    async fn handle_envelope(&self, envelope: &Envelope) -> MessageReport {
        let message_id = envelope.message_id.clone();

        let command = match envelope.decode() {
            Ok(command) => command,
            Err(err) => {
                error!(
                    message_id = envelope.message_id_or_unknown(),
                    receive_count = ?envelope.receive_count,
                    error = %err,
                    "Error processing message, leaving it for redelivery"
                );
                return MessageReport {
                    message_id,
                    outcome: MessageOutcome::DecodeFailed(err),
                    acknowledged: false,
                };
            }
        };

        let outcome = match command.method() {
            Some(method) => {
                MessageOutcome::Dispatched(self.dispatcher.dispatch(method, &command).await)
            }
            None => {
                debug!(
                    message_id = envelope.message_id_or_unknown(),
                    "Message has no method, skipping dispatch"
                );
                MessageOutcome::NoMethod
            }
        };

        if !self.should_acknowledge(&outcome) {
            warn!(
                message_id = envelope.message_id_or_unknown(),
                "Message not acknowledged, it will be redelivered"
            );
            return MessageReport {
                message_id,
                outcome,
                acknowledged: false,
            };
        }

        let acknowledged = match self.queue.acknowledge(envelope).await {
            Ok(()) => {
                debug!(message_id = envelope.message_id_or_unknown(), "Message acknowledged");
                true
            }
            Err(err) => {
                error!(
                    message_id = envelope.message_id_or_unknown(),
                    error = %err,
                    "Error acknowledging message"
                );
                false
            }
        };

        MessageReport {
            message_id,
            outcome,
            acknowledged,
        }
    }

    fn should_acknowledge(&self, outcome: &MessageOutcome) -> bool {
        match (self.ack_policy, outcome) {
            (_, MessageOutcome::DecodeFailed(_)) => false,
            (AckPolicy::AfterAttempt, _) => true,
            (AckPolicy::OnSuccess, MessageOutcome::Dispatched(dispatched)) => {
                dispatched.is_success()
            }
            (AckPolicy::OnSuccess, MessageOutcome::NoMethod) => false,
        }
    }
}
