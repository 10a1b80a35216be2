//! 命令分发器

use std::collections::HashMap;
use std::sync::Arc;

use tracing::error;

use super::builders::{HandlerOutcome, RequestBuilder};
use crate::domain::{Command, DownstreamClient, MigrationMethod};
use crate::error::HandlerError;

/// 单次分发的结果
#[derive(Debug)]
pub enum DispatchOutcome {
    /// Builder 执行成功
    Completed(HandlerOutcome),
    /// Builder 返回错误（已记录日志，不再向上传播）
    Failed(HandlerError),
    /// 分发表中没有该方法
    Unsupported(String),
}

impl DispatchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DispatchOutcome::Completed(_))
    }
}

/// 将方法名路由到对应的 Request Builder
///
/// 分发表在构造时一次性建立，之后不可变。
pub struct CommandDispatcher {
    table: HashMap<&'static str, RequestBuilder>,
    client: Arc<dyn DownstreamClient>,
}

impl CommandDispatcher {
    pub fn new(client: Arc<dyn DownstreamClient>) -> Self {
        let table = MigrationMethod::ALL
            .into_iter()
            .map(|method| (method.as_str(), RequestBuilder::for_method(method)))
            .collect();
        Self { table, client }
    }

    /// 分发命令，永远不向调用方返回错误
    pub async fn dispatch(&self, method: &str, command: &Command) -> DispatchOutcome {
        let Some(builder) = self.table.get(method) else {
            error!(method = %method, "Unsupported method: {method}");
            return DispatchOutcome::Unsupported(method.to_string());
        };

        match builder.validate_and_send(command, self.client.as_ref()).await {
            Ok(outcome) => DispatchOutcome::Completed(outcome),
            Err(err) => {
                // 校验和下游失败都会导致命令被丢弃，统一按 error 级别记录
                error!(method = %method, error = %err, "Error processing message with method");
                DispatchOutcome::Failed(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{TransportError, ValidationError};
    use crate::test_support::RecordingClient;
    use std::sync::Mutex;
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    /// 记录事件级别
    #[derive(Clone, Default)]
    struct LevelRecorder(Arc<Mutex<Vec<Level>>>);

    impl LevelRecorder {
        fn levels(&self) -> Vec<Level> {
            self.0.lock().unwrap().clone()
        }
    }

    impl<S: Subscriber> Layer<S> for LevelRecorder {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            self.0.lock().unwrap().push(*event.metadata().level());
        }
    }

    fn dispatcher(client: Arc<RecordingClient>) -> CommandDispatcher {
        CommandDispatcher::new(client)
    }

    #[test]
    fn table_contains_exactly_the_six_methods() {
        let dispatcher = dispatcher(Arc::new(RecordingClient::with_status(200)));
        for method in MigrationMethod::ALL {
            assert!(dispatcher.table.contains_key(method.as_str()));
        }
        assert!(!dispatcher.table.contains_key("RENAME_TABLE"));
        assert!(!dispatcher.table.contains_key("delete_blob"));
    }

    #[tokio::test]
    async fn unknown_method_is_reported_without_downstream_call() {
        let client = Arc::new(RecordingClient::with_status(200));
        let dispatcher = dispatcher(client.clone());
        let cmd = Command::decode(r#"{"method":"RENAME_TABLE","table":"acme:t1"}"#).unwrap();

        let outcome = dispatcher.dispatch("RENAME_TABLE", &cmd).await;

        assert!(matches!(outcome, DispatchOutcome::Unsupported(ref m) if m == "RENAME_TABLE"));
        assert!(!outcome.is_success());
        assert!(client.requests().is_empty());
    }

    #[tokio::test]
    async fn handler_errors_are_suppressed() {
        let client = Arc::new(RecordingClient::with_status(404));
        let dispatcher = dispatcher(client.clone());
        let cmd = Command::decode(r#"{"method":"DELETE_BLOB","table":"acme:t1","blobId":"b1"}"#)
            .unwrap();

        let outcome = dispatcher.dispatch("DELETE_BLOB", &cmd).await;

        match outcome {
            DispatchOutcome::Failed(HandlerError::Transport(TransportError::UnexpectedStatus {
                status,
                ..
            })) => assert_eq!(status, 404),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(client.requests().len(), 1);
    }

    #[tokio::test]
    async fn transport_failures_are_suppressed() {
        let client = Arc::new(RecordingClient::failing());
        let dispatcher = dispatcher(client);
        let cmd = Command::decode(r#"{"method":"DELETE_TABLE","table":"acme:t1","audit":{}}"#)
            .unwrap();

        let outcome = dispatcher.dispatch("DELETE_TABLE", &cmd).await;

        assert!(matches!(
            outcome,
            DispatchOutcome::Failed(HandlerError::Transport(TransportError::Connect(_)))
        ));
    }

    #[tokio::test]
    async fn validation_errors_are_suppressed() {
        let dispatcher = dispatcher(Arc::new(RecordingClient::with_status(200)));
        let cmd = Command::decode(r#"{"method":"DELETE_TABLE","table":"badformat","audit":{}}"#)
            .unwrap();

        let outcome = dispatcher.dispatch("DELETE_TABLE", &cmd).await;

        assert!(matches!(
            outcome,
            DispatchOutcome::Failed(HandlerError::Validation(
                ValidationError::MalformedTable { .. }
            ))
        ));
    }

    #[tokio::test]
    async fn successful_dispatch_is_completed() {
        let dispatcher = dispatcher(Arc::new(RecordingClient::with_status(200)));
        let cmd = Command::decode(
            r#"{"method":"PUT_TABLE_BLOBID","requestUrl":"http://x/y","tenantName":"acme","blobId":"b1"}"#,
        )
        .unwrap();

        let outcome = dispatcher.dispatch("PUT_TABLE_BLOBID", &cmd).await;
        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn dropped_commands_are_logged_at_error_level() {
        let recorder = LevelRecorder::default();
        let _guard =
            tracing::subscriber::set_default(tracing_subscriber::registry().with(recorder.clone()));
        let dispatcher = dispatcher(Arc::new(RecordingClient::with_status(200)));
        let cmd = Command::decode(r#"{"method":"PUT_TABLE_BLOBID","blobId":"b1"}"#).unwrap();

        let outcome = dispatcher.dispatch("PUT_TABLE_BLOBID", &cmd).await;

        assert!(matches!(
            outcome,
            DispatchOutcome::Failed(HandlerError::Validation(ValidationError::MissingFields { .. }))
        ));
        let levels = recorder.levels();
        assert!(levels.contains(&Level::ERROR), "levels: {levels:?}");
        assert!(!levels.contains(&Level::WARN), "levels: {levels:?}");
    }

    #[tokio::test]
    async fn transport_failures_are_logged_at_error_level() {
        let recorder = LevelRecorder::default();
        let _guard =
            tracing::subscriber::set_default(tracing_subscriber::registry().with(recorder.clone()));
        let dispatcher = dispatcher(Arc::new(RecordingClient::failing()));
        let cmd = Command::decode(r#"{"method":"DELETE_BLOB","table":"acme:t1","blobId":"b1"}"#)
            .unwrap();

        dispatcher.dispatch("DELETE_BLOB", &cmd).await;

        assert!(recorder.levels().contains(&Level::ERROR));
    }
}
