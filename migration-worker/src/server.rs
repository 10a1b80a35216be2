use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};

use crate::application::CommandDispatcher;
use crate::config::{MigrationWorkerConfig, RunMode};
use crate::domain::{DownstreamClient, MessageQueue};
use crate::infrastructure::{HttpDownstreamClient, SqsMessageQueue};
use crate::interface::runtime::{InvocationReport, MigrationQueueConsumer};

/// 轮询模式下拉取失败后的等待时间
const FETCH_RETRY_DELAY: Duration = Duration::from_secs(5);

pub struct MigrationWorkerServer {
    config: Arc<MigrationWorkerConfig>,
    consumer: Arc<MigrationQueueConsumer>,
}

impl MigrationWorkerServer {
    /// 未注入的队列 / 下游客户端使用 SQS 与 HTTP 默认实现
    pub async fn new(
        config: MigrationWorkerConfig,
        queue: Option<Arc<dyn MessageQueue>>,
        client: Option<Arc<dyn DownstreamClient>>,
    ) -> Result<Self> {
        let config = Arc::new(config);

        let queue = match queue {
            Some(queue) => queue,
            None => Arc::new(
                SqsMessageQueue::connect(
                    config.queue_url.clone(),
                    config.queue_region.clone(),
                    config.queue_endpoint.clone(),
                )
                .await,
            ) as Arc<dyn MessageQueue>,
        };
        let client = match client {
            Some(client) => client,
            None => Arc::new(HttpDownstreamClient::new(
                &config.api_base_url,
                config.request_timeout,
            )?) as Arc<dyn DownstreamClient>,
        };

        let consumer = Arc::new(MigrationQueueConsumer::new(
            queue,
            CommandDispatcher::new(client),
            config.fetch_options(),
            config.ack_policy,
        ));

        Ok(Self { config, consumer })
    }

    /// 执行一次调用
    pub async fn run_once(&self) -> InvocationReport {
        self.consumer.run_once().await
    }

    pub async fn run(&self) -> Result<()> {
        info!(
            queue_url = %self.config.queue_url,
            api_base_url = %self.config.api_base_url,
            run_mode = ?self.config.run_mode,
            ack_policy = ?self.config.ack_policy,
            "Migration Worker started"
        );

        match self.config.run_mode {
            RunMode::Once => {
                self.run_once().await;
            }
            RunMode::Poll => loop {
                tokio::select! {
                    report = self.run_once() => {
                        if report.fetch_failed {
                            tokio::time::sleep(FETCH_RETRY_DELAY).await;
                        }
                    }
                    signal = tokio::signal::ctrl_c() => {
                        if let Err(err) = signal {
                            warn!(error = %err, "Failed to listen for shutdown signal");
                        }
                        info!("Shutdown signal received, stopping Migration Worker");
                        break;
                    }
                }
            },
        }

        Ok(())
    }
}
