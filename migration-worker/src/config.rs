//! 迁移 Worker 配置

use std::env;
use std::time::Duration;

use anyhow::{Result, anyhow};
use migration_core::config::MigrationAppConfig;

use crate::domain::{AckPolicy, FetchOptions};

/// 每次调用最多处理的消息数（固定）
pub const MAX_MESSAGES_PER_INVOCATION: u32 = 1;

const DEFAULT_QUEUE_PROFILE: &str = "migration";
const DEFAULT_VISIBILITY_TIMEOUT_SECS: u64 = 60;
const DEFAULT_WAIT_TIME_SECS: u64 = 20;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// 运行模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// 执行一次后退出，由外部调度器重复触发
    #[default]
    Once,
    /// 本地常驻：循环执行直到收到 Ctrl-C
    Poll,
}

impl std::str::FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "once" => Ok(RunMode::Once),
            "poll" => Ok(RunMode::Poll),
            other => Err(format!("unknown run mode `{other}`")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MigrationWorkerConfig {
    pub queue_url: String,
    pub queue_region: Option<String>,
    pub queue_endpoint: Option<String>,
    /// 存储管理服务地址
    pub api_base_url: String,
    pub visibility_timeout: Duration,
    pub wait_time: Duration,
    pub request_timeout: Duration,
    pub ack_policy: AckPolicy,
    pub run_mode: RunMode,
}

impl MigrationWorkerConfig {
    pub fn from_app_config(app: &MigrationAppConfig) -> Result<Self> {
        Self::from_sources(app, |key| env::var(key).ok())
    }

    /// 环境变量优先，其次是配置文件，最后是默认值
    pub fn from_sources<F>(app: &MigrationAppConfig, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let service = app.migration_worker_service();
        let queue_name = service.queue.as_deref().unwrap_or(DEFAULT_QUEUE_PROFILE);
        let queue_profile = app.queue_profile(queue_name);

        let queue_url = lookup("MIGRATION_WORKER_QUEUE_URL")
            .or_else(|| queue_profile.map(|cfg| cfg.url.clone()))
            .filter(|url| !url.is_empty())
            .ok_or_else(|| anyhow!("queue url is not configured (queue profile `{queue_name}`)"))?;

        let queue_region = lookup("MIGRATION_WORKER_QUEUE_REGION")
            .or_else(|| queue_profile.and_then(|cfg| cfg.region.clone()));
        let queue_endpoint = lookup("MIGRATION_WORKER_QUEUE_ENDPOINT")
            .or_else(|| queue_profile.and_then(|cfg| cfg.endpoint.clone()));

        let api_base_url = lookup("MIGRATION_WORKER_API_BASE_URL")
            .or_else(|| service.api_base_url.clone())
            .filter(|url| !url.is_empty())
            .ok_or_else(|| anyhow!("downstream api_base_url is not configured"))?;

        let secs = |key: &str, configured: Option<u64>, default: u64| -> Result<Duration> {
            let value = match lookup(key) {
                Some(raw) => raw
                    .parse::<u64>()
                    .map_err(|err| anyhow!("invalid {key} `{raw}`: {err}"))?,
                None => configured.unwrap_or(default),
            };
            Ok(Duration::from_secs(value))
        };

        let visibility_timeout = secs(
            "MIGRATION_WORKER_VISIBILITY_TIMEOUT_SECS",
            service.visibility_timeout_secs,
            DEFAULT_VISIBILITY_TIMEOUT_SECS,
        )?;
        let wait_time = secs(
            "MIGRATION_WORKER_WAIT_TIME_SECS",
            service.wait_time_secs,
            DEFAULT_WAIT_TIME_SECS,
        )?;
        let request_timeout = secs(
            "MIGRATION_WORKER_REQUEST_TIMEOUT_SECS",
            service.request_timeout_secs,
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?;

        let ack_policy = match lookup("MIGRATION_WORKER_ACK_POLICY").or(service.ack_policy) {
            Some(raw) => raw.parse::<AckPolicy>().map_err(|err| anyhow!(err))?,
            None => AckPolicy::default(),
        };
        let run_mode = match lookup("MIGRATION_WORKER_RUN_MODE").or(service.run_mode) {
            Some(raw) => raw.parse::<RunMode>().map_err(|err| anyhow!(err))?,
            None => RunMode::default(),
        };

        Ok(Self {
            queue_url,
            queue_region,
            queue_endpoint,
            api_base_url,
            visibility_timeout,
            wait_time,
            request_timeout,
            ack_policy,
            run_mode,
        })
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            max_messages: MAX_MESSAGES_PER_INVOCATION,
            visibility_timeout: self.visibility_timeout,
            wait_time: self.wait_time,
        }
    }
}
