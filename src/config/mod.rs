//! Migration Core 配置模块
//!
//! 该模块提供应用程序配置管理功能，包括：
//! - 配置文件加载
//! - 环境特定配置覆盖
//! - 队列、日志以及各服务的配置定义

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use toml::Value;
use tracing::warn;

mod manager;
pub use manager::ConfigManager;

/// 全局应用配置实例，使用 OnceLock 确保只初始化一次
static APP_CONFIG: OnceLock<MigrationAppConfig> = OnceLock::new();

/// 日志输出格式
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// 人类可读的文本格式
    #[default]
    Text,
    /// 结构化 JSON 格式
    Json,
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别（RUST_LOG 优先）
    pub level: String,
    /// 输出格式
    pub format: LogFormat,
    pub with_target: bool,
    pub with_thread_ids: bool,
    pub with_file: bool,
    pub with_line_number: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            with_target: true,
            with_thread_ids: false,
            with_file: false,
            with_line_number: false,
        }
    }
}

/// 队列配置（按名称引用）
#[derive(Debug, Clone, Deserialize, Default)]
pub struct QueueProfileConfig {
    /// 队列地址
    pub url: String,
    /// 区域
    #[serde(default)]
    pub region: Option<String>,
    /// 自定义端点（本地模拟环境使用）
    #[serde(default)]
    pub endpoint: Option<String>,
}

/// 迁移 Worker 服务配置
#[derive(Debug, Clone, Deserialize, Default)]
pub struct MigrationWorkerServiceConfig {
    /// 引用的队列配置名称
    #[serde(default)]
    pub queue: Option<String>,
    /// 下游存储管理服务地址
    #[serde(default)]
    pub api_base_url: Option<String>,
    /// 可见性超时（秒）
    #[serde(default)]
    pub visibility_timeout_secs: Option<u64>,
    /// 长轮询等待时间（秒）
    #[serde(default)]
    pub wait_time_secs: Option<u64>,
    /// 单次下游请求超时（秒）
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    /// 确认策略：after_attempt | on_success
    #[serde(default)]
    pub ack_policy: Option<String>,
    /// 运行模式：once | poll
    #[serde(default)]
    pub run_mode: Option<String>,
}

/// 服务配置集合
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ServicesConfig {
    /// 迁移 Worker 服务配置
    #[serde(default)]
    pub migration_worker: Option<MigrationWorkerServiceConfig>,
}

/// 应用配置
#[derive(Debug, Clone, Deserialize, Default)]
pub struct MigrationAppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub queues: HashMap<String, QueueProfileConfig>,
    #[serde(default)]
    pub services: ServicesConfig,
}

impl MigrationAppConfig {
    pub fn queue_profile(&self, name: &str) -> Option<&QueueProfileConfig> {
        self.queues.get(name)
    }

    pub fn migration_worker_service(&self) -> MigrationWorkerServiceConfig {
        self.services.migration_worker.clone().unwrap_or_default()
    }
}

/// 默认的配置文件位置，按顺序尝试
const DEFAULT_CONFIG_FILES: [&str; 2] = ["config/migration-worker.toml", "config.toml"];

/// 加载配置（进程内只加载一次）
pub fn load_config(path: Option<&str>) -> &'static MigrationAppConfig {
    let candidates: Vec<PathBuf> = match path {
        Some(p) => vec![PathBuf::from(p)],
        None => DEFAULT_CONFIG_FILES.iter().map(PathBuf::from).collect(),
    };

    APP_CONFIG.get_or_init(|| load_with_fallback(&candidates))
}

fn load_with_fallback(candidates: &[PathBuf]) -> MigrationAppConfig {
    for path in candidates {
        match load_config_from_path(path) {
            Ok(cfg) => return cfg,
            Err(err) => {
                warn!("failed to load config from {}: {err:#}", path.display());
            }
        }
    }

    warn!("no configuration source succeeded, falling back to defaults");
    MigrationAppConfig::default()
}

/// 读取单个 TOML 配置文件，并叠加 `environments/{MIGRATION_ENV}.toml`
pub fn load_config_from_path(path: &Path) -> Result<MigrationAppConfig> {
    load_for_environment(path, &ConfigManager::get_environment())
}

fn load_for_environment(path: &Path, environment: &str) -> Result<MigrationAppConfig> {
    if !path.is_file() {
        return Err(anyhow!("config file {} does not exist", path.display()));
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("unable to read config file {}", path.display()))?;
    let mut document: Value = toml::from_str(&content)
        .with_context(|| format!("invalid TOML in {}", path.display()))?;

    ConfigManager::apply_overlay_for(&mut document, path, environment)?;

    document
        .try_into()
        .with_context(|| format!("invalid configuration in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const BASE: &str = r#"
[logging]
level = "debug"

[queues.migration]
url = "https://sqs.eu-west-1.amazonaws.com/000000000000/migration"
region = "eu-west-1"

[services.migration_worker]
queue = "migration"
api_base_url = "http://storage.internal/api"
"#;

    #[test]
    fn loads_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("config.toml");
        fs::write(&file, BASE).unwrap();

        let cfg = load_config_from_path(&file).unwrap();
        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(cfg.logging.format, LogFormat::Text);
        let queue = cfg.queue_profile("migration").unwrap();
        assert_eq!(queue.region.as_deref(), Some("eu-west-1"));
        let service = cfg.migration_worker_service();
        assert_eq!(service.queue.as_deref(), Some("migration"));
        assert_eq!(service.visibility_timeout_secs, None);
    }

    #[test]
    fn environment_overlay_next_to_file_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("migration-worker.toml");
        fs::write(&file, BASE).unwrap();
        fs::create_dir(dir.path().join("environments")).unwrap();
        fs::write(
            dir.path().join("environments").join("staging.toml"),
            "[logging]\nformat = \"json\"\n",
        )
        .unwrap();

        let cfg = load_for_environment(&file, "staging").unwrap();
        assert_eq!(cfg.logging.format, LogFormat::Json);
        assert_eq!(cfg.logging.level, "debug");

        let cfg = load_for_environment(&file, "production").unwrap();
        assert_eq!(cfg.logging.format, LogFormat::Text);
    }

    #[test]
    fn directories_are_not_config_files() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config_from_path(dir.path()).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn invalid_toml_is_reported_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("config.toml");
        fs::write(&file, "[logging\nlevel = 1").unwrap();
        let err = load_config_from_path(&file).unwrap_err();
        assert!(err.to_string().contains("invalid TOML"));
    }

    #[test]
    fn missing_path_falls_back_to_defaults() {
        let cfg = load_with_fallback(&[PathBuf::from("/definitely/not/here.toml")]);
        assert!(cfg.queues.is_empty());
        assert!(cfg.services.migration_worker.is_none());
    }
}
