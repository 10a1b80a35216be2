//! Migration Core 公共库
//!
//! 提供统一的配置加载与日志初始化功能

pub mod config;
pub mod tracing;

pub use config::{
    ConfigManager, LogFormat, LoggingConfig, MigrationAppConfig, MigrationWorkerServiceConfig,
    QueueProfileConfig, ServicesConfig, load_config, load_config_from_path,
};
pub use self::tracing::init_tracing_from_config;
