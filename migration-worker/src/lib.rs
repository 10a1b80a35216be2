//! # Migration Worker
//!
//! 从消息队列拉取表/Blob 迁移命令，校验后转发到存储管理服务。

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interface;
pub mod server;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{MigrationWorkerConfig, RunMode};
pub use server::MigrationWorkerServer;
