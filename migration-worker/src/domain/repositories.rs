use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::model::Envelope;
use crate::error::{QueueError, TransportError};

/// 单次拉取参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    pub max_messages: u32,
    pub visibility_timeout: Duration,
    pub wait_time: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            max_messages: 1,
            visibility_timeout: Duration::from_secs(60),
            wait_time: Duration::from_secs(20),
        }
    }
}

/// 消息队列端口
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// 长轮询拉取消息，没有消息时返回空列表
    async fn fetch(&self, options: &FetchOptions) -> Result<Vec<Envelope>, QueueError>;

    /// 永久删除消息
    async fn acknowledge(&self, envelope: &Envelope) -> Result<(), QueueError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Post,
    Delete,
}

/// 发往存储管理服务的请求描述
#[derive(Debug, Clone, PartialEq)]
pub struct DownstreamRequest {
    pub method: HttpMethod,
    /// 相对 base url 的路径，None 表示 base url 本身
    pub path: Option<&'static str>,
    pub query: Vec<(&'static str, String)>,
    pub body: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownstreamResponse {
    pub status: u16,
    pub body: String,
}

/// 存储管理服务客户端端口
#[async_trait]
pub trait DownstreamClient: Send + Sync {
    async fn send(&self, request: &DownstreamRequest) -> Result<DownstreamResponse, TransportError>;
}
