use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::{DownstreamClient, DownstreamRequest, DownstreamResponse};
use crate::error::TransportError;

/// 记录请求并返回固定状态码的下游客户端
pub struct RecordingClient {
    status: Option<u16>,
    requests: Mutex<Vec<DownstreamRequest>>,
}

impl RecordingClient {
    pub fn with_status(status: u16) -> Self {
        Self {
            status: Some(status),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// 每次调用都返回连接错误
    pub fn failing() -> Self {
        Self {
            status: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<DownstreamRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl DownstreamClient for RecordingClient {
    async fn send(
        &self,
        request: &DownstreamRequest,
    ) -> Result<DownstreamResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        match self.status {
            Some(status) => Ok(DownstreamResponse {
                status,
                body: String::new(),
            }),
            None => Err(TransportError::Connect("connection refused".to_string())),
        }
    }
}
