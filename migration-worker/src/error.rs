//! 统一错误类型定义
//!
//! 错误在各层的传播边界：
//! - [`HandlerError`] 只会传到 Dispatcher，不再向上传播
//! - [`DecodeError`] 在 Worker 循环中捕获，并跳过消息确认
//! - [`QueueError`] 在各自的调用点记录日志

use thiserror::Error;

/// 队列访问错误（拉取或确认失败）
#[derive(Debug, Error)]
pub enum QueueError {
    /// 拉取消息失败（网络 / 鉴权）
    #[error("failed to receive messages: {0}")]
    Receive(String),

    /// 删除消息失败
    #[error("failed to delete message: {0}")]
    Delete(String),

    /// 消息缺少 receipt handle，无法确认
    #[error("message {message_id} has no receipt handle")]
    MissingReceiptHandle { message_id: String },
}

/// 消息体解码错误
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("message has no body")]
    MissingBody,

    #[error("message body is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// JSON 合法但不是对象
    #[error("message body must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// 命令字段校验错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{method} is missing required field(s): {}", .fields.join(", "))]
    MissingFields {
        method: &'static str,
        fields: Vec<&'static str>,
    },

    #[error("field `{field}` must be a {expected}")]
    InvalidFieldType {
        field: &'static str,
        expected: &'static str,
    },

    /// table 必须是 `client:table` 格式
    #[error("malformed table `{value}`, expected `<clientName>:<tableName>`")]
    MalformedTable { value: String },
}

/// 下游调用错误
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid downstream base url `{url}`: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("downstream request timed out: {0}")]
    Timeout(String),

    #[error("failed to connect to downstream: {0}")]
    Connect(String),

    #[error("downstream request failed: {0}")]
    Request(String),

    #[error("downstream returned status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },
}

impl TransportError {
    /// 下游返回的状态码（如果有）
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(err.to_string())
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

/// Request Builder 错误
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("transport failed: {0}")]
    Transport(#[from] TransportError),
}

/// Request Builder 结果类型
pub type HandlerResult<T> = Result<T, HandlerError>;
