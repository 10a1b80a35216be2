//! 迁移命令领域模型

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::error::{DecodeError, ValidationError};

/// 支持的命令方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MigrationMethod {
    PutTableBlobId,
    DeleteBlob,
    CreateTable,
    DeleteTable,
    PurgeTable,
    SetTableAttribute,
}

impl MigrationMethod {
    pub const ALL: [MigrationMethod; 6] = [
        MigrationMethod::PutTableBlobId,
        MigrationMethod::DeleteBlob,
        MigrationMethod::CreateTable,
        MigrationMethod::DeleteTable,
        MigrationMethod::PurgeTable,
        MigrationMethod::SetTableAttribute,
    ];

    /// 线上使用的方法名
    pub fn as_str(&self) -> &'static str {
        match self {
            MigrationMethod::PutTableBlobId => "PUT_TABLE_BLOBID",
            MigrationMethod::DeleteBlob => "DELETE_BLOB",
            MigrationMethod::CreateTable => "CREATE_TABLE",
            MigrationMethod::DeleteTable => "DELETE_TABLE",
            MigrationMethod::PurgeTable => "PURGE_TABLE",
            MigrationMethod::SetTableAttribute => "SET_TABLE_ATTRIBUTE",
        }
    }
}

impl fmt::Display for MigrationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MigrationMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MigrationMethod::ALL
            .into_iter()
            .find(|method| method.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// 命令字段名
pub mod fields {
    pub const METHOD: &str = "method";
    pub const TABLE: &str = "table";
    pub const BLOB_ID: &str = "blobId";
    pub const ATTRIBUTES: &str = "attributes";
    pub const OPTIONS: &str = "options";
    pub const AUDIT: &str = "audit";
    pub const REQUEST_URL: &str = "requestUrl";
    pub const TENANT_NAME: &str = "tenantName";
}

/// 一条队列消息解码后的命令
///
/// 除 `method` 外的字段原样保留，由各 Request Builder 按需提取和校验。
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    method: Option<String>,
    fields: Map<String, Value>,
}

impl Command {
    /// 解析消息体
    ///
    /// 只有结构非法（非 JSON 或非对象）才算解码失败；
    /// `method` 缺失或为空值（null、false、0、空字符串 / 数组 / 对象）时
    /// 得到 `method() == None`。
    pub fn decode(body: &str) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_str(body)?;
        match value {
            Value::Object(object) => Ok(Self::from_object(object)),
            other => Err(DecodeError::NotAnObject(json_kind(&other))),
        }
    }

    pub fn from_object(object: Map<String, Value>) -> Self {
        let method = match object.get(fields::METHOD) {
            Some(value) if !is_truthy(value) => None,
            Some(Value::String(s)) => Some(s.clone()),
            // 非字符串的 method 交给 Dispatcher 按不支持的方法处理
            Some(other) => Some(other.to_string()),
            None => None,
        };
        Self {
            method,
            fields: object,
        }
    }

    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    /// 字段是否存在（只做存在性检查，不检查类型）
    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// 读取字符串字段；字段缺失返回 `Ok(None)`，类型不符返回错误
    pub fn str_field(&self, field: &'static str) -> Result<Option<&str>, ValidationError> {
        match self.fields.get(field) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(_) => Err(ValidationError::InvalidFieldType {
                field,
                expected: "string",
            }),
        }
    }

    /// 检查必填字段，一次性报告所有缺失字段
    pub fn require_fields(
        &self,
        method: MigrationMethod,
        required: &[&'static str],
    ) -> Result<(), ValidationError> {
        let missing: Vec<&'static str> = required
            .iter()
            .copied()
            .filter(|field| !self.has(field))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::MissingFields {
                method: method.as_str(),
                fields: missing,
            })
        }
    }

    /// 读取已确认存在的字符串字段
    pub fn required_str(&self, field: &'static str) -> Result<&str, ValidationError> {
        self.str_field(field)?.ok_or(ValidationError::InvalidFieldType {
            field,
            expected: "string",
        })
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// `<clientName>:<tableName>` 形式的表引用
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub client_name: String,
    pub table_name: String,
}

impl TableRef {
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let malformed = || ValidationError::MalformedTable {
            value: value.to_string(),
        };
        let mut parts = value.split(':');
        let (Some(client_name), Some(table_name), None) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(malformed());
        };
        if client_name.is_empty() || table_name.is_empty() {
            return Err(malformed());
        }
        Ok(Self {
            client_name: client_name.to_string(),
            table_name: table_name.to_string(),
        })
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.client_name, self.table_name)
    }
}

/// 队列传输层的消息信封
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Envelope {
    pub message_id: Option<String>,
    /// 删除 / 延长可见性所需的凭据
    pub receipt_handle: Option<String>,
    pub body: Option<String>,
    /// 传输层记录的大致投递次数
    pub receive_count: Option<u32>,
}

impl Envelope {
    pub fn new(
        message_id: impl Into<String>,
        receipt_handle: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            message_id: Some(message_id.into()),
            receipt_handle: Some(receipt_handle.into()),
            body: Some(body.into()),
            receive_count: None,
        }
    }

    pub fn message_id_or_unknown(&self) -> &str {
        self.message_id.as_deref().unwrap_or("unknown")
    }

    /// 解码消息体
    pub fn decode(&self) -> Result<Command, DecodeError> {
        let body = self.body.as_deref().ok_or(DecodeError::MissingBody)?;
        Command::decode(body)
    }
}

/// 消息确认策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AckPolicy {
    /// 除解码失败外，任何处理结果都确认（删除）消息
    #[default]
    AfterAttempt,
    /// 仅在下游处理成功时确认，其余留给队列重投
    OnSuccess,
}

impl FromStr for AckPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "after_attempt" | "always" => Ok(AckPolicy::AfterAttempt),
            "on_success" => Ok(AckPolicy::OnSuccess),
            other => Err(format!("unknown ack policy `{other}`")),
        }
    }
}
