//! Request Builders
//!
//! 每种命令方法对应一个 Builder：提取并校验必填字段，构造最多一个下游请求。
//! 构造（[`MethodBuilder::prepare`]）是纯函数，发送与结果分类由
//! [`RequestBuilder::validate_and_send`] 统一完成。

use std::fmt;

use serde_json::{Value, json};
use tracing::{info, warn};

use crate::domain::model::fields;
use crate::domain::{
    Command, DownstreamClient, DownstreamRequest, HttpMethod, MigrationMethod, TableRef,
};
use crate::error::{HandlerResult, TransportError, ValidationError};

/// PUT_TABLE_BLOBID 的下游路径
pub const DIGEST_URL_PATH: &str = "digestUrl";

/// 请求针对的对象，用于日志
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    Blob(String),
    Table(String),
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Blob(blob_id) => write!(f, "blobId={blob_id}"),
            Subject::Table(table) => write!(f, "table={table}"),
        }
    }
}

/// 校验通过后的请求
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub subject: Subject,
    /// None 表示该方法尚未定义下游副作用
    pub request: Option<DownstreamRequest>,
}

/// 处理成功的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerOutcome {
    pub subject: Subject,
    /// 下游返回的状态码；未发送请求时为 None
    pub status: Option<u16>,
}

pub trait MethodBuilder {
    fn method(&self) -> MigrationMethod;

    fn prepare(&self, command: &Command) -> Result<PreparedRequest, ValidationError>;
}

/// 表字段的日志展示（只做存在性检查的方法不要求字符串）
fn table_label(command: &Command) -> String {
    match command.get(fields::TABLE) {
        Some(Value::String(table)) => table.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

/// PUT_TABLE_BLOBID：让存储服务抓取 requestUrl 指向的内容
#[derive(Debug, Clone, Copy, Default)]
pub struct PutBlobBuilder;

impl MethodBuilder for PutBlobBuilder {
    fn method(&self) -> MigrationMethod {
        MigrationMethod::PutTableBlobId
    }

    fn prepare(&self, command: &Command) -> Result<PreparedRequest, ValidationError> {
        command.require_fields(
            self.method(),
            &[fields::REQUEST_URL, fields::TENANT_NAME, fields::BLOB_ID],
        )?;
        let request_url = command.required_str(fields::REQUEST_URL)?;
        let tenant_name = command.required_str(fields::TENANT_NAME)?;
        let blob_id = command.required_str(fields::BLOB_ID)?;

        Ok(PreparedRequest {
            subject: Subject::Blob(blob_id.to_string()),
            request: Some(DownstreamRequest {
                method: HttpMethod::Post,
                path: Some(DIGEST_URL_PATH),
                query: Vec::new(),
                body: Some(json!({
                    "url": request_url,
                    "tenantName": tenant_name,
                    "bypassCache": true,
                    "includeMetadata": true,
                    "overrideHeaders": {},
                    "preferProxy": true,
                })),
            }),
        })
    }
}

/// DELETE_BLOB
#[derive(Debug, Clone, Copy, Default)]
pub struct DeleteBlobBuilder;

impl MethodBuilder for DeleteBlobBuilder {
    fn method(&self) -> MigrationMethod {
        MigrationMethod::DeleteBlob
    }

    fn prepare(&self, command: &Command) -> Result<PreparedRequest, ValidationError> {
        command.require_fields(self.method(), &[fields::TABLE, fields::BLOB_ID])?;
        let table = TableRef::parse(command.required_str(fields::TABLE)?)?;
        let blob_id = command.required_str(fields::BLOB_ID)?;

        Ok(PreparedRequest {
            subject: Subject::Blob(blob_id.to_string()),
            request: Some(DownstreamRequest {
                method: HttpMethod::Delete,
                path: None,
                query: vec![
                    ("tableName", table.table_name),
                    ("clientName", table.client_name),
                    ("blobId", blob_id.to_string()),
                ],
                body: None,
            }),
        })
    }
}

/// CREATE_TABLE：目前只校验字段
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateTableBuilder;

impl MethodBuilder for CreateTableBuilder {
    fn method(&self) -> MigrationMethod {
        MigrationMethod::CreateTable
    }

    fn prepare(&self, command: &Command) -> Result<PreparedRequest, ValidationError> {
        command.require_fields(
            self.method(),
            &[fields::TABLE, fields::OPTIONS, fields::ATTRIBUTES, fields::AUDIT],
        )?;
        Ok(PreparedRequest {
            subject: Subject::Table(table_label(command)),
            request: None,
        })
    }
}

/// DELETE_TABLE
#[derive(Debug, Clone, Copy, Default)]
pub struct DeleteTableBuilder;

impl MethodBuilder for DeleteTableBuilder {
    fn method(&self) -> MigrationMethod {
        MigrationMethod::DeleteTable
    }

    fn prepare(&self, command: &Command) -> Result<PreparedRequest, ValidationError> {
        command.require_fields(self.method(), &[fields::TABLE, fields::AUDIT])?;
        let table = TableRef::parse(command.required_str(fields::TABLE)?)?;

        Ok(PreparedRequest {
            subject: Subject::Table(table.to_string()),
            request: Some(DownstreamRequest {
                method: HttpMethod::Delete,
                path: None,
                query: vec![
                    ("tableName", table.table_name),
                    ("clientName", table.client_name),
                ],
                body: None,
            }),
        })
    }
}

/// PURGE_TABLE：目前只校验字段
#[derive(Debug, Clone, Copy, Default)]
pub struct PurgeTableBuilder;

impl MethodBuilder for PurgeTableBuilder {
    fn method(&self) -> MigrationMethod {
        MigrationMethod::PurgeTable
    }

    fn prepare(&self, command: &Command) -> Result<PreparedRequest, ValidationError> {
        command.require_fields(self.method(), &[fields::TABLE, fields::AUDIT])?;
        Ok(PreparedRequest {
            subject: Subject::Table(table_label(command)),
            request: None,
        })
    }
}

/// SET_TABLE_ATTRIBUTE：目前只校验字段
#[derive(Debug, Clone, Copy, Default)]
pub struct SetTableAttributeBuilder;

impl MethodBuilder for SetTableAttributeBuilder {
    fn method(&self) -> MigrationMethod {
        MigrationMethod::SetTableAttribute
    }

    fn prepare(&self, command: &Command) -> Result<PreparedRequest, ValidationError> {
        command.require_fields(
            self.method(),
            &[fields::TABLE, fields::ATTRIBUTES, fields::AUDIT],
        )?;
        Ok(PreparedRequest {
            subject: Subject::Table(table_label(command)),
            request: None,
        })
    }
}

/// Builder 的枚举封装，Dispatcher 通过它做多态分发
#[derive(Debug, Clone, Copy)]
pub enum RequestBuilder {
    PutBlob(PutBlobBuilder),
    DeleteBlob(DeleteBlobBuilder),
    CreateTable(CreateTableBuilder),
    DeleteTable(DeleteTableBuilder),
    PurgeTable(PurgeTableBuilder),
    SetTableAttribute(SetTableAttributeBuilder),
}

impl RequestBuilder {
    pub fn for_method(method: MigrationMethod) -> Self {
        match method {
            MigrationMethod::PutTableBlobId => RequestBuilder::PutBlob(PutBlobBuilder),
            MigrationMethod::DeleteBlob => RequestBuilder::DeleteBlob(DeleteBlobBuilder),
            MigrationMethod::CreateTable => RequestBuilder::CreateTable(CreateTableBuilder),
            MigrationMethod::DeleteTable => RequestBuilder::DeleteTable(DeleteTableBuilder),
            MigrationMethod::PurgeTable => RequestBuilder::PurgeTable(PurgeTableBuilder),
            MigrationMethod::SetTableAttribute => {
                RequestBuilder::SetTableAttribute(SetTableAttributeBuilder)
            }
        }
    }

    pub fn method(&self) -> MigrationMethod {
        match self {
            RequestBuilder::PutBlob(builder) => builder.method(),
            RequestBuilder::DeleteBlob(builder) => builder.method(),
            RequestBuilder::CreateTable(builder) => builder.method(),
            RequestBuilder::DeleteTable(builder) => builder.method(),
            RequestBuilder::PurgeTable(builder) => builder.method(),
            RequestBuilder::SetTableAttribute(builder) => builder.method(),
        }
    }

    pub fn prepare(&self, command: &Command) -> Result<PreparedRequest, ValidationError> {
        match self {
            RequestBuilder::PutBlob(builder) => builder.prepare(command),
            RequestBuilder::DeleteBlob(builder) => builder.prepare(command),
            RequestBuilder::CreateTable(builder) => builder.prepare(command),
            RequestBuilder::DeleteTable(builder) => builder.prepare(command),
            RequestBuilder::PurgeTable(builder) => builder.prepare(command),
            RequestBuilder::SetTableAttribute(builder) => builder.prepare(command),
        }
    }

    /// 校验命令、发送下游请求并分类结果
    ///
    /// 只有状态码 200 视为成功，不做重试。
    pub async fn validate_and_send(
        &self,
        command: &Command,
        client: &dyn DownstreamClient,
    ) -> HandlerResult<HandlerOutcome> {
        let method = self.method();
        let PreparedRequest { subject, request } = self.prepare(command)?;

        let Some(request) = request else {
            info!(method = %method, %subject, "Command validated, no downstream effect defined");
            return Ok(HandlerOutcome {
                subject,
                status: None,
            });
        };

        let response = client.send(&request).await?;
        if response.status != 200 {
            warn!(
                method = %method,
                %subject,
                status = response.status,
                "Downstream rejected request"
            );
            return Err(TransportError::UnexpectedStatus {
                status: response.status,
                body: response.body,
            }
            .into());
        }

        info!(method = %method, %subject, status = response.status, "Downstream request succeeded");
        Ok(HandlerOutcome {
            subject,
            status: Some(response.status),
        })
    }
}
