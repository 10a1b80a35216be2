//! 存储管理服务 HTTP 客户端

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

use crate::domain::{DownstreamClient, DownstreamRequest, DownstreamResponse, HttpMethod};
use crate::error::TransportError;

/// 基于 reqwest 的下游客户端，每个请求都有超时上限
#[derive(Clone)]
pub struct HttpDownstreamClient {
    client: Client,
    base_url: Url,
}

impl HttpDownstreamClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let invalid = |reason: String| TransportError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason,
        };
        let parsed = Url::parse(base_url).map_err(|err| invalid(err.to_string()))?;
        if parsed.cannot_be_a_base() {
            return Err(invalid("url cannot be a base".to_string()));
        }

        let client = Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .build()
            .map_err(|err| TransportError::Request(format!("failed to build http client: {err}")))?;

        Ok(Self {
            client,
            base_url: parsed,
        })
    }

    /// `{base}` 或 `{base}/{path}`
    pub fn endpoint(&self, path: Option<&str>) -> Url {
        let mut url = self.base_url.clone();
        if let Some(path) = path {
            // 构造时已排除 cannot-be-a-base 的地址
            if let Ok(mut segments) = url.path_segments_mut() {
                segments.pop_if_empty().push(path);
            }
        }
        url
    }
}

#[async_trait]
impl DownstreamClient for HttpDownstreamClient {
    #[instrument(skip(self, request), fields(method = ?request.method, path = ?request.path))]
    async fn send(
        &self,
        request: &DownstreamRequest,
    ) -> Result<DownstreamResponse, TransportError> {
        let url = self.endpoint(request.path);
        let mut builder = match request.method {
            HttpMethod::Post => self.client.post(url),
            HttpMethod::Delete => self.client.delete(url),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        debug!(status, "Downstream responded");

        Ok(DownstreamResponse { status, body })
    }
}
