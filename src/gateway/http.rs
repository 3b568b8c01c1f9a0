//! 带重试的上游 HTTP 客户端
//! 只在传输层失败（超时、连接错误）时重试，上游返回的任何 HTTP
//! 状态码都视为成功并原样交回，由调用方决定如何处理

use axum::body::Bytes;
use reqwest::{header::HeaderMap, Client, Method};
use std::time::Duration;
use tracing::warn;

use crate::{config::UpstreamConfig, error::AppError};

/// 上游代理客户端
/// 超时按请求传入，重试参数来自配置
#[derive(Debug, Clone)]
pub struct ProxyClient {
    client: Client,
    max_retries: u32,
    retry_delay: Duration,
}

impl ProxyClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, AppError> {
        // 不设全局超时，每个请求按上游类型单独给定
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::internal_error(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            max_retries: config.max_retries,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        })
    }

    /// 发送请求，传输层失败时线性退避重试
    /// 共尝试 max_retries + 1 次，第 n 次失败后等待 retry_delay * (n + 1)
    pub async fn request_with_retry(
        &self,
        method: Method,
        url: &str,
        headers: HeaderMap,
        body: Option<Bytes>,
        timeout: Duration,
    ) -> Result<reqwest::Response, reqwest::Error> {
        let mut attempt: u32 = 0;

        loop {
            let mut request = self
                .client
                .request(method.clone(), url)
                .headers(headers.clone())
                .timeout(timeout);

            if let Some(bytes) = &body {
                // Bytes 克隆是引用计数拷贝
                request = request.body(bytes.clone());
            }

            match request.send().await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    if attempt >= self.max_retries {
                        return Err(e);
                    }

                    let delay = self.retry_delay * (attempt + 1);
                    warn!(
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        url = %url,
                        error = %e,
                        "Upstream request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
