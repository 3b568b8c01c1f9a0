//! 目录校验客户端
//!
//! 缺陷服务在写入前向认证服务与项目服务确认引用的用户和项目确实存在。
//! 调用方的令牌原样透传，目录服务自行完成鉴权。

use std::time::Duration;

use reqwest::StatusCode;
use uuid::Uuid;

use crate::config::UpstreamConfig;
use crate::error::AppError;

use super::transport_error;

// ==================== 目录客户端 ====================

pub struct DirectoryClient {
    client: reqwest::Client,
    auth_url: String,
    projects_url: String,
}

impl DirectoryClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AppError::internal_error(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            auth_url: config.auth_url.clone(),
            projects_url: config.projects_url.clone(),
        })
    }

    /// 校验用户存在，用于受派人指派
    pub async fn validate_user_exists(&self, user_id: Uuid, token: &str) -> Result<(), AppError> {
        let response = self
            .client
            .get(format!("{}/api/v1/users/{}", self.auth_url, user_id))
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await
            .map_err(|e| transport_error("Authentication service", &e))?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => Err(AppError::not_found(format!(
                "User with ID {} not found",
                user_id
            ))),
            status => {
                tracing::warn!(status = %status, "Authentication service returned unexpected status");
                Err(AppError::upstream_unavailable("Authentication service error"))
            }
        }
    }

    /// 校验项目存在，缺陷必须挂在真实项目下
    pub async fn validate_project_exists(
        &self,
        project_id: Uuid,
        token: &str,
    ) -> Result<(), AppError> {
        let response = self
            .client
            .get(format!("{}/api/v1/projects/{}", self.projects_url, project_id))
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await
            .map_err(|e| transport_error("Projects service", &e))?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => Err(AppError::not_found(format!(
                "Project with ID {} not found",
                project_id
            ))),
            status => {
                tracing::warn!(status = %status, "Projects service returned unexpected status");
                Err(AppError::upstream_unavailable("Projects service error"))
            }
        }
    }
}
