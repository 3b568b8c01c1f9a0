//! 报表数据抓取
//!
//! 从缺陷服务分页拉取全量缺陷，从项目服务拉取项目清单用于补充名称。
//! 上游按 project_id、status、priority 过滤，日期范围在本地内存中过滤。

use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::{ReportConfig, UpstreamConfig};
use crate::error::AppError;
use crate::models::project::ProjectRecord;
use crate::models::report::{RemoteDefect, ReportFilters};

use super::transport_error;

// ==================== 数据抓取客户端 ====================

pub struct DataFetcher {
    client: reqwest::Client,
    defects_url: String,
    projects_url: String,
    page_size: usize,
    max_rows: usize,
}

impl DataFetcher {
    pub fn new(upstream: &UpstreamConfig, report: &ReportConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(upstream.fetch_timeout_secs))
            .build()
            .map_err(|e| AppError::internal_error(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            defects_url: upstream.defects_url.clone(),
            projects_url: upstream.projects_url.clone(),
            page_size: report.fetch_page_size,
            max_rows: report.fetch_max_rows,
        })
    }

    /// 按页遍历缺陷服务，直到拿到最后一个不满页或触达总量上限
    pub async fn fetch_defects(
        &self,
        filters: &ReportFilters,
        token: &str,
    ) -> Result<Vec<RemoteDefect>, AppError> {
        let mut rows: Vec<RemoteDefect> = Vec::new();
        let mut skip: usize = 0;

        loop {
            let page = self.fetch_defects_page(filters, skip, token).await?;
            let page_len = page.len();
            rows.extend(page);

            if rows.len() >= self.max_rows {
                warn!(
                    max_rows = self.max_rows,
                    "Defect fetch hit the row cap, report will be truncated"
                );
                rows.truncate(self.max_rows);
                break;
            }
            if page_len < self.page_size {
                break;
            }
            skip += self.page_size;
        }

        debug!(count = rows.len(), "Fetched defects for report");
        Ok(rows)
    }

    async fn fetch_defects_page(
        &self,
        filters: &ReportFilters,
        skip: usize,
        token: &str,
    ) -> Result<Vec<RemoteDefect>, AppError> {
        let mut query: Vec<(&str, String)> = vec![
            ("skip", skip.to_string()),
            ("limit", self.page_size.to_string()),
        ];
        if let Some(project_id) = filters.project_id {
            query.push(("project_id", project_id.to_string()));
        }
        if let Some(status) = filters.status {
            query.push(("status", status.to_string()));
        }
        if let Some(priority) = filters.priority {
            query.push(("priority", priority.to_string()));
        }

        let response = self
            .client
            .get(format!("{}/api/v1/defects", self.defects_url))
            .header("Authorization", format!("Bearer {}", token))
            .query(&query)
            .send()
            .await
            .map_err(|e| transport_error("Defects service", &e))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(AppError::upstream_unavailable(format!(
                "Defects service error: {}",
                status.as_u16()
            )));
        }

        #[derive(Deserialize)]
        struct DefectPage {
            #[serde(default)]
            data: Vec<RemoteDefect>,
        }

        let page: DefectPage = response.json().await.map_err(|e| {
            AppError::internal_error(format!("Failed to decode defects response: {}", e))
        })?;
        Ok(page.data)
    }

    /// 单个项目查询，项目不存在时返回 None 而不是报错
    pub async fn fetch_project(
        &self,
        project_id: Uuid,
        token: &str,
    ) -> Result<Option<ProjectRecord>, AppError> {
        let response = self
            .client
            .get(format!("{}/api/v1/projects/{}", self.projects_url, project_id))
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await
            .map_err(|e| transport_error("Projects service", &e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if status != StatusCode::OK {
            return Err(AppError::upstream_unavailable(format!(
                "Projects service error: {}",
                status.as_u16()
            )));
        }

        #[derive(Deserialize)]
        struct ProjectEnvelope {
            data: Option<ProjectRecord>,
        }

        let envelope: ProjectEnvelope = response.json().await.map_err(|e| {
            AppError::internal_error(format!("Failed to decode project response: {}", e))
        })?;
        Ok(envelope.data)
    }

    /// 项目清单，报表用来把 project_id 映射成名称
    pub async fn fetch_projects(&self, token: &str) -> Result<Vec<ProjectRecord>, AppError> {
        let query = [("limit", self.max_rows.to_string())];
        let response = self
            .client
            .get(format!("{}/api/v1/projects", self.projects_url))
            .header("Authorization", format!("Bearer {}", token))
            .query(&query)
            .send()
            .await
            .map_err(|e| transport_error("Projects service", &e))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(AppError::upstream_unavailable(format!(
                "Projects service error: {}",
                status.as_u16()
            )));
        }

        #[derive(Deserialize)]
        struct ProjectPage {
            #[serde(default)]
            data: Vec<ProjectRecord>,
        }

        let page: ProjectPage = response.json().await.map_err(|e| {
            AppError::internal_error(format!("Failed to decode projects response: {}", e))
        })?;
        Ok(page.data)
    }
}
