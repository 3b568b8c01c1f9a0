//! 报表生成
//!
//! 聚合、日期过滤、解决时长折算都是纯函数，服务层只负责串起抓取与导出。
//! 分布按枚举序输出，同一份数据多次生成结果一致。

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use futures::future;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::clients::DataFetcher;
use crate::config::ReportConfig;
use crate::error::{AppError, Result};
use crate::models::defect::DefectStatus;
use crate::models::project::ProjectRecord;
use crate::models::report::{
    DefectReportRow, DetailedReport, ExportFormat, PriorityCount, ProjectSummary, RemoteDefect,
    ReportFilters, StatusCount, SummaryReport,
};
use crate::services::export::{self, ExportFile};

const SECONDS_PER_DAY: f64 = 86_400.0;

// ==================== 纯聚合函数 ====================

/// 按创建日期过滤，闭区间
/// 任一边界给定时，缺少 created_at 的行会被剔除
pub fn filter_by_date_range(
    defects: Vec<RemoteDefect>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> Vec<RemoteDefect> {
    if start_date.is_none() && end_date.is_none() {
        return defects;
    }

    defects
        .into_iter()
        .filter(|defect| {
            let Some(created_at) = defect.created_at else {
                return false;
            };
            let created_date = created_at.date_naive();
            if let Some(start) = start_date {
                if created_date < start {
                    return false;
                }
            }
            if let Some(end) = end_date {
                if created_date > end {
                    return false;
                }
            }
            true
        })
        .collect()
}

/// 按状态计数，状态缺失的行不计
pub fn status_distribution(defects: &[RemoteDefect]) -> Vec<StatusCount> {
    let mut counts = BTreeMap::new();
    for defect in defects {
        if let Some(status) = defect.status {
            *counts.entry(status).or_insert(0u64) += 1;
        }
    }
    counts
        .into_iter()
        .map(|(status, count)| StatusCount { status, count })
        .collect()
}

/// 按优先级计数，优先级缺失的行不计
pub fn priority_distribution(defects: &[RemoteDefect]) -> Vec<PriorityCount> {
    let mut counts = BTreeMap::new();
    for defect in defects {
        if let Some(priority) = defect.priority {
            *counts.entry(priority).or_insert(0u64) += 1;
        }
    }
    counts
        .into_iter()
        .map(|(priority, count)| PriorityCount { priority, count })
        .collect()
}

/// 单行解决时长（天）
/// 只对 CLOSED 且两端时间齐备的行有值，updated_at 视作关闭时间
pub fn resolution_time_days(defect: &RemoteDefect) -> Option<f64> {
    if defect.status != Some(DefectStatus::Closed) {
        return None;
    }
    let created_at = defect.created_at?;
    let updated_at = defect.updated_at?;
    let seconds = (updated_at - created_at).num_milliseconds() as f64 / 1000.0;
    Some(seconds / SECONDS_PER_DAY)
}

/// 平均解决时长（天），没有可计算的行时为 None
pub fn average_resolution_time(defects: &[RemoteDefect]) -> Option<f64> {
    let times: Vec<f64> = defects.iter().filter_map(resolution_time_days).collect();
    if times.is_empty() {
        return None;
    }
    Some(times.iter().sum::<f64>() / times.len() as f64)
}

/// 汇总报表
/// closed 只计 CLOSED，open 计 NEW/IN_PROGRESS/ON_REVIEW，CANCELED 两边都不计
pub fn summary_report(
    defects: &[RemoteDefect],
    project: Option<&ProjectRecord>,
    filters: &ReportFilters,
) -> SummaryReport {
    let total_defects = defects.len();
    let status_dist = status_distribution(defects);
    let priority_dist = priority_distribution(defects);
    let avg_resolution = average_resolution_time(defects);

    let closed_defects_count = defects
        .iter()
        .filter(|d| d.status == Some(DefectStatus::Closed))
        .count();
    let open_defects_count = defects
        .iter()
        .filter(|d| {
            matches!(
                d.status,
                Some(DefectStatus::New)
                    | Some(DefectStatus::InProgress)
                    | Some(DefectStatus::OnReview)
            )
        })
        .count();

    let project_summary = project.map(|p| ProjectSummary {
        project_id: p.id,
        project_name: p.name.clone(),
        total_defects,
        status_distribution: status_dist.clone(),
        priority_distribution: priority_dist.clone(),
        average_resolution_time_days: avg_resolution,
    });

    SummaryReport {
        total_defects,
        status_distribution: status_dist,
        priority_distribution: priority_dist,
        average_resolution_time_days: avg_resolution,
        closed_defects_count,
        open_defects_count,
        project_summary,
        filters_applied: filters.clone(),
        generated_at: Utc::now(),
    }
}

/// 明细报表，项目名从映射表补充
pub fn detailed_report(
    defects: &[RemoteDefect],
    projects: &HashMap<Uuid, ProjectRecord>,
    filters: &ReportFilters,
) -> DetailedReport {
    let rows: Vec<DefectReportRow> = defects
        .iter()
        .map(|defect| DefectReportRow {
            id: defect.id,
            project_id: defect.project_id,
            project_name: projects.get(&defect.project_id).map(|p| p.name.clone()),
            title: defect.title.clone(),
            priority: defect.priority,
            status: defect.status,
            author_id: defect.author_id,
            assignee_id: defect.assignee_id,
            due_date: defect.due_date,
            created_at: defect.created_at,
            updated_at: defect.updated_at,
            resolution_time_days: resolution_time_days(defect),
        })
        .collect();

    DetailedReport {
        total_count: rows.len(),
        defects: rows,
        filters_applied: filters.clone(),
        generated_at: Utc::now(),
    }
}

// ==================== 报表服务 ====================

/// 报表服务
pub struct ReportService {
    fetcher: DataFetcher,
    max_export_rows: usize,
    generation_timeout_secs: u64,
}

impl ReportService {
    pub fn new(fetcher: DataFetcher, report: &ReportConfig) -> Self {
        Self {
            fetcher,
            max_export_rows: report.max_export_rows,
            generation_timeout_secs: report.generation_timeout_secs,
        }
    }

    /// 汇总报表
    /// 按单个项目过滤时项目必须存在，并附带该项目的细分块
    #[instrument(skip(self, filters, token))]
    pub async fn summary(&self, filters: &ReportFilters, token: &str) -> Result<SummaryReport> {
        self.with_budget(async {
            // 缺陷与项目并发抓取
            let (defects, project) = match filters.project_id {
                Some(project_id) => {
                    let (defects, project) = future::try_join(
                        self.fetcher.fetch_defects(filters, token),
                        self.fetcher.fetch_project(project_id, token),
                    )
                    .await?;
                    let project = project.ok_or_else(|| {
                        AppError::not_found(format!("Project with ID {} not found", project_id))
                    })?;
                    (defects, Some(project))
                }
                None => (self.fetcher.fetch_defects(filters, token).await?, None),
            };
            let defects = filter_by_date_range(defects, filters.start_date, filters.end_date);

            info!(total = defects.len(), "Summary report generated");
            Ok(summary_report(&defects, project.as_ref(), filters))
        })
        .await
    }

    /// 明细报表
    #[instrument(skip(self, filters, token))]
    pub async fn detailed(&self, filters: &ReportFilters, token: &str) -> Result<DetailedReport> {
        self.with_budget(async {
            let (defects, projects) = future::try_join(
                self.fetcher.fetch_defects(filters, token),
                self.projects_map(token),
            )
            .await?;
            let defects = filter_by_date_range(defects, filters.start_date, filters.end_date);

            info!(total = defects.len(), "Detailed report generated");
            Ok(detailed_report(&defects, &projects, filters))
        })
        .await
    }

    /// 导出文件
    /// 行数超限直接拒绝，上限判定在项目补充与序列化之前
    #[instrument(skip(self, filters, token))]
    pub async fn export(
        &self,
        filters: &ReportFilters,
        format: ExportFormat,
        token: &str,
    ) -> Result<ExportFile> {
        self.with_budget(async {
            let defects = self.fetcher.fetch_defects(filters, token).await?;
            let defects = filter_by_date_range(defects, filters.start_date, filters.end_date);

            if defects.len() > self.max_export_rows {
                return Err(AppError::ExportLimitExceeded {
                    count: defects.len(),
                    limit: self.max_export_rows,
                });
            }

            let projects = self.projects_map(token).await?;
            let report = detailed_report(&defects, &projects, filters);
            let file = export::to_file(&report, format)?;

            info!(
                rows = report.total_count,
                filename = %file.filename,
                "Report exported"
            );
            Ok(file)
        })
        .await
    }

    // ==================== 私有方法 ====================

    async fn projects_map(&self, token: &str) -> Result<HashMap<Uuid, ProjectRecord>> {
        let projects = self.fetcher.fetch_projects(token).await?;
        Ok(projects.into_iter().map(|p| (p.id, p)).collect())
    }

    /// 整条流水线共用一个时间预算，超时按上游超时上报
    async fn with_budget<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(Duration::from_secs(self.generation_timeout_secs), fut).await {
            Ok(result) => result,
            Err(_) => Err(AppError::upstream_timeout("Report generation timed out")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn remote(
        status: Option<DefectStatus>,
        created_at: Option<&str>,
        updated_at: Option<&str>,
    ) -> RemoteDefect {
        let parse = |s: &str| {
            chrono::DateTime::parse_from_rfc3339(s)
                .unwrap()
                .with_timezone(&Utc)
        };
        RemoteDefect {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            title: Some("Test defect".to_string()),
            priority: Some(crate::models::defect::DefectPriority::Medium),
            status,
            author_id: Some(Uuid::new_v4()),
            assignee_id: None,
            due_date: None,
            created_at: created_at.map(parse),
            updated_at: updated_at.map(parse),
        }
    }

    #[test]
    fn test_date_filter_is_inclusive_on_both_ends() {
        let defects = vec![
            remote(Some(DefectStatus::New), Some("2024-01-01T00:00:00Z"), None),
            remote(Some(DefectStatus::New), Some("2024-01-15T12:30:00Z"), None),
            remote(Some(DefectStatus::New), Some("2024-01-31T23:59:59Z"), None),
            remote(Some(DefectStatus::New), Some("2024-02-01T00:00:00Z"), None),
        ];

        let filtered = filter_by_date_range(
            defects,
            NaiveDate::from_ymd_opt(2024, 1, 1),
            NaiveDate::from_ymd_opt(2024, 1, 31),
        );
        assert_eq!(filtered.len(), 3);
    }

    #[test]
    fn test_date_filter_drops_rows_without_created_at() {
        let defects = vec![
            remote(Some(DefectStatus::New), None, None),
            remote(Some(DefectStatus::New), Some("2024-01-15T00:00:00Z"), None),
        ];

        let filtered =
            filter_by_date_range(defects, NaiveDate::from_ymd_opt(2024, 1, 1), None);
        assert_eq!(filtered.len(), 1);
    }

    #[test]
    fn test_date_filter_without_bounds_is_noop() {
        let defects = vec![remote(Some(DefectStatus::New), None, None)];
        let filtered = filter_by_date_range(defects, None, None);
        assert_eq!(filtered.len(), 1);
    }

    #[test]
    fn test_status_distribution_skips_missing() {
        let defects = vec![
            remote(Some(DefectStatus::New), None, None),
            remote(Some(DefectStatus::New), None, None),
            remote(Some(DefectStatus::Closed), None, None),
            remote(None, None, None),
        ];

        let dist = status_distribution(&defects);
        assert_eq!(
            dist,
            vec![
                StatusCount {
                    status: DefectStatus::New,
                    count: 2
                },
                StatusCount {
                    status: DefectStatus::Closed,
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn test_resolution_time_exactly_three_days() {
        let defect = remote(
            Some(DefectStatus::Closed),
            Some("2024-01-01T00:00:00Z"),
            Some("2024-01-04T00:00:00Z"),
        );
        assert_eq!(resolution_time_days(&defect), Some(3.0));
    }

    #[test]
    fn test_resolution_time_only_for_closed() {
        let defect = remote(
            Some(DefectStatus::InProgress),
            Some("2024-01-01T00:00:00Z"),
            Some("2024-01-04T00:00:00Z"),
        );
        assert_eq!(resolution_time_days(&defect), None);
    }

    #[test]
    fn test_average_resolution_time_without_closed_is_none() {
        let defects = vec![
            remote(Some(DefectStatus::New), Some("2024-01-01T00:00:00Z"), None),
            remote(
                Some(DefectStatus::Canceled),
                Some("2024-01-01T00:00:00Z"),
                Some("2024-01-02T00:00:00Z"),
            ),
        ];
        assert_eq!(average_resolution_time(&defects), None);
    }

    #[test]
    fn test_summary_counts_closed_and_open_separately() {
        // CANCELED 不计入 closed 也不计入 open
        let defects = vec![
            remote(Some(DefectStatus::New), None, None),
            remote(
                Some(DefectStatus::Closed),
                Some("2024-01-01T00:00:00Z"),
                Some("2024-01-04T00:00:00Z"),
            ),
            remote(Some(DefectStatus::Canceled), None, None),
        ];

        let report = summary_report(&defects, None, &ReportFilters::default());
        assert_eq!(report.total_defects, 3);
        assert_eq!(report.closed_defects_count, 1);
        assert_eq!(report.open_defects_count, 1);
        assert_eq!(report.average_resolution_time_days, Some(3.0));
        assert!(report.project_summary.is_none());
    }

    #[test]
    fn test_summary_includes_project_block_when_given() {
        let defects = vec![remote(Some(DefectStatus::New), None, None)];
        let project = ProjectRecord {
            id: Uuid::new_v4(),
            name: "River crossing".to_string(),
            code: None,
            address: None,
            customer_name: None,
            start_date: None,
            end_date: None,
        };

        let report = summary_report(&defects, Some(&project), &ReportFilters::default());
        let block = report.project_summary.unwrap();
        assert_eq!(block.project_name, "River crossing");
        assert_eq!(block.total_defects, 1);
    }

    #[test]
    fn test_detailed_report_enriches_project_names() {
        let mut defect = remote(
            Some(DefectStatus::Closed),
            Some("2024-01-01T00:00:00Z"),
            Some("2024-01-04T00:00:00Z"),
        );
        let project_id = Uuid::new_v4();
        defect.project_id = project_id;

        let other = remote(Some(DefectStatus::New), None, None);

        let mut projects = HashMap::new();
        projects.insert(
            project_id,
            ProjectRecord {
                id: project_id,
                name: "North tower".to_string(),
                code: None,
                address: None,
                customer_name: None,
                start_date: None,
                end_date: None,
            },
        );

        let report =
            detailed_report(&[defect, other], &projects, &ReportFilters::default());
        assert_eq!(report.total_count, 2);
        assert_eq!(report.defects[0].project_name.as_deref(), Some("North tower"));
        assert_eq!(report.defects[0].resolution_time_days, Some(3.0));
        assert!(report.defects[1].project_name.is_none());
        assert!(report.defects[1].resolution_time_days.is_none());
    }

    #[test]
    fn test_half_day_resolution() {
        let created = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let updated = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let mut defect = remote(Some(DefectStatus::Closed), None, None);
        defect.created_at = Some(created);
        defect.updated_at = Some(updated);
        assert_eq!(resolution_time_days(&defect), Some(0.5));
    }
}
