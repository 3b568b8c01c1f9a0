//! 报表线格式与聚合产物
//! 报表不落库，全部在内存中从缺陷服务的响应行计算

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::defect::{DefectPriority, DefectStatus};

/// 缺陷服务返回的原始行
/// 枚举与时间字段宽松解码：缺失或无法解析时记为 None，不让单行坏数据
/// 拖垮整次抓取
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteDefect {
    pub id: Uuid,
    pub project_id: Uuid,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_option")]
    pub priority: Option<DefectPriority>,
    #[serde(default, deserialize_with = "lenient_option")]
    pub status: Option<DefectStatus>,
    #[serde(default)]
    pub author_id: Option<Uuid>,
    #[serde(default)]
    pub assignee_id: Option<Uuid>,
    #[serde(default, deserialize_with = "lenient_option")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient_option")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_option")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// 宽松反序列化：解析失败按 None 处理
fn lenient_option<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: serde::de::DeserializeOwned,
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

/// 报表查询过滤器，同时作为响应中的 filters_applied 回显
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportFilters {
    pub project_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<DefectStatus>,
    pub priority: Option<DefectPriority>,
}

/// 状态分布条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: DefectStatus,
    pub count: u64,
}

/// 优先级分布条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityCount {
    pub priority: DefectPriority,
    pub count: u64,
}

/// 单项目细分（仅在按项目过滤时出现）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub project_id: Uuid,
    pub project_name: String,
    pub total_defects: usize,
    pub status_distribution: Vec<StatusCount>,
    pub priority_distribution: Vec<PriorityCount>,
    pub average_resolution_time_days: Option<f64>,
}

/// 汇总报表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryReport {
    pub total_defects: usize,
    pub status_distribution: Vec<StatusCount>,
    pub priority_distribution: Vec<PriorityCount>,
    pub average_resolution_time_days: Option<f64>,
    /// CLOSED 的数量
    pub closed_defects_count: usize,
    /// NEW + IN_PROGRESS + ON_REVIEW 的数量，CANCELED 两边都不计
    pub open_defects_count: usize,
    pub project_summary: Option<ProjectSummary>,
    pub filters_applied: ReportFilters,
    pub generated_at: DateTime<Utc>,
}

/// 明细报表单行，导出列顺序与字段顺序一致
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefectReportRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub project_name: Option<String>,
    pub title: Option<String>,
    pub priority: Option<DefectPriority>,
    pub status: Option<DefectStatus>,
    pub author_id: Option<Uuid>,
    pub assignee_id: Option<Uuid>,
    pub due_date: Option<NaiveDate>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    /// 仅 CLOSED 行计算，(updated_at - created_at) 按 86400 秒一天折算
    pub resolution_time_days: Option<f64>,
}

/// 明细报表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailedReport {
    pub defects: Vec<DefectReportRow>,
    pub total_count: usize,
    pub filters_applied: ReportFilters,
    pub generated_at: DateTime<Utc>,
}

/// 导出格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Xlsx,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
        }
    }

    pub fn media_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }
}

/// 导出格式查询参数
#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub format: ExportFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_defect_lenient_decode() {
        // 状态非法、优先级缺失、时间戳格式错误，均应解码为 None
        let row: RemoteDefect = serde_json::from_str(
            r#"{
                "id": "0a2f1f4e-41f1-4c1a-93c8-ab0907ad7716",
                "project_id": "5b7f9a76-2a34-44b0-a07c-4c8269a1b843",
                "title": "Cracked facade panel",
                "status": "NOT_A_STATUS",
                "created_at": "yesterday",
                "updated_at": "2024-03-01T10:00:00Z"
            }"#,
        )
        .unwrap();

        assert_eq!(row.title.as_deref(), Some("Cracked facade panel"));
        assert!(row.status.is_none());
        assert!(row.priority.is_none());
        assert!(row.created_at.is_none());
        assert!(row.updated_at.is_some());
    }

    #[test]
    fn test_remote_defect_full_decode() {
        let row: RemoteDefect = serde_json::from_str(
            r#"{
                "id": "0a2f1f4e-41f1-4c1a-93c8-ab0907ad7716",
                "project_id": "5b7f9a76-2a34-44b0-a07c-4c8269a1b843",
                "title": "Leaking pipe",
                "priority": "HIGH",
                "status": "CLOSED",
                "author_id": "c1bb1f2e-9c2e-4f3a-8e46-0de0ccfcbe40",
                "due_date": "2024-05-01",
                "created_at": "2024-03-01T10:00:00Z",
                "updated_at": "2024-03-04T10:00:00Z"
            }"#,
        )
        .unwrap();

        assert_eq!(row.status, Some(DefectStatus::Closed));
        assert_eq!(row.priority, Some(DefectPriority::High));
        assert_eq!(
            row.due_date,
            Some(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap())
        );
    }

    #[test]
    fn test_export_format_defaults_to_csv() {
        let query: ExportQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.format, ExportFormat::Csv);
        assert_eq!(query.format.extension(), "csv");
        assert_eq!(query.format.media_type(), "text/csv");
        assert_eq!(
            ExportFormat::Xlsx.media_type(),
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        );
    }
}
