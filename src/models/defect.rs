//! 缺陷领域模型
//! 状态与优先级为 Postgres 枚举，线上取值为 SCREAMING_SNAKE_CASE

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// 缺陷状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "defect_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DefectStatus {
    /// 新建
    New,
    /// 处理中
    InProgress,
    /// 待复核
    OnReview,
    /// 已关闭（终态）
    Closed,
    /// 已取消（终态）
    Canceled,
}

impl DefectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DefectStatus::New => "NEW",
            DefectStatus::InProgress => "IN_PROGRESS",
            DefectStatus::OnReview => "ON_REVIEW",
            DefectStatus::Closed => "CLOSED",
            DefectStatus::Canceled => "CANCELED",
        }
    }

    /// 终态不再允许任何状态变更
    pub fn is_final(&self) -> bool {
        matches!(self, DefectStatus::Closed | DefectStatus::Canceled)
    }
}

impl fmt::Display for DefectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 缺陷优先级
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "defect_priority", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DefectPriority {
    /// 低
    Low,
    /// 中
    Medium,
    /// 高
    High,
    /// 紧急
    Critical,
}

impl DefectPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            DefectPriority::Low => "LOW",
            DefectPriority::Medium => "MEDIUM",
            DefectPriority::High => "HIGH",
            DefectPriority::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for DefectPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 缺陷 - 核心业务实体
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Defect {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: String,
    pub priority: DefectPriority,
    pub status: DefectStatus,

    // 人员字段指向外部用户目录
    pub author_id: Uuid,
    pub assignee_id: Option<Uuid>,

    pub due_date: Option<NaiveDate>,
    pub location: Option<String>,

    // 审计字段，updated_at 在每次变更时刷新
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 创建缺陷请求
/// author_id 来自令牌，status 固定为 NEW，均不接受请求体传入
#[derive(Debug, Deserialize, validator::Validate)]
pub struct CreateDefectRequest {
    pub project_id: Uuid,
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(min = 1))]
    pub description: String,
    pub priority: DefectPriority,
    pub assignee_id: Option<Uuid>,
    pub due_date: Option<NaiveDate>,
    #[validate(length(max = 255))]
    pub location: Option<String>,
}

/// 部分更新缺陷请求
/// 可置空字段用双层 Option 区分「缺失」与「显式 null」：
/// 缺失 -> None，null -> Some(None)，有值 -> Some(Some(v))
#[derive(Debug, Default, Deserialize, validator::Validate)]
pub struct UpdateDefectRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    #[validate(length(min = 1))]
    pub description: Option<String>,
    pub priority: Option<DefectPriority>,
    pub status: Option<DefectStatus>,
    #[serde(default, deserialize_with = "double_option")]
    pub assignee_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    pub location: Option<Option<String>>,
}

/// 双层 Option 反序列化
/// serde 对缺失字段走 default（外层 None），出现即包一层 Some
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// 缺陷查询过滤器
#[derive(Debug, Deserialize, validator::Validate)]
pub struct DefectListFilters {
    pub project_id: Option<Uuid>,
    pub status: Option<DefectStatus>,
    pub priority: Option<DefectPriority>,
    pub author_id: Option<Uuid>,
    pub assignee_id: Option<Uuid>,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub skip: i64,
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 1000))]
    pub limit: i64,
}

fn default_limit() -> i64 {
    100
}

impl Default for DefectListFilters {
    fn default() -> Self {
        Self {
            project_id: None,
            status: None,
            priority: None,
            author_id: None,
            assignee_id: None,
            skip: 0,
            limit: default_limit(),
        }
    }
}

/// 分页参数（历史与评论列表）
#[derive(Debug, Deserialize, validator::Validate)]
pub struct Pagination {
    #[serde(default)]
    #[validate(range(min = 0))]
    pub skip: i64,
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 1000))]
    pub limit: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: default_limit(),
        }
    }
}
