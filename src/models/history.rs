//! 缺陷变更历史模型
//! 只追加，新旧值为展示用字符串快照（不保留原始类型）

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 创建事件的哨兵字段名
pub const CREATED_FIELD: &str = "created";

/// 单条字段变更记录
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DefectHistoryEntry {
    pub id: Uuid,
    pub defect_id: Uuid,
    pub changed_by_id: Uuid,
    /// 被跟踪字段名，或创建事件的哨兵值 "created"
    pub field_name: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub changed_at: DateTime<Utc>,
}
