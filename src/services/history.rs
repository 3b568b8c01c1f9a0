//! 字段变更的历史快照
//! 新旧值统一降为展示字符串落库，读取方只消费纯文本

use crate::models::{
    defect::{Defect, UpdateDefectRequest},
    history::{DefectHistoryEntry, CREATED_FIELD},
};
use chrono::{DateTime, Utc};
use std::fmt;
use uuid::Uuid;

/// 一个被跟踪字段的一次变更
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub field_name: &'static str,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

impl FieldChange {
    /// 转为落库的历史记录
    pub fn into_entry(
        self,
        defect_id: Uuid,
        changed_by_id: Uuid,
        changed_at: DateTime<Utc>,
    ) -> DefectHistoryEntry {
        DefectHistoryEntry {
            id: Uuid::new_v4(),
            defect_id,
            changed_by_id,
            field_name: self.field_name.to_string(),
            old_value: self.old_value,
            new_value: self.new_value,
            changed_at,
        }
    }
}

fn stringify<T: fmt::Display>(value: Option<&T>) -> Option<String> {
    value.map(|v| v.to_string())
}

/// 计算一次更新里被跟踪字段的差异
/// 旧值取更新前的快照；字段在请求中出现且取值不同才算一次变更。
/// 落库顺序固定：status, priority, assignee_id, due_date, title, location
pub fn diff_tracked_fields(current: &Defect, update: &UpdateDefectRequest) -> Vec<FieldChange> {
    let mut changes = Vec::new();

    if let Some(new_status) = update.status {
        if new_status != current.status {
            changes.push(FieldChange {
                field_name: "status",
                old_value: stringify(Some(&current.status)),
                new_value: stringify(Some(&new_status)),
            });
        }
    }

    if let Some(new_priority) = update.priority {
        if new_priority != current.priority {
            changes.push(FieldChange {
                field_name: "priority",
                old_value: stringify(Some(&current.priority)),
                new_value: stringify(Some(&new_priority)),
            });
        }
    }

    if let Some(new_assignee) = update.assignee_id {
        if new_assignee != current.assignee_id {
            changes.push(FieldChange {
                field_name: "assignee_id",
                old_value: stringify(current.assignee_id.as_ref()),
                new_value: stringify(new_assignee.as_ref()),
            });
        }
    }

    if let Some(new_due_date) = update.due_date {
        if new_due_date != current.due_date {
            changes.push(FieldChange {
                field_name: "due_date",
                old_value: stringify(current.due_date.as_ref()),
                new_value: stringify(new_due_date.as_ref()),
            });
        }
    }

    if let Some(new_title) = update.title.as_ref() {
        if *new_title != current.title {
            changes.push(FieldChange {
                field_name: "title",
                old_value: Some(current.title.clone()),
                new_value: Some(new_title.clone()),
            });
        }
    }

    if let Some(new_location) = update.location.as_ref() {
        if *new_location != current.location {
            changes.push(FieldChange {
                field_name: "location",
                old_value: current.location.clone(),
                new_value: new_location.clone(),
            });
        }
    }

    changes
}

/// 创建事件的哨兵记录
pub fn creation_entry(
    defect: &Defect,
    changed_by_id: Uuid,
    changed_at: DateTime<Utc>,
) -> DefectHistoryEntry {
    DefectHistoryEntry {
        id: Uuid::new_v4(),
        defect_id: defect.id,
        changed_by_id,
        field_name: CREATED_FIELD.to_string(),
        old_value: None,
        new_value: Some(format!("Defect created with status {}", defect.status)),
        changed_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::defect::{DefectPriority, DefectStatus};
    use chrono::NaiveDate;

    fn sample_defect() -> Defect {
        Defect {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            title: "Cracked beam".to_string(),
            description: "Visible crack on level 2".to_string(),
            priority: DefectPriority::Medium,
            status: DefectStatus::New,
            author_id: Uuid::new_v4(),
            assignee_id: None,
            due_date: None,
            location: Some("Block A".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_empty_update_has_no_changes() {
        let defect = sample_defect();
        let update = UpdateDefectRequest::default();
        assert!(diff_tracked_fields(&defect, &update).is_empty());
    }

    #[test]
    fn test_equal_value_is_not_a_change() {
        let defect = sample_defect();
        let update = UpdateDefectRequest {
            title: Some("Cracked beam".to_string()),
            priority: Some(DefectPriority::Medium),
            ..Default::default()
        };
        assert!(diff_tracked_fields(&defect, &update).is_empty());
    }

    #[test]
    fn test_status_change_snapshots_both_values() {
        let defect = sample_defect();
        let update = UpdateDefectRequest {
            status: Some(DefectStatus::InProgress),
            ..Default::default()
        };

        let changes = diff_tracked_fields(&defect, &update);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field_name, "status");
        assert_eq!(changes[0].old_value.as_deref(), Some("NEW"));
        assert_eq!(changes[0].new_value.as_deref(), Some("IN_PROGRESS"));
    }

    #[test]
    fn test_assigning_from_empty_keeps_old_value_null() {
        let defect = sample_defect();
        let assignee = Uuid::new_v4();
        let update = UpdateDefectRequest {
            assignee_id: Some(Some(assignee)),
            ..Default::default()
        };

        let changes = diff_tracked_fields(&defect, &update);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field_name, "assignee_id");
        assert!(changes[0].old_value.is_none());
        assert_eq!(changes[0].new_value.as_deref(), Some(assignee.to_string().as_str()));
    }

    #[test]
    fn test_clearing_location_keeps_new_value_null() {
        let defect = sample_defect();
        let update = UpdateDefectRequest {
            location: Some(None),
            ..Default::default()
        };

        let changes = diff_tracked_fields(&defect, &update);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field_name, "location");
        assert_eq!(changes[0].old_value.as_deref(), Some("Block A"));
        assert!(changes[0].new_value.is_none());
    }

    #[test]
    fn test_due_date_uses_iso_snapshot() {
        let defect = sample_defect();
        let update = UpdateDefectRequest {
            due_date: Some(Some(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())),
            ..Default::default()
        };

        let changes = diff_tracked_fields(&defect, &update);
        assert_eq!(changes[0].new_value.as_deref(), Some("2024-06-01"));
    }

    #[test]
    fn test_change_order_is_stable() {
        let defect = sample_defect();
        let update = UpdateDefectRequest {
            title: Some("New title".to_string()),
            status: Some(DefectStatus::InProgress),
            priority: Some(DefectPriority::High),
            ..Default::default()
        };

        let fields: Vec<&str> = diff_tracked_fields(&defect, &update)
            .iter()
            .map(|c| c.field_name)
            .collect();
        assert_eq!(fields, ["status", "priority", "title"]);
    }

    #[test]
    fn test_creation_entry_sentinel() {
        let defect = sample_defect();
        let author = defect.author_id;
        let entry = creation_entry(&defect, author, Utc::now());

        assert_eq!(entry.field_name, CREATED_FIELD);
        assert!(entry.old_value.is_none());
        assert_eq!(
            entry.new_value.as_deref(),
            Some("Defect created with status NEW")
        );
    }
}
