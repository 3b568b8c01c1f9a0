//! 缺陷状态机
//! 同状态提交总是合法，CLOSED 与 CANCELED 为终态
//! 校验顺序与错误文案是对外契约：先放行同状态，再拒绝终态，最后查邻接表

use crate::{error::AppError, models::defect::DefectStatus};

/// 各状态允许迁入的目标集合
pub fn allowed_targets(status: DefectStatus) -> &'static [DefectStatus] {
    match status {
        DefectStatus::New => &[DefectStatus::InProgress, DefectStatus::Canceled],
        DefectStatus::InProgress => &[DefectStatus::OnReview, DefectStatus::Canceled],
        DefectStatus::OnReview => &[
            DefectStatus::Closed,
            DefectStatus::InProgress,
            DefectStatus::Canceled,
        ],
        DefectStatus::Closed | DefectStatus::Canceled => &[],
    }
}

/// 校验一次状态迁移
pub fn validate_transition(
    current: DefectStatus,
    proposed: DefectStatus,
) -> Result<(), AppError> {
    if current == proposed {
        return Ok(());
    }

    if current.is_final() {
        return Err(AppError::IllegalTransition(format!(
            "Cannot change status from {}. It is a final status.",
            current
        )));
    }

    let allowed = allowed_targets(current);
    if allowed.contains(&proposed) {
        return Ok(());
    }

    let names: Vec<&'static str> = allowed.iter().map(|s| s.as_str()).collect();
    Err(AppError::IllegalTransition(format!(
        "Invalid status transition from {} to {}. Allowed transitions: {:?}",
        current, proposed, names
    )))
}
