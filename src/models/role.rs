//! 用户角色
//! 角色由认证服务签发在 JWT 中，本侧只读取和比较

use serde::{Deserialize, Serialize};
use std::fmt;

/// 用户角色（线上取值为 SCREAMING_SNAKE_CASE，与令牌一致）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    /// 工程师，创建与处理缺陷
    Engineer,
    /// 经理，管理缺陷与查看报表
    Manager,
    /// 管理员
    Admin,
    /// 监理，查看自己项目的缺陷与报表
    Supervisor,
    /// 客户，查看自己项目的缺陷与报表
    Customer,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Engineer => "ENGINEER",
            UserRole::Manager => "MANAGER",
            UserRole::Admin => "ADMIN",
            UserRole::Supervisor => "SUPERVISOR",
            UserRole::Customer => "CUSTOMER",
        }
    }

    /// MANAGER 与 ADMIN 拥有全量读写权限
    pub fn is_privileged(&self) -> bool {
        matches!(self, UserRole::Manager | UserRole::Admin)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for (role, wire) in [
            (UserRole::Engineer, "\"ENGINEER\""),
            (UserRole::Manager, "\"MANAGER\""),
            (UserRole::Admin, "\"ADMIN\""),
            (UserRole::Supervisor, "\"SUPERVISOR\""),
            (UserRole::Customer, "\"CUSTOMER\""),
        ] {
            assert_eq!(serde_json::to_string(&role).unwrap(), wire);
            assert_eq!(serde_json::from_str::<UserRole>(wire).unwrap(), role);
        }
    }

    #[test]
    fn test_privileged_roles() {
        assert!(UserRole::Manager.is_privileged());
        assert!(UserRole::Admin.is_privileged());
        assert!(!UserRole::Engineer.is_privileged());
        assert!(!UserRole::Supervisor.is_privileged());
        assert!(!UserRole::Customer.is_privileged());
    }
}
