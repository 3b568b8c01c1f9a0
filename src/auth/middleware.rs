//! JWT 认证中间件

use crate::{auth::jwt::JwtService, error::AppError, models::role::UserRole};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use uuid::Uuid;

/// 认证上下文（附加到请求扩展）
/// 原始令牌一并保留，便于向上游服务透传
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub role: UserRole,
    pub token: String,
}

// 实现 FromRequestParts 以便在 handler 中直接提取 AuthContext
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

/// 从 Authorization 头提取令牌
pub fn extract_token(headers: &HeaderMap) -> Result<String, AppError> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| {
            if s.starts_with("Bearer ") {
                Some(s[7..].to_string())
            } else {
                None
            }
        })
        .ok_or(AppError::Unauthorized)
}

/// JWT 认证中间件 - 必须认证
pub async fn jwt_auth_middleware(
    State(jwt_service): State<Arc<JwtService>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    // 从 Authorization 头提取令牌
    let token = extract_token(req.headers())?;

    // 验证令牌
    let claims = jwt_service.validate_token(&token)?;

    // 创建认证上下文
    let auth_context = AuthContext {
        user_id: claims.user_id()?,
        role: claims.role,
        token,
    };

    // 附加到请求扩展
    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}

/// 角色门禁
/// 拒绝时在消息中列出允许的角色，便于排查权限配置
pub fn require_roles(ctx: &AuthContext, allowed: &[UserRole]) -> Result<(), AppError> {
    if allowed.contains(&ctx.role) {
        return Ok(());
    }

    let names: Vec<&'static str> = allowed.iter().map(|r| r.as_str()).collect();
    Err(AppError::forbidden(format!(
        "Access denied. Required roles: {:?}",
        names
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_context(role: UserRole) -> AuthContext {
        AuthContext {
            user_id: Uuid::new_v4(),
            role,
            token: "test_token".to_string(),
        }
    }

    #[test]
    fn test_extract_token_valid() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer test_token_123".parse().unwrap());

        let token = extract_token(&headers).unwrap();
        assert_eq!(token, "test_token_123");
    }

    #[test]
    fn test_extract_token_missing() {
        let headers = HeaderMap::new();
        assert!(extract_token(&headers).is_err());
    }

    #[test]
    fn test_extract_token_invalid_format() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "InvalidFormat".parse().unwrap());

        assert!(extract_token(&headers).is_err());
    }

    #[test]
    fn test_require_roles_allows_listed_role() {
        let ctx = test_context(UserRole::Manager);
        assert!(require_roles(&ctx, &[UserRole::Manager, UserRole::Admin]).is_ok());
    }

    #[test]
    fn test_require_roles_rejects_and_names_roles() {
        let ctx = test_context(UserRole::Engineer);
        let err = require_roles(&ctx, &[UserRole::Manager, UserRole::Admin]).unwrap_err();

        let message = err.user_message();
        assert!(message.starts_with("Access denied. Required roles:"));
        assert!(message.contains("MANAGER"));
        assert!(message.contains("ADMIN"));
    }
}
