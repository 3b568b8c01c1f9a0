//! JWT 校验
//! 令牌由认证服务签发，这里只负责校验与解码

use crate::{config::AppConfig, error::AppError, models::role::UserRole};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT claims
/// 与认证服务的签发格式一致：{sub, role, exp}，不依赖其它字段
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// 用户 ID（字符串形式的 UUID）
    pub sub: String,

    /// 用户角色
    pub role: UserRole,

    /// 过期时间（Unix 秒）
    pub exp: i64,
}

impl Claims {
    /// 解析 sub 为 UUID，失败按未认证处理
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub).map_err(|_| AppError::Unauthorized)
    }
}

/// JWT 校验服务
pub struct JwtService {
    decoding_key: DecodingKey,
}

impl JwtService {
    /// 从配置创建
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let secret = config.security.jwt_secret.expose_secret();

        // HS256 密钥至少 32 字节
        if secret.len() < 32 {
            return Err(AppError::Config("JWT secret too short (min 32 chars)".to_string()));
        }

        Ok(Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        })
    }

    /// 校验并解码令牌
    pub fn validate_token(&self, token: &str) -> Result<Claims, AppError> {
        Ok(decode::<Claims>(token, &self.decoding_key, &Validation::new(Algorithm::HS256))
            .map_err(|e| {
                tracing::debug!("Token validation failed: {:?}", e);
                AppError::Unauthorized
            })?
            .claims)
    }
}
