//! 统一成功响应信封
//! 成功响应固定为 {"success": true, "data": ...}，错误信封见 error 模块

use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;

/// 成功响应信封
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// 纯文案响应（删除等操作）
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let body = serde_json::to_value(ApiResponse::new(vec![1, 2, 3])).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"], serde_json::json!([1, 2, 3]));
    }

    #[test]
    fn test_message_response() {
        let body =
            serde_json::to_value(ApiResponse::new(MessageResponse::new("Defect deleted successfully")))
                .unwrap();
        assert_eq!(body["data"]["message"], "Defect deleted successfully");
    }
}
