//! HTTP 中间件与各服务的共享状态
//! 请求追踪贯穿三个服务，状态按服务拆分

use axum::{
    extract::Request,
    http::{header, HeaderMap, HeaderName, HeaderValue, Method},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tracing::Instrument;
use uuid::Uuid;

/// 缺陷服务状态
///
/// 服务以 Arc 包装在多路由间共享，Clone 仅拷贝指针
#[derive(Clone)]
pub struct DefectsState {
    pub config: crate::config::AppConfig,
    pub db: sqlx::PgPool,
    pub jwt_service: Arc<crate::auth::jwt::JwtService>,
    pub defect_service: Arc<crate::services::DefectService>,
}

/// 报表服务状态
/// 报表服务不直连数据库，数据全部来自上游 HTTP
#[derive(Clone)]
pub struct ReportsState {
    pub config: crate::config::AppConfig,
    pub jwt_service: Arc<crate::auth::jwt::JwtService>,
    pub report_service: Arc<crate::services::ReportService>,
}

/// 请求标识（附加到请求扩展）
/// 网关转发时取出并透传给上游服务
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// 请求追踪中间件
/// 为每个请求生成 trace_id 和 request_id，并记录指标
/// 调用方带来的 x-request-id 原样保留，保证跨服务串联同一条请求链
pub async fn request_tracking_middleware(mut req: Request, next: Next) -> Response {
    // 生成或提取 trace_id/request_id
    let trace_id = extract_or_generate(req.headers(), "x-trace-id");
    let request_id = extract_or_generate(req.headers(), "x-request-id");

    // 获取请求方法和路径
    let method = req.method().to_string();
    let method_for_metrics = method.clone();
    let uri = req.uri().to_string();

    // 创建 span
    let span = tracing::info_span!(
        "http_request",
        trace_id = %trace_id,
        request_id = %request_id,
        method = %method,
        uri = %uri,
    );

    req.extensions_mut().insert(RequestId(request_id.clone()));

    async move {
        let start = Instant::now();

        // 继续处理请求
        let response = next.run(req).await;

        let elapsed = start.elapsed();

        // 记录指标 - 使用静态字符串
        let status = response.status().as_u16();
        let method_name = match method_for_metrics.as_str() {
            "GET" => "GET",
            "POST" => "POST",
            "PUT" => "PUT",
            "DELETE" => "DELETE",
            "PATCH" => "PATCH",
            _ => "UNKNOWN",
        };
        let status_code = match status {
            200 => "200",
            201 => "201",
            204 => "204",
            400 => "400",
            401 => "401",
            403 => "403",
            404 => "404",
            500 => "500",
            _ => "other",
        };

        metrics::counter!("http_requests_total", "method" => method_name, "status" => status_code)
            .increment(1);
        metrics::histogram!("http_request_duration_seconds").record(elapsed.as_secs_f64());

        // 记录日志
        tracing::info!(
            method = %method,
            uri = %uri,
            status = status,
            elapsed_ms = elapsed.as_millis(),
            "Request completed"
        );

        // 在响应头中回显 trace_id/request_id
        let mut response = response;
        response.headers_mut().insert("x-trace-id", trace_id.parse().unwrap());
        response.headers_mut().insert("x-request-id", request_id.parse().unwrap());

        response
    }
    .instrument(span)
    .await
}

/// 从请求头中提取标识，缺失时生成新的 UUID
fn extract_or_generate(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// 按配置构建跨域层
/// 通配来源不能与 credentials 同时开启，两种形态分开构建
pub fn cors_layer(allowed_origins: &str) -> CorsLayer {
    if allowed_origins.trim() == "*" {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
            .expose_headers(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .split(',')
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-request-id"),
        ])
        .expose_headers([
            HeaderName::from_static("x-trace-id"),
            HeaderName::from_static("x-request-id"),
        ])
        .allow_credentials(true)
}
