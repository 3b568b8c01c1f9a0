//! 网关路由与转发处理器
//! 鉴权在网关本地完成，转发时只透传必要的请求头，
//! 上游的状态码与响应体原样返回给调用方

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use std::{sync::Arc, time::Duration};
use tracing::error;

use crate::{
    auth::jwt::JwtService,
    config::UpstreamConfig,
    error::{AppError, Result},
    gateway::http::ProxyClient,
    handlers,
    middleware::RequestId,
    models::envelope::ApiResponse,
};

/// 转发请求体的上限
const MAX_PROXY_BODY_BYTES: usize = 10 * 1024 * 1024;

/// 网关状态
#[derive(Clone)]
pub struct GatewayState {
    pub proxy: ProxyClient,
    pub jwt_service: Arc<JwtService>,
    pub upstream: UpstreamConfig,
    pub allowed_origins: String,
}

/// 上游服务标识
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Upstream {
    Auth,
    Projects,
    Defects,
    Reports,
}

impl Upstream {
    /// 错误消息中使用的服务名
    fn service_name(self) -> &'static str {
        match self {
            Upstream::Auth => "Auth service",
            Upstream::Projects => "Projects service",
            Upstream::Defects => "Defects service",
            Upstream::Reports => "Reports service",
        }
    }

    fn base_url(self, config: &UpstreamConfig) -> &str {
        match self {
            Upstream::Auth => &config.auth_url,
            Upstream::Projects => &config.projects_url,
            Upstream::Defects => &config.defects_url,
            Upstream::Reports => &config.reports_url,
        }
    }

    /// 报表生成耗时远超普通请求，给更长的超时
    fn timeout(self, config: &UpstreamConfig) -> Duration {
        match self {
            Upstream::Reports => Duration::from_secs(config.report_timeout_secs),
            _ => Duration::from_secs(config.request_timeout_secs),
        }
    }
}

/// 创建网关路由
pub fn gateway_router(state: Arc<GatewayState>) -> Router {
    // 公开端点（服务横幅、健康检查、认证入口）
    let public_routes = Router::new()
        .route("/", get(service_banner))
        .route("/health", get(handlers::health::health_check))
        .route("/api/v1/auth/{*path}", any(forward_auth));

    // 需要认证的转发路由
    let authenticated_routes = Router::new()
        .route("/api/v1/users", any(forward_users))
        .route("/api/v1/users/{*path}", any(forward_users))
        .route("/api/v1/projects", any(forward_projects))
        .route("/api/v1/projects/{*path}", any(forward_projects))
        .route("/api/v1/defects", any(forward_defects))
        .route("/api/v1/defects/{*path}", any(forward_defects))
        .route("/api/v1/comments/{*path}", any(forward_defects))
        .route("/api/v1/reports/{*path}", any(forward_reports))
        .layer(axum::middleware::from_fn_with_state(
            state.jwt_service.clone(),
            crate::auth::middleware::jwt_auth_middleware,
        ));

    // 组合所有路由
    Router::new()
        .merge(public_routes)
        .merge(authenticated_routes)
        .layer(axum::middleware::from_fn(crate::middleware::request_tracking_middleware))
        .layer(crate::middleware::cors_layer(&state.allowed_origins))
        .with_state(state)
}

/// 服务横幅
async fn service_banner() -> impl IntoResponse {
    ApiResponse::new(serde_json::json!({
        "service": "defect-tracking-gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
    }))
}

async fn forward_auth(State(state): State<Arc<GatewayState>>, req: Request) -> Result<Response> {
    forward(state, Upstream::Auth, req).await
}

async fn forward_users(State(state): State<Arc<GatewayState>>, req: Request) -> Result<Response> {
    forward(state, Upstream::Auth, req).await
}

async fn forward_projects(
    State(state): State<Arc<GatewayState>>,
    req: Request,
) -> Result<Response> {
    forward(state, Upstream::Projects, req).await
}

async fn forward_defects(
    State(state): State<Arc<GatewayState>>,
    req: Request,
) -> Result<Response> {
    forward(state, Upstream::Defects, req).await
}

async fn forward_reports(
    State(state): State<Arc<GatewayState>>,
    req: Request,
) -> Result<Response> {
    forward(state, Upstream::Reports, req).await
}

/// 核心转发逻辑
/// 路径与查询串原样拼到上游基址后面
async fn forward(
    state: Arc<GatewayState>,
    upstream: Upstream,
    req: Request,
) -> Result<Response> {
    let (parts, body) = req.into_parts();

    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| parts.uri.path().to_string());
    let url = format!("{}{}", upstream.base_url(&state.upstream), path_and_query);

    // 只透传鉴权头、请求标识和内容类型，其余请求头不带给上游
    let mut headers = HeaderMap::new();
    if let Some(authorization) = parts.headers.get(header::AUTHORIZATION) {
        headers.insert(header::AUTHORIZATION, authorization.clone());
    }
    if let Some(content_type) = parts.headers.get(header::CONTENT_TYPE) {
        headers.insert(header::CONTENT_TYPE, content_type.clone());
    }
    if let Some(request_id) = parts.extensions.get::<RequestId>() {
        if let Ok(value) = HeaderValue::from_str(&request_id.0) {
            headers.insert("x-request-id", value);
        }
    }

    let bytes = to_bytes(body, MAX_PROXY_BODY_BYTES)
        .await
        .map_err(|e| AppError::validation(format!("Failed to read request body: {}", e)))?;
    let body = if bytes.is_empty() { None } else { Some(bytes) };

    let response = state
        .proxy
        .request_with_retry(
            parts.method,
            &url,
            headers,
            body,
            upstream.timeout(&state.upstream),
        )
        .await
        .map_err(|e| map_proxy_error(upstream, &e))?;

    // 状态码与响应体原样透传，响应头只保留内容类型与下载标头
    let status = response.status();
    let content_type = response.headers().get(header::CONTENT_TYPE).cloned();
    let content_disposition = response.headers().get(header::CONTENT_DISPOSITION).cloned();

    let payload = response
        .bytes()
        .await
        .map_err(|e| map_proxy_error(upstream, &e))?;

    let mut builder = Response::builder().status(status);
    if let Some(value) = content_type {
        builder = builder.header(header::CONTENT_TYPE, value);
    }
    if let Some(value) = content_disposition {
        builder = builder.header(header::CONTENT_DISPOSITION, value);
    }

    builder
        .body(Body::from(payload))
        .map_err(|e| AppError::internal_error(format!("Failed to build proxy response: {}", e)))
}

/// 传输层错误映射
/// 超时报 504，其余传输错误报 503，消息不携带底层细节
fn map_proxy_error(upstream: Upstream, e: &reqwest::Error) -> AppError {
    let service = upstream.service_name();
    if e.is_timeout() {
        error!(service = service, error = %e, "Upstream request timed out");
        AppError::upstream_timeout(format!("{} timeout", service))
    } else {
        error!(service = service, error = %e, "Upstream request failed");
        AppError::upstream_unavailable(format!("{} unavailable", service))
    }
}
