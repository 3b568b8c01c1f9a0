//! 路由注册
//! 缺陷服务与报表服务各自建路由，网关路由在 gateway 模块单独注册

use axum::{
    routing::{delete, get},
    Router,
};
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;

use crate::{
    handlers,
    middleware::{DefectsState, ReportsState},
};

/// JSON 请求体上限
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// 创建缺陷服务路由
pub fn defects_router(state: Arc<DefectsState>) -> Router {
    // 公开端点（健康检查与指标）
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route("/metrics", get(handlers::metrics::metrics_export));

    // 需要认证的路由
    let authenticated_routes = Router::new()
        // 缺陷
        .route(
            "/api/v1/defects",
            get(handlers::defect::list_defects)
                .post(handlers::defect::create_defect)
        )
        .route(
            "/api/v1/defects/{id}",
            get(handlers::defect::get_defect)
                .patch(handlers::defect::update_defect)
                .delete(handlers::defect::delete_defect)
        )
        .route(
            "/api/v1/defects/{id}/history",
            get(handlers::defect::list_defect_history)
        )

        // 评论
        .route(
            "/api/v1/defects/{id}/comments",
            get(handlers::comment::list_comments)
                .post(handlers::comment::create_comment)
        )
        .route(
            "/api/v1/comments/{id}",
            delete(handlers::comment::delete_comment)
        )
        .layer(axum::middleware::from_fn_with_state(
            state.jwt_service.clone(),
            crate::auth::middleware::jwt_auth_middleware,
        ));

    // 组合所有路由
    Router::new()
        .merge(public_routes)
        .merge(authenticated_routes)
        .layer(axum::middleware::from_fn(crate::middleware::request_tracking_middleware))
        .layer(crate::middleware::cors_layer(&state.config.server.allowed_origins))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

/// 创建报表服务路由
pub fn reports_router(state: Arc<ReportsState>) -> Router {
    // 公开端点（健康检查）
    let public_routes = Router::new().route("/health", get(handlers::health::health_check));

    // 需要认证的路由
    let authenticated_routes = Router::new()
        .route("/api/v1/reports/summary", get(handlers::report::summary_report))
        .route("/api/v1/reports/detailed", get(handlers::report::detailed_report))
        .route("/api/v1/reports/export", get(handlers::report::export_report))
        .layer(axum::middleware::from_fn_with_state(
            state.jwt_service.clone(),
            crate::auth::middleware::jwt_auth_middleware,
        ));

    // 组合所有路由
    Router::new()
        .merge(public_routes)
        .merge(authenticated_routes)
        .layer(axum::middleware::from_fn(crate::middleware::request_tracking_middleware))
        .layer(crate::middleware::cors_layer(&state.config.server.allowed_origins))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}
