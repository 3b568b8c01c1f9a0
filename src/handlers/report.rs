//! 报表 API 处理器
//! 汇总、明细与导出均为只读聚合接口，统一限制在管理与查阅类角色

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::{
    auth::middleware::{require_roles, AuthContext},
    error::{AppError, Result},
    middleware::ReportsState,
    models::envelope::ApiResponse,
    models::report::{ExportQuery, ReportFilters},
    models::role::UserRole,
};

const REPORT_ROLES: [UserRole; 4] = [
    UserRole::Manager,
    UserRole::Admin,
    UserRole::Supervisor,
    UserRole::Customer,
];

/// 汇总报表
pub async fn summary_report(
    State(state): State<Arc<ReportsState>>,
    Query(filters): Query<ReportFilters>,
    ctx: AuthContext,
) -> Result<impl IntoResponse> {
    require_roles(&ctx, &REPORT_ROLES)?;

    let report = state.report_service.summary(&filters, &ctx.token).await?;
    Ok(ApiResponse::new(report))
}

/// 明细报表
pub async fn detailed_report(
    State(state): State<Arc<ReportsState>>,
    Query(filters): Query<ReportFilters>,
    ctx: AuthContext,
) -> Result<impl IntoResponse> {
    require_roles(&ctx, &REPORT_ROLES)?;

    let report = state.report_service.detailed(&filters, &ctx.token).await?;
    Ok(ApiResponse::new(report))
}

/// 导出报表文件
/// 响应体为文件字节流，通过 Content-Disposition 触发下载
pub async fn export_report(
    State(state): State<Arc<ReportsState>>,
    Query(filters): Query<ReportFilters>,
    Query(query): Query<ExportQuery>,
    ctx: AuthContext,
) -> Result<Response> {
    require_roles(&ctx, &REPORT_ROLES)?;

    let file = state
        .report_service
        .export(&filters, query.format, &ctx.token)
        .await?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, file.media_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename={}", file.filename),
        )
        .body(file.bytes.into())
        .map_err(|e| AppError::internal_error(format!("Failed to build export response: {}", e)))
}
