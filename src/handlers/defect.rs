//! 缺陷 API 处理器

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::middleware::{require_roles, AuthContext},
    error::Result,
    middleware::DefectsState,
    models::defect::{CreateDefectRequest, DefectListFilters, Pagination, UpdateDefectRequest},
    models::envelope::{ApiResponse, MessageResponse},
    models::role::UserRole,
};

/// 创建缺陷
/// SUPERVISOR 与 CUSTOMER 只读，不能登记缺陷
pub async fn create_defect(
    State(state): State<Arc<DefectsState>>,
    ctx: AuthContext,
    Json(request): Json<CreateDefectRequest>,
) -> Result<impl IntoResponse> {
    require_roles(&ctx, &[UserRole::Engineer, UserRole::Manager, UserRole::Admin])?;
    request.validate()?;

    let defect = state.defect_service.create_defect(request, &ctx).await?;
    Ok((StatusCode::CREATED, ApiResponse::new(defect)))
}

/// 查询缺陷列表
pub async fn list_defects(
    State(state): State<Arc<DefectsState>>,
    Query(filters): Query<DefectListFilters>,
    ctx: AuthContext,
) -> Result<impl IntoResponse> {
    filters.validate()?;

    let defects = state.defect_service.list_defects(filters, &ctx).await?;
    Ok(ApiResponse::new(defects))
}

/// 查询缺陷详情
pub async fn get_defect(
    State(state): State<Arc<DefectsState>>,
    Path(defect_id): Path<Uuid>,
    ctx: AuthContext,
) -> Result<impl IntoResponse> {
    let defect = state.defect_service.get_defect(defect_id, &ctx).await?;
    Ok(ApiResponse::new(defect))
}

/// 部分更新缺陷
pub async fn update_defect(
    State(state): State<Arc<DefectsState>>,
    Path(defect_id): Path<Uuid>,
    ctx: AuthContext,
    Json(request): Json<UpdateDefectRequest>,
) -> Result<impl IntoResponse> {
    request.validate()?;

    let defect = state
        .defect_service
        .update_defect(defect_id, request, &ctx)
        .await?;
    Ok(ApiResponse::new(defect))
}

/// 删除缺陷
pub async fn delete_defect(
    State(state): State<Arc<DefectsState>>,
    Path(defect_id): Path<Uuid>,
    ctx: AuthContext,
) -> Result<impl IntoResponse> {
    state.defect_service.delete_defect(defect_id, &ctx).await?;
    Ok(ApiResponse::new(MessageResponse::new(
        "Defect deleted successfully",
    )))
}

/// 查询缺陷变更历史
pub async fn list_defect_history(
    State(state): State<Arc<DefectsState>>,
    Path(defect_id): Path<Uuid>,
    Query(pagination): Query<Pagination>,
    _ctx: AuthContext,
) -> Result<impl IntoResponse> {
    pagination.validate()?;

    let entries = state
        .defect_service
        .list_history(defect_id, pagination)
        .await?;
    Ok(ApiResponse::new(entries))
}
