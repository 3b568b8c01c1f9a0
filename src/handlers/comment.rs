//! 缺陷评论 API 处理器

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
    auth::middleware::AuthContext,
    error::Result,
    middleware::DefectsState,
    models::comment::CreateCommentRequest,
    models::defect::Pagination,
    models::envelope::{ApiResponse, MessageResponse},
};

/// 发表评论
pub async fn create_comment(
    State(state): State<Arc<DefectsState>>,
    Path(defect_id): Path<Uuid>,
    ctx: AuthContext,
    Json(request): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse> {
    request.validate()?;

    let comment = state
        .defect_service
        .create_comment(defect_id, request, &ctx)
        .await?;
    Ok((StatusCode::CREATED, ApiResponse::new(comment)))
}

/// 查询缺陷下的评论
pub async fn list_comments(
    State(state): State<Arc<DefectsState>>,
    Path(defect_id): Path<Uuid>,
    Query(pagination): Query<Pagination>,
    _ctx: AuthContext,
) -> Result<impl IntoResponse> {
    pagination.validate()?;

    let comments = state
        .defect_service
        .list_comments(defect_id, pagination)
        .await?;
    Ok(ApiResponse::new(comments))
}

/// 删除评论
/// 普通用户只能删除自己的评论，MANAGER/ADMIN 可以删除任意评论
pub async fn delete_comment(
    State(state): State<Arc<DefectsState>>,
    Path(comment_id): Path<Uuid>,
    ctx: AuthContext,
) -> Result<impl IntoResponse> {
    state.defect_service.delete_comment(comment_id, &ctx).await?;
    Ok(ApiResponse::new(MessageResponse::new(
        "Comment deleted successfully",
    )))
}
