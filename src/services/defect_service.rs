//! 缺陷服务层
//! 编排缺陷的创建、查询、更新、删除，以及评论与变更历史

use std::sync::Arc;

use chrono::Utc;
use sqlx::PgPool;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::auth::AuthContext;
use crate::clients::DirectoryClient;
use crate::error::{AppError, Result};
use crate::models::comment::{Comment, CreateCommentRequest};
use crate::models::defect::{
    CreateDefectRequest, Defect, DefectListFilters, DefectStatus, Pagination, UpdateDefectRequest,
};
use crate::models::history::DefectHistoryEntry;
use crate::models::role::UserRole;
use crate::repository::{CommentRepository, DefectRepository, DefectVisibility, HistoryRepository};
use crate::services::history::{creation_entry, diff_tracked_fields};
use crate::services::transitions::validate_transition;

/// 缺陷服务
pub struct DefectService {
    db: PgPool,
    defects: DefectRepository,
    history: HistoryRepository,
    comments: CommentRepository,
    directory: Arc<DirectoryClient>,
}

impl DefectService {
    pub fn new(db: PgPool, directory: Arc<DirectoryClient>) -> Self {
        Self {
            defects: DefectRepository::new(db.clone()),
            history: HistoryRepository::new(db.clone()),
            comments: CommentRepository::new(db.clone()),
            directory,
            db,
        }
    }

    // ==================== 缺陷 ====================

    /// 创建缺陷
    /// 项目必须存在，受派人给定时必须存在，作者取自令牌
    #[instrument(skip(self, request, ctx))]
    pub async fn create_defect(
        &self,
        request: CreateDefectRequest,
        ctx: &AuthContext,
    ) -> Result<Defect> {
        info!(project_id = %request.project_id, "Creating defect");

        self.directory
            .validate_project_exists(request.project_id, &ctx.token)
            .await?;
        if let Some(assignee_id) = request.assignee_id {
            self.directory
                .validate_user_exists(assignee_id, &ctx.token)
                .await?;
        }

        let mut tx = self.db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to begin transaction");
            AppError::database("Failed to begin transaction")
        })?;

        let now = Utc::now();
        let defect = Defect {
            id: Uuid::new_v4(),
            project_id: request.project_id,
            title: request.title,
            description: request.description,
            priority: request.priority,
            status: DefectStatus::New,
            author_id: ctx.user_id,
            assignee_id: request.assignee_id,
            due_date: request.due_date,
            location: request.location,
            created_at: now,
            updated_at: now,
        };

        let created = self.defects.insert_tx(&mut tx, &defect).await?;
        let entry = creation_entry(&created, ctx.user_id, now);
        self.history.insert_tx(&mut tx, &entry).await?;

        tx.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit transaction");
            AppError::database("Failed to commit transaction")
        })?;

        info!(defect_id = %created.id, "Defect created successfully");
        Ok(created)
    }

    /// 查询单个缺陷
    /// ENGINEER 只能看自己创建或被指派的
    #[instrument(skip(self, ctx))]
    pub async fn get_defect(&self, id: Uuid, ctx: &AuthContext) -> Result<Defect> {
        let defect = self
            .defects
            .get(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Defect with ID {} not found", id)))?;

        if ctx.role == UserRole::Engineer
            && defect.author_id != ctx.user_id
            && defect.assignee_id != Some(ctx.user_id)
        {
            return Err(AppError::forbidden(
                "Access denied. You can only view your own defects.",
            ));
        }

        Ok(defect)
    }

    /// 缺陷列表，按角色折算可见范围后再叠加过滤条件
    #[instrument(skip(self, filters, ctx))]
    pub async fn list_defects(
        &self,
        filters: DefectListFilters,
        ctx: &AuthContext,
    ) -> Result<Vec<Defect>> {
        let visibility = Self::visibility_for(ctx);
        self.defects.list(visibility, &filters).await
    }

    /// 更新缺陷
    ///
    /// 部分更新。状态变化要过状态机校验，受派人变化要过目录校验，
    /// 关键字段变化逐条写入变更历史。行锁保证并发更新串行落库。
    #[instrument(skip(self, request, ctx))]
    pub async fn update_defect(
        &self,
        id: Uuid,
        request: UpdateDefectRequest,
        ctx: &AuthContext,
    ) -> Result<Defect> {
        info!(defect_id = %id, "Updating defect");

        let existing = self
            .defects
            .get(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Defect with ID {} not found", id)))?;

        if ctx.role == UserRole::Engineer
            && existing.author_id != ctx.user_id
            && existing.assignee_id != Some(ctx.user_id)
        {
            return Err(AppError::forbidden(
                "Access denied. You can only update your own defects.",
            ));
        }

        // 目录校验在事务外完成，避免持锁等待上游 HTTP
        if let Some(Some(assignee_id)) = request.assignee_id {
            self.directory
                .validate_user_exists(assignee_id, &ctx.token)
                .await?;
        }

        let mut tx = self.db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to begin transaction");
            AppError::database("Failed to begin transaction")
        })?;

        // 加锁重读，状态机校验针对锁定行的当前状态
        let locked = self
            .defects
            .get_for_update_tx(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Defect with ID {} not found", id)))?;

        if let Some(new_status) = request.status {
            validate_transition(locked.status, new_status)?;
        }

        let now = Utc::now();
        let changes = diff_tracked_fields(&locked, &request);
        for change in changes {
            let entry = change.into_entry(locked.id, ctx.user_id, now);
            self.history.insert_tx(&mut tx, &entry).await?;
        }

        let mut defect = locked;
        Self::apply_update(&mut defect, request);
        defect.updated_at = now;

        let updated = self.defects.update_tx(&mut tx, &defect).await?;

        tx.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit transaction");
            AppError::database("Failed to commit transaction")
        })?;

        info!(defect_id = %updated.id, status = %updated.status, "Defect updated successfully");
        Ok(updated)
    }

    /// 删除缺陷，评论、历史随外键级联清除
    #[instrument(skip(self, ctx))]
    pub async fn delete_defect(&self, id: Uuid, ctx: &AuthContext) -> Result<()> {
        info!(defect_id = %id, "Deleting defect");

        let defect = self
            .defects
            .get(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Defect with ID {} not found", id)))?;

        match ctx.role {
            UserRole::Engineer => {
                if defect.author_id != ctx.user_id {
                    return Err(AppError::forbidden(
                        "Access denied. You can only delete defects you created.",
                    ));
                }
            }
            UserRole::Supervisor | UserRole::Customer => {
                return Err(AppError::forbidden(
                    "Access denied. You cannot delete defects.",
                ));
            }
            UserRole::Manager | UserRole::Admin => {}
        }

        let deleted = self.defects.delete(id).await?;
        if !deleted {
            return Err(AppError::not_found(format!(
                "Defect with ID {} not found",
                id
            )));
        }

        info!(defect_id = %id, "Defect deleted successfully");
        Ok(())
    }

    // ==================== 变更历史 ====================

    /// 缺陷变更历史，最近的在前
    #[instrument(skip(self, pagination))]
    pub async fn list_history(
        &self,
        defect_id: Uuid,
        pagination: Pagination,
    ) -> Result<Vec<DefectHistoryEntry>> {
        self.require_defect_exists(defect_id).await?;
        self.history
            .list_for_defect(defect_id, pagination.skip, pagination.limit)
            .await
    }

    // ==================== 评论 ====================

    /// 新增评论，任何已认证角色都可以发表
    #[instrument(skip(self, request, ctx))]
    pub async fn create_comment(
        &self,
        defect_id: Uuid,
        request: CreateCommentRequest,
        ctx: &AuthContext,
    ) -> Result<Comment> {
        self.require_defect_exists(defect_id).await?;

        let now = Utc::now();
        let comment = Comment {
            id: Uuid::new_v4(),
            defect_id,
            author_id: ctx.user_id,
            content: request.content,
            created_at: now,
            updated_at: now,
        };

        let created = self.comments.insert(&comment).await?;
        info!(comment_id = %created.id, defect_id = %defect_id, "Comment created");
        Ok(created)
    }

    /// 缺陷评论列表，发表时间正序
    #[instrument(skip(self, pagination))]
    pub async fn list_comments(
        &self,
        defect_id: Uuid,
        pagination: Pagination,
    ) -> Result<Vec<Comment>> {
        self.require_defect_exists(defect_id).await?;
        self.comments
            .list_for_defect(defect_id, pagination.skip, pagination.limit)
            .await
    }

    /// 删除评论，作者本人或 MANAGER/ADMIN
    #[instrument(skip(self, ctx))]
    pub async fn delete_comment(&self, comment_id: Uuid, ctx: &AuthContext) -> Result<()> {
        let comment = self.comments.get(comment_id).await?.ok_or_else(|| {
            AppError::not_found(format!("Comment with ID {} not found", comment_id))
        })?;

        if comment.author_id != ctx.user_id && !ctx.role.is_privileged() {
            return Err(AppError::forbidden(
                "Access denied. You can only delete your own comments.",
            ));
        }

        let deleted = self.comments.delete(comment_id).await?;
        if !deleted {
            return Err(AppError::not_found(format!(
                "Comment with ID {} not found",
                comment_id
            )));
        }

        info!(comment_id = %comment_id, "Comment deleted");
        Ok(())
    }

    // ==================== 私有方法 ====================

    fn visibility_for(ctx: &AuthContext) -> DefectVisibility {
        match ctx.role {
            UserRole::Manager | UserRole::Admin => DefectVisibility::All,
            UserRole::Engineer => DefectVisibility::AuthorOrAssignee(ctx.user_id),
            UserRole::Supervisor | UserRole::Customer => DefectVisibility::AuthorOnly(ctx.user_id),
        }
    }

    /// 把请求中出现的字段覆盖到缺陷上，双层 Option 允许显式置空
    fn apply_update(defect: &mut Defect, request: UpdateDefectRequest) {
        if let Some(title) = request.title {
            defect.title = title;
        }
        if let Some(description) = request.description {
            defect.description = description;
        }
        if let Some(priority) = request.priority {
            defect.priority = priority;
        }
        if let Some(status) = request.status {
            defect.status = status;
        }
        if let Some(assignee_id) = request.assignee_id {
            defect.assignee_id = assignee_id;
        }
        if let Some(due_date) = request.due_date {
            defect.due_date = due_date;
        }
        if let Some(location) = request.location {
            defect.location = location;
        }
    }

    async fn require_defect_exists(&self, defect_id: Uuid) -> Result<()> {
        self.defects
            .get(defect_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Defect with ID {} not found", defect_id)))?;
        Ok(())
    }
}
