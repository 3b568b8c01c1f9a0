//! 缺陷数据访问

use crate::{
    error::AppError,
    models::defect::{Defect, DefectListFilters},
};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::error;
use uuid::Uuid;

/// 列表可见范围，由调用方按角色折算
#[derive(Debug, Clone, Copy)]
pub enum DefectVisibility {
    /// MANAGER / ADMIN 可见全部
    All,
    /// ENGINEER 可见自己创建或被指派的
    AuthorOrAssignee(Uuid),
    /// SUPERVISOR / CUSTOMER 按作者过滤
    /// 完整口径需要联表项目负责人，这里沿用按 author_id 的既有简化
    AuthorOnly(Uuid),
}

pub struct DefectRepository {
    db: PgPool,
}

impl DefectRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// 事务内插入缺陷
    pub async fn insert_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        defect: &Defect,
    ) -> Result<Defect, AppError> {
        let created = sqlx::query_as::<_, Defect>(
            r#"
            INSERT INTO defects (
                id, project_id, title, description, priority, status,
                author_id, assignee_id, due_date, location, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(defect.id)
        .bind(defect.project_id)
        .bind(&defect.title)
        .bind(&defect.description)
        .bind(defect.priority)
        .bind(defect.status)
        .bind(defect.author_id)
        .bind(defect.assignee_id)
        .bind(defect.due_date)
        .bind(&defect.location)
        .bind(defect.created_at)
        .bind(defect.updated_at)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to insert defect");
            AppError::database("Failed to insert defect")
        })?;

        Ok(created)
    }

    /// 按 ID 读取
    pub async fn get(&self, id: Uuid) -> Result<Option<Defect>, AppError> {
        let defect = sqlx::query_as::<_, Defect>("SELECT * FROM defects WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        Ok(defect)
    }

    /// 事务内读取并加行锁，并发更新在存储层串行化
    pub async fn get_for_update_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<Option<Defect>, AppError> {
        let defect =
            sqlx::query_as::<_, Defect>("SELECT * FROM defects WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut **tx)
                .await?;

        Ok(defect)
    }

    /// 过滤 + 可见范围 + 分页，created_at 倒序（新的在前）
    pub async fn list(
        &self,
        visibility: DefectVisibility,
        filters: &DefectListFilters,
    ) -> Result<Vec<Defect>, AppError> {
        let mut query = String::from("SELECT * FROM defects WHERE 1=1");
        let mut count = 0;

        match visibility {
            DefectVisibility::All => {}
            DefectVisibility::AuthorOrAssignee(_) => {
                count += 1;
                query.push_str(&format!(
                    " AND (author_id = ${0} OR assignee_id = ${0})",
                    count
                ));
            }
            DefectVisibility::AuthorOnly(_) => {
                count += 1;
                query.push_str(&format!(" AND author_id = ${}", count));
            }
        }

        if filters.project_id.is_some() {
            count += 1;
            query.push_str(&format!(" AND project_id = ${}", count));
        }
        if filters.status.is_some() {
            count += 1;
            query.push_str(&format!(" AND status = ${}", count));
        }
        if filters.priority.is_some() {
            count += 1;
            query.push_str(&format!(" AND priority = ${}", count));
        }
        if filters.assignee_id.is_some() {
            count += 1;
            query.push_str(&format!(" AND assignee_id = ${}", count));
        }
        if filters.author_id.is_some() {
            count += 1;
            query.push_str(&format!(" AND author_id = ${}", count));
        }

        query.push_str(&format!(
            " ORDER BY created_at DESC OFFSET ${} LIMIT ${}",
            count + 1,
            count + 2
        ));

        let mut q = sqlx::query_as::<_, Defect>(&query);

        match visibility {
            DefectVisibility::All => {}
            DefectVisibility::AuthorOrAssignee(user_id)
            | DefectVisibility::AuthorOnly(user_id) => {
                q = q.bind(user_id);
            }
        }
        if let Some(project_id) = filters.project_id {
            q = q.bind(project_id);
        }
        if let Some(status) = filters.status {
            q = q.bind(status);
        }
        if let Some(priority) = filters.priority {
            q = q.bind(priority);
        }
        if let Some(assignee_id) = filters.assignee_id {
            q = q.bind(assignee_id);
        }
        if let Some(author_id) = filters.author_id {
            q = q.bind(author_id);
        }

        let defects = q
            .bind(filters.skip)
            .bind(filters.limit)
            .fetch_all(&self.db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to list defects");
                AppError::database("Failed to list defects")
            })?;

        Ok(defects)
    }

    /// 事务内按最终值整行更新，updated_at 总是刷新
    pub async fn update_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        defect: &Defect,
    ) -> Result<Defect, AppError> {
        let updated = sqlx::query_as::<_, Defect>(
            r#"
            UPDATE defects
            SET
                title = $2,
                description = $3,
                priority = $4,
                status = $5,
                assignee_id = $6,
                due_date = $7,
                location = $8,
                updated_at = $9
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(defect.id)
        .bind(&defect.title)
        .bind(&defect.description)
        .bind(defect.priority)
        .bind(defect.status)
        .bind(defect.assignee_id)
        .bind(defect.due_date)
        .bind(&defect.location)
        .bind(defect.updated_at)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to update defect");
            AppError::database("Failed to update defect")
        })?;

        Ok(updated)
    }

    /// 删除（历史、评论随外键级联删除）
    pub async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM defects WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
