//! 缺陷评论数据访问

use crate::{error::AppError, models::comment::Comment};
use sqlx::PgPool;
use uuid::Uuid;

pub struct CommentRepository {
    db: PgPool,
}

impl CommentRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// 插入评论
    pub async fn insert(&self, comment: &Comment) -> Result<Comment, AppError> {
        let created = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (id, defect_id, author_id, content, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(comment.id)
        .bind(comment.defect_id)
        .bind(comment.author_id)
        .bind(&comment.content)
        .bind(comment.created_at)
        .bind(comment.updated_at)
        .fetch_one(&self.db)
        .await?;

        Ok(created)
    }

    /// 按 ID 读取
    pub async fn get(&self, id: Uuid) -> Result<Option<Comment>, AppError> {
        let comment = sqlx::query_as::<_, Comment>("SELECT * FROM comments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        Ok(comment)
    }

    /// 按缺陷读取，created_at 正序分页（评论按对话顺序展示）
    pub async fn list_for_defect(
        &self,
        defect_id: Uuid,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Comment>, AppError> {
        let comments = sqlx::query_as::<_, Comment>(
            r#"
            SELECT * FROM comments
            WHERE defect_id = $1
            ORDER BY created_at ASC
            OFFSET $2 LIMIT $3
            "#,
        )
        .bind(defect_id)
        .bind(skip)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        Ok(comments)
    }

    /// 删除评论
    pub async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
