//! 缺陷变更历史数据访问
//! 只追加表，不提供更新与删除

use crate::{error::AppError, models::history::DefectHistoryEntry};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::error;
use uuid::Uuid;

pub struct HistoryRepository {
    db: PgPool,
}

impl HistoryRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// 事务内追加一条变更记录
    pub async fn insert_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        entry: &DefectHistoryEntry,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO defect_history (
                id, defect_id, changed_by_id, field_name, old_value, new_value, changed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(entry.id)
        .bind(entry.defect_id)
        .bind(entry.changed_by_id)
        .bind(&entry.field_name)
        .bind(&entry.old_value)
        .bind(&entry.new_value)
        .bind(entry.changed_at)
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to insert history entry");
            AppError::database("Failed to insert history entry")
        })?;

        Ok(())
    }

    /// 按缺陷读取，changed_at 倒序分页
    pub async fn list_for_defect(
        &self,
        defect_id: Uuid,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<DefectHistoryEntry>, AppError> {
        let entries = sqlx::query_as::<_, DefectHistoryEntry>(
            r#"
            SELECT * FROM defect_history
            WHERE defect_id = $1
            ORDER BY changed_at DESC
            OFFSET $2 LIMIT $3
            "#,
        )
        .bind(defect_id)
        .bind(skip)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        Ok(entries)
    }
}
