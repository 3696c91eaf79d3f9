use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::database::Database;

/// Учебная группа. ID совпадает с chat ID группы в Telegram.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Group {
    pub group_id: i64,
    pub title: String,
    pub added_date: DateTime<Utc>,
}

impl Group {
    /// Регистрация группы через /setgroup; повторная регистрация обновляет название.
    pub async fn upsert(db: &Database, group_id: i64, title: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO groups (group_id, title, added_date)
            VALUES ($1, $2, NOW())
            ON CONFLICT (group_id)
            DO UPDATE SET title = EXCLUDED.title
            "#,
        )
        .bind(group_id)
        .bind(title)
        .execute(&db.pool)
        .await?;

        Ok(())
    }

    pub async fn find_by_id(db: &Database, group_id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Group>(
            "SELECT group_id, title, added_date FROM groups WHERE group_id = $1",
        )
        .bind(group_id)
        .fetch_optional(&db.pool)
        .await
    }

    pub async fn all(db: &Database) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Group>(
            "SELECT group_id, title, added_date FROM groups ORDER BY added_date",
        )
        .fetch_all(&db.pool)
        .await
    }

    /// Названия групп по ID, чтобы не ходить в базу на каждого ученика в отчете.
    pub async fn title_map(db: &Database) -> Result<HashMap<i64, String>, sqlx::Error> {
        let groups = Self::all(db).await?;
        Ok(groups
            .into_iter()
            .map(|group| (group.group_id, group.title))
            .collect())
    }

    pub async fn student_counts(db: &Database) -> Result<HashMap<i64, i64>, sqlx::Error> {
        let rows = sqlx::query_as::<_, (i64, i64)>(
            "SELECT group_id, COUNT(*) FROM students WHERE group_id IS NOT NULL GROUP BY group_id",
        )
        .fetch_all(&db.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }
}
