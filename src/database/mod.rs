use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .min_connections(2)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(1800))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        Ok(Database { pool })
    }

    pub async fn init(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        // Таблица учеников: ключ — Telegram ID ученика
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS students (
                user_id BIGINT PRIMARY KEY,
                name TEXT NOT NULL,
                phone TEXT NOT NULL,
                username TEXT,
                group_id BIGINT,
                last_payment TIMESTAMP WITH TIME ZONE,
                next_payment TIMESTAMP WITH TIME ZONE,
                payment_days INTEGER,
                status TEXT NOT NULL DEFAULT 'active',
                added_date TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Таблица групп: ключ — chat ID группы в Telegram
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS groups (
                group_id BIGINT PRIMARY KEY,
                title TEXT NOT NULL,
                added_date TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_students_group_id ON students (group_id)"
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_students_next_payment ON students (next_payment)"
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
