use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::database::Database;

/// Статус оплаты ученика. Хранится в колонке TEXT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Active,
    Paid,
    Overdue,
}

/// Категория по числу дней до оплаты.
/// Границы одни и те же для отчетов и напоминаний: <0, ==0, 1..=7, >7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueBucket {
    Overdue,
    DueToday,
    DueSoon,
    Current,
}

impl DueBucket {
    pub fn classify(days_left: i64) -> Self {
        match days_left {
            d if d < 0 => DueBucket::Overdue,
            0 => DueBucket::DueToday,
            1..=7 => DueBucket::DueSoon,
            _ => DueBucket::Current,
        }
    }
}

/// Дней до оплаты, с округлением вниз: просроченные полсуток — это уже -1.
pub fn days_left(next_payment: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (next_payment - now).num_seconds().div_euclid(86_400)
}

pub fn next_payment_after(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    now + Duration::days(days)
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Student {
    pub user_id: i64,
    pub name: String,
    pub phone: String,
    pub username: Option<String>,
    pub group_id: Option<i64>,
    pub last_payment: Option<DateTime<Utc>>,
    pub next_payment: Option<DateTime<Utc>>,
    pub payment_days: Option<i32>,
    pub status: PaymentStatus,
    pub added_date: DateTime<Utc>,
}

const STUDENT_COLUMNS: &str =
    "user_id, name, phone, username, group_id, last_payment, next_payment, payment_days, status, added_date";

impl Student {
    pub fn days_left(&self, now: DateTime<Utc>) -> Option<i64> {
        self.next_payment.map(|next| days_left(next, now))
    }

    /// Упоминание в сообщениях: @username, если он известен, иначе имя.
    pub fn mention(&self) -> String {
        match &self.username {
            Some(username) => format!("@{}", username),
            None => self.name.clone(),
        }
    }

    pub async fn find_by_id(db: &Database, user_id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Student>(&format!(
            "SELECT {} FROM students WHERE user_id = $1",
            STUDENT_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&db.pool)
        .await
    }

    pub async fn all(db: &Database) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Student>(&format!(
            "SELECT {} FROM students ORDER BY added_date",
            STUDENT_COLUMNS
        ))
        .fetch_all(&db.pool)
        .await
    }

    pub async fn by_group(db: &Database, group_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Student>(&format!(
            "SELECT {} FROM students WHERE group_id = $1 ORDER BY added_date",
            STUDENT_COLUMNS
        ))
        .bind(group_id)
        .fetch_all(&db.pool)
        .await
    }

    /// Ученики с назначенной датой оплаты, по которым ещё не зафиксирована просрочка.
    pub async fn with_pending_payment(db: &Database) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Student>(&format!(
            "SELECT {} FROM students WHERE next_payment IS NOT NULL AND status <> 'overdue'",
            STUDENT_COLUMNS
        ))
        .fetch_all(&db.pool)
        .await
    }

    /// Повторное добавление того же ID перезаписывает карточку ученика.
    pub async fn insert(db: &Database, student: &Student) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO students
            (user_id, name, phone, username, group_id, last_payment, next_payment, payment_days, status, added_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (user_id)
            DO UPDATE SET
                name = EXCLUDED.name,
                phone = EXCLUDED.phone,
                username = EXCLUDED.username,
                group_id = EXCLUDED.group_id,
                last_payment = EXCLUDED.last_payment,
                next_payment = EXCLUDED.next_payment,
                payment_days = EXCLUDED.payment_days,
                status = EXCLUDED.status,
                added_date = EXCLUDED.added_date
            "#,
        )
        .bind(student.user_id)
        .bind(&student.name)
        .bind(&student.phone)
        .bind(&student.username)
        .bind(student.group_id)
        .bind(student.last_payment)
        .bind(student.next_payment)
        .bind(student.payment_days)
        .bind(student.status)
        .bind(student.added_date)
        .execute(&db.pool)
        .await?;

        Ok(())
    }

    pub async fn mark_paid(
        db: &Database,
        user_id: i64,
        paid_at: DateTime<Utc>,
        next_payment: DateTime<Utc>,
        days: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE students
            SET last_payment = $2, next_payment = $3, payment_days = $4, status = $5
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(paid_at)
        .bind(next_payment)
        .bind(days)
        .bind(PaymentStatus::Paid)
        .execute(&db.pool)
        .await?;

        Ok(())
    }

    pub async fn set_status(
        db: &Database,
        user_id: i64,
        status: PaymentStatus,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE students SET status = $2 WHERE user_id = $1")
            .bind(user_id)
            .bind(status)
            .execute(&db.pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn days_left_floors_partial_days() {
        let now = Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap();
        // Срок прошёл полсуток назад — это уже «вчера», а не «сегодня»
        let next = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
        assert_eq!(days_left(next, now), -1);

        let next = Utc.with_ymd_and_hms(2024, 1, 10, 18, 0, 0).unwrap();
        assert_eq!(days_left(next, now), 0);
    }

    #[test]
    fn bucket_boundaries() {
        assert_eq!(DueBucket::classify(-1), DueBucket::Overdue);
        assert_eq!(DueBucket::classify(0), DueBucket::DueToday);
        assert_eq!(DueBucket::classify(1), DueBucket::DueSoon);
        assert_eq!(DueBucket::classify(7), DueBucket::DueSoon);
        assert_eq!(DueBucket::classify(8), DueBucket::Current);
    }

    #[test]
    fn bucket_is_monotonic_in_days_left() {
        fn rank(bucket: DueBucket) -> u8 {
            match bucket {
                DueBucket::Overdue => 0,
                DueBucket::DueToday => 1,
                DueBucket::DueSoon => 2,
                DueBucket::Current => 3,
            }
        }

        let mut prev = 0;
        for days in -30..=30 {
            let current = rank(DueBucket::classify(days));
            assert!(current >= prev, "bucket rank dropped at days_left={}", days);
            prev = current;
        }
    }

    #[test]
    fn next_payment_is_exactly_days_ahead() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let next = next_payment_after(now, 30);
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap());
        assert_eq!(days_left(next, now), 30);
    }

    #[test]
    fn mention_prefers_username() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut student = Student {
            user_id: 555,
            name: "Abdullayev Ali".to_string(),
            phone: "+998901234567".to_string(),
            username: Some("ali".to_string()),
            group_id: None,
            last_payment: None,
            next_payment: None,
            payment_days: None,
            status: PaymentStatus::Active,
            added_date: now,
        };

        assert_eq!(student.mention(), "@ali");
        student.username = None;
        assert_eq!(student.mention(), "Abdullayev Ali");
    }
}
