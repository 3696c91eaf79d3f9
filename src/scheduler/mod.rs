use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use teloxide::Bot;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::database::Database;
use crate::handlers::reminders;
use crate::models::Student;

type JobMap = Arc<Mutex<HashMap<i64, JoinHandle<()>>>>;

/// Одноразовые напоминания о сроке оплаты, не больше одного на ученика.
/// Повторное планирование для того же ID заменяет прежнее задание;
/// снятие отсутствующего задания — не ошибка.
#[derive(Clone)]
pub struct ReminderScheduler {
    bot: Bot,
    db: Database,
    jobs: JobMap,
}

impl ReminderScheduler {
    pub fn new(bot: Bot, db: Database) -> Self {
        Self {
            bot,
            db,
            jobs: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Ставит (или заменяет) напоминание для ученика на момент fire_at.
    pub async fn schedule(&self, user_id: i64, fire_at: DateTime<Utc>) {
        let bot = self.bot.clone();
        let db = self.db.clone();
        let jobs = self.jobs.clone();

        let handle = tokio::spawn(async move {
            // Для дат в прошлом задание срабатывает сразу
            let delay = (fire_at - Utc::now()).to_std().unwrap_or_default();
            tokio::time::sleep(delay).await;

            if let Err(e) = reminders::fire_due_reminder(&bot, &db, user_id).await {
                log::error!("Error sending payment reminder to {}: {}", user_id, e);
            }

            jobs.lock().await.remove(&user_id);
        });

        let mut jobs = self.jobs.lock().await;
        if let Some(old) = jobs.insert(user_id, handle) {
            old.abort();
        }

        log::info!("⏰ Reminder for student {} scheduled at {}", user_id, fire_at);
    }

    pub async fn cancel(&self, user_id: i64) {
        if let Some(handle) = self.jobs.lock().await.remove(&user_id) {
            handle.abort();
            log::info!("Reminder for student {} cancelled", user_id);
        }
    }

    /// Перевзводит напоминания после рестарта: в памяти они процесс не переживают.
    /// Уже истекшие сроки не достреливаются — по ним и так видна просрочка в отчетах.
    pub async fn restore_pending(&self) -> anyhow::Result<usize> {
        let students = Student::with_pending_payment(&self.db).await?;
        let now = Utc::now();
        let mut restored = 0;

        for student in students {
            if let Some(next_payment) = student.next_payment {
                if next_payment > now {
                    self.schedule(student.user_id, next_payment).await;
                    restored += 1;
                }
            }
        }

        Ok(restored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use sqlx::postgres::PgPoolOptions;

    fn test_scheduler() -> ReminderScheduler {
        // Ленивый пул: соединение не открывается, пока задание не сработало
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .expect("lazy pool");
        ReminderScheduler::new(Bot::new("0:TEST"), Database { pool })
    }

    #[tokio::test]
    async fn schedule_replaces_existing_job() {
        let scheduler = test_scheduler();
        let fire_at = Utc::now() + Duration::days(30);

        scheduler.schedule(555, fire_at).await;
        scheduler.schedule(555, fire_at + Duration::days(1)).await;

        assert_eq!(scheduler.jobs.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn jobs_are_kept_per_student() {
        let scheduler = test_scheduler();
        let fire_at = Utc::now() + Duration::days(30);

        scheduler.schedule(555, fire_at).await;
        scheduler.schedule(556, fire_at).await;

        assert_eq!(scheduler.jobs.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn cancel_missing_job_is_noop() {
        let scheduler = test_scheduler();

        scheduler.cancel(777).await;

        scheduler.schedule(555, Utc::now() + Duration::days(1)).await;
        scheduler.cancel(555).await;
        assert!(scheduler.jobs.lock().await.is_empty());
    }
}
