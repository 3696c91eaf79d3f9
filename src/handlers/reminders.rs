use std::error::Error;
use std::time::Duration;

use chrono::Utc;
use teloxide::prelude::*;
use teloxide::requests::Request;
use teloxide::types::ChatId;

use crate::bot_state::BotState;
use crate::database::Database;
use crate::models::{Group, PaymentStatus, Student};
use crate::reports;

/// Сколько ждем отправку в группу, прежде чем считать её неудачной.
const BROADCAST_TIMEOUT: Duration = Duration::from_secs(30);

/// Рассылка по группе: ученики раскладываются по категориям срочности,
/// сводка уходит в групповой чат, отчет — администратору.
pub async fn send_group_reminder(
    bot: &Bot,
    state: &BotState,
    group: &Group,
    admin_chat: ChatId,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    bot.send_message(
        admin_chat,
        format!("⏳ {} guruhi uchun eslatmalar tayyorlanmoqda...", group.title),
    )
    .await?;

    let students = Student::by_group(&state.db, group.group_id).await?;
    let due = reports::partition_by_due(&students, Utc::now());

    let Some(message) = reports::render_group_reminder(&due) else {
        bot.send_message(
            admin_chat,
            reports::render_nothing_to_remind(&group.title, due.current.len()),
        )
        .await?;
        return Ok(());
    };

    // Единственное место, где сбой внешнего вызова показывается администратору как есть
    let broadcast = bot.send_message(ChatId(group.group_id), message).send();
    match tokio::time::timeout(BROADCAST_TIMEOUT, broadcast).await {
        Ok(Ok(_)) => {
            log::info!("📨 Reminder broadcast to group {} sent", group.group_id);
            bot.send_message(
                admin_chat,
                reports::render_reminder_report(&group.title, &due),
            )
            .await?;
        }
        Ok(Err(e)) => {
            log::error!("Error broadcasting reminder to group {}: {}", group.group_id, e);
            bot.send_message(admin_chat, render_broadcast_failure(group, &e.to_string()))
                .await?;
        }
        Err(_) => {
            log::error!("Broadcast to group {} timed out", group.group_id);
            bot.send_message(admin_chat, render_broadcast_failure(group, "timeout"))
                .await?;
        }
    }

    Ok(())
}

fn render_broadcast_failure(group: &Group, detail: &str) -> String {
    format!(
        "❌ Xatolik yuz berdi!\n\n\
         Guruh: {}\n\
         ID: {}\n\
         Xato: {}\n\n\
         Botni guruhda admin qilganingizga ishonch hosil qiling.",
        group.title, group.group_id, detail
    )
}

/// Одноразовое напоминание ученику в момент next_payment.
/// Ученика могли убрать из базы — тогда задание просто сгорает.
pub async fn fire_due_reminder(bot: &Bot, db: &Database, user_id: i64) -> anyhow::Result<()> {
    let Some(student) = Student::find_by_id(db, user_id).await? else {
        log::debug!("Reminder target {} no longer exists", user_id);
        return Ok(());
    };

    bot.send_message(
        ChatId(student.user_id),
        format!(
            "⏰ TO'LOV ESLATMASI\n\n\
             Hurmatli {},\n\
             Sizning to'lov muddatingiz tugadi!\n\n\
             📅 To'lov sanasi: Bugun\n\
             📱 Admin bilan bog'laning.",
            student.name
        ),
    )
    .await?;

    // Статус меняется только после успешной отправки
    Student::set_status(db, user_id, PaymentStatus::Overdue).await?;
    log::info!("⏰ Student {} marked overdue after reminder", user_id);

    Ok(())
}
