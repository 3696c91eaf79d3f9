use std::error::Error;

use chrono::Utc;
use teloxide::prelude::*;
use teloxide::types::{ChatId, UserId};

use crate::bot_state::BotState;
use crate::handlers::reminders;
use crate::handlers::utils::format_date;
use crate::models::student::next_payment_after;
use crate::models::{
    AddStudentStep, Dialog, Group, MarkPaymentStep, PaymentStatus, SendReminderStep, Student,
};
use crate::reports;

/// Обрабатывает ввод администратора в рамках активного сценария.
/// Каждый шаг возвращает следующее состояние сессии; None означает,
/// что сценарий закончился — коммитом или сбросом.
pub async fn handle_dialog_input(
    bot: &Bot,
    msg: &Message,
    state: &BotState,
    operator: UserId,
    dialog: Dialog,
    text: &str,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let next = match dialog {
        Dialog::AddStudent(step) => add_student_step(bot, msg, state, step, text).await?,
        Dialog::MarkPayment(step) => mark_payment_step(bot, msg, state, step, text).await?,
        Dialog::SendReminder(step) => send_reminder_step(bot, msg, state, step, text).await?,
    };

    match next {
        Some(dialog) => state.sessions.set(operator, dialog).await,
        None => state.sessions.clear(operator).await,
    }

    Ok(())
}

async fn add_student_step(
    bot: &Bot,
    msg: &Message,
    state: &BotState,
    step: AddStudentStep,
    text: &str,
) -> Result<Option<Dialog>, Box<dyn Error + Send + Sync>> {
    let next = match step {
        AddStudentStep::Name => {
            bot.send_message(
                msg.chat.id,
                "📱 Telefon raqamini kiriting:\n\nMisol: +998901234567",
            )
            .await?;
            Some(AddStudentStep::Phone {
                name: text.to_string(),
            })
        }

        AddStudentStep::Phone { name } => {
            bot.send_message(
                msg.chat.id,
                "🆔 Telegram ID ni kiriting:\n\n\
                 ID ni qanday topish mumkin:\n\
                 1. @userinfobot ga /start yuboring\n\
                 2. O'quvchining xabarini forward qiling\n\
                 3. ID ni ko'chirib oling",
            )
            .await?;
            Some(AddStudentStep::UserId {
                name,
                phone: text.to_string(),
            })
        }

        AddStudentStep::UserId { name, phone } => match text.trim().parse::<i64>() {
            Err(_) => {
                bot.send_message(
                    msg.chat.id,
                    "❌ Xato format!\n\n\
                     ID faqat raqamlardan iborat bo'lishi kerak.\n\
                     Misol: 123456789",
                )
                .await?;
                Some(AddStudentStep::UserId { name, phone })
            }
            Ok(user_id) => {
                let groups = Group::all(&state.db).await?;
                if groups.is_empty() {
                    // Прикрепить ученика некуда — сценарий сбрасывается целиком
                    bot.send_message(
                        msg.chat.id,
                        "❌ Guruhlar topilmadi!\n\nAvval guruh qo'shing.",
                    )
                    .await?;
                    return Ok(None);
                }

                bot.send_message(msg.chat.id, reports::render_group_pick_for_student(&groups))
                    .await?;
                Some(AddStudentStep::Group {
                    name,
                    phone,
                    user_id,
                })
            }
        },

        AddStudentStep::Group {
            name,
            phone,
            user_id,
        } => match text.trim().parse::<i64>() {
            Err(_) => {
                bot.send_message(
                    msg.chat.id,
                    "❌ Xato format!\n\nGuruh ID faqat raqam bo'lishi kerak.",
                )
                .await?;
                Some(AddStudentStep::Group {
                    name,
                    phone,
                    user_id,
                })
            }
            Ok(group_id) => match Group::find_by_id(&state.db, group_id).await? {
                None => {
                    bot.send_message(
                        msg.chat.id,
                        "❌ Bu guruh topilmadi!\n\nIltimos, mavjud guruh ID sini kiriting.",
                    )
                    .await?;
                    Some(AddStudentStep::Group {
                        name,
                        phone,
                        user_id,
                    })
                }
                Some(group) => {
                    // Username подтягиваем по возможности; его отсутствие — штатная ситуация
                    let username = lookup_username(bot, user_id).await;

                    let student = Student {
                        user_id,
                        name,
                        phone,
                        username: username.clone(),
                        group_id: Some(group_id),
                        last_payment: None,
                        next_payment: None,
                        payment_days: None,
                        status: PaymentStatus::Active,
                        added_date: Utc::now(),
                    };
                    Student::insert(&state.db, &student).await?;
                    log::info!("✅ Student {} added to group {}", user_id, group_id);

                    let username_line = match &username {
                        Some(username) => format!("🔗 Username: @{}", username),
                        None => "⚠️ Username topilmadi".to_string(),
                    };
                    bot.send_message(
                        msg.chat.id,
                        format!(
                            "✅ O'quvchi muvaffaqiyatli qo'shildi!\n\n\
                             👤 Ism: {}\n\
                             🆔 Telegram ID: {}\n\
                             📱 Telefon: {}\n\
                             📱 Guruh: {}\n\
                             {}",
                            student.name, user_id, student.phone, group.title, username_line
                        ),
                    )
                    .await?;

                    None
                }
            },
        },
    };

    Ok(next.map(Dialog::AddStudent))
}

async fn mark_payment_step(
    bot: &Bot,
    msg: &Message,
    state: &BotState,
    step: MarkPaymentStep,
    text: &str,
) -> Result<Option<Dialog>, Box<dyn Error + Send + Sync>> {
    let next = match step {
        MarkPaymentStep::SelectStudent => match text.trim().parse::<i64>() {
            Err(_) => {
                bot.send_message(msg.chat.id, "❌ Faqat raqam kiriting!").await?;
                Some(MarkPaymentStep::SelectStudent)
            }
            Ok(user_id) => match Student::find_by_id(&state.db, user_id).await? {
                None => {
                    bot.send_message(msg.chat.id, "❌ Bu ID bazada topilmadi. Qaytadan kiriting:")
                        .await?;
                    Some(MarkPaymentStep::SelectStudent)
                }
                Some(student) => {
                    let group_name = match student.group_id {
                        Some(group_id) => Group::find_by_id(&state.db, group_id)
                            .await?
                            .map(|group| group.title)
                            .unwrap_or_else(|| "Belgilanmagan".to_string()),
                        None => "Belgilanmagan".to_string(),
                    };

                    bot.send_message(
                        msg.chat.id,
                        format!(
                            "👤 {}\n\
                             🆔 ID: {}\n\
                             📱 Guruh: {}\n\n\
                             📅 Necha kunlik to'lov?\n\n\
                             Misol:\n\
                             30 - 1 oylik\n\
                             90 - 3 oylik\n\
                             180 - 6 oylik",
                            student.name, user_id, group_name
                        ),
                    )
                    .await?;
                    Some(MarkPaymentStep::PaymentDays { user_id })
                }
            },
        },

        MarkPaymentStep::PaymentDays { user_id } => match parse_payment_days(text) {
            None => {
                bot.send_message(msg.chat.id, "❌ Faqat raqam kiriting!\n\nMisol: 30")
                    .await?;
                Some(MarkPaymentStep::PaymentDays { user_id })
            }
            Some(days) => match Student::find_by_id(&state.db, user_id).await? {
                None => {
                    bot.send_message(msg.chat.id, "❌ Bu ID bazada topilmadi. Qaytadan kiriting:")
                        .await?;
                    Some(MarkPaymentStep::PaymentDays { user_id })
                }
                Some(student) => {
                    let now = Utc::now();
                    let next_payment = next_payment_after(now, i64::from(days));

                    Student::mark_paid(&state.db, user_id, now, next_payment, days).await?;
                    state.scheduler.schedule(user_id, next_payment).await;
                    log::info!(
                        "💰 Payment for student {} marked, next due {}",
                        user_id,
                        next_payment
                    );

                    bot.send_message(
                        msg.chat.id,
                        format!(
                            "✅ TO'LOV MUVAFFAQIYATLI BELGILANDI!\n\n\
                             👤 O'quvchi: {}\n\
                             🆔 ID: {}\n\
                             📅 To'lov sanasi: {}\n\
                             ⏰ Keyingi to'lov: {}\n\
                             📆 Muddat: {} kun ({} oy)",
                            student.name,
                            user_id,
                            format_date(now),
                            format_date(next_payment),
                            days,
                            days / 30
                        ),
                    )
                    .await?;

                    None
                }
            },
        },
    };

    Ok(next.map(Dialog::MarkPayment))
}

async fn send_reminder_step(
    bot: &Bot,
    msg: &Message,
    state: &BotState,
    step: SendReminderStep,
    text: &str,
) -> Result<Option<Dialog>, Box<dyn Error + Send + Sync>> {
    let next = match step {
        SendReminderStep::SelectGroup => match text.trim().parse::<i64>() {
            Err(_) => {
                bot.send_message(msg.chat.id, "❌ Faqat raqam kiriting!").await?;
                Some(SendReminderStep::SelectGroup)
            }
            Ok(group_id) => match Group::find_by_id(&state.db, group_id).await? {
                None => {
                    bot.send_message(
                        msg.chat.id,
                        "❌ Bu guruh topilmadi!\n\nIltimos, mavjud guruh ID sini kiriting.",
                    )
                    .await?;
                    Some(SendReminderStep::SelectGroup)
                }
                Some(group) => {
                    reminders::send_group_reminder(bot, state, &group, msg.chat.id).await?;
                    None
                }
            },
        },
    };

    Ok(next.map(Dialog::SendReminder))
}

/// Срок оплаты принимается только как целое положительное число дней.
fn parse_payment_days(text: &str) -> Option<i32> {
    text.trim().parse::<i32>().ok().filter(|days| *days > 0)
}

/// Запрашивает username ученика через Bot API. Сбой не прерывает сценарий.
async fn lookup_username(bot: &Bot, user_id: i64) -> Option<String> {
    match bot.get_chat(ChatId(user_id)).await {
        Ok(chat) => chat.username().map(str::to_string),
        Err(e) => {
            log::debug!("Username lookup for {} failed: {}", user_id, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_days_must_be_a_positive_number() {
        assert_eq!(parse_payment_days("30"), Some(30));
        assert_eq!(parse_payment_days(" 90 "), Some(90));
        assert_eq!(parse_payment_days("0"), None);
        assert_eq!(parse_payment_days("-5"), None);
        assert_eq!(parse_payment_days("o'ttiz"), None);
        assert_eq!(parse_payment_days("30 kun"), None);
    }
}
