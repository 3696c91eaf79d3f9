use std::error::Error;

use chrono::Utc;
use teloxide::prelude::*;
use teloxide::types::UserId;

use crate::bot_state::BotState;
use crate::handlers::dialogs;
use crate::handlers::utils::{main_menu_keyboard, MenuAction};
use crate::models::{AddStudentStep, Dialog, Group, MarkPaymentStep, SendReminderStep, Student};
use crate::reports;

pub async fn message_handler(
    bot: Bot,
    msg: Message,
    state: BotState,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    // Диалоги ведутся только в личке администратора
    if !msg.chat.is_private() {
        return Ok(());
    }
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    if user.id != state.admin_id {
        return Ok(());
    }
    let operator = user.id;

    let Some(text) = msg.text() else {
        bot.send_message(msg.chat.id, "Quyidagi tugmalardan foydalaning:")
            .reply_markup(main_menu_keyboard())
            .await?;
        return Ok(());
    };

    // Команды уже обработаны в command_handler
    if text.starts_with('/') {
        return Ok(());
    }

    // Кнопка меню срабатывает и поверх активного диалога
    if let Some(action) = MenuAction::from_label(text) {
        return handle_menu_action(&bot, &msg, &state, operator, action).await;
    }

    match state.sessions.get(operator).await {
        Some(dialog) => {
            dialogs::handle_dialog_input(&bot, &msg, &state, operator, dialog, text).await?;
        }
        None => {
            // Свободный текст вне сценария просто игнорируется
            log::debug!("Text outside of any dialog ignored: {}", text);
        }
    }

    Ok(())
}

async fn handle_menu_action(
    bot: &Bot,
    msg: &Message,
    state: &BotState,
    operator: UserId,
    action: MenuAction,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    match action {
        MenuAction::AddStudent => {
            bot.send_message(
                msg.chat.id,
                "👤 O'quvchining to'liq ismini kiriting:\n\nMisol: Abdullayev Ali",
            )
            .await?;
            state
                .sessions
                .set(operator, Dialog::AddStudent(AddStudentStep::Name))
                .await;
        }

        MenuAction::MarkPayment => {
            let students = Student::all(&state.db).await?;
            if students.is_empty() {
                bot.send_message(
                    msg.chat.id,
                    "❌ O'quvchilar ro'yxati bo'sh!\n\nAvval o'quvchi qo'shing.",
                )
                .await?;
                return Ok(());
            }

            let titles = Group::title_map(&state.db).await?;
            bot.send_message(
                msg.chat.id,
                reports::render_payment_pick_list(&students, &titles),
            )
            .await?;
            state
                .sessions
                .set(operator, Dialog::MarkPayment(MarkPaymentStep::SelectStudent))
                .await;
        }

        MenuAction::ListStudents => {
            let students = Student::all(&state.db).await?;
            let titles = Group::title_map(&state.db).await?;
            bot.send_message(
                msg.chat.id,
                reports::render_student_list(&students, &titles, Utc::now()),
            )
            .await?;
        }

        MenuAction::DaysRemaining => {
            let students = Student::all(&state.db).await?;
            let titles = Group::title_map(&state.db).await?;
            bot.send_message(
                msg.chat.id,
                reports::render_days_remaining(&students, &titles, Utc::now()),
            )
            .await?;
        }

        MenuAction::GroupReminder => {
            let groups = Group::all(&state.db).await?;
            if groups.is_empty() {
                bot.send_message(
                    msg.chat.id,
                    "❌ Guruhlar topilmadi!\n\n\
                     Avval guruh qo'shing:\n\
                     1. Botni guruhga qo'shing\n\
                     2. /setgroup kommandasini guruhda yuboring",
                )
                .await?;
                return Ok(());
            }

            bot.send_message(msg.chat.id, reports::render_group_pick_list(&groups))
                .await?;
            state
                .sessions
                .set(operator, Dialog::SendReminder(SendReminderStep::SelectGroup))
                .await;
        }

        MenuAction::Stats => {
            let students = Student::all(&state.db).await?;
            let groups = Group::all(&state.db).await?;
            bot.send_message(
                msg.chat.id,
                reports::render_stats(&students, groups.len(), Utc::now()),
            )
            .await?;
        }

        MenuAction::ListGroups => {
            let groups = Group::all(&state.db).await?;
            let counts = Group::student_counts(&state.db).await?;
            bot.send_message(msg.chat.id, reports::render_group_list(&groups, &counts))
                .await?;
        }

        MenuAction::SetGroupHelp => {
            bot.send_message(
                msg.chat.id,
                "⚙️ Guruhni o'rnatish:\n\n\
                 1. Botni guruhga qo'shing\n\
                 2. Botni admin qiling\n\
                 3. Guruhda /setgroup kommandasini yuboring\n\n\
                 Shundan keyin o'quvchilarni shu guruhga biriktirishingiz mumkin.",
            )
            .await?;
        }
    }

    Ok(())
}
