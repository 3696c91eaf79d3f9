use std::error::Error;

use teloxide::prelude::*;

use crate::bot_state::BotState;
use crate::handlers::utils::main_menu_keyboard;
use crate::models::Group;
use crate::Command;

pub async fn command_handler(
    bot: Bot,
    msg: Message,
    cmd: Command,
    state: BotState,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    match cmd {
        Command::Start => handle_start(bot, msg, state).await?,
        Command::SetGroup => handle_set_group(bot, msg, state).await?,
    }
    Ok(())
}

fn is_admin(msg: &Message, state: &BotState) -> bool {
    msg.from
        .as_ref()
        .map_or(false, |user| user.id == state.admin_id)
}

async fn handle_start(
    bot: Bot,
    msg: Message,
    state: BotState,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    // В группе /start не работает
    if !msg.chat.is_private() {
        return Ok(());
    }

    if is_admin(&msg, &state) {
        bot.send_message(
            msg.chat.id,
            "🤖 Assalomu alaykum, Admin!\n\n\
             To'lov boshqaruv tizimiga xush kelibsiz.\n\
             Quyidagi tugmalardan foydalaning:",
        )
        .reply_markup(main_menu_keyboard())
        .await?;
    } else {
        bot.send_message(
            msg.chat.id,
            "Assalomu alaykum! Sizning to'lovlaringiz adminlar tomonidan nazorat qilinadi.",
        )
        .await?;
    }

    Ok(())
}

async fn handle_set_group(
    bot: Bot,
    msg: Message,
    state: BotState,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    if !is_admin(&msg, &state) {
        return Ok(());
    }

    if msg.chat.is_group() || msg.chat.is_supergroup() {
        let group_id = msg.chat.id.0;
        let title = msg.chat.title().unwrap_or("Nomsiz guruh").to_string();

        Group::upsert(&state.db, group_id, &title).await?;
        log::info!("✅ Group {} ({}) registered", group_id, title);

        bot.send_message(
            msg.chat.id,
            format!(
                "✅ Guruh muvaffaqiyatli qo'shildi!\n\n\
                 📱 Guruh: {}\n\
                 🆔 ID: {}\n\n\
                 Endi bu guruhga o'quvchilarni biriktirishingiz mumkin.",
                title, group_id
            ),
        )
        .await?;
    } else {
        bot.send_message(
            msg.chat.id,
            "❌ Bu funksiya faqat guruhda ishlaydi!\n\n\
             Botni guruhga qo'shing va u yerda /setgroup kommandasini yuboring.",
        )
        .await?;
    }

    Ok(())
}
