use teloxide::{prelude::*, types::UserId, utils::command::BotCommands};
use std::env;

mod bot_state;
mod database;
mod handlers;
mod models;
mod reports;
mod scheduler;

use crate::bot_state::BotState;
use crate::database::Database;
use crate::handlers::{command_handler, message_handler};
use crate::scheduler::ReminderScheduler;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Mavjud komandalar:")]
enum Command {
    #[command(description = "botni ishga tushirish")]
    Start,
    #[command(description = "joriy guruhni ro'yxatga olish")]
    SetGroup,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Загружаем .env и инициализируем логирование
    dotenvy::dotenv().ok();
    env_logger::init();
    log::info!("Starting tutoring payment bot with PostgreSQL...");

    let database_url = env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set");
    let admin_id: u64 = env::var("ADMIN_ID")
        .expect("ADMIN_ID must be set")
        .parse()
        .expect("ADMIN_ID must be a numeric Telegram user id");

    let db = Database::new(&database_url).await?;
    db.init().await?;
    log::info!("✅ Database initialized");

    let bot = Bot::from_env();

    // Напоминания живут в памяти процесса, после рестарта их надо перевзвести
    let scheduler = ReminderScheduler::new(bot.clone(), db.clone());
    match scheduler.restore_pending().await {
        Ok(count) => log::info!("⏰ {} payment reminder(s) restored", count),
        Err(e) => log::error!("Error restoring reminders: {}", e),
    }

    let state = BotState::new(db, UserId(admin_id), scheduler);

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(command_handler),
        )
        .branch(Update::filter_message().endpoint(message_handler));

    log::info!("🚀 Starting dispatcher...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
