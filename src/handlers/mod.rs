pub mod commands;
pub mod dialogs;
pub mod messages;
pub mod reminders;
pub mod utils;

pub use commands::command_handler;
pub use messages::message_handler;
