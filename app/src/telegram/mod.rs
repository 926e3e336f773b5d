//! Telegram transport: Bot API client, notifier and command loop

mod api;
mod commands;
pub mod format;
mod notifier;

pub use api::{BotCommand, Chat, Message, TelegramApi, Update, DEFAULT_API_URL};
pub use commands::{bot_commands, spawn_command_loop, Command, CommandHandler};
pub use notifier::TelegramNotifier;
