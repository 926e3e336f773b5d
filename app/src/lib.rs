//! Slotwatch bot - process wiring, configuration and the Telegram transport

pub mod config;
pub mod telegram;

pub use config::Config;
