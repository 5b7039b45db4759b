//! Telegram transport adapter: teloxide-backed polling loop, inbound event
//! mapping, and the outbound `Transport` implementation.

pub mod bot;
pub mod inbound;
pub mod outbound;

pub use {bot::start_polling, outbound::TelegramTransport};
