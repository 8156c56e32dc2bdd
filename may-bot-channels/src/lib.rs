//! Chat platform integrations for may-bot
//!
//! [`MessageRelay`] holds the platform-independent behaviour (commands,
//! replies, failure notices); [`TelegramHandler`] wires it to the Bot API.

pub mod base;
pub mod relay;
pub mod telegram;

pub use base::{ChannelError, ChannelHandler, Result};
pub use relay::{ChatCommand, MessageRelay};
pub use telegram::TelegramHandler;
