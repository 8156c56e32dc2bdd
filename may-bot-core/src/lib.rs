//! Core types for may-bot
//!
//! This crate provides the conversation store shared by the completion
//! gateway and the chat transports, together with configuration loading,
//! logging bootstrap and the common error type.

pub mod config;
pub mod error;
pub mod logging;
pub mod session;

pub use error::{Error, Result};
pub use session::{ConversationStore, Message, Role, SessionKey, SessionStore};
