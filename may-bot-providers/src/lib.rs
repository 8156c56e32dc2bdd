//! Chat-completion gateway for may-bot
//!
//! Turns a user's text into a completion request carrying the whole
//! conversation so far, and records the model's answer in the shared
//! conversation store.

pub mod error;
pub mod gateway;

pub use error::{GatewayError, GatewayResult};
pub use gateway::{CompletionGateway, NOT_CONFIGURED_REPLY};
