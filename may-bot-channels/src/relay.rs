//! Transport-independent message handling

use may_bot_core::{SessionKey, SessionStore};
use may_bot_providers::CompletionGateway;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

pub const START_REPLY: &str = "Hi! I'm a bot backed by DeepSeek. Ask me anything and I'll do my best to answer. Use /help to see the available commands.";

pub const HELP_REPLY: &str = "Available commands:\n/start - Start talking to the bot\n/help - Show this message\n/reset - Clear our conversation history\n\nJust write your question and I'll answer it with DeepSeek.";

pub const RESET_REPLY: &str =
    "Our conversation history has been cleared. Let's start a new conversation!";

pub const UNKNOWN_COMMAND_REPLY: &str = "Unknown command. Use /help to see the available commands.";

/// Shown to the user whenever the completion exchange fails
pub const GENERIC_FAILURE_REPLY: &str = "Sorry, something went wrong while processing your request.";

/// Placeholder posted while the model is working
pub const THINKING_PLACEHOLDER: &str = "🤔 Thinking...";

/// Commands every transport understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatCommand {
    Start,
    Help,
    Reset,
}

/// Maps chat input onto the conversation store and the completion gateway.
pub struct MessageRelay {
    gateway: Arc<CompletionGateway>,
    store: Arc<dyn SessionStore>,
}

impl MessageRelay {
    /// `store` must be the store the gateway was built with, otherwise
    /// `/reset` clears the wrong history.
    pub fn new(gateway: Arc<CompletionGateway>, store: Arc<dyn SessionStore>) -> Self {
        Self { gateway, store }
    }

    pub fn gateway(&self) -> &CompletionGateway {
        &self.gateway
    }

    /// Answer a recognised command
    pub fn handle_command(&self, command: ChatCommand, key: &SessionKey) -> String {
        match command {
            ChatCommand::Start => START_REPLY.to_string(),
            ChatCommand::Help => HELP_REPLY.to_string(),
            ChatCommand::Reset => {
                self.store.reset(key);
                info!("Conversation history reset for session {}", key);
                RESET_REPLY.to_string()
            }
        }
    }

    /// Answer free text. Gateway errors are logged and replaced with
    /// [`GENERIC_FAILURE_REPLY`]; the user's message stays in history.
    pub async fn handle_text(
        &self,
        cancel: &CancellationToken,
        key: &SessionKey,
        text: &str,
    ) -> String {
        match self.gateway.respond(cancel, key, text).await {
            Ok(reply) => reply,
            Err(e) => {
                error!("Error getting completion for session {}: {}", key, e);
                GENERIC_FAILURE_REPLY.to_string()
            }
        }
    }
}

/// Text that is a slash command the bot does not know
pub fn is_unknown_command(text: &str) -> bool {
    let trimmed = text.trim_start();
    trimmed.len() > 1
        && trimmed.starts_with('/')
        && trimmed[1..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphanumeric())
}
