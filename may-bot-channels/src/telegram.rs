//! Telegram channel integration

use crate::base::{ChannelError, ChannelHandler, Result};
use crate::relay::{
    is_unknown_command, ChatCommand, MessageRelay, THINKING_PLACEHOLDER, UNKNOWN_COMMAND_REPLY,
};
use async_trait::async_trait;
use may_bot_core::config::TelegramConfig;
use may_bot_core::SessionKey;
use std::sync::Arc;
use teloxide::dispatching::{Dispatcher, UpdateFilterExt};
use teloxide::prelude::*;
use teloxide::types::ChatAction;
use teloxide::utils::command::BotCommands;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Telegram bot commands
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "may-bot commands:")]
enum Command {
    #[command(description = "Start talking to the bot")]
    Start,
    #[command(description = "Show available commands")]
    Help,
    #[command(description = "Clear conversation history")]
    Reset,
}

impl From<Command> for ChatCommand {
    fn from(command: Command) -> Self {
        match command {
            Command::Start => ChatCommand::Start,
            Command::Help => ChatCommand::Help,
            Command::Reset => ChatCommand::Reset,
        }
    }
}

/// Telegram channel handler (long polling)
pub struct TelegramHandler {
    /// Channel name
    name: String,
    /// Bot token
    token: String,
    /// Post a "thinking" placeholder while waiting for the model
    thinking_indicator: bool,
    relay: Arc<MessageRelay>,
    /// Bot instance
    bot: Option<Bot>,
    /// Running state
    running: bool,
    /// Dispatcher handle
    dispatcher_handle: Option<JoinHandle<()>>,
    /// Parent of every per-message cancellation token
    shutdown: CancellationToken,
}

impl TelegramHandler {
    /// Create a new Telegram handler from config
    pub fn new(config: &TelegramConfig, relay: Arc<MessageRelay>) -> Self {
        Self {
            name: "telegram".to_string(),
            token: config.token.trim().to_string(),
            thinking_indicator: config.thinking_indicator,
            relay,
            bot: None,
            running: false,
            dispatcher_handle: None,
            shutdown: CancellationToken::new(),
        }
    }

    /// Wait until the dispatcher task exits
    pub async fn join(&mut self) {
        if let Some(handle) = self.dispatcher_handle.take() {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    tracing::error!("Telegram dispatcher task failed: {}", e);
                }
            }
        }
    }
}

/// Handle a recognised command
async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    relay: Arc<MessageRelay>,
) -> ResponseResult<()> {
    let key = SessionKey::from(msg.chat.id.0);
    let reply = relay.handle_command(cmd.into(), &key);

    if let Err(e) = bot.send_message(msg.chat.id, reply).await {
        tracing::error!("Error sending command reply to chat {}: {}", msg.chat.id, e);
    }
    Ok(())
}

/// Handle a plain message: typing action, placeholder, completion, reply
async fn handle_text_message(
    bot: Bot,
    msg: Message,
    relay: Arc<MessageRelay>,
    thinking_indicator: bool,
    cancel: CancellationToken,
) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let chat_id = msg.chat.id;

    if is_unknown_command(text) {
        if let Err(e) = bot.send_message(chat_id, UNKNOWN_COMMAND_REPLY).await {
            tracing::error!("Error sending message: {}", e);
        }
        return Ok(());
    }

    if let Err(e) = bot.send_chat_action(chat_id, ChatAction::Typing).await {
        tracing::warn!("Failed to send typing action to chat {}: {}", chat_id, e);
    }

    let placeholder = if thinking_indicator {
        match bot.send_message(chat_id, THINKING_PLACEHOLDER).await {
            Ok(sent) => Some(sent.id),
            Err(e) => {
                tracing::error!("Error sending thinking message: {}", e);
                return Ok(());
            }
        }
    } else {
        None
    };

    let key = SessionKey::from(chat_id.0);
    let reply = relay.handle_text(&cancel, &key, text).await;

    if let Some(message_id) = placeholder {
        if let Err(e) = bot.delete_message(chat_id, message_id).await {
            tracing::warn!("Failed to delete thinking message: {}", e);
        }
    }

    if let Err(e) = bot.send_message(chat_id, reply).await {
        tracing::error!("Error sending message: {}", e);
    }
    Ok(())
}

#[async_trait]
impl ChannelHandler for TelegramHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_running(&self) -> bool {
        self.running
    }

    async fn start(&mut self) -> Result<()> {
        if self.token.is_empty() {
            return Err(ChannelError::NotConfigured(
                "Telegram token not configured (set TELEGRAM_BOT_TOKEN)".to_string(),
            ));
        }

        if self.running {
            return Ok(());
        }

        tracing::info!("Starting Telegram bot (polling mode)...");

        let bot = Bot::new(&self.token);

        if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
            tracing::warn!("Failed to set bot commands: {}", e);
        }

        match bot.get_me().await {
            Ok(me) => {
                let username = me.username.clone().unwrap_or_else(|| "unknown".to_string());
                tracing::info!("Authorized on account @{}", username);
            }
            Err(e) => {
                return Err(ChannelError::ApiError(format!(
                    "Failed to get bot info: {}",
                    e
                )));
            }
        }

        self.shutdown = CancellationToken::new();
        self.bot = Some(bot.clone());
        self.running = true;

        let relay_cmd = self.relay.clone();
        let relay_text = self.relay.clone();
        let thinking_indicator = self.thinking_indicator;
        let shutdown = self.shutdown.clone();

        let handler = dptree::entry()
            .branch(
                Update::filter_message()
                    .filter_command::<Command>()
                    .endpoint(move |bot: Bot, msg: Message, cmd: Command| {
                        handle_command(bot, msg, cmd, relay_cmd.clone())
                    }),
            )
            .branch(
                Update::filter_message().endpoint(move |bot: Bot, msg: Message| {
                    handle_text_message(
                        bot,
                        msg,
                        relay_text.clone(),
                        thinking_indicator,
                        shutdown.child_token(),
                    )
                }),
            );

        // Updates are not serialised per chat: two quick messages from one
        // user are handled concurrently and ordered by the store.
        let dispatcher_handle = tokio::spawn(async move {
            Dispatcher::builder(bot, handler)
                .distribution_function(|_| None::<std::convert::Infallible>)
                .build()
                .dispatch()
                .await;
        });

        self.dispatcher_handle = Some(dispatcher_handle);

        tracing::info!("Telegram bot started successfully");

        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        if !self.running {
            return Ok(());
        }

        tracing::info!("Stopping Telegram bot...");

        self.shutdown.cancel();

        if let Some(handle) = self.dispatcher_handle.take() {
            handle.abort();
        }

        self.bot = None;
        self.running = false;

        tracing::info!("Telegram bot stopped");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use may_bot_core::config::ProviderConfig;
    use may_bot_core::ConversationStore;
    use may_bot_providers::CompletionGateway;

    fn relay() -> Arc<MessageRelay> {
        let store = Arc::new(ConversationStore::new());
        let gateway = Arc::new(CompletionGateway::new(
            store.clone(),
            &ProviderConfig::default(),
        ));
        Arc::new(MessageRelay::new(gateway, store))
    }

    #[test]
    fn test_telegram_handler_new() {
        let config = TelegramConfig {
            token: " 123:abc ".to_string(),
            thinking_indicator: false,
        };

        let handler = TelegramHandler::new(&config, relay());
        assert_eq!(handler.name(), "telegram");
        assert_eq!(handler.token, "123:abc");
        assert!(!handler.thinking_indicator);
        assert!(!handler.is_running());
    }

    #[tokio::test]
    async fn test_start_without_token_is_not_configured() {
        let mut handler = TelegramHandler::new(&TelegramConfig::default(), relay());
        let err = handler.start().await.unwrap_err();
        assert!(matches!(err, ChannelError::NotConfigured(_)));
        assert!(!handler.is_running());
    }

    #[tokio::test]
    async fn test_stop_when_not_running_is_noop() {
        let mut handler = TelegramHandler::new(&TelegramConfig::default(), relay());
        assert!(handler.stop().await.is_ok());
    }

    #[test]
    fn test_command_parsing() {
        assert_eq!(Command::parse("/start", "maybot").unwrap(), Command::Start);
        assert_eq!(Command::parse("/reset", "maybot").unwrap(), Command::Reset);
        assert_eq!(
            Command::parse("/help@maybot", "maybot").unwrap(),
            Command::Help
        );
        assert!(Command::parse("/weather", "maybot").is_err());
    }

    #[test]
    fn test_command_maps_to_chat_command() {
        assert_eq!(ChatCommand::from(Command::Reset), ChatCommand::Reset);
        assert_eq!(Command::bot_commands().len(), 3);
    }
}
