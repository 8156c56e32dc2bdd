//! CLI entry point for may-bot

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use console::style;
use may_bot_channels::relay::{is_unknown_command, UNKNOWN_COMMAND_REPLY};
use may_bot_channels::{ChannelHandler, ChatCommand, MessageRelay, TelegramHandler};
use may_bot_core::config::{Config, ConfigLoader};
use may_bot_core::logging::init_logging;
use may_bot_core::{ConversationStore, SessionKey, SessionStore};
use may_bot_providers::CompletionGateway;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "may-bot")]
#[command(about = "Telegram relay to the DeepSeek chat-completion API")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration directory
    #[arg(short, long, global = true)]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the Telegram bot until Ctrl+C
    Gateway,
    /// Talk to the model from the terminal
    Chat {
        /// Send one message and exit (interactive when omitted)
        #[arg(short, long)]
        message: Option<String>,
        /// Session key for conversation continuity
        #[arg(short, long, default_value = "cli")]
        session: String,
    },
    /// Show status information
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let loader = match &cli.config_dir {
        Some(dir) => ConfigLoader::with_dir(dir),
        None => ConfigLoader::new(),
    };

    match cli.command {
        Commands::Gateway => run_gateway(&loader).await,
        Commands::Chat { message, session } => run_chat(&loader, message, session).await,
        Commands::Status => show_status(&loader),
    }
}

/// One store shared by the gateway and the relay
fn build_relay(config: &Config) -> Arc<MessageRelay> {
    let store: Arc<dyn SessionStore> = Arc::new(ConversationStore::new());
    let gateway = Arc::new(CompletionGateway::new(store.clone(), &config.provider));
    Arc::new(MessageRelay::new(gateway, store))
}

async fn run_gateway(loader: &ConfigLoader) -> Result<()> {
    let config = loader.load()?;
    let _guard = init_logging(&config.logging);

    if config.telegram.token.trim().is_empty() {
        bail!("TELEGRAM_BOT_TOKEN environment variable is not set");
    }

    let relay = build_relay(&config);
    if !relay.gateway().is_configured() {
        warn!("DeepSeek client is not configured: set DEEPSEEK_API_KEY to enable completions");
    }

    println!("{}", style("Starting may-bot gateway...").bold().cyan());
    println!("Model: {}", relay.gateway().model());
    println!("Endpoint: {}", relay.gateway().endpoint());

    let mut telegram = TelegramHandler::new(&config.telegram, relay);
    telegram.start().await?;

    println!(
        "\n{}",
        style("Gateway is running. Press Ctrl+C to stop.").green()
    );

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("Shutdown signal received");
        }
        _ = telegram.join() => {
            warn!("Telegram dispatcher exited on its own");
        }
    }

    telegram.stop().await?;
    Ok(())
}

async fn run_chat(loader: &ConfigLoader, message: Option<String>, session: String) -> Result<()> {
    let config = loader.load()?;
    let _guard = init_logging(&config.logging);

    let relay = build_relay(&config);
    let key = SessionKey::from(session);

    if let Some(message) = message {
        let cancel = cancel_on_ctrl_c();
        let reply = answer(&relay, &cancel, &key, &message).await;
        println!("{}", reply);
        return Ok(());
    }

    println!(
        "{} (session {}, /reset to clear, /exit to quit)",
        style("may-bot chat").bold().cyan(),
        key
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let next = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = next else {
            println!();
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/exit" || line == "/quit" {
            break;
        }

        let cancel = cancel_on_ctrl_c();
        let reply = answer(&relay, &cancel, &key, line).await;
        cancel.cancel();
        println!("{}\n", style(reply).green());
    }

    Ok(())
}

/// Route one line the way the Telegram transport would
async fn answer(
    relay: &MessageRelay,
    cancel: &CancellationToken,
    key: &SessionKey,
    text: &str,
) -> String {
    if let Some(command) = parse_command(text) {
        return relay.handle_command(command, key);
    }
    if is_unknown_command(text) {
        return UNKNOWN_COMMAND_REPLY.to_string();
    }
    relay.handle_text(cancel, key, text).await
}

fn parse_command(text: &str) -> Option<ChatCommand> {
    match text.trim() {
        "/start" => Some(ChatCommand::Start),
        "/help" => Some(ChatCommand::Help),
        "/reset" => Some(ChatCommand::Reset),
        _ => None,
    }
}

/// Token cancelled by Ctrl+C; cancelling it also retires the watcher task
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let watcher = cancel.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => watcher.cancel(),
            _ = watcher.cancelled() => {}
        }
    });
    cancel
}

fn show_status(loader: &ConfigLoader) -> Result<()> {
    let config = loader.load()?;
    let gateway = CompletionGateway::new(Arc::new(ConversationStore::new()), &config.provider);

    let flag = |set: bool| {
        if set {
            style("set").green()
        } else {
            style("not set").red()
        }
    };

    println!("{}", style("may-bot status").bold().cyan());
    println!("Config file: {}", loader.config_path().display());
    println!("Model: {}", gateway.model());
    println!("Endpoint: {}", gateway.endpoint());
    println!(
        "Temperature: {}, max tokens: {}, timeout: {}s",
        config.provider.temperature, config.provider.max_tokens, config.provider.timeout_secs
    );
    println!("DeepSeek API key: {}", flag(gateway.is_configured()));
    println!(
        "Telegram token: {}",
        flag(!config.telegram.token.trim().is_empty())
    );
    println!("Log directory: {}", config.logging.dir);
    Ok(())
}
