//! Base trait for channel handlers

use async_trait::async_trait;

/// Trait for channel handlers
#[async_trait]
pub trait ChannelHandler: Send + Sync {
    /// Get the channel name
    fn name(&self) -> &str;

    /// Check if the channel is running
    fn is_running(&self) -> bool;

    /// Start receiving messages
    async fn start(&mut self) -> Result<()>;

    /// Stop receiving messages and cancel in-flight completions
    async fn stop(&mut self) -> Result<()>;
}

/// Channel errors
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel not configured: {0}")]
    NotConfigured(String),

    #[error("Channel not running: {0}")]
    NotRunning(String),

    #[error("API error: {0}")]
    ApiError(String),
}

pub type Result<T> = std::result::Result<T, ChannelError>;
