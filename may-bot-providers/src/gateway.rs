//! DeepSeek chat-completion client bound to a conversation store

use may_bot_core::config::ProviderConfig;
use may_bot_core::{Message, SessionKey, SessionStore};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{GatewayError, GatewayResult};

/// Returned instead of a completion when no API key is configured
pub const NOT_CONFIGURED_REPLY: &str =
    "The DeepSeek API is not configured. Please set the DEEPSEEK_API_KEY environment variable.";

/// Chat completion request body
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f64,
    max_tokens: u32,
}

/// Chat completion response body, reduced to what the bot reads
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Sends a session's history to the completion endpoint and records the reply.
///
/// The gateway never owns history: it reads and appends through the injected
/// [`SessionStore`], so several gateways (or a transport resetting sessions)
/// can share one store.
pub struct CompletionGateway {
    client: Client,
    store: Arc<dyn SessionStore>,
    api_key: Option<String>,
    endpoint: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
}

impl CompletionGateway {
    /// Create a gateway from provider settings.
    ///
    /// A missing or blank API key is not an error: the gateway then answers
    /// every call with [`NOT_CONFIGURED_REPLY`].
    pub fn new(store: Arc<dyn SessionStore>, config: &ProviderConfig) -> Self {
        let api_key = if config.has_api_key() {
            Some(config.api_key.trim().to_string())
        } else {
            None
        };

        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()
                .unwrap_or_else(|_| Client::new()),
            store,
            api_key,
            endpoint: format!("{}/chat/completions", config.api_base.trim_end_matches('/')),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run one exchange for `key`.
    ///
    /// The user message is committed before the request goes out and stays in
    /// history whatever happens next; the assistant message is appended only
    /// when a reply was parsed. Cancelling `cancel` aborts the HTTP exchange.
    pub async fn respond(
        &self,
        cancel: &CancellationToken,
        key: impl Into<SessionKey>,
        user_text: &str,
    ) -> GatewayResult<String> {
        let key = key.into();
        let Some(api_key) = self.api_key.as_deref() else {
            warn!("Completion requested for session {} but no API key is set", key);
            return Ok(NOT_CONFIGURED_REPLY.to_string());
        };

        self.store.append(&key, Message::user(user_text));
        let history = self.store.snapshot(&key);

        let request = self.build_request(history);
        let body = serde_json::to_vec(&request).map_err(GatewayError::Serialization)?;

        debug!(
            "Sending request to {} for session {} with body: {}",
            self.endpoint,
            key,
            String::from_utf8_lossy(&body)
        );

        let raw = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("Completion request for session {} cancelled", key);
                return Err(GatewayError::Cancelled);
            }
            result = self.exchange(api_key, body) => result?,
        };

        let reply = parse_reply(raw)?;
        self.store.append(&key, Message::assistant(reply.clone()));
        Ok(reply)
    }

    /// Build the request payload from a session snapshot.
    ///
    /// The entire history is sent; this is the single place a window over
    /// the history would be applied.
    fn build_request(&self, history: Vec<Message>) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: history,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    /// POST the encoded body and return the raw success body
    async fn exchange(&self, api_key: &str, body: Vec<u8>) -> GatewayResult<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .bearer_auth(api_key)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            warn!("API error response: status={}, body={}", status, text);
            return Err(GatewayError::RemoteApi {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(text)
    }
}

fn parse_reply(body: String) -> GatewayResult<String> {
    let parsed: ChatCompletionResponse = match serde_json::from_str(&body) {
        Ok(parsed) => parsed,
        Err(source) => return Err(GatewayError::Deserialization { source, body }),
    };

    match parsed.choices.into_iter().next() {
        Some(choice) => Ok(choice.message.content.unwrap_or_default()),
        None => Err(GatewayError::EmptyResponse { body }),
    }
}
