//! Error type for completion exchanges

use thiserror::Error;

/// Why a completion exchange failed
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("failed to encode completion request: {0}")]
    Serialization(#[source] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("completion request cancelled")]
    Cancelled,

    #[error("API error: status {status}, body: {body}")]
    RemoteApi { status: u16, body: String },

    #[error("no choices in response: {body}")]
    EmptyResponse { body: String },

    #[error("failed to decode completion response: {source}, body: {body}")]
    Deserialization {
        #[source]
        source: serde_json::Error,
        body: String,
    },
}

impl GatewayError {
    /// Network-level failure, cancellation and timeouts included
    pub fn is_transport(&self) -> bool {
        matches!(self, GatewayError::Transport(_) | GatewayError::Cancelled)
    }

    /// HTTP status returned by the remote API, if it answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::RemoteApi { status, .. } => Some(*status),
            GatewayError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
