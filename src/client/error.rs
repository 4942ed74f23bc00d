use std::time::Duration;

use reqwest::StatusCode;

use thiserror::Error;

use crate::client::{RefreshError, TransportCode};

pub type ClientResult<T> = Result<T, ClientError>;

/// Terminal outcome of a request, after retries and session refresh have been exhausted
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Request to {endpoint} failed ({code})")]
    Transport {
        endpoint: String,
        code: TransportCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to {endpoint} failed with status {status}")]
    Status {
        endpoint: String,
        status: StatusCode,
        /// `code` from the JSON error body
        code: Option<String>,
        /// `error` from the JSON error body
        message: Option<String>,
        retry_after: Option<Duration>,
    },

    #[error(transparent)]
    Refresh(#[from] RefreshError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Failed to decode response from {endpoint}")]
    Decode {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to build http client")]
    Build(#[source] reqwest::Error),
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Refresh(RefreshError::Rejected { status }) => Some(*status),
            _ => None,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status() == Some(StatusCode::TOO_MANY_REQUESTS)
    }

    /// Server advised wait attached to a rate limited response
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Status { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Set when no response was received at all
    pub fn transport_code(&self) -> Option<TransportCode> {
        match self {
            Self::Transport { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Message suitable for end users, taken from the server when it sent one
    pub fn user_message(&self) -> String {
        match self {
            Self::Status {
                message: Some(message),
                ..
            } => message.clone(),
            other => other.to_string(),
        }
    }
}
