use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid api base url {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("{endpoint} request failed: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} returned {status}: {message}")]
    Status {
        endpoint: &'static str,
        status: u16,
        message: String,
    },
    #[error("{endpoint} response could not be decoded: {reason}")]
    Decode {
        endpoint: &'static str,
        reason: String,
    },
    #[error("encode request body: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ClientError {
    /// True when the remote API was never reached or did not answer.
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Message reported by the remote API, if it answered with an error.
    pub fn remote_message(&self) -> Option<&str> {
        match self {
            Self::Status { message, .. } => Some(message),
            _ => None,
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
