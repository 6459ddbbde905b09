use crate::config::ValidationError;
use hyper::StatusCode;
use shared::record::DecodingError;
use thiserror::Error;

/// Result type alias for consumer operations
pub type Result<T, E = ConsumerError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum ConsumerError {
    #[error("failed to decode record: {0}")]
    Decoding(#[from] DecodingError),

    #[error("record {id} cannot be turned into a request: {reason}")]
    InvalidRequest { id: String, reason: String },

    #[error("replay of record {id} to {url} failed: {source}")]
    Replay {
        id: String,
        url: String,
        source: reqwest::Error,
    },

    #[error("delivered payload exceeds the limit of {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("failed to read delivered payload: {0}")]
    RequestBodyError(String),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ValidationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConsumerError {
    /// Status reported back to the delivery mechanism, which owns redelivery.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ConsumerError::Decoding(_)
            | ConsumerError::InvalidRequest { .. }
            | ConsumerError::RequestBodyError(_) => StatusCode::BAD_REQUEST,
            ConsumerError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ConsumerError::Replay { .. } => StatusCode::BAD_GATEWAY,
            ConsumerError::HttpClient(_)
            | ConsumerError::InvalidConfig(_)
            | ConsumerError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
