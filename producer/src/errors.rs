use crate::broker::PublishError;
use crate::config::ValidationError;
use hyper::StatusCode;
use shared::record::EncodingError;
use thiserror::Error;

/// Result type alias for producer operations
pub type Result<T, E = ProducerError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum ProducerError {
    #[error("request body exceeds the limit of {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("failed to read request body: {0}")]
    RequestBodyError(String),

    #[error("request has no host to replay against")]
    MissingHost,

    #[error("invalid request target: {0}")]
    InvalidTarget(String),

    #[error("failed to encode record: {0}")]
    Encoding(#[from] EncodingError),

    #[error("failed to publish record: {0}")]
    Publish(#[from] PublishError),

    #[error("upstream request failed for {0}: {1}")]
    UpstreamRequestFailed(String, String),

    #[error("upstream timeout for {0}")]
    UpstreamTimeout(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ValidationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProducerError {
    /// Status returned to the caller. Capture failures are always a server error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProducerError::UpstreamRequestFailed(..) => StatusCode::BAD_GATEWAY,
            ProducerError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label used to tag the rejection metric.
    pub fn reason(&self) -> &'static str {
        match self {
            ProducerError::PayloadTooLarge { .. } => "payload_too_large",
            ProducerError::RequestBodyError(_) => "body_error",
            ProducerError::MissingHost | ProducerError::InvalidTarget(_) => "invalid_target",
            ProducerError::Encoding(_) => "encoding_error",
            ProducerError::Publish(_) => "publish_error",
            ProducerError::UpstreamRequestFailed(..) => "upstream_failed",
            ProducerError::UpstreamTimeout(_) => "upstream_timeout",
            ProducerError::InvalidConfig(_) | ProducerError::Io(_) => "internal",
        }
    }
}
