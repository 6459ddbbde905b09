use serde::Deserialize;
use shared::config::{Listener, ListenerError};
use thiserror::Error;
use url::Url;

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("invalid listener: {0}")]
    Listener(#[from] ListenerError),

    #[error("Listener and admin listener use the same address")]
    ListenerConflict,

    #[error("Empty stream name")]
    EmptyStream,

    #[error("Unsupported broker url scheme: {0}")]
    UnsupportedBrokerScheme(String),

    #[error("Request size limit cannot be 0")]
    InvalidRequestSizeLimit,

    #[error("Passthrough timeout cannot be 0")]
    InvalidTimeout,
}

/// Scheme used when rebuilding the absolute url of a captured request
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    #[default]
    Http,
    Https,
}

impl Scheme {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

/// Producer configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Listener receiving the requests to capture
    pub listener: Listener,
    /// Admin listener for health and readiness endpoints
    pub admin_listener: Listener,
    pub broker: BrokerConfig,
    /// Maximum accepted request body, in bytes
    #[serde(default = "default_request_size_limit")]
    pub request_size_limit: usize,
    #[serde(default)]
    pub scheme: Scheme,
    /// Timeout for requests that are forwarded synchronously
    #[serde(default = "default_passthrough_timeout_secs")]
    pub passthrough_timeout_secs: u64,
}

/// Stream the captured requests are appended to
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct BrokerConfig {
    /// e.g. "redis://redis.redis.svc.cluster.local:6379"
    pub url: Url,
    pub stream: String,
}

fn default_request_size_limit() -> usize {
    1_000_000
}

fn default_passthrough_timeout_secs() -> u64 {
    30
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.admin_listener.validate()?;
        if self.listener.conflicts_with(&self.admin_listener) {
            return Err(ValidationError::ListenerConflict);
        }

        if self.broker.stream.is_empty() {
            return Err(ValidationError::EmptyStream);
        }

        if !matches!(self.broker.url.scheme(), "redis" | "rediss" | "redis+unix") {
            return Err(ValidationError::UnsupportedBrokerScheme(
                self.broker.url.scheme().to_string(),
            ));
        }

        if self.request_size_limit == 0 {
            return Err(ValidationError::InvalidRequestSizeLimit);
        }

        if self.passthrough_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }

        Ok(())
    }
}
