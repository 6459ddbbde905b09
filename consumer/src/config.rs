use serde::Deserialize;
use shared::config::{Listener, ListenerError};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("invalid listener: {0}")]
    Listener(#[from] ListenerError),

    #[error("Listener and admin listener use the same address")]
    ListenerConflict,

    #[error("Replay timeout cannot be 0")]
    InvalidTimeout,

    #[error("Maximum event size cannot be 0")]
    InvalidMaxEventSize,
}

/// Consumer configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Listener receiving delivered stream entries
    pub listener: Listener,
    /// Admin listener for health and readiness endpoints
    pub admin_listener: Listener,
    /// Timeout for a complete replay, connection included
    #[serde(default = "default_replay_timeout_secs")]
    pub replay_timeout_secs: u64,
    /// Maximum size of a delivered payload, in bytes
    #[serde(default = "default_max_event_size")]
    pub max_event_size: usize,
}

fn default_replay_timeout_secs() -> u64 {
    30
}

fn default_max_event_size() -> usize {
    10_000_000
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.admin_listener.validate()?;
        if self.listener.conflicts_with(&self.admin_listener) {
            return Err(ValidationError::ListenerConflict);
        }

        if self.replay_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }

        if self.max_event_size == 0 {
            return Err(ValidationError::InvalidMaxEventSize);
        }

        Ok(())
    }
}
