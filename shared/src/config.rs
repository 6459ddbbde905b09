use serde::Deserialize;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ListenerError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Empty listener host")]
    EmptyHost,
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

impl Listener {
    pub fn validate(&self) -> Result<(), ListenerError> {
        if self.host.is_empty() {
            return Err(ListenerError::EmptyHost);
        }
        if self.port == 0 {
            return Err(ListenerError::InvalidPort);
        }
        Ok(())
    }

    pub fn conflicts_with(&self, other: &Listener) -> bool {
        self.port == other.port && self.host == other.host
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listener() {
        let listener: Listener = serde_yaml::from_str("{host: 0.0.0.0, port: 8080}").unwrap();
        assert!(listener.validate().is_ok());

        let zero_port = Listener {
            port: 0,
            ..listener.clone()
        };
        assert_eq!(zero_port.validate(), Err(ListenerError::InvalidPort));

        let no_host = Listener {
            host: "".into(),
            ..listener.clone()
        };
        assert_eq!(no_host.validate(), Err(ListenerError::EmptyHost));

        assert!(listener.conflicts_with(&listener.clone()));
        assert!(!listener.conflicts_with(&Listener {
            host: "0.0.0.0".into(),
            port: 8081
        }));
    }
}
