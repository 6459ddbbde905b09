//! Append-only stream the captured requests are published to.

use async_trait::async_trait;
use redis::Client;
use redis::aio::ConnectionManager;
use shared::record::RECORD_FIELD;

#[derive(thiserror::Error, Debug)]
pub enum PublishError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("write rejected: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait Broker: Send + Sync {
    /// Appends one entry holding `payload` to `stream`. Never retried by the caller.
    async fn publish(&self, stream: &str, payload: &[u8]) -> Result<(), PublishError>;

    /// Checks that the broker is reachable.
    async fn ping(&self) -> Result<(), PublishError> {
        Ok(())
    }
}

/// Redis streams backend. Entries are written with `XADD <stream> * data <payload>`.
#[derive(Clone)]
pub struct RedisBroker {
    connection: ConnectionManager,
}

impl RedisBroker {
    pub async fn connect(url: &str) -> Result<Self, PublishError> {
        let client = Client::open(url)?;
        let connection = ConnectionManager::new(client).await?;
        Ok(Self { connection })
    }
}

#[async_trait]
impl Broker for RedisBroker {
    async fn publish(&self, stream: &str, payload: &[u8]) -> Result<(), PublishError> {
        // The connection manager multiplexes a single connection, clones are cheap.
        let mut conn = self.connection.clone();
        let entry_id: String = redis::cmd("XADD")
            .arg(stream)
            .arg("*")
            .arg(RECORD_FIELD)
            .arg(payload)
            .query_async(&mut conn)
            .await?;

        tracing::trace!(stream, entry_id = %entry_id, "Appended stream entry");
        Ok(())
    }

    async fn ping(&self) -> Result<(), PublishError> {
        let mut conn = self.connection.clone();
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }
}
