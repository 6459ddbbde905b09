//! Broker reachability backing the admin `/ready` endpoint.

use crate::broker::Broker;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

const PING_TIMEOUT: Duration = Duration::from_secs(2);

/// Last known broker state. Starts healthy since `run` only gets here after
/// connecting.
#[derive(Clone)]
pub struct BrokerHealth {
    healthy: Arc<AtomicBool>,
}

impl Default for BrokerHealth {
    fn default() -> Self {
        Self {
            healthy: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl BrokerHealth {
    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    pub async fn check(&self, broker: &dyn Broker) {
        let healthy = match tokio::time::timeout(PING_TIMEOUT, broker.ping()).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Broker ping failed");
                false
            }
            Err(_) => {
                tracing::warn!("Broker ping timed out");
                false
            }
        };

        let was_healthy = self.healthy.swap(healthy, Ordering::Relaxed);
        if healthy && !was_healthy {
            tracing::info!("Broker reachable again");
        }
    }

    /// Pings the broker every `interval` for the lifetime of the process.
    pub async fn run(self, broker: Arc<dyn Broker>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            self.check(broker.as_ref()).await;
        }
    }
}
