pub mod broker;
mod capture;
pub mod config;
pub mod errors;
mod health;
mod metrics_defs;
mod service;
#[cfg(test)]
mod testutils;

pub use capture::{BoxError, Producer, RelayBody};
pub use errors::ProducerError;
pub use metrics_defs::ALL_METRICS;

use broker::{Broker, RedisBroker};
use health::BrokerHealth;
use service::ProducerService;
use shared::admin_service::AdminService;
use shared::http::run_http_service;
use std::sync::Arc;
use std::time::Duration;

const BROKER_CHECK_INTERVAL: Duration = Duration::from_secs(5);

pub async fn run(config: config::Config) -> Result<(), ProducerError> {
    config.validate()?;

    let broker = RedisBroker::connect(config.broker.url.as_str()).await?;
    tracing::info!(stream = %config.broker.stream, "Connected to broker");

    let broker: Arc<dyn Broker> = Arc::new(broker);
    let health = BrokerHealth::default();
    tokio::spawn(health.clone().run(broker.clone(), BROKER_CHECK_INTERVAL));

    let producer = Arc::new(Producer::new(&config, broker));

    let producer_task = run_http_service(
        &config.listener.host,
        config.listener.port,
        ProducerService::new(producer),
    );
    let admin_task = run_http_service(
        &config.admin_listener.host,
        config.admin_listener.port,
        AdminService::new(move || health.is_healthy()),
    );

    tokio::try_join!(producer_task, admin_task)?;
    Ok(())
}
