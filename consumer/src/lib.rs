pub mod config;
mod envelope;
pub mod errors;
mod metrics_defs;
mod replay;
mod service;
#[cfg(test)]
mod testutils;

pub use envelope::extract_record;
pub use errors::ConsumerError;
pub use metrics_defs::ALL_METRICS;
pub use replay::{Consumer, reconstruct};

use service::ConsumerService;
use shared::admin_service::AdminService;
use shared::http::run_http_service;
use std::sync::Arc;

pub async fn run(config: config::Config) -> Result<(), ConsumerError> {
    config.validate()?;

    let consumer = Arc::new(Consumer::new(&config)?);

    let consumer_task = run_http_service(
        &config.listener.host,
        config.listener.port,
        ConsumerService::new(consumer, config.max_event_size),
    );
    let admin_task = run_http_service(
        &config.admin_listener.host,
        config.admin_listener.port,
        // Replays open a connection per record, so ready means alive here.
        AdminService::new(|| true),
    );

    tokio::try_join!(consumer_task, admin_task)?;
    Ok(())
}
