mod config;

use clap::{Args, Parser};
use config::{CommonConfig, Config, ConfigError};
use metrics_exporter_statsd::StatsdBuilder;
use shared::metrics_defs::{MetricDef, describe_all};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "relay", about = "Defers HTTP requests through a stream and replays them")]
enum CliCommand {
    /// Capture requests marked `Prefer: respond-async` and publish them
    Producer(CliArgs),
    /// Replay records pushed from the stream
    Consumer(CliArgs),
}

#[derive(Args)]
struct CliArgs {
    #[arg(long)]
    config_file_path: PathBuf,
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("missing `{0}` section in config file")]
    MissingSection(&'static str),
    #[error("could not set up metrics: {0}")]
    Metrics(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Producer(#[from] producer::ProducerError),
    #[error(transparent)]
    Consumer(#[from] consumer::ConsumerError),
}

fn main() -> ExitCode {
    let cli = CliCommand::parse();

    let (CliCommand::Producer(args) | CliCommand::Consumer(args)) = &cli;
    let config = match Config::from_file(&args.config_file_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let _sentry = init_logging(&config.common);

    match run(cli, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Relay exited with an error");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: CliCommand, config: Config) -> Result<(), CliError> {
    let runtime = tokio::runtime::Runtime::new()?;

    match cli {
        CliCommand::Producer(_) => {
            let producer_config = config
                .producer
                .ok_or(CliError::MissingSection("producer"))?;
            init_metrics(&config.common, producer::ALL_METRICS)?;

            tracing::info!("Starting producer");
            runtime.block_on(producer::run(producer_config))?;
        }
        CliCommand::Consumer(_) => {
            let consumer_config = config
                .consumer
                .ok_or(CliError::MissingSection("consumer"))?;
            init_metrics(&config.common, consumer::ALL_METRICS)?;

            tracing::info!("Starting consumer");
            runtime.block_on(consumer::run(consumer_config))?;
        }
    }

    Ok(())
}

// RUST_LOG controls the level, info by default. Events at error level are
// also sent to Sentry when a DSN is configured.
fn init_logging(common: &CommonConfig) -> Option<sentry::ClientInitGuard> {
    let guard = common.logging.as_ref().map(|logging| {
        sentry::init((
            logging.sentry_dsn.as_str(),
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(guard.as_ref().map(|_| sentry::integrations::tracing::layer()))
        .init();

    guard
}

fn init_metrics(common: &CommonConfig, defs: &[MetricDef]) -> Result<(), CliError> {
    let Some(metrics_config) = &common.metrics else {
        return Ok(());
    };

    let recorder = StatsdBuilder::from(
        metrics_config.statsd_host.as_str(),
        metrics_config.statsd_port,
    )
    .build(Some("relay"))
    .map_err(|e| CliError::Metrics(e.to_string()))?;
    metrics::set_global_recorder(recorder).map_err(|e| CliError::Metrics(e.to_string()))?;
    describe_all(defs);

    tracing::info!(
        host = %metrics_config.statsd_host,
        port = metrics_config.statsd_port,
        "Sending metrics to statsd"
    );
    Ok(())
}
