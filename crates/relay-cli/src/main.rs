mod handlers;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use relay_core::app::HandlerRegistry;
use relay_core::impls::SqsQueueBackend;
use relay_core::{RelayBuilder, RelayConfig};

use crate::logging::LogFormat;

/// Drain an SQS queue, routing SNS notifications to handlers by topic.
#[derive(Debug, Parser)]
#[command(name = "relay", version, about)]
struct Cli {
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Receive and dispatch until the queue is empty, then exit.
    Drain(ConfigArgs),
    /// Show configured routes and whether their handlers are registered.
    Routes(ConfigArgs),
}

#[derive(Debug, Args)]
struct ConfigArgs {
    /// Path to the TOML config file.
    #[arg(short, long, env = "RELAY_CONFIG", default_value = "relay.toml")]
    config: PathBuf,

    /// Overrides `queue.url` from the config file.
    #[arg(long, env = "RELAY_QUEUE_URL")]
    queue_url: Option<String>,
}

impl ConfigArgs {
    fn load(&self) -> anyhow::Result<RelayConfig> {
        let config = RelayConfig::from_path(&self.config)
            .with_context(|| format!("loading {}", self.config.display()))?
            .with_queue_url(self.queue_url.clone());
        Ok(config)
    }
}

async fn drain(args: &ConfigArgs) -> anyhow::Result<()> {
    let config = args.load()?;
    config.validate()?;

    let backend = SqsQueueBackend::from_env(&config.queue).await;
    tracing::info!(
        queue_url = backend.queue_url(),
        routes = config.routes.len(),
        "Starting SQS processor"
    );

    let poll_loop = RelayBuilder::from_config(&config)
        .catalog(handlers::builtin_catalog()?)
        .backend(Arc::new(backend))
        .build()?;

    let stats = poll_loop.run().await?;
    tracing::info!(
        run_id = %stats.run_id,
        processed = stats.processed,
        failed = stats.failed,
        batches = stats.batches,
        acknowledged = stats.acknowledged,
        "drain finished"
    );
    Ok(())
}

fn routes(args: &ConfigArgs) -> anyhow::Result<()> {
    let config = args.load()?;
    let registry = HandlerRegistry::new(config.routes, handlers::builtin_catalog()?);

    if registry.routes().is_empty() {
        println!("no routes configured");
        return Ok(());
    }
    for (routing_key, handler) in registry.routes() {
        let status = if registry.catalog().contains(handler) {
            "ok"
        } else {
            "unregistered"
        };
        println!("{routing_key} -> {handler} [{status}]");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.log_format);

    let result = match &cli.command {
        Command::Drain(args) => drain(args).await,
        Command::Routes(args) => routes(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = ?err, "relay failed");
            ExitCode::FAILURE
        }
    }
}
