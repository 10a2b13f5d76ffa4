use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use feedd::core::notifications::{self, Notifications};
use feedd::ipc::{IpcClient, ListenerPool, Operation};
use feedd::logging::{self, LogConfig};
use feedd::{adapters, config, context, core::Orchestrator, ipc};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "feedd")]
#[command(about = "Video feed subscription daemon", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true, default_value = config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the daemon in the foreground
    Daemon(ServerArgs),
    /// Send one request to a running daemon
    Call {
        /// fetch, add, get, rm, refresh, search, subs or health
        endpoint: String,
        operand: Vec<String>,
    },
}

#[derive(Args, Serialize)]
struct ServerArgs {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    socket_dir: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    notify: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    subs_file: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    refresh_minutes: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    debug: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    verbose: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    json_logs: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    simulation: Option<bool>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.command {
        Commands::Daemon(args) => config::AppConfig::load(&cli.config, Some(args))?,
        _ => config::AppConfig::load(&cli.config, None::<&ServerArgs>)?,
    };

    match &cli.command {
        Commands::Daemon(_) => {
            logging::init(LogConfig::from(&config))?;

            let sources = adapters::get_sources(config.simulation)?;
            let notifications = Notifications::new(notifications::create_notifier(&config));
            let listeners = Arc::new(ListenerPool::new(ipc::LISTENER_CAPACITY));
            let ctx = context::AppContext::new(config, sources, notifications, listeners);
            run_daemon(ctx).await.context("Failed to start daemon")?
        }
        Commands::Call { endpoint, operand } => run_call(&config, endpoint, &operand.join(" "))
            .await
            .context("Failed to call daemon")?,
    }

    Ok(())
}

async fn run_daemon(ctx: context::AppContext) -> Result<()> {
    let orchestrator = Orchestrator::new(ctx);
    orchestrator.spawn_signal_handler()?;
    orchestrator.start().await
}

async fn run_call(config: &config::AppConfig, endpoint: &str, operand: &str) -> Result<()> {
    let Some(operation) = Operation::from_name(endpoint) else {
        bail!("unknown endpoint '{}'", endpoint);
    };

    let client = IpcClient::for_operation(config, operation);
    match client.call(operand.as_bytes()).await? {
        Some(response) if response.is_success() => println!("{}", response.payload),
        Some(response) => bail!("{}", response.payload),
        None => {}
    }
    Ok(())
}
