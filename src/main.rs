//! Game server log relay.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gamelog_relay::config::{ConfigLoader, ConfigProvider, FileConfigProvider, RelayConfig};
use gamelog_relay::supervisor::{SupervisorOptions, WatcherSupervisor};
use gamelog_relay::webhook::{
    FallbackOutcome, MessageSink, SendLog, SendOutcome, WebhookDispatcher, SEND_LOG_FILE,
};

#[derive(Parser)]
#[command(
    name = "gamelog-relay",
    about = "Relay game server log events to Discord webhooks",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the logs directory and relay new events until interrupted.
    Run {
        /// Path to the config file.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Send a single message to a webhook.
    Send {
        /// Webhook URL.
        #[arg(long)]
        url: String,
        /// Message text.
        #[arg(short, long)]
        message: String,
        /// Fallback webhook URLs, tried in order.
        #[arg(long = "fallback")]
        fallbacks: Vec<String>,
        /// Path to the config file.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Print delivery totals from the send log.
    Stats {
        /// Path to the config file.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn loader(path: Option<PathBuf>) -> ConfigLoader {
    path.map_or_else(ConfigLoader::new, ConfigLoader::with_path)
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => tracing::error!(error = %e, "Failed to serialize output"),
    }
}

async fn run(config_path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let loader = loader(config_path);
    let config = loader.load()?;
    let state_dir = config.resolved_state_dir();

    let dispatcher = WebhookDispatcher::new(config.dispatch.clone())?
        .with_send_log(state_dir.join(SEND_LOG_FILE));

    // A config file is re-read on every lookup; without one the defaults stay.
    let provider: Arc<dyn ConfigProvider> = match loader.find_config_file() {
        Some(path) => {
            tracing::info!(path = %path.display(), "Using config file");
            Arc::new(FileConfigProvider::new(path))
        }
        None => Arc::new(config.clone()),
    };

    let options = SupervisorOptions {
        watch: config.watch.clone(),
        ..SupervisorOptions::default()
    };
    let mut supervisor =
        WatcherSupervisor::new(state_dir.clone(), Arc::new(dispatcher), provider, options);
    supervisor.start();
    tracing::info!(state_dir = %state_dir.display(), "Relay running, press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    supervisor.shutdown().await;
    Ok(())
}

async fn send(
    url: &str,
    message: &str,
    fallbacks: &[String],
    config: &RelayConfig,
) -> Result<bool, Box<dyn std::error::Error>> {
    let dispatcher = WebhookDispatcher::new(config.dispatch.clone())?
        .with_send_log(config.resolved_state_dir().join(SEND_LOG_FILE));

    if fallbacks.is_empty() {
        let result = dispatcher.send(url, message).await;
        print_json(&SendOutcome::from(&result));
        Ok(result.is_ok())
    } else {
        let result = dispatcher.send_with_fallback(url, message, fallbacks).await;
        print_json(&FallbackOutcome::from(&result));
        Ok(result.is_ok())
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Run { config } => run(config).await.map(|()| true),
        Commands::Send {
            url,
            message,
            fallbacks,
            config,
        } => match loader(config).load() {
            Ok(config) => send(&url, &message, &fallbacks, &config).await,
            Err(e) => Err(e.into()),
        },
        Commands::Stats { config } => match loader(config).load() {
            Ok(config) => {
                let log = SendLog::open(
                    config.resolved_state_dir().join(SEND_LOG_FILE),
                    config.dispatch.send_log_capacity,
                );
                print_json(&log.stats());
                Ok(true)
            }
            Err(e) => Err(e.into()),
        },
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
