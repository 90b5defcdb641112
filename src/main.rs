mod recognize;
mod task;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use smartspeech_core::config::ConnectionConfig;
use smartspeech_core::{AppConfig, ClientError};
use smartspeech_grpc::{CallMetadata, ConnectionSettings, Connector, SmartSpeechClient};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "smartspeech", about = "SmartSpeech recognition and task client")]
struct Cli {
    /// Path to an optional TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// host[:port] of the gRPC endpoint; `http://` disables TLS
    #[arg(long, global = true)]
    host: Option<String>,

    /// Access token
    #[arg(long, global = true, env = "SMARTSPEECH_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// CA certificate file (TLS)
    #[arg(long, global = true)]
    ca: Option<PathBuf>,

    /// Client certificate file (TLS)
    #[arg(long, global = true)]
    cert: Option<PathBuf>,

    /// Private key file (TLS)
    #[arg(long, global = true)]
    key: Option<PathBuf>,

    /// Extra call metadata as KEY VALUE pairs
    #[arg(long, global = true, num_args = 1..)]
    metadata: Vec<String>,

    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Stream an audio file and print recognition results
    Recognize(recognize::RecognizeArgs),
    /// Inspect, cancel or wait for an asynchronous recognition task
    Task(task::TaskArgs),
}

impl Cli {
    fn apply_overrides(&self, config: &mut AppConfig) {
        let conn = &mut config.connection;
        if let Some(host) = &self.host {
            conn.host = host.clone();
        }
        if let Some(token) = &self.token {
            conn.token = token.clone();
        }
        if self.ca.is_some() {
            conn.ca = self.ca.clone();
        }
        if self.cert.is_some() {
            conn.cert = self.cert.clone();
        }
        if self.key.is_some() {
            conn.key = self.key.clone();
        }
        if let Some(level) = &self.log_level {
            config.general.log_level = level.clone();
        }
    }
}

/// Validated endpoint and call metadata. Nothing is opened until
/// [`connect`](Self::connect).
pub(crate) struct Connection {
    connector: Connector,
    metadata: CallMetadata,
}

impl Connection {
    pub(crate) fn prepare(
        config: &ConnectionConfig,
        metadata: &[String],
    ) -> Result<Self, ClientError> {
        let metadata = CallMetadata::new(&config.token, metadata)?;
        let connector = Connector::new(&ConnectionSettings {
            host: config.host.clone(),
            ca: config.ca.clone(),
            cert: config.cert.clone(),
            key: config.key.clone(),
        })?;
        Ok(Self {
            connector,
            metadata,
        })
    }

    /// Open the channel every call of this run shares.
    pub(crate) async fn connect(self) -> Result<(SmartSpeechClient, CallMetadata), ClientError> {
        let channel = self.connector.connect().await?;
        Ok((SmartSpeechClient::new(channel), self.metadata))
    }
}

fn report(err: &ClientError) {
    match err {
        ClientError::Transport { .. } => println!("{err}"),
        ClientError::Application(message) => println!("Exception: {message}"),
        ClientError::Validation(e) => eprintln!("invalid configuration: {e}"),
        ClientError::TaskFailed { message, .. } => println!("\nTask has failed: {message}"),
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path)
            .with_context(|| format!("failed to load config from {path:?}"))?,
        None => AppConfig::default(),
    };
    cli.apply_overrides(&mut config);

    let env_filter = EnvFilter::try_new(&config.general.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::Registry::default()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false),
        );

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    tracing::debug!(host = %config.connection.host, "smartspeech starting");

    let outcome = match cli.command {
        Command::Recognize(args) => recognize::run(&config, &cli.metadata, args).await,
        Command::Task(args) => task::run(&config, &cli.metadata, args).await,
    };

    match outcome {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => {
            tracing::debug!("run failed: {err}");
            report(&err);
            Ok(ExitCode::FAILURE)
        }
    }
}
