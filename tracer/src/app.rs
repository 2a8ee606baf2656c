//! Core application

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::core::cli::{self, CliConfig, Commands};
use crate::core::config::AppConfig;
use crate::core::constants::{APP_NAME_LOWER, ENV_LOG};
use crate::core::install;
use crate::data::backend::{ApiClient, BackendSpanSink};
use crate::data::sink::{MemorySpanSink, SpanSink};
use crate::domain::events::HostMessage;
use crate::domain::processor::EventProcessor;
use crate::domain::tree::build_span_forest;
use crate::utils::id::UuidIds;
use crate::utils::time::SystemClock;

pub struct CoreApp;

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        Self::init_logging();

        let (cli_config, command) = cli::parse();
        match command {
            Some(Commands::Install { host_config }) => Self::install(host_config),
            Some(Commands::Uninstall { host_config }) => Self::uninstall(host_config),
            Some(Commands::Status) => Self::status(&cli_config).await,
            Some(Commands::Run { offline }) => Self::run_feed(&cli_config, offline).await,
            None => Self::run_feed(&cli_config, false).await,
        }
    }

    fn init_logging() {
        let default_filter = format!("info,{}=info", APP_NAME_LOWER);

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        // stdout stays free for command output; the host may capture it.
        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_writer(std::io::stderr)
            .compact()
            .with_env_filter(filter)
            .init();
    }

    fn install(host_config: Option<PathBuf>) -> Result<()> {
        let exe = std::env::current_exe().context("Failed to resolve current executable")?;
        let path = install::install(host_config, &exe)?;
        println!("Registered {} in {}", APP_NAME_LOWER, path.display());
        Ok(())
    }

    fn uninstall(host_config: Option<PathBuf>) -> Result<()> {
        let path = install::uninstall(host_config)?;
        println!("Removed {} from {}", APP_NAME_LOWER, path.display());
        Ok(())
    }

    async fn status(cli: &CliConfig) -> Result<()> {
        let config = AppConfig::load(cli)?;
        println!("enabled: {}", config.enabled);
        println!("api_url: {}", config.backend.api_url);
        println!("project: {}", config.backend.project);
        match ApiClient::new(&config.backend) {
            Err(_) => println!("api_key: not configured"),
            Ok(client) => match client.login().await {
                Ok(info) => println!(
                    "api_key: valid{}",
                    info.org_name
                        .map(|org| format!(" (org: {})", org))
                        .unwrap_or_default()
                ),
                Err(error) => println!("api_key: check failed: {}", error),
            },
        }
        Ok(())
    }

    /// Consume the NDJSON host feed from stdin until EOF.
    async fn run_feed(cli: &CliConfig, offline: bool) -> Result<()> {
        let config = AppConfig::load(cli)?;
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        if !config.enabled {
            // Keep the host's pipe alive, just record nothing.
            tracing::info!("tracing disabled by config, draining host events");
            while lines
                .next_line()
                .await
                .context("Failed to read host event feed")?
                .is_some()
            {}
            return Ok(());
        }

        let sink: Arc<dyn SpanSink> = if offline {
            Arc::new(MemorySpanSink::new())
        } else {
            Arc::new(
                BackendSpanSink::connect(&config.backend)
                    .await
                    .context("Failed to connect to trace backend")?,
            )
        };
        let mut processor = EventProcessor::new(
            sink.clone(),
            Arc::new(SystemClock),
            Arc::new(UuidIds),
            config.backend.project.clone(),
        );

        while let Some(line) = lines
            .next_line()
            .await
            .context("Failed to read host event feed")?
        {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<HostMessage>(line) {
                Ok(message) => processor.handle(message).await,
                Err(error) => {
                    tracing::debug!(error = %error, "skipping undecodable host message");
                }
            }
        }

        if offline {
            let spans = sink.spans().await;
            for tree in build_span_forest(&spans) {
                print!("{}", tree.render_ascii());
            }
        }
        Ok(())
    }
}
