use std::path::PathBuf;

use clap::{Parser, Subcommand};

use super::constants::{ENV_API_KEY, ENV_API_URL, ENV_CONFIG, ENV_PROJECT};

#[derive(Parser)]
#[command(name = "traceline")]
#[command(
    version,
    about = "Trace AI agent sessions into an observability backend",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// Backend API base URL
    #[arg(long, global = true, env = ENV_API_URL)]
    pub api_url: Option<String>,

    /// Backend API key
    #[arg(long, global = true, env = ENV_API_KEY, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Backend project name spans are filed under
    #[arg(long, global = true, env = ENV_PROJECT)]
    pub project: Option<String>,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Read host events from stdin and ship spans (default command)
    Run {
        /// Keep spans in memory and print the assembled trace on exit
        #[arg(long)]
        offline: bool,
    },
    /// Register this binary as an event hook in the host agent config
    Install {
        /// Path to the host agent's JSON config
        #[arg(long)]
        host_config: Option<PathBuf>,
    },
    /// Remove the event hook from the host agent config
    Uninstall {
        /// Path to the host agent's JSON config
        #[arg(long)]
        host_config: Option<PathBuf>,
    },
    /// Show resolved configuration and check backend credentials
    Status,
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub config: Option<PathBuf>,
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub project: Option<String>,
}

/// Parse CLI arguments and return config with command
pub fn parse() -> (CliConfig, Option<Commands>) {
    let cli = Cli::parse();
    let config = CliConfig {
        config: cli.config,
        api_url: cli.api_url,
        api_key: cli.api_key,
        project: cli.project,
    };
    (config, cli.command)
}
