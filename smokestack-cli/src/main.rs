//! Smokestack CLI: lifecycle control and smoke testing for the RAG stack.

mod commands;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Smokestack: bring the RAG stack up and down, and verify its contracts
#[derive(Parser, Debug)]
#[command(name = "smokestack", version, about, long_about = None)]
struct Cli {
    /// Workspace directory (holds smokestack.toml and the compose file)
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Validate the compose config, start the stack, wait for readiness,
    /// and run the boot gate
    Up,
    /// Snapshot service status, stop gracefully, and tear the stack down
    Down,
    /// Run the boot gate checks alone
    Gate,
    /// Run the small read-only smoke suite
    Smoke,
    /// Run the release-train suite
    Release,
    /// Run numbered test scripts (NN_name) from a directory
    Run {
        /// Directory containing the test scripts
        dir: PathBuf,

        /// Override the per-script timeout in seconds
        #[arg(short, long)]
        timeout: Option<u64>,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Create a default configuration file in the workspace
    Init,
    /// Show the effective layered configuration
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "smokestack", "smokestack")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "smokestack.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    // Resolve workspace
    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    commands::handle_command(cli.command, &workspace).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_structure_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_with_timeout() {
        let cli = Cli::parse_from(["smokestack", "run", "tests/small", "--timeout", "10"]);
        match cli.command {
            Commands::Run { dir, timeout } => {
                assert_eq!(dir, PathBuf::from("tests/small"));
                assert_eq!(timeout, Some(10));
            }
            command => panic!("expected run subcommand, got: {command:?}"),
        }
    }

    #[test]
    fn test_parse_verbosity_flags() {
        let cli = Cli::parse_from(["smokestack", "-vv", "smoke"]);
        assert_eq!(cli.verbose, 2);
        assert!(!cli.quiet);
        assert!(matches!(cli.command, Commands::Smoke));
    }
}
