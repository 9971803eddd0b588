//! Screenctl CLI entry point.

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use screenctl_cli::cli::Cli;
use screenctl_cli::{commands, exit_code};
use screenctl_core::ScreenOrchestrator;

#[tokio::main]
async fn main() {
    // Load .env.local if it exists (for SCREENDIR etc.)
    let _ = dotenvy::from_filename(".env.local");

    let cli = Cli::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level().to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.config() {
        Ok(config) => {
            let screen = ScreenOrchestrator::with_config(config);
            commands::execute(cli.command, &screen).await
        }
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(exit_code(e.as_ref()));
    }
}
