use clap::Parser;
use tracing_subscriber::EnvFilter;

use mcp_testbench::cli::{self, Cli, Commands};
use mcp_testbench::errors::TestbenchError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.quiet {
        "warn"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(!cli.no_color)
        .init();

    let result = match cli.command {
        Commands::Run(args) => cli::run::handle_run(args).await,
        Commands::Validate(args) => cli::run::handle_validate(args).await,
    };

    match result {
        Ok(()) => {}
        Err(e) => {
            eprintln!("Error: {}", e);
            let exit_code = match &e {
                TestbenchError::Config(_) => 2,
                TestbenchError::Launch(_) => 3,
                TestbenchError::Connect(_) => 4,
                TestbenchError::InvalidTarget(_) => 5,
                TestbenchError::GradeThreshold(_) => 6,
                _ => 1,
            };
            std::process::exit(exit_code);
        }
    }
}
