use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use kickstart_iso::cli::Cli;
use kickstart_iso::core::Builder;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(format!("kickstart_iso={},warn", cli.log_level.as_filter()))
        .init();

    info!("kickstart-iso v{} starting", env!("CARGO_PKG_VERSION"));

    let result = cli
        .build_config()
        .and_then(|config| Builder::new(config).build());

    match result {
        Ok(()) => {
            info!("✓ ** PROCESS COMPLETE **");
            Ok(())
        }
        Err(e) => {
            error!("✗ Build failed: {:#}", e);
            std::process::exit(1);
        }
    }
}
