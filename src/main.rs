//! snipvault - snippet organizer
//!
//! Run without a command to print the whole tree.

use std::process::exit;

use clap::Parser;
use snipvault::cli::Cli;
use snipvault::config::{Config, LOG_ENV};
use tracing::error;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let config = match cli.load_config() {
        Ok(config) => config,
        Err(err) => {
            init_tracing(&Config::default());
            error!("{err:?}");
            exit(1);
        }
    };
    init_tracing(&config);

    if let Err(err) = cli.run(&config) {
        error!("{err:?}");
        exit(1);
    }

    Ok(())
}

/// `SNIPVAULT_LOG` wins over the configured level.
fn init_tracing(config: &Config) {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr);
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry().with(layer).with(filter).init();
}
