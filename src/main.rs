//! Refern Takeout - export every board and collection from a refern.app account.
//!
//! Authenticates to the refern private API with a user-supplied token,
//! walks the account's folder hierarchy, saves each board as a JSON file
//! and each collection as a zipped export bundle, mirroring the remote
//! folder structure on disk.

mod application;
mod cli;
mod domain;
mod infrastructure;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::Cli;
use infrastructure::{load_token, RefernApi};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    setup_logging(cli.debug);

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// Main application logic.
async fn run(cli: Cli) -> domain::Result<()> {
    let token = load_token(cli.token_file.as_deref())?;
    let api = RefernApi::new(&token)?;
    let options = cli.takeout_options();

    application::run_takeout(&api, &cli.username, &options).await
}

/// Setup tracing/logging; `--debug` enables verbose diagnostics.
fn setup_logging(debug: bool) {
    let filter = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}
