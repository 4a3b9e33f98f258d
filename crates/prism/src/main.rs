//! Prism CLI - Declarative image transformation pipeline.
//!
//! Prism reads a JSON request describing a base image and an ordered list of
//! steps (resize, add-text, composite), runs it, and writes the
//! `{ success, data | error }` response envelope.
//!
//! # Usage
//!
//! ```bash
//! # Run a pipeline request
//! prism run request.json --image-out out.jpg
//!
//! # Standalone operations, reading the request from stdin
//! cat banner.json | prism run - --op marketing
//!
//! # Check that the configured fonts load
//! prism fonts
//!
//! # View configuration
//! prism config show
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Prism - Declarative image transformation pipeline.
#[derive(Parser, Debug)]
#[command(name = "prism")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true, env = "PRISM_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a JSON transformation request
    Run(cli::run::RunArgs),

    /// Load the configured fonts and list them
    Fonts,

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings go through eprintln.
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(prism_core::Config::default_path);
    let config = match (&cli.config, config_path.exists()) {
        // An explicit file must load
        (Some(path), _) => prism_core::Config::load_from(path)?,
        (None, true) => match prism_core::Config::load_from(&config_path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!(
                    "Warning: Failed to load config: {e}\n  \
                     Using default configuration. Check your config file with `prism config path`."
                );
                prism_core::Config::default()
            }
        },
        (None, false) => prism_core::Config::default(),
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Prism v{}", prism_core::VERSION);

    match cli.command {
        Commands::Run(args) => cli::run::execute(args, config).await,
        Commands::Fonts => cli::fonts::execute(config).await,
        Commands::Config(args) => cli::config::execute(args, config, config_path).await,
    }
}
