use std::path::PathBuf;

use acton_query::config::Config;
use acton_query::observability::init_tracing;
use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tokio_util::sync::CancellationToken;

mod commands;
mod utils;

use commands::products::ProductsArgs;
use commands::Outcome;

/// acton-query - Filter product listings and print category trees
#[derive(Parser)]
#[command(name = "acton-query")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Read configuration from this file instead of the search path
    #[arg(
        short,
        long,
        global = true,
        value_name = "FILE",
        env = "ACTON_QUERY_CONFIG"
    )]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the category tree under a root
    Tree {
        /// Categories JSON file
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Root category ID
        #[arg(short, long)]
        root: u64,

        /// Print JSON instead of a drawing
        #[arg(long)]
        json: bool,
    },
    /// List products matching filters, one page at a time
    Products(ProductsArgs),
    /// Print the effective configuration as TOML
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            std::process::exit(utils::EXIT_UNEXPECTED);
        }
    };

    // Tracing failures only cost us log output
    if let Err(e) = init_tracing(&config) {
        utils::warning(&e.to_string());
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, cancelling");
            on_interrupt.cancel();
        }
    });

    let json = match cli.command {
        Commands::Tree { json, .. } => json,
        Commands::Products(ref args) => args.json,
        Commands::Config => false,
    };
    let settings = config.query.settings();
    let result = match cli.command {
        Commands::Tree { input, root, json } => {
            commands::tree::execute(&input, root, json, &settings, &cancel).await
        }
        Commands::Products(args) => commands::products::execute(args, &settings, &cancel).await,
        Commands::Config => commands::config::execute(&config),
    };

    match result {
        Ok(Outcome::Done) => std::process::exit(utils::EXIT_OK),
        Ok(Outcome::NotFound(message)) => {
            utils::error(&message);
            std::process::exit(utils::EXIT_NOT_FOUND);
        }
        Err(e) => std::process::exit(utils::report(&e, json)),
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Config::load_for_app("acton-query").context("Failed to load configuration"),
    }
}
