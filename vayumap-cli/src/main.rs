//! Vayumap CLI - Command-line interface
//!
//! This binary provides a command-line interface to the Vayumap library:
//! configuration management and an offline demo of the map lifecycle.

mod commands;
mod error;

use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;
use commands::demo::DemoArgs;

#[derive(Debug, Parser)]
#[command(name = "vayumap", version, about = "Interactive air-quality map")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Run the offline map demo
    Demo(DemoArgs),
}

#[tokio::main]
async fn main() {
    vayumap::logging::init("vayumap=info");

    let cli = Cli::parse();
    tracing::debug!(?cli, "parsed arguments");

    let result = match cli.command {
        Commands::Config { command } => commands::config::run(command),
        Commands::Demo(args) => commands::demo::run(args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
