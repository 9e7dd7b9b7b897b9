//! Configuration management CLI commands.
//!
//! Provides `config init`, `config show`, and `config path` commands for
//! creating and inspecting the configuration file.

use clap::Subcommand;
use vayumap::config::{config_file_path, ConfigFile};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Create the configuration file with default settings
    Init,

    /// Show the effective configuration
    Show,

    /// Show the configuration file path
    Path,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init => run_init(),
        ConfigCommands::Show => run_show(),
        ConfigCommands::Path => run_path(),
    }
}

/// Create the configuration file if it doesn't exist.
fn run_init() -> Result<(), CliError> {
    let path = ConfigFile::ensure_exists()?;
    println!("Configuration file: {}", path.display());
    println!();
    println!("Edit this file to customize map defaults, the imagery proxy");
    println!("and the geocoder endpoint.");
    Ok(())
}

/// Print the effective configuration (file values over defaults).
fn run_show() -> Result<(), CliError> {
    let config = ConfigFile::load()?;
    print!("{}", config.to_config_string());
    Ok(())
}

/// Print the configuration file path.
fn run_path() -> Result<(), CliError> {
    println!("{}", config_file_path().display());
    Ok(())
}
