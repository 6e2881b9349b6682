//! ovpnctl - OpenVPN client profile manager
//!
//! A command-line adapter over the ovpnctl-core library: imports `.ovpn`
//! profiles into the encrypted per-installation store, switches the
//! active profile, attaches credentials, and edits client settings.

use clap::{Parser, Subcommand};
use ovpnctl_core::{error::CoreError, init_logging};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "ovpnctl")]
#[command(about = "OpenVPN client profile manager with encrypted storage")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import an .ovpn profile and make it the active one
    Import {
        /// Path to the .ovpn file
        path: PathBuf,
    },
    /// List stored profiles
    List,
    /// Show the active profile
    Show,
    /// Make a stored profile the active one
    Use {
        /// Profile name as shown by `list`
        name: String,
    },
    /// Delete the active profile
    Delete,
    /// Write the active profile's original text to a file
    Export {
        /// Destination path; defaults to <name>.ovpn in the current directory
        path: Option<PathBuf>,
    },
    /// Attach username/password credentials to the active profile
    Credentials,
    /// Inspect or change client settings
    Settings {
        #[command(subcommand)]
        action: SettingsCommands,
    },
}

#[derive(Subcommand)]
enum SettingsCommands {
    /// Print all settings
    Show,
    /// Set a setting: auto-connect, use-biometric, kill-switch, auto-start
    Set {
        key: String,
        /// "on" or "off"
        value: String,
    },
}

fn main() {
    // Initialize logging
    if let Err(e) = init_logging() {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(2);
    }

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Import { path } => cli::profiles::run_import(&path),
        Commands::List => cli::profiles::run_list(),
        Commands::Show => cli::profiles::run_show(),
        Commands::Use { name } => cli::profiles::run_use(&name),
        Commands::Delete => cli::profiles::run_delete(),
        Commands::Export { path } => cli::profiles::run_export(path.as_deref()),
        Commands::Credentials => cli::credentials::run_credentials(),
        Commands::Settings { action } => match action {
            SettingsCommands::Show => cli::settings::run_show(),
            SettingsCommands::Set { key, value } => cli::settings::run_set(&key, &value),
        },
    };

    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            let exit_code = match e {
                // Bad profile text or bad user input (exit code 2)
                CoreError::Parse(_) => 2,
                // Runtime failures (exit code 1)
                CoreError::Store(_) => 1,
                CoreError::Session(_) => 1,
                CoreError::Auth(_) => 1,
                CoreError::Io(_) => 1,
            };

            eprintln!("{}", e);
            std::process::exit(exit_code);
        }
    }
}
