//! CLI command implementations
//!
//! Shared plumbing: data directory resolution, store bootstrap, and the
//! interactive prompt helpers.

pub mod credentials;
pub mod profiles;
pub mod settings;

use ovpnctl_core::error::CoreError;
use ovpnctl_core::keys::{default_machine_id, DerivedKey};
use ovpnctl_core::store::{FileBackend, SecureConfigStore};
use std::io::{self, Write};
use std::path::PathBuf;

/// Resolve the data directory
///
/// `OVPNCTL_DATA_DIR` overrides (used by tests and portable installs);
/// otherwise `$HOME/.config/ovpnctl`.
pub fn data_dir() -> Result<PathBuf, CoreError> {
    if let Ok(dir) = std::env::var("OVPNCTL_DATA_DIR") {
        return Ok(PathBuf::from(dir));
    }

    let home = std::env::var("HOME").map_err(|_| {
        CoreError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            "HOME environment variable not set",
        ))
    })?;

    Ok(PathBuf::from(home).join(".config").join("ovpnctl"))
}

/// Open the encrypted profile store for this installation
pub fn open_store() -> Result<SecureConfigStore, CoreError> {
    let dir = data_dir()?;
    tracing::debug!(dir = %dir.display(), "opening profile store");
    let machine_id = default_machine_id();
    if machine_id.is_none() {
        eprintln!("Warning: no stable machine identifier found; profiles saved now will not survive a restart.");
    }
    let key = DerivedKey::derive(machine_id.as_deref(), &dir);
    let backend = FileBackend::new(&dir)?;
    Ok(SecureConfigStore::open(Box::new(backend), key)?)
}

/// Prompt for a required value
pub fn prompt_required(prompt: &str) -> Result<String, CoreError> {
    loop {
        let input = prompt_input(&format!("{}: ", prompt))?;

        if input.trim().is_empty() {
            println!("This field is required. Please enter a value.");
            continue;
        }

        return Ok(input.trim().to_string());
    }
}

/// Prompt for yes/no with default no
pub fn prompt_yes_no(prompt: &str) -> Result<bool, CoreError> {
    loop {
        let input = prompt_input(&format!("{} [y/N]: ", prompt))?.to_lowercase();

        match input.as_str() {
            "y" | "yes" => return Ok(true),
            "n" | "no" | "" => return Ok(false),
            _ => {
                println!("Please enter 'y' for yes or 'n' for no.");
                continue;
            }
        }
    }
}

/// Low-level input prompting
fn prompt_input(prompt: &str) -> Result<String, CoreError> {
    print!("{}", prompt);
    io::stdout().flush().map_err(CoreError::Io)?;

    let mut input = String::new();
    io::stdin().read_line(&mut input).map_err(CoreError::Io)?;

    Ok(input.trim_end().to_string())
}
