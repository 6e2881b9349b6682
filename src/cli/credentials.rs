//! Attach credentials to the active profile

use super::{open_store, prompt_required};
use colored::Colorize;
use ovpnctl_core::error::{CoreError, SessionError};
use ovpnctl_core::types::Credentials;

/// Collect username/password and write them into the active profile
pub fn run_credentials() -> Result<(), CoreError> {
    let store = open_store()?;
    let Some(mut config) = store.get_active() else {
        return Err(CoreError::Session(SessionError::NoActiveProfile));
    };

    println!(
        "Attaching credentials to {}",
        config.profile.display_name().bold()
    );
    println!("They are stored encrypted under this installation's key.");
    println!();

    let username = prompt_required("Username")?;
    let password = prompt_required("Password")?;

    config.credentials = Some(Credentials::new(username, password));
    store.update_active(config)?;

    println!("{} Credentials stored.", "✓".green());
    Ok(())
}
