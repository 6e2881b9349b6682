//! Profile management commands

use super::{open_store, prompt_yes_no};
use colored::Colorize;
use ovpnctl_core::error::{CoreError, SessionError, StoreError};
use std::fs;
use std::path::Path;

/// Import an .ovpn file, validate it, and make it the active profile
pub fn run_import(path: &Path) -> Result<(), CoreError> {
    let text = fs::read_to_string(path)?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("profile.ovpn");

    let profile = ovpnctl_core::profile::parse(name, &text)?;

    let display = profile.display_name().to_string();
    let remote = format!(
        "{}:{} ({})",
        profile.server_address, profile.port, profile.protocol
    );
    let requires_auth = profile.requires_auth;

    let store = open_store()?;
    store.save(profile)?;

    println!("{} Imported {}", "✓".green(), display.bold());
    println!("  remote {}", remote);
    if requires_auth {
        println!(
            "  {}",
            "This profile expects username/password - run `ovpnctl credentials`.".yellow()
        );
    }

    Ok(())
}

/// List stored profiles, marking the active one
pub fn run_list() -> Result<(), CoreError> {
    let store = open_store()?;
    let mut configs = store.list_all();

    if configs.is_empty() {
        println!("No profiles stored. Import one with `ovpnctl import <file.ovpn>`.");
        return Ok(());
    }

    let active = store.get_active().map(|c| c.name().to_string());
    configs.sort_by(|a, b| a.name().cmp(b.name()));

    for config in configs {
        let marker = if Some(config.name()) == active.as_deref() {
            "*".green().to_string()
        } else {
            " ".to_string()
        };
        println!(
            "{} {}  {}:{} ({})",
            marker,
            config.profile.display_name().bold(),
            config.profile.server_address,
            config.profile.port,
            config.profile.protocol
        );
    }

    Ok(())
}

/// Show the active profile in detail
pub fn run_show() -> Result<(), CoreError> {
    let store = open_store()?;
    let config = store
        .get_active()
        .ok_or(CoreError::Session(SessionError::NoActiveProfile))?;

    let profile = &config.profile;
    println!("{}", profile.display_name().bold());
    println!("  remote     {}:{}", profile.server_address, profile.port);
    println!("  proto      {}", profile.protocol);
    println!("  dev        {}", profile.device_type);
    if let Some(cipher) = &profile.cipher {
        println!("  cipher     {}", cipher);
    }
    if let Some(digest) = &profile.auth_digest {
        println!("  auth       {}", digest);
    }

    let mut materials: Vec<&str> = Vec::new();
    if profile.ca.is_some() {
        materials.push("ca");
    }
    if profile.cert.is_some() {
        materials.push("cert");
    }
    if profile.key.is_some() {
        materials.push("key");
    }
    if profile.tls_auth.is_some() {
        materials.push("tls-auth");
    }
    if !materials.is_empty() {
        println!("  embedded   {}", materials.join(", "));
    }

    if profile.requires_auth {
        match &config.credentials {
            Some(credentials) => println!("  login      {} (password stored)", credentials.username),
            None => println!("  login      {}", "not configured".yellow()),
        }
    }
    println!("  imported   {}", profile.imported_at.format("%Y-%m-%d %H:%M UTC"));

    Ok(())
}

/// Make a stored profile the active one
pub fn run_use(name: &str) -> Result<(), CoreError> {
    let store = open_store()?;

    // accept both the display name and the stored name
    let stored_name = if store.set_active(name)? {
        name.to_string()
    } else {
        let with_suffix = format!("{}.ovpn", name);
        if store.set_active(&with_suffix)? {
            with_suffix
        } else {
            return Err(CoreError::Store(StoreError::UnknownProfile {
                name: name.to_string(),
            }));
        }
    };

    println!("{} Active profile is now {}", "✓".green(), stored_name.bold());
    Ok(())
}

/// Delete the active profile after confirmation
pub fn run_delete() -> Result<(), CoreError> {
    let store = open_store()?;
    let Some(config) = store.get_active() else {
        println!("No active profile to delete.");
        return Ok(());
    };

    let prompt = format!("Delete profile {}?", config.profile.display_name());
    if !prompt_yes_no(&prompt)? {
        println!("Delete cancelled.");
        return Ok(());
    }

    store.delete_active()?;
    println!("{} Deleted {}", "✓".green(), config.profile.display_name());
    Ok(())
}

/// Write the active profile's original text to a file
pub fn run_export(path: Option<&Path>) -> Result<(), CoreError> {
    let store = open_store()?;
    let config = store
        .get_active()
        .ok_or(CoreError::Session(SessionError::NoActiveProfile))?;

    let default_name = format!("{}.ovpn", config.profile.display_name());
    let destination = path
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| default_name.into());

    fs::write(&destination, &config.profile.raw_content)?;
    println!(
        "{} Exported {} to {}",
        "✓".green(),
        config.profile.display_name().bold(),
        destination.display()
    );
    Ok(())
}
