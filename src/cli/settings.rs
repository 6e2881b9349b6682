//! Client settings commands

use super::open_store;
use colored::Colorize;
use ovpnctl_core::error::CoreError;

const KEYS: &str = "auto-connect, use-biometric, kill-switch, auto-start";

fn format_flag(value: bool) -> String {
    if value {
        "on".green().to_string()
    } else {
        "off".to_string()
    }
}

/// Print all settings
pub fn run_show() -> Result<(), CoreError> {
    let store = open_store()?;
    let settings = store.settings();

    println!("auto-connect   {}", format_flag(settings.auto_connect));
    println!("use-biometric  {}", format_flag(settings.use_biometric));
    println!("kill-switch    {}", format_flag(settings.kill_switch));
    println!("auto-start     {}", format_flag(settings.auto_start));

    Ok(())
}

/// Set one boolean setting
pub fn run_set(key: &str, value: &str) -> Result<(), CoreError> {
    let enabled = match value.to_ascii_lowercase().as_str() {
        "on" | "true" | "1" => true,
        "off" | "false" | "0" => false,
        other => {
            eprintln!("Unknown value '{}': expected on or off.", other);
            std::process::exit(2);
        }
    };

    let store = open_store()?;
    match key {
        "auto-connect" => store.update_settings(|s| s.auto_connect = enabled)?,
        "use-biometric" => store.update_settings(|s| s.use_biometric = enabled)?,
        "kill-switch" => store.update_settings(|s| s.kill_switch = enabled)?,
        "auto-start" => store.update_settings(|s| s.auto_start = enabled)?,
        other => {
            eprintln!("Unknown setting '{}': expected one of {}.", other, KEYS);
            std::process::exit(2);
        }
    };

    println!("{} {} is now {}", "✓".green(), key, format_flag(enabled));
    Ok(())
}
