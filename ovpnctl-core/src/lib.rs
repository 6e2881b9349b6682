//! Core library for the ovpnctl VPN client
//!
//! This crate provides OpenVPN profile ingestion, per-installation
//! encrypted configuration storage, the connection session lifecycle,
//! and the background token refresh policy. UI layers, the native tunnel
//! engine, and the authentication backend sit behind the trait seams in
//! [`session`] and [`auth`].

pub mod auth;
pub mod error;
pub mod keys;
pub mod profile;
pub mod session;
pub mod store;
pub mod types;

/// Initialize logging infrastructure
///
/// Sets up tracing with systemd journal logging for production use.
/// In development, logs to stderr with appropriate formatting.
pub fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    // Try to use systemd journal logging if available
    #[cfg(target_os = "linux")]
    {
        if std::env::var("JOURNAL_STREAM").is_ok() {
            // We're running under systemd, use journal logging
            let journal_layer = tracing_journald::layer()?;
            tracing_subscriber::registry()
                .with(journal_layer)
                .with(tracing_subscriber::filter::LevelFilter::INFO)
                .init();
            return Ok(());
        }
    }

    // Fallback to stderr logging with pretty formatting
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().pretty())
        .with(tracing_subscriber::filter::LevelFilter::INFO)
        .init();

    Ok(())
}
