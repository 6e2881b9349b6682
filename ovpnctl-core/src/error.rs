//! Error types for the ovpnctl core
//!
//! Every component reports failures through its own enum. All of them are
//! recoverable at the component boundary: user-visible failure is a state
//! or a result value, never a process abort.

use thiserror::Error;

/// Main error type aggregating the per-component enums
#[derive(Error, Debug)]
pub enum CoreError {
    /// Errors raised while parsing an .ovpn profile
    #[error("Profile error: {0}")]
    Parse(#[from] ParseError),

    /// Errors from the encrypted config store
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Errors from the connection session
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Errors from the authentication collaborator
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Generic I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Profile parsing errors
///
/// All of these are recoverable by re-importing a corrected profile.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("profile has no remote directive")]
    MissingRemote,

    #[error("invalid port: {value}")]
    InvalidPort { value: String },

    #[error("inline block <{tag}> has no matching close tag")]
    UnbalancedBlock { tag: String },

    #[error("malformed profile: {reason}")]
    Malformed { reason: String },
}

/// Encrypted config store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage backend error: {message}")]
    Backend { message: String },

    #[error("failed to encode store document: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to seal store document")]
    Seal,

    #[error("no stored profile named {name}")]
    UnknownProfile { name: String },
}

/// Connection session errors
///
/// Tunnel-reported failure reasons are opaque strings from the engine;
/// they surface through the `Error` state variant, not through this enum.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("no active profile configured")]
    NoActiveProfile,

    #[error("operation not valid while {state}")]
    InvalidTransition { state: String },

    #[error("tunnel failed: {reason}")]
    Tunnel { reason: String },
}

/// Token refresh errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("token refresh failed: {reason}")]
    RefreshFailed { reason: String },

    #[error("authentication backend unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, CoreError>;
