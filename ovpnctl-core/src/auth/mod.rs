//! Authentication collaborator seam and the token refresh policy
//!
//! The actual token exchange (HTTP, storage of the token itself) lives
//! behind [`AuthProvider`]; this module only decides when to call it.

pub mod refresh;

pub use refresh::{backoff_delay, RefreshHandle, RefreshScheduler};

use crate::error::AuthError;
use async_trait::async_trait;

/// Backend that owns the actual token exchange
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Whether a user is currently signed in
    async fn is_authenticated(&self) -> bool;

    /// Exchange the current token for a fresh one
    async fn refresh_token(&self) -> Result<(), AuthError>;
}
