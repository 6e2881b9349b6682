//! Connection lifecycle state machine
//!
//! The session never blocks on the native engine. It drives the engine
//! through [`VpnEngine`], reacts to the engine's notifications through
//! [`ConnectionSession::handle_event`], and applies every transition
//! under one lock so no two transitions overlap. Observers see each
//! transition and stats update in order.

pub mod stats;

pub use stats::SessionStats;

use crate::error::SessionError;
use crate::store::{SecureConfigStore, StoredConfig};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, info};

/// VPN connection states
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected
    #[default]
    Disconnected,

    /// Attempting to establish the tunnel
    Connecting,

    /// Tunnel is up
    Connected,

    /// Tearing the tunnel down
    Disconnecting,

    /// Connection failed with an engine-reported reason
    Error(String),
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Disconnecting => write!(f, "disconnecting"),
            ConnectionState::Error(msg) => write!(f, "error: {}", msg),
        }
    }
}

/// Native tunnel engine seam
///
/// The engine owns the TUN device and the OpenVPN protocol; the session
/// only starts it, stops it, and listens.
pub trait VpnEngine: Send + Sync {
    fn start_tunnel(&self, config: &StoredConfig) -> Result<(), SessionError>;
    fn stop_tunnel(&self);
}

/// Notifications the engine delivers back to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TunnelEvent {
    /// Tunnel came up
    Established,
    /// Establishment failed
    Failure { reason: String },
    /// Established tunnel was lost without a disconnect request
    Dropped { reason: String },
    /// Requested teardown finished
    Teardown,
    /// Periodic traffic counters
    Stats {
        bytes_in: u64,
        bytes_out: u64,
        duration_seconds: u32,
    },
}

/// Observer for state and stats changes
///
/// Callbacks run on the thread applying the transition, while the
/// session lock is held: delivery is in transition order, and a callback
/// must not call back into the session.
pub trait SessionObserver: Send + Sync {
    fn state_changed(&self, state: &ConnectionState);
    fn stats_updated(&self, stats: &SessionStats);
}

struct SessionInner {
    state: ConnectionState,
    stats: SessionStats,
    observers: Vec<Arc<dyn SessionObserver>>,
}

/// Connection session over one store and one engine
pub struct ConnectionSession {
    store: Arc<SecureConfigStore>,
    engine: Arc<dyn VpnEngine>,
    inner: Mutex<SessionInner>,
    state_tx: watch::Sender<ConnectionState>,
}

impl ConnectionSession {
    pub fn new(store: Arc<SecureConfigStore>, engine: Arc<dyn VpnEngine>) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            store,
            engine,
            inner: Mutex::new(SessionInner {
                state: ConnectionState::Disconnected,
                stats: SessionStats::default(),
                observers: Vec::new(),
            }),
            state_tx,
        }
    }

    /// Register an observer for state and stats changes
    pub fn subscribe(&self, observer: Arc<dyn SessionObserver>) {
        self.inner.lock().unwrap().observers.push(observer);
    }

    /// Coalescing async mirror of the state
    ///
    /// A receiver may skip intermediate states under load; the observer
    /// callbacks are the ordered delivery path.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.lock().unwrap().state.clone()
    }

    pub fn stats(&self) -> SessionStats {
        self.inner.lock().unwrap().stats
    }

    /// Begin connecting with the active stored profile
    ///
    /// Requires an active profile and a session that is disconnected or
    /// in the error state (user-initiated retry). The active profile is
    /// read as a single snapshot before any state changes.
    pub fn connect(&self) -> Result<(), SessionError> {
        let config = self
            .store
            .get_active()
            .ok_or(SessionError::NoActiveProfile)?;

        {
            let mut inner = self.inner.lock().unwrap();
            match inner.state {
                ConnectionState::Disconnected | ConnectionState::Error(_) => {}
                ref other => {
                    return Err(SessionError::InvalidTransition {
                        state: other.to_string(),
                    });
                }
            }
            inner.stats = SessionStats::default();
            Self::apply_state(&mut inner, &self.state_tx, ConnectionState::Connecting);
        }

        // Engine call happens outside the lock: an engine that signals
        // failure synchronously re-enters handle_event.
        info!(profile = %config.profile.display_name(), "starting tunnel");
        if let Err(e) = self.engine.start_tunnel(&config) {
            let mut inner = self.inner.lock().unwrap();
            if inner.state == ConnectionState::Connecting {
                Self::apply_state(
                    &mut inner,
                    &self.state_tx,
                    ConnectionState::Error(e.to_string()),
                );
            }
            return Err(e);
        }
        Ok(())
    }

    /// Ask the engine to tear the tunnel down
    pub fn disconnect(&self) -> Result<(), SessionError> {
        {
            let mut inner = self.inner.lock().unwrap();
            if inner.state != ConnectionState::Connected {
                return Err(SessionError::InvalidTransition {
                    state: inner.state.to_string(),
                });
            }
            Self::apply_state(&mut inner, &self.state_tx, ConnectionState::Disconnecting);
        }
        self.engine.stop_tunnel();
        Ok(())
    }

    /// Force the machine back to Disconnected from any state
    ///
    /// Recovery hatch for an unknown engine state, e.g. after an app
    /// restart.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.state != ConnectionState::Disconnected {
            Self::apply_state(&mut inner, &self.state_tx, ConnectionState::Disconnected);
        }
    }

    /// Report a traffic tick; only meaningful while connected
    pub fn update_stats(&self, bytes_in: u64, bytes_out: u64, duration_seconds: u32) {
        self.handle_event(TunnelEvent::Stats {
            bytes_in,
            bytes_out,
            duration_seconds,
        });
    }

    /// Apply one engine notification
    ///
    /// Notifications that don't fit the current state (an engine racing a
    /// user action, or a late callback) are logged and dropped rather
    /// than corrupting the machine.
    pub fn handle_event(&self, event: TunnelEvent) {
        let mut inner = self.inner.lock().unwrap();
        match (inner.state.clone(), event) {
            (ConnectionState::Connecting, TunnelEvent::Established) => {
                inner.stats = SessionStats::default();
                Self::apply_state(&mut inner, &self.state_tx, ConnectionState::Connected);
            }
            (ConnectionState::Connecting, TunnelEvent::Failure { reason }) => {
                Self::apply_state(&mut inner, &self.state_tx, ConnectionState::Error(reason));
            }
            (ConnectionState::Connected, TunnelEvent::Dropped { reason }) => {
                Self::apply_state(&mut inner, &self.state_tx, ConnectionState::Error(reason));
            }
            (ConnectionState::Disconnecting, TunnelEvent::Teardown) => {
                Self::apply_state(&mut inner, &self.state_tx, ConnectionState::Disconnected);
            }
            (
                ConnectionState::Connected,
                TunnelEvent::Stats {
                    bytes_in,
                    bytes_out,
                    duration_seconds,
                },
            ) => {
                inner.stats.apply_tick(bytes_in, bytes_out, duration_seconds);
                let stats = inner.stats;
                for observer in &inner.observers {
                    observer.stats_updated(&stats);
                }
            }
            (state, event) => {
                debug!(%state, ?event, "ignoring tunnel event in current state");
            }
        }
    }

    fn apply_state(
        inner: &mut SessionInner,
        state_tx: &watch::Sender<ConnectionState>,
        next: ConnectionState,
    ) {
        debug!(from = %inner.state, to = %next, "connection state transition");
        inner.state = next.clone();
        // send only fails with no receivers, which is fine
        let _ = state_tx.send(next.clone());
        for observer in &inner.observers {
            observer.state_changed(&next);
        }
    }
}
