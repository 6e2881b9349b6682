//! Tests for the connection session state machine
//!
//! A recording mock stands in for the native engine; the store runs on
//! the in-memory backend.

use ovpnctl_core::error::SessionError;
use ovpnctl_core::keys::DerivedKey;
use ovpnctl_core::profile::parse;
use ovpnctl_core::session::{
    ConnectionSession, ConnectionState, SessionObserver, SessionStats, TunnelEvent, VpnEngine,
};
use ovpnctl_core::store::{MemoryBackend, SecureConfigStore, StoredConfig};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Engine double that records calls and fails on demand
struct MockEngine {
    calls: Mutex<Vec<String>>,
    fail_start: Mutex<Option<String>>,
}

impl MockEngine {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            fail_start: Mutex::new(None),
        })
    }

    fn fail_next_start(&self, reason: &str) {
        *self.fail_start.lock().unwrap() = Some(reason.to_string());
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl VpnEngine for MockEngine {
    fn start_tunnel(&self, config: &StoredConfig) -> Result<(), SessionError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("start:{}", config.name()));
        if let Some(reason) = self.fail_start.lock().unwrap().take() {
            return Err(SessionError::Tunnel { reason });
        }
        Ok(())
    }

    fn stop_tunnel(&self) {
        self.calls.lock().unwrap().push("stop".to_string());
    }
}

/// Observer double that records everything it is told
#[derive(Default)]
struct RecordingObserver {
    states: Mutex<Vec<ConnectionState>>,
    stats: Mutex<Vec<SessionStats>>,
}

impl SessionObserver for RecordingObserver {
    fn state_changed(&self, state: &ConnectionState) {
        self.states.lock().unwrap().push(state.clone());
    }

    fn stats_updated(&self, stats: &SessionStats) {
        self.stats.lock().unwrap().push(*stats);
    }
}

fn empty_store() -> Arc<SecureConfigStore> {
    let key = DerivedKey::derive(Some("test-machine"), &PathBuf::from("/tmp/ovpnctl-test"));
    Arc::new(SecureConfigStore::open(Box::new(MemoryBackend::new()), key).unwrap())
}

fn store_with_profile() -> Arc<SecureConfigStore> {
    let store = empty_store();
    let profile = parse("work.ovpn", "remote vpn.example.com 1194 udp\n").unwrap();
    store.save(profile).unwrap();
    store
}

#[test]
fn test_connect_without_active_profile_is_rejected() {
    // Given: An empty store
    let engine = MockEngine::new();
    let session = ConnectionSession::new(empty_store(), engine.clone());

    // When: Connecting
    let err = session.connect().unwrap_err();

    // Then: The request is rejected and the state is unchanged
    assert_eq!(err, SessionError::NoActiveProfile);
    assert_eq!(session.state(), ConnectionState::Disconnected);
    assert!(engine.calls().is_empty());
}

#[test]
fn test_full_connect_disconnect_lifecycle() {
    let engine = MockEngine::new();
    let session = ConnectionSession::new(store_with_profile(), engine.clone());

    session.connect().unwrap();
    assert_eq!(session.state(), ConnectionState::Connecting);

    session.handle_event(TunnelEvent::Established);
    assert_eq!(session.state(), ConnectionState::Connected);

    session.disconnect().unwrap();
    assert_eq!(session.state(), ConnectionState::Disconnecting);

    session.handle_event(TunnelEvent::Teardown);
    assert_eq!(session.state(), ConnectionState::Disconnected);

    assert_eq!(engine.calls(), vec!["start:work.ovpn", "stop"]);
}

#[test]
fn test_start_failure_moves_to_error_state() {
    let engine = MockEngine::new();
    engine.fail_next_start("tun device unavailable");
    let session = ConnectionSession::new(store_with_profile(), engine.clone());

    let err = session.connect().unwrap_err();

    assert!(matches!(err, SessionError::Tunnel { .. }));
    assert_eq!(
        session.state(),
        ConnectionState::Error("tunnel failed: tun device unavailable".to_string())
    );
}

#[test]
fn test_engine_failure_during_establishment() {
    let engine = MockEngine::new();
    let session = ConnectionSession::new(store_with_profile(), engine.clone());

    session.connect().unwrap();
    session.handle_event(TunnelEvent::Failure {
        reason: "TLS handshake timed out".to_string(),
    });

    assert_eq!(
        session.state(),
        ConnectionState::Error("TLS handshake timed out".to_string())
    );
}

#[test]
fn test_unsolicited_drop_while_connected() {
    let engine = MockEngine::new();
    let session = ConnectionSession::new(store_with_profile(), engine.clone());
    session.connect().unwrap();
    session.handle_event(TunnelEvent::Established);

    session.handle_event(TunnelEvent::Dropped {
        reason: "link down".to_string(),
    });

    assert_eq!(
        session.state(),
        ConnectionState::Error("link down".to_string())
    );
}

#[test]
fn test_retry_from_error_state_is_allowed() {
    let engine = MockEngine::new();
    let session = ConnectionSession::new(store_with_profile(), engine.clone());
    session.connect().unwrap();
    session.handle_event(TunnelEvent::Failure {
        reason: "first attempt failed".to_string(),
    });

    // user-initiated retry
    session.connect().unwrap();
    assert_eq!(session.state(), ConnectionState::Connecting);
}

#[test]
fn test_connect_while_connected_is_rejected() {
    let engine = MockEngine::new();
    let session = ConnectionSession::new(store_with_profile(), engine.clone());
    session.connect().unwrap();
    session.handle_event(TunnelEvent::Established);

    let err = session.connect().unwrap_err();
    assert!(matches!(err, SessionError::InvalidTransition { .. }));
    assert_eq!(session.state(), ConnectionState::Connected);
}

#[test]
fn test_disconnect_when_not_connected_is_rejected() {
    let engine = MockEngine::new();
    let session = ConnectionSession::new(store_with_profile(), engine.clone());

    let err = session.disconnect().unwrap_err();
    assert!(matches!(err, SessionError::InvalidTransition { .. }));
    assert!(engine.calls().is_empty());
}

#[test]
fn test_reset_forces_disconnected_from_any_state() {
    let engine = MockEngine::new();
    let session = ConnectionSession::new(store_with_profile(), engine.clone());
    session.connect().unwrap();
    session.handle_event(TunnelEvent::Established);

    session.reset();

    assert_eq!(session.state(), ConnectionState::Disconnected);
}

#[test]
fn test_stats_accumulate_monotonically_while_connected() {
    let engine = MockEngine::new();
    let session = ConnectionSession::new(store_with_profile(), engine.clone());
    session.connect().unwrap();
    session.handle_event(TunnelEvent::Established);

    session.update_stats(1_000, 400, 1);
    session.update_stats(2_500, 900, 2);
    session.update_stats(4_000, 1_500, 3);

    let stats = session.stats();
    assert_eq!(stats.bytes_in, 4_000);
    assert_eq!(stats.bytes_out, 1_500);
    assert_eq!(stats.duration_seconds, 3);
}

#[test]
fn test_shrinking_duration_resets_the_accounting_baseline() {
    let engine = MockEngine::new();
    let session = ConnectionSession::new(store_with_profile(), engine.clone());
    session.connect().unwrap();
    session.handle_event(TunnelEvent::Established);

    session.update_stats(10_000, 5_000, 60);
    // upstream counters restarted; the session starts a new epoch
    session.update_stats(100, 50, 1);

    let stats = session.stats();
    assert_eq!(stats.bytes_in, 100);
    assert_eq!(stats.bytes_out, 50);
    assert_eq!(stats.duration_seconds, 1);
}

#[test]
fn test_stats_are_zeroed_when_connecting() {
    let engine = MockEngine::new();
    let session = ConnectionSession::new(store_with_profile(), engine.clone());
    session.connect().unwrap();
    session.handle_event(TunnelEvent::Established);
    session.update_stats(10_000, 5_000, 60);
    session.handle_event(TunnelEvent::Dropped {
        reason: "link down".to_string(),
    });

    session.connect().unwrap();

    assert_eq!(session.stats(), SessionStats::default());
}

#[test]
fn test_stats_outside_connected_are_ignored() {
    let engine = MockEngine::new();
    let session = ConnectionSession::new(store_with_profile(), engine.clone());
    session.connect().unwrap();

    // still Connecting; the tick must not register
    session.update_stats(9_999, 9_999, 9);

    assert_eq!(session.stats(), SessionStats::default());
}

#[test]
fn test_observers_see_transitions_in_order() {
    let engine = MockEngine::new();
    let session = ConnectionSession::new(store_with_profile(), engine.clone());
    let observer = Arc::new(RecordingObserver::default());
    session.subscribe(observer.clone());

    session.connect().unwrap();
    session.handle_event(TunnelEvent::Established);
    session.update_stats(100, 50, 1);
    session.disconnect().unwrap();
    session.handle_event(TunnelEvent::Teardown);

    let states = observer.states.lock().unwrap().clone();
    assert_eq!(
        states,
        vec![
            ConnectionState::Connecting,
            ConnectionState::Connected,
            ConnectionState::Disconnecting,
            ConnectionState::Disconnected,
        ]
    );

    let stats = observer.stats.lock().unwrap().clone();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].bytes_in, 100);
}

#[test]
fn test_watch_channel_mirrors_the_latest_state() {
    let engine = MockEngine::new();
    let session = ConnectionSession::new(store_with_profile(), engine.clone());
    let rx = session.watch_state();

    session.connect().unwrap();
    session.handle_event(TunnelEvent::Established);

    assert_eq!(*rx.borrow(), ConnectionState::Connected);
}

#[test]
fn test_late_engine_events_are_dropped() {
    let engine = MockEngine::new();
    let session = ConnectionSession::new(store_with_profile(), engine.clone());

    // engine races ahead of any connect request
    session.handle_event(TunnelEvent::Established);
    assert_eq!(session.state(), ConnectionState::Disconnected);

    session.handle_event(TunnelEvent::Teardown);
    assert_eq!(session.state(), ConnectionState::Disconnected);
}
