//! Periodic token refresh with retry backoff
//!
//! One refresh runs at a time per scheduler: a manual trigger landing
//! while a cycle is in flight is coalesced (skipped), never queued.
//! Failures back the period off exponentially with no cap here; the
//! hosting scheduler layer enforces ceilings.

use super::AuthProvider;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Default refresh period
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(15 * 60);

/// Delay before retry `attempt` (1-indexed): base, 2x, 4x, ...
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
}

enum CycleOutcome {
    /// Token refreshed
    Refreshed,
    /// Nobody signed in; the cycle is a deliberate no-op
    NotAuthenticated,
    Failed,
}

async fn run_cycle(auth: &dyn AuthProvider) -> CycleOutcome {
    if !auth.is_authenticated().await {
        debug!("not authenticated; refresh cycle is a no-op");
        return CycleOutcome::NotAuthenticated;
    }
    match auth.refresh_token().await {
        Ok(()) => {
            info!("auth token refreshed");
            CycleOutcome::Refreshed
        }
        Err(e) => {
            warn!(error = %e, "token refresh failed");
            CycleOutcome::Failed
        }
    }
}

/// Periodic refresh driver
pub struct RefreshScheduler {
    auth: Arc<dyn AuthProvider>,
    period: Duration,
}

impl RefreshScheduler {
    pub fn new(auth: Arc<dyn AuthProvider>) -> Self {
        Self::with_period(auth, DEFAULT_PERIOD)
    }

    pub fn with_period(auth: Arc<dyn AuthProvider>, period: Duration) -> Self {
        Self { auth, period }
    }

    /// Spawn the periodic loop on the current tokio runtime
    pub fn spawn(self) -> RefreshHandle {
        let auth = self.auth;
        let period = self.period;
        let in_flight = Arc::new(Mutex::new(()));
        let cancelled = Arc::new(AtomicBool::new(false));
        let cancel_notify = Arc::new(Notify::new());

        let task = tokio::spawn(run_loop(
            Arc::clone(&auth),
            period,
            Arc::clone(&in_flight),
            Arc::clone(&cancelled),
            Arc::clone(&cancel_notify),
        ));

        RefreshHandle {
            auth,
            in_flight,
            cancelled,
            cancel_notify,
            task,
        }
    }
}

async fn run_loop(
    auth: Arc<dyn AuthProvider>,
    period: Duration,
    in_flight: Arc<Mutex<()>>,
    cancelled: Arc<AtomicBool>,
    cancel_notify: Arc<Notify>,
) {
    // consecutive failure count; zero means the plain period applies
    let mut failures: u32 = 0;

    loop {
        let delay = if failures == 0 {
            period
        } else {
            backoff_delay(period, failures)
        };

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = cancel_notify.notified() => break,
        }
        if cancelled.load(Ordering::SeqCst) {
            break;
        }

        let outcome = {
            let guard = in_flight.try_lock();
            match guard {
                Ok(_guard) => Some(run_cycle(auth.as_ref()).await),
                Err(_) => {
                    debug!("refresh already in flight; skipping periodic cycle");
                    None
                }
            }
        };

        // A cancellation that landed mid-cycle discards the outcome.
        if cancelled.load(Ordering::SeqCst) {
            break;
        }

        match outcome {
            Some(CycleOutcome::Refreshed) | Some(CycleOutcome::NotAuthenticated) => {
                failures = 0;
            }
            Some(CycleOutcome::Failed) => {
                failures += 1;
                warn!(
                    failures,
                    next_delay_secs = backoff_delay(period, failures).as_secs(),
                    "scheduling refresh retry with backoff"
                );
            }
            None => {}
        }
    }
    debug!("refresh scheduler stopped");
}

/// Handle to a spawned refresh loop
pub struct RefreshHandle {
    auth: Arc<dyn AuthProvider>,
    in_flight: Arc<Mutex<()>>,
    cancelled: Arc<AtomicBool>,
    cancel_notify: Arc<Notify>,
    task: JoinHandle<()>,
}

impl RefreshHandle {
    /// Trigger a refresh cycle immediately
    ///
    /// Returns false without doing anything when a cycle is already in
    /// flight (the trigger coalesces into it) or the scheduler has been
    /// cancelled.
    pub async fn run_now(&self) -> bool {
        if self.cancelled.load(Ordering::SeqCst) {
            return false;
        }
        let guard = match self.in_flight.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                debug!("refresh already in flight; coalescing manual trigger");
                return false;
            }
        };
        run_cycle(self.auth.as_ref()).await;
        drop(guard);
        true
    }

    /// Stop all future cycles
    ///
    /// A cycle already running finishes on its own; its outcome is
    /// discarded.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.cancel_notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Wait for the loop to wind down after [`cancel`](Self::cancel)
    pub async fn join(self) {
        let _ = self.task.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_per_failure() {
        let base = Duration::from_secs(900);
        assert_eq!(backoff_delay(base, 1), base);
        assert_eq!(backoff_delay(base, 2), base * 2);
        assert_eq!(backoff_delay(base, 3), base * 4);
        assert_eq!(backoff_delay(base, 4), base * 8);
    }

    #[test]
    fn test_backoff_saturates_instead_of_overflowing() {
        let base = Duration::from_secs(900);
        let huge = backoff_delay(base, 64);
        assert!(huge >= backoff_delay(base, 32));
    }
}
