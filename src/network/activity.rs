//! Session activity tracking and idle shutdown
//!
//! The active-session count and the time of the last accepted connection
//! live behind one mutex. Workers touch them only through `SessionGuard`.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{self, RecvTimeoutError, Sender};
use parking_lot::Mutex;

use super::ShutdownHandle;

/// Floor on the watchdog's check period
pub const MIN_IDLE_CHECK: Duration = Duration::from_millis(10);

#[derive(Debug)]
struct ActivityState {
    /// Sessions currently running
    active: usize,

    /// When the most recent connection was accepted
    last_accept: Instant,
}

/// Shared count of live sessions
#[derive(Debug)]
pub struct ActivityTracker {
    state: Mutex<ActivityState>,
}

impl ActivityTracker {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ActivityState {
                active: 0,
                last_accept: Instant::now(),
            }),
        }
    }

    /// Record an accepted connection; the guard ends the session on drop
    pub fn begin_session(self: &Arc<Self>) -> SessionGuard {
        {
            let mut state = self.state.lock();
            state.active += 1;
            state.last_accept = Instant::now();
        }

        SessionGuard {
            tracker: Arc::clone(self),
        }
    }

    /// Number of sessions currently running
    pub fn active_sessions(&self) -> usize {
        self.state.lock().active
    }

    /// Time since the last accept, or `None` while any session is active
    pub fn idle_for(&self) -> Option<Duration> {
        let state = self.state.lock();
        (state.active == 0).then(|| state.last_accept.elapsed())
    }

    /// No active sessions and no accept for at least `threshold`
    pub fn is_idle(&self, threshold: Duration) -> bool {
        self.idle_for().is_some_and(|idle| idle >= threshold)
    }

    fn end_session(&self) {
        let mut state = self.state.lock();
        state.active = state.active.saturating_sub(1);
    }
}

impl Default for ActivityTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Marks one running session; decrements the count when dropped
#[derive(Debug)]
pub struct SessionGuard {
    tracker: Arc<ActivityTracker>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.tracker.end_session();
    }
}

/// Background thread that requests shutdown once the server is idle
pub struct IdleWatchdog {
    stop: Sender<()>,
    handle: JoinHandle<()>,
    check_every: Duration,
}

impl IdleWatchdog {
    /// Check `tracker` every `check_every`; trigger `shutdown` after
    /// `threshold` without sessions
    ///
    /// `check_every` is raised to `MIN_IDLE_CHECK` if smaller.
    pub fn spawn(
        tracker: Arc<ActivityTracker>,
        threshold: Duration,
        check_every: Duration,
        shutdown: ShutdownHandle,
    ) -> std::io::Result<Self> {
        let (stop, stop_rx) = channel::bounded::<()>(1);
        let check_every = check_every.max(MIN_IDLE_CHECK);

        let handle = thread::Builder::new()
            .name("idle-watchdog".to_string())
            .spawn(move || loop {
                match stop_rx.recv_timeout(check_every) {
                    Err(RecvTimeoutError::Timeout) => {
                        if tracker.is_idle(threshold) {
                            tracing::info!("No active sessions for {:?}, shutting down", threshold);
                            shutdown.shutdown();
                            return;
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
                }
            })?;

        Ok(Self {
            stop,
            handle,
            check_every,
        })
    }

    /// Stop the watchdog and wait for its thread
    pub fn stop(self) {
        let _ = self.stop.try_send(());
        if self.handle.join().is_err() {
            tracing::warn!("Idle watchdog thread panicked");
        }
    }

    /// Effective period between checks
    pub fn check_period(&self) -> Duration {
        self.check_every
    }
}
