//! Shared session state between native callbacks, pump worker and facade
//!
//! Native callback contexts write the login timestamp and signal the
//! notify channel; the facade reads both without touching the session
//! mutex. All parties reference this via `Arc<SharedSessionState>`.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};

use crate::notify::NotifyChannel;

/// Sentinel stored in the login timestamp while logged out.
const LOGIN_NEVER: i64 = -1;

/// State shared between native callbacks, the pump worker and the facade
pub struct SharedSessionState {
    /// Wake-up channel for the pump worker.
    pub notify: NotifyChannel,
    /// Unix seconds of the last successful login; `LOGIN_NEVER` while
    /// logged out. Atomic so callback contexts write it without locking.
    login_at: AtomicI64,
}

impl SharedSessionState {
    pub fn new() -> Self {
        Self {
            notify: NotifyChannel::new(),
            login_at: AtomicI64::new(LOGIN_NEVER),
        }
    }

    /// Record a successful login at the current wall-clock time.
    ///
    /// Returns the recorded time for logging.
    pub fn mark_logged_in(&self) -> DateTime<Utc> {
        let now = Utc::now();
        self.login_at.store(now.timestamp(), Ordering::Relaxed);
        now
    }

    /// Reset the login timestamp to the logged-out sentinel.
    pub fn mark_logged_out(&self) {
        self.login_at.store(LOGIN_NEVER, Ordering::Relaxed);
    }

    /// Check whether a successful login has been recorded.
    ///
    /// Lock-free gate used by operations that require a login.
    pub fn is_logged_in(&self) -> bool {
        self.login_at.load(Ordering::Relaxed) != LOGIN_NEVER
    }

    /// Wall-clock time of the last successful login, if logged in.
    pub fn logged_in_at(&self) -> Option<DateTime<Utc>> {
        let seconds = self.login_at.load(Ordering::Relaxed);
        if seconds == LOGIN_NEVER {
            return None;
        }
        DateTime::from_timestamp(seconds, 0)
    }
}

impl Default for SharedSessionState {
    fn default() -> Self {
        Self::new()
    }
}
