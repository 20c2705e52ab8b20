//! Session events and their dispatch
//!
//! The native library reports everything through a small closed set of
//! events. An [`EventRouter`] is handed to the backend at connect time;
//! the backend dispatches events through it from whatever internal
//! threads the native runtime uses.
//!
//! Dispatch is deliberately cheap and independent of the session mutex:
//! it only touches the notify channel, the atomic login timestamp and
//! the log facade, so a callback can never deadlock against a native
//! call in progress.

use std::sync::Arc;

use crate::backend::BackendError;
use crate::state::SharedSessionState;

/// Event delivered by the native backend.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Diagnostic line produced inside the native runtime.
    LogMessage(String),
    /// Internal work is queued; the pump worker must run.
    NotifyPendingWork,
    /// A login attempt completed.
    LoggedIn(Result<(), BackendError>),
    /// The user was logged out.
    LoggedOut,
    /// A connection-level problem occurred; the backend retries on its
    /// own, nothing is torn down.
    ConnectionError(BackendError),
}

/// Routes session events into the shared state and the log facade.
///
/// Clones share one session's state; the backend keeps a clone for its
/// callback machinery.
#[derive(Clone)]
pub struct EventRouter {
    shared: Arc<SharedSessionState>,
}

impl EventRouter {
    pub(crate) fn new(shared: Arc<SharedSessionState>) -> Self {
        Self { shared }
    }

    /// Deliver one event.
    ///
    /// Never blocks beyond the notify flag update and never calls back
    /// into the native library.
    pub fn dispatch(&self, event: SessionEvent) {
        match event {
            SessionEvent::LogMessage(message) => {
                log::info!("backend: {}", message.trim_end());
            }
            SessionEvent::NotifyPendingWork => {
                self.shared.notify.signal();
            }
            SessionEvent::LoggedIn(Ok(())) => {
                let at = self.shared.mark_logged_in();
                log::info!("Logged in successfully at {}", at);
            }
            SessionEvent::LoggedIn(Err(error)) => {
                log::warn!("Login failed: {}", error);
            }
            SessionEvent::LoggedOut => {
                self.shared.mark_logged_out();
                log::info!("Logged out");
            }
            SessionEvent::ConnectionError(error) => {
                log::warn!("Connection error: {}", error);
            }
        }
    }
}
