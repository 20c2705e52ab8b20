//! Wake-up channel between native callbacks and the pump worker
//!
//! The native library signals pending work from arbitrary callback
//! contexts; the pump worker sleeps until signalled. A dedicated
//! mutex/condvar pair carries the handoff:
//! - `signal` sets a pending flag and wakes the worker
//! - `wait_and_consume` blocks until the flag (or stop) is set
//!
//! The flag is checked under the mutex before every wait, so a signal
//! that lands before the worker starts waiting is never lost, and
//! repeated signals coalesce into a single wakeup.

use std::sync::{Condvar, Mutex};

/// Reason `wait_and_consume` returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wakeup {
    /// Pending work was signalled; the flag has been consumed.
    Work,
    /// Stop was requested; the channel stays stopped.
    Stop,
}

#[derive(Debug, Default)]
struct Flags {
    pending: bool,
    stopped: bool,
}

/// Condvar-backed wake-up channel with a coalescing pending flag.
///
/// The mutex here guards only the two flags. It is never held across a
/// native call, so signalling from a callback cannot deadlock against
/// the session mutex.
#[derive(Debug, Default)]
pub struct NotifyChannel {
    flags: Mutex<Flags>,
    wakeup: Condvar,
}

impl NotifyChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark work pending and wake the worker.
    ///
    /// Callable from any thread, including native callback contexts;
    /// blocks only for the flag update itself.
    pub fn signal(&self) {
        match self.flags.lock() {
            Ok(mut flags) => {
                flags.pending = true;
                self.wakeup.notify_one();
            }
            Err(_) => log::warn!("Notify lock poisoned; dropping work signal"),
        }
    }

    /// Ask the worker to stop at its next idle check.
    ///
    /// Sticky: every later wait returns `Wakeup::Stop` immediately.
    pub fn request_stop(&self) {
        match self.flags.lock() {
            Ok(mut flags) => {
                flags.stopped = true;
                self.wakeup.notify_all();
            }
            Err(_) => log::warn!("Notify lock poisoned; stop request dropped"),
        }
    }

    /// Block until work is signalled or stop is requested.
    ///
    /// Consumes the pending flag on wakeup. Stop takes precedence over
    /// pending work. Spurious condvar wakeups re-check the flags and go
    /// back to sleep.
    pub fn wait_and_consume(&self) -> Wakeup {
        let mut flags = match self.flags.lock() {
            Ok(flags) => flags,
            Err(_) => {
                log::error!("Notify lock poisoned; stopping worker");
                return Wakeup::Stop;
            }
        };

        loop {
            if flags.stopped {
                return Wakeup::Stop;
            }
            if flags.pending {
                flags.pending = false;
                return Wakeup::Work;
            }
            flags = match self.wakeup.wait(flags) {
                Ok(flags) => flags,
                Err(_) => {
                    log::error!("Notify lock poisoned; stopping worker");
                    return Wakeup::Stop;
                }
            };
        }
    }
}
