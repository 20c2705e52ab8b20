//! Event pump worker
//!
//! One dedicated thread per session owns every `process_events` call.
//! The thread sleeps on the notify channel, drains the backend while it
//! keeps reporting immediately-pending work (zero retry interval), then
//! goes back to sleep. Stop is cooperative: it is honored between drain
//! cycles, never in the middle of one.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crossbeam::channel::{bounded, Receiver, RecvTimeoutError, Sender};

use crate::backend::StreamingBackend;
use crate::error::{SessionError, SessionResult};
use crate::notify::Wakeup;
use crate::state::SharedSessionState;

/// Handle to a session's pump worker thread
///
/// Owns the join handle and the shutdown handshake. When dropped with
/// the thread still attached, requests stop and waits for it.
pub(crate) struct PumpThread {
    handle: Option<thread::JoinHandle<()>>,
    done_rx: Receiver<()>,
    shared: Arc<SharedSessionState>,
}

impl PumpThread {
    /// Spawn the pump worker for a connected session.
    pub(crate) fn spawn<B: StreamingBackend>(
        backend: Arc<Mutex<B>>,
        shared: Arc<SharedSessionState>,
    ) -> SessionResult<Self> {
        let (done_tx, done_rx) = bounded(1);
        let loop_shared = Arc::clone(&shared);

        let handle = thread::Builder::new()
            .name("session-pump".to_string())
            .spawn(move || pump_loop(backend, loop_shared, done_tx))?;

        Ok(Self {
            handle: Some(handle),
            done_rx,
            shared,
        })
    }

    /// Stop the worker: request cooperative stop, wait up to `timeout`
    /// for confirmation.
    ///
    /// On timeout the thread is detached. It finishes its current drain
    /// cycle on its own, observes the stop flag and exits; it just no
    /// longer has anyone waiting on it.
    pub(crate) fn stop(&mut self, timeout: Duration) -> SessionResult<()> {
        self.shared.notify.request_stop();

        let handle = match self.handle.take() {
            Some(handle) => handle,
            None => return Ok(()),
        };

        match self.done_rx.recv_timeout(timeout) {
            Ok(()) => {
                if handle.join().is_err() {
                    log::error!("Pump worker panicked during shutdown");
                }
                Ok(())
            }
            Err(RecvTimeoutError::Disconnected) => {
                // Worker exited without confirming: it panicked. Reap it.
                if handle.join().is_err() {
                    log::error!("Pump worker panicked");
                }
                Ok(())
            }
            Err(RecvTimeoutError::Timeout) => {
                log::warn!(
                    "Pump worker still draining after {:?}; detaching thread",
                    timeout
                );
                Err(SessionError::ShutdownStalled { timeout })
            }
        }
    }
}

impl Drop for PumpThread {
    fn drop(&mut self) {
        self.shared.notify.request_stop();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Worker body: sleep on the notify channel, drain, repeat.
fn pump_loop<B: StreamingBackend>(
    backend: Arc<Mutex<B>>,
    shared: Arc<SharedSessionState>,
    done_tx: Sender<()>,
) {
    log::info!("Pump worker started");

    loop {
        match shared.notify.wait_and_consume() {
            Wakeup::Stop => break,
            Wakeup::Work => drain(&backend),
        }
    }

    log::info!("Pump worker stopped");
    let _ = done_tx.send(());
}

/// One drain cycle: pump until the backend stops asking for immediate
/// re-entry.
///
/// The session mutex is taken per pump call, not across the whole
/// cycle, so facade calls can interleave with a long drain.
fn drain<B: StreamingBackend>(backend: &Arc<Mutex<B>>) {
    loop {
        let next = {
            let mut session = match backend.lock() {
                Ok(session) => session,
                Err(_) => {
                    log::error!("Session lock poisoned; abandoning drain cycle");
                    return;
                }
            };
            session.process_events()
        };

        match next {
            Ok(interval) if interval.is_zero() => continue,
            Ok(_) => return,
            Err(error) => {
                log::warn!("Event pump error: {}", error.source);
                if error.retry_after.is_zero() {
                    continue;
                }
                return;
            }
        }
    }
}
