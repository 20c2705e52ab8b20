//! Session lifecycle and host facade
//!
//! `Session` owns one connected backend, the mutex that serializes
//! every native call, the shared callback state and the pump worker.
//! All methods are callable from any host thread; queries take the
//! session mutex only for the duration of the native call.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::backend::{ConnectionState, ReloginStatus, StreamingBackend};
use crate::config::SessionConfig;
use crate::error::{SessionError, SessionResult};
use crate::events::EventRouter;
use crate::search;
use crate::state::SharedSessionState;
use crate::worker::PumpThread;

/// How long `shutdown` waits for the worker before detaching it.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Credentials for a login request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Explicit username and password. The request always asks the
    /// backend to remember the credentials for a later
    /// [`Credentials::Remembered`] login.
    Password {
        username: String,
        password: String,
        /// Reusable login token issued by the service, when one is held.
        blob: Option<String>,
    },
    /// Credentials stored by an earlier remember-me login.
    Remembered,
}

/// What a login call achieved.
///
/// Completion of a requested login arrives later as a logged-in event;
/// this value only reports whether a request was issued at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    /// The backend accepted the login request.
    Requested,
    /// No stored credentials exist, nothing was requested. Not an
    /// error: the host falls back to a password login.
    NoStoredCredentials,
}

/// Live half of a session: gone after shutdown.
struct Running<B: StreamingBackend> {
    backend: Arc<Mutex<B>>,
    worker: PumpThread,
}

/// A connected session and its worker.
///
/// Dropping a session that was never shut down runs the shutdown path,
/// including the bounded worker join.
pub struct Session<B: StreamingBackend> {
    shared: Arc<SharedSessionState>,
    running: Mutex<Option<Running<B>>>,
}

impl<B: StreamingBackend> Session<B> {
    /// Create the native session and start its pump worker.
    ///
    /// On success the session immediately attempts a stored-credential
    /// relogin; when none are stored that is logged and the host logs
    /// in explicitly. Creation failure is returned, never fatal to the
    /// process.
    pub fn initialize(config: SessionConfig, mut backend: B) -> SessionResult<Self> {
        let shared = Arc::new(SharedSessionState::new());
        let events = EventRouter::new(Arc::clone(&shared));

        backend
            .connect(&config, events)
            .map_err(SessionError::CreateFailed)?;
        log::info!("Session created (user agent '{}')", config.user_agent);

        let backend = Arc::new(Mutex::new(backend));
        let worker = PumpThread::spawn(Arc::clone(&backend), Arc::clone(&shared))?;

        let session = Self {
            shared,
            running: Mutex::new(Some(Running { backend, worker })),
        };

        if let Err(error) = session.login(&Credentials::Remembered) {
            log::warn!("Initial login attempt failed: {}", error);
        }

        Ok(session)
    }

    /// Request a login.
    ///
    /// Asynchronous: success or failure arrives later as a logged-in
    /// event and is reflected by `connection_state` / `logged_in_at`.
    pub fn login(&self, credentials: &Credentials) -> SessionResult<LoginOutcome> {
        let backend = self.backend_handle("login")?;
        let mut backend = backend
            .lock()
            .map_err(|_| SessionError::StatePoisoned("login"))?;

        match credentials {
            Credentials::Password {
                username,
                password,
                blob,
            } => {
                log::info!("Trying to login as {}", username);
                backend.login(username, password, true, blob.as_deref());
                Ok(LoginOutcome::Requested)
            }
            Credentials::Remembered => match backend.relogin() {
                ReloginStatus::NoStoredCredentials => {
                    log::info!("No stored credentials; password login required");
                    Ok(LoginOutcome::NoStoredCredentials)
                }
                ReloginStatus::Attempted => {
                    match backend.remembered_user() {
                        Some(user) => log::info!("Trying to relogin as {}", user),
                        None => log::info!("Trying to relogin with stored credentials"),
                    }
                    Ok(LoginOutcome::Requested)
                }
            },
        }
    }

    /// Current connection state; `Undefined` after shutdown or when the
    /// backend cannot be asked.
    pub fn connection_state(&self) -> ConnectionState {
        let backend = match self.backend_handle("connection_state") {
            Ok(backend) => backend,
            Err(_) => return ConnectionState::Undefined,
        };
        let backend = match backend.lock() {
            Ok(backend) => backend,
            Err(_) => {
                log::warn!("Session lock poisoned during connection state query");
                return ConnectionState::Undefined;
            }
        };
        backend.connection_state()
    }

    /// Stable text form of [`connection_state`](Self::connection_state).
    pub fn connection_state_text(&self) -> &'static str {
        self.connection_state().as_str()
    }

    /// Whether a successful login has been recorded. Lock-free.
    pub fn is_logged_in(&self) -> bool {
        self.shared.is_logged_in()
    }

    /// Wall-clock time of the last successful login. Lock-free.
    pub fn logged_in_at(&self) -> Option<DateTime<Utc>> {
        self.shared.logged_in_at()
    }

    /// Search the catalog for artists matching `query`.
    ///
    /// Returns `None` without touching the backend when the query is
    /// empty, no login has completed, or the session is shut down; a
    /// search that runs but matches nothing returns `Some` of an empty
    /// vector. At most [`ARTIST_SEARCH_LIMIT`](crate::ARTIST_SEARCH_LIMIT)
    /// names come back.
    pub fn search_artists(&self, query: &str) -> Option<Vec<String>> {
        if query.is_empty() {
            log::debug!("Rejecting artist search: empty query");
            return None;
        }
        if !self.shared.is_logged_in() {
            log::debug!("Rejecting artist search: not logged in");
            return None;
        }

        let backend = self.backend_handle("search").ok()?;
        let mut backend = match backend.lock() {
            Ok(backend) => backend,
            Err(_) => {
                log::warn!("Session lock poisoned during artist search");
                return None;
            }
        };

        search::collect_artists(&mut *backend, query)
    }

    /// Shut the session down with the default worker join bound.
    pub fn shutdown(&self) -> SessionResult<()> {
        self.shutdown_with_timeout(SHUTDOWN_TIMEOUT)
    }

    /// Shut the session down.
    ///
    /// Stops the pump worker cooperatively, waits up to `timeout` for
    /// it, then releases the native session. A stalled worker is
    /// detached and reported as `ShutdownStalled`; the native session
    /// is then torn down once the detached worker exits. Calling
    /// shutdown again returns `AlreadyShutDown`.
    pub fn shutdown_with_timeout(&self, timeout: Duration) -> SessionResult<()> {
        let running = self
            .running
            .lock()
            .map_err(|_| SessionError::StatePoisoned("shutdown"))?
            .take();

        let mut running = running.ok_or(SessionError::AlreadyShutDown)?;
        let stop_result = running.worker.stop(timeout);

        // Last strong reference unless the worker is still detached;
        // dropping it tears the native session down.
        drop(running.backend);

        log::info!("Session shut down");
        stop_result
    }

    /// Clone the backend handle out of the running state.
    fn backend_handle(&self, op: &'static str) -> SessionResult<Arc<Mutex<B>>> {
        let running = self
            .running
            .lock()
            .map_err(|_| SessionError::StatePoisoned(op))?;
        running
            .as_ref()
            .map(|running| Arc::clone(&running.backend))
            .ok_or(SessionError::AlreadyShutDown)
    }
}

impl<B: StreamingBackend> Drop for Session<B> {
    fn drop(&mut self) {
        match self.shutdown() {
            Ok(()) | Err(SessionError::AlreadyShutDown) => {}
            Err(error) => log::warn!("Shutdown during drop failed: {}", error),
        }
    }
}
