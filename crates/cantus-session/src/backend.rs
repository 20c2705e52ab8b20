//! Backend trait for the native streaming client library
//!
//! Defines the seam between the session layer and the native library:
//! - Session layer calls in: create, login, pump, search
//! - Native library calls out: events dispatched through an `EventRouter`
//!
//! The session layer serializes every inbound call behind one mutex, so
//! implementations never observe overlapping calls.

use std::time::Duration;

use thiserror::Error;

use crate::config::SessionConfig;
use crate::events::EventRouter;

/// Error reported by the native backend.
///
/// The native error space is opaque to this layer; only the rendered
/// message crosses the seam.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct BackendError {
    message: String,
}

impl BackendError {
    /// Wrap a backend-rendered error message.
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }

    /// The backend's rendered message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Failure of a single event-pump call.
///
/// Pump failures are never fatal to the session; the worker logs them
/// and honors `retry_after` like the interval of a successful call.
#[derive(Debug, Clone, Error)]
#[error("event pump failed: {source}")]
pub struct PumpError {
    /// Underlying backend failure.
    #[source]
    pub source: BackendError,
    /// Interval to wait before the next pump call; zero keeps draining.
    pub retry_after: Duration,
}

/// Connection state of the native session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No user is logged in.
    LoggedOut,
    /// Logged in against the service.
    LoggedIn,
    /// Was logged in, connection currently lost.
    Disconnected,
    /// Logged in but running in offline mode.
    Offline,
    /// State unknown to the backend (startup, teardown).
    Undefined,
}

impl ConnectionState {
    /// Stable lowercase label for logs and host display.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::LoggedOut => "logged out",
            ConnectionState::LoggedIn => "logged in",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Offline => "offline",
            ConnectionState::Undefined => "undefined",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of asking the backend for a stored-credential login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloginStatus {
    /// A relogin request was issued; completion arrives as a login event.
    Attempted,
    /// Nothing is stored in the settings location.
    NoStoredCredentials,
}

/// Slice of results requested for one catalog category.
///
/// A zero count excludes the category from the search entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResultWindow {
    /// Index of the first result requested.
    pub offset: u32,
    /// Maximum number of results requested.
    pub count: u32,
}

impl ResultWindow {
    /// Window covering the first `count` results.
    pub fn first(count: u32) -> Self {
        Self { offset: 0, count }
    }
}

/// Parameters of one catalog search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Free-text query.
    pub query: String,
    /// Track results requested.
    pub tracks: ResultWindow,
    /// Album results requested.
    pub albums: ResultWindow,
    /// Artist results requested.
    pub artists: ResultWindow,
    /// Playlist results requested.
    pub playlists: ResultWindow,
}

impl SearchRequest {
    /// Request artist results only; every other category is excluded.
    pub fn artists_only(query: &str, window: ResultWindow) -> Self {
        Self {
            query: query.to_string(),
            tracks: ResultWindow::default(),
            albums: ResultWindow::default(),
            artists: window,
            playlists: ResultWindow::default(),
        }
    }
}

/// Search flavor understood by the native catalog.
///
/// Mirrors the native create-search argument. The session layer always
/// requests [`SearchKind::Standard`]; `Suggest` is here so backend
/// implementations can map the seam onto the full native enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    /// Ordinary ranked catalog search.
    Standard,
    /// Typeahead suggestion search.
    Suggest,
}

/// Opaque identifier of a search result object held by the backend.
///
/// Valid from `create_search` until the matching `release_search`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SearchToken(pub u64);

/// Interface to the native streaming client library.
///
/// One value wraps one native session. After a successful `connect`,
/// every method is called with the session mutex held, so
/// implementations never see two calls at once; `process_events` is
/// additionally only ever called by the dedicated pump worker.
///
/// Events flow the other way: implementations keep the [`EventRouter`]
/// handed to `connect` and dispatch session events through it from
/// whatever internal threads the native library uses.
///
/// Teardown is `Drop`: dropping a connected backend must log out and
/// free the native session.
pub trait StreamingBackend: Send + 'static {
    /// Create the native session.
    ///
    /// Called exactly once, before any other method. Failure aborts
    /// session initialization.
    fn connect(&mut self, config: &SessionConfig, events: EventRouter) -> Result<(), BackendError>;

    /// Request an asynchronous login with explicit credentials.
    ///
    /// Completion (success or failure) arrives later as a logged-in
    /// event. `remember_me` asks the backend to store the credentials
    /// for a later `relogin`.
    fn login(&mut self, username: &str, password: &str, remember_me: bool, blob: Option<&str>);

    /// Request an asynchronous login with stored credentials.
    fn relogin(&mut self) -> ReloginStatus;

    /// Username whose credentials are currently stored, if any.
    fn remembered_user(&self) -> Option<String>;

    /// Current connection state of the native session.
    fn connection_state(&self) -> ConnectionState;

    /// Run one iteration of the native event pump.
    ///
    /// Returns the interval the backend wants before the next pump
    /// call; zero means more work is pending and the caller should pump
    /// again immediately. Errors must leave the session usable.
    fn process_events(&mut self) -> Result<Duration, PumpError>;

    /// Start a catalog search and acquire the result object.
    ///
    /// The returned token stays valid until passed to `release_search`,
    /// which must happen exactly once.
    fn create_search(
        &mut self,
        request: &SearchRequest,
        kind: SearchKind,
    ) -> Result<SearchToken, BackendError>;

    /// Number of artist results held by a search object.
    fn search_artist_count(&self, search: SearchToken) -> usize;

    /// Display name of one artist result, copied out of the backend.
    ///
    /// Returns `None` for an out-of-range index.
    fn search_artist_name(&self, search: SearchToken, index: usize) -> Option<String>;

    /// Release a search object acquired by `create_search`.
    fn release_search(&mut self, search: SearchToken);
}
