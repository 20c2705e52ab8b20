//! Session management for the Cantus streaming backend
//!
//! Bridges a callback-driven native client library and synchronous,
//! thread-safe host access:
//!
//! - **Session mutex**: one mutex serializes every native call, from
//!   host threads and the pump worker alike
//! - **Pump worker**: a dedicated thread owns the native event pump,
//!   woken through a condvar notify channel that never loses a signal
//!   and coalesces bursts into one wakeup
//! - **Event routing**: login, logout, connection trouble and native
//!   log lines arrive as [`SessionEvent`]s and land in shared state and
//!   the `log` facade
//! - **Artist search**: scoped ownership of the native search result,
//!   released on every path out
//!
//! Hosts build a [`SessionConfig`], provide a [`StreamingBackend`] and
//! drive everything through [`Session`]. The crate never installs a
//! logger; bring your own `log` implementation.

pub mod backend;
pub mod config;
pub mod error;
pub mod events;
mod notify;
mod search;
mod session;
mod state;
#[cfg(test)]
pub(crate) mod testing;
mod worker;

pub use backend::{
    BackendError, ConnectionState, PumpError, ReloginStatus, ResultWindow, SearchKind,
    SearchRequest, SearchToken, StreamingBackend,
};
pub use config::{default_cache_path, default_settings_path, SessionConfig};
pub use error::{SessionError, SessionResult};
pub use events::{EventRouter, SessionEvent};
pub use search::ARTIST_SEARCH_LIMIT;
pub use session::{Credentials, LoginOutcome, Session, SHUTDOWN_TIMEOUT};
