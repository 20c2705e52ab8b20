//! Error types for session operations
//!
//! Structured errors for session creation, worker lifecycle and
//! shutdown. Login and connection failures are not represented here:
//! they arrive asynchronously as session events and are surfaced
//! through the log facade.

use std::time::Duration;
use thiserror::Error;

use crate::backend::BackendError;

/// Errors that can occur during session operations
#[derive(Debug, Error)]
pub enum SessionError {
    /// Native session creation failed
    #[error("Failed to create session: {0}")]
    CreateFailed(#[source] BackendError),

    /// The event pump worker thread could not be spawned
    #[error("Failed to start session worker: {0}")]
    WorkerSpawn(#[from] std::io::Error),

    /// The session mutex was poisoned by a panicking holder
    #[error("Session state lock poisoned during {0}")]
    StatePoisoned(&'static str),

    /// Shutdown was requested on an already shut down session
    #[error("Session already shut down")]
    AlreadyShutDown,

    /// The worker did not confirm shutdown within the join bound
    ///
    /// The worker thread is left detached; it exits on its own once the
    /// current drain cycle completes and observes the stop flag.
    #[error("Session worker did not stop within {timeout:?}; thread detached")]
    ShutdownStalled { timeout: Duration },
}

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;
