//! Session configuration
//!
//! Static values the native session is created with, plus the standard
//! on-disk locations for its cache and settings stores.

use std::path::PathBuf;

/// Get the default cache directory for session data
///
/// Returns: `~/.cache/cantus` (platform equivalent via `dirs`)
///
/// The backend keeps its content cache here; safe to delete between runs.
pub fn default_cache_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cantus")
}

/// Get the default settings directory for session data
///
/// Returns: `~/.config/cantus` (platform equivalent via `dirs`)
///
/// Stored credentials for relogin live under this directory, so it must
/// persist between runs.
pub fn default_settings_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cantus")
}

/// Static configuration for native session creation.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Directory for the backend's on-disk cache.
    pub cache_location: PathBuf,
    /// Directory for backend settings, including stored credentials.
    pub settings_location: PathBuf,
    /// Application key bytes issued for this client build.
    pub application_key: Vec<u8>,
    /// User agent string reported to the service.
    pub user_agent: String,
}

impl SessionConfig {
    /// Create a configuration using the default cache and settings locations.
    pub fn new(application_key: Vec<u8>, user_agent: &str) -> Self {
        Self {
            cache_location: default_cache_path(),
            settings_location: default_settings_path(),
            application_key,
            user_agent: user_agent.to_string(),
        }
    }
}
