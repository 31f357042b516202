//! Runtime configuration for the engine's collaborators.

use std::path::PathBuf;
use std::time::Duration;

/// Default backend base URL.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// Configuration consumed by the CLI when wiring up a session.
///
/// Library callers construct collaborators directly; this struct only
/// centralizes the environment lookups.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the ingest/ask backend.
    pub backend_url: String,
    /// Per-request timeout for backend calls.
    pub request_timeout: Duration,
    /// Override for the trial store location; the platform data directory
    /// is used when unset.
    pub trial_store_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            request_timeout: Duration::from_secs(60),
            trial_store_path: None,
        }
    }
}

impl Config {
    /// Reads configuration from the environment, falling back to
    /// defaults: `GLANCE_BACKEND_URL`, `GLANCE_TIMEOUT_SECS`,
    /// `GLANCE_TRIAL_STORE`.
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            backend_url: std::env::var("GLANCE_BACKEND_URL").unwrap_or(default.backend_url),
            request_timeout: std::env::var("GLANCE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(default.request_timeout),
            trial_store_path: std::env::var("GLANCE_TRIAL_STORE").ok().map(PathBuf::from),
        }
    }
}
