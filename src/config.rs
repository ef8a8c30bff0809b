//! Environment-derived configuration.
//!
//! ccache passes everything through `CRSH_*` environment variables:
//!
//! - `CRSH_IPC_ENDPOINT`: socket path (Unix) or pipe name (Windows).
//! - `CRSH_URL`: storage base URL.
//! - `CRSH_IDLE_TIMEOUT`: whole seconds of inactivity before the helper
//!   shuts itself down; `0` (the default) disables the timer.
//! - `CRSH_LOGFILE`: optional log file path.
//! - `CRSH_NUM_ATTR` with `CRSH_ATTR_KEY_<i>` / `CRSH_ATTR_VALUE_<i>`:
//!   backend attributes (`layout`, `bearer-token`, `header`).
//!
//! # Design Decisions
//! - Config is immutable once loaded and shared read-only by all
//!   connections; there is no reload path.
//! - Only a missing/unparseable URL and non-numeric numbers are fatal;
//!   malformed attributes are skipped, matching what ccache tolerates.

use std::num::ParseIntError;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::storage::Layout;

/// Errors that make startup configuration unusable.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("CRSH_URL not set")]
    MissingUrl,

    #[error("invalid CRSH_URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("invalid CRSH_IDLE_TIMEOUT: {0}")]
    InvalidIdleTimeout(ParseIntError),

    #[error("invalid CRSH_NUM_ATTR: {0}")]
    InvalidAttrCount(ParseIntError),
}

/// Immutable helper configuration, created once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Optional log file; stderr is used when absent.
    pub log_file: Option<PathBuf>,

    /// IPC endpoint address. On Windows this is the full pipe path
    /// (`\\.\pipe\<name>`).
    pub ipc_endpoint: String,

    /// Storage base URL.
    pub url: Url,

    /// Idle shutdown timeout; zero disables the idle timer.
    pub idle_timeout: Duration,

    /// Key-to-path layout scheme.
    pub layout: Layout,

    /// Optional bearer token sent as `Authorization: Bearer <token>`.
    pub bearer_token: Option<String>,

    /// Extra HTTP headers in configuration order. Applied after the
    /// defaults, so they can override e.g. the PUT content type.
    pub headers: Vec<(String, String)>,
}

impl Config {
    /// Load configuration from the `CRSH_*` environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw_endpoint = env_var("CRSH_IPC_ENDPOINT").unwrap_or_default();
        let ipc_endpoint = if cfg!(windows) {
            format!(r"\\.\pipe\{raw_endpoint}")
        } else {
            raw_endpoint
        };

        let url: Url = env_var("CRSH_URL")
            .ok_or(ConfigError::MissingUrl)?
            .parse()?;

        let idle_secs: u64 = env_var("CRSH_IDLE_TIMEOUT")
            .unwrap_or_else(|| "0".to_string())
            .parse()
            .map_err(ConfigError::InvalidIdleTimeout)?;

        let mut config = Config {
            log_file: env_var("CRSH_LOGFILE").map(PathBuf::from),
            ipc_endpoint,
            url,
            idle_timeout: Duration::from_secs(idle_secs),
            layout: Layout::default(),
            bearer_token: None,
            headers: Vec::new(),
        };

        let attr_count: usize = env_var("CRSH_NUM_ATTR")
            .unwrap_or_else(|| "0".to_string())
            .parse()
            .map_err(ConfigError::InvalidAttrCount)?;

        for i in 0..attr_count {
            let Some(key) = env_var(&format!("CRSH_ATTR_KEY_{i}")) else {
                continue;
            };
            let value = env_var(&format!("CRSH_ATTR_VALUE_{i}")).unwrap_or_default();
            config.apply_attribute(&key, &value);
        }

        Ok(config)
    }

    fn apply_attribute(&mut self, key: &str, value: &str) {
        match key {
            "layout" => self.layout = Layout::from_name(value),
            "bearer-token" => self.bearer_token = Some(value.to_string()),
            "header" => {
                // "Name=Value"; entries without '=' or with an empty name
                // are skipped.
                match value.split_once('=') {
                    Some((name, header_value)) if !name.is_empty() => {
                        self.headers
                            .push((name.to_string(), header_value.to_string()));
                    }
                    _ => {
                        tracing::warn!(attribute = value, "ignoring malformed header attribute");
                    }
                }
            }
            other => {
                tracing::warn!(attribute = other, "ignoring unknown attribute");
            }
        }
    }
}

/// Read an environment variable, treating empty values as unset.
fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
