use std::net::SocketAddr;
use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Clinic Desk";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable overriding the database file.
pub const ENV_DB_PATH: &str = "CLINIC_DB_PATH";
/// Environment variable overriding the listen address.
pub const ENV_BIND_ADDR: &str = "CLINIC_BIND_ADDR";

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:7878";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid {var} value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Get the application data directory.
///
/// Platform data dir (`~/.local/share`, `~/Library/Application Support`,
/// `%APPDATA%`), falling back to the home directory, then the working
/// directory.
pub fn app_data_dir() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ClinicDesk")
}

pub fn default_db_path() -> PathBuf {
    app_data_dir().join("clinic.db")
}

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "clinic_lib=info,clinic_desk=info,tower_http=warn"
}

/// Runtime settings for the HTTP server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub db_path: PathBuf,
    pub bind_addr: SocketAddr,
}

impl ServerConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup (tests pass a closure over a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_path = lookup(ENV_DB_PATH)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_db_path);

        let raw_addr = lookup(ENV_BIND_ADDR)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = raw_addr
            .trim()
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                var: ENV_BIND_ADDR,
                value: raw_addr.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self { db_path, bind_addr })
    }
}
