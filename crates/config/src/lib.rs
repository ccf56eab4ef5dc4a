//! Layered configuration for the ProgressDB process: built-in defaults,
//! optionally overridden by a TOML file, optionally overridden again by
//! `PROGRESSDB_*` environment variables — the same "file first, restart to
//! apply" model the teacher workspace uses for its own `strata.toml`, with
//! an environment layer added on top for container deployments.
//!
//! CLI flag parsing, TLS, and auth middleware configuration are out of
//! scope; this crate only has to exist as the seam those collaborators
//! would plug into.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use progressdb_security::EncryptionPolicy;

pub use error::{ConfigError, Result};

/// Config file name a deployment would place alongside its data directory.
pub const CONFIG_FILE_NAME: &str = "progressdb.toml";

/// How log lines are formatted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable, one line per event.
    Compact,
    /// One JSON object per event, for log aggregators.
    Json,
}

impl Default for LogFormat {
    fn default() -> Self {
        LogFormat::Compact
    }
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("expected \"compact\" or \"json\", got \"{other}\"")),
        }
    }
}

/// Full process configuration, after merging defaults, file, and
/// environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory backing `storedb` (threads, current message bodies).
    #[serde(default = "default_store_dir")]
    pub store_dir: PathBuf,
    /// Directory backing `indexdb` (versions, relationships, markers).
    #[serde(default = "default_index_dir")]
    pub index_dir: PathBuf,
    /// Capacity of the bounded ingest queue.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Number of ingest workers draining the queue.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    /// How long a read blocks waiting for a provisional key to resolve.
    #[serde(default = "default_resolve_timeout_ms")]
    pub resolve_timeout_ms: u64,
    /// UNIX socket path the KMS process is listening on.
    #[serde(default = "default_kms_socket_path")]
    pub kms_socket_path: PathBuf,
    /// How message bodies are encrypted at rest.
    #[serde(default)]
    pub encryption: EncryptionPolicy,
    /// Five-field cron expression for the retention sweep.
    #[serde(default = "default_retention_cron")]
    pub retention_cron: String,
    /// How long a soft-deleted entity survives before the sweep purges it.
    #[serde(default = "default_retention_period_secs")]
    pub retention_period_secs: u64,
    /// Address the HTTP edge binds to.
    #[serde(default = "default_http_bind_addr")]
    pub http_bind_addr: String,
    /// Log line format.
    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_store_dir() -> PathBuf {
    PathBuf::from("./data/storedb")
}

fn default_index_dir() -> PathBuf {
    PathBuf::from("./data/indexdb")
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_worker_count() -> usize {
    4
}

fn default_resolve_timeout_ms() -> u64 {
    5_000
}

fn default_kms_socket_path() -> PathBuf {
    PathBuf::from(progressdb_wire_socket_default())
}

// Kept as a free function rather than a dependency on `progressdb-wire` (a
// much heavier crate) purely for this one constant; duplicated literal,
// not duplicated logic.
fn progressdb_wire_socket_default() -> &'static str {
    "/tmp/progressdb-kms.sock"
}

fn default_retention_cron() -> String {
    "0 3 * * *".to_string()
}

fn default_retention_period_secs() -> u64 {
    30 * 24 * 60 * 60
}

fn default_http_bind_addr() -> String {
    "127.0.0.1:8080".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_dir: default_store_dir(),
            index_dir: default_index_dir(),
            queue_capacity: default_queue_capacity(),
            worker_count: default_worker_count(),
            resolve_timeout_ms: default_resolve_timeout_ms(),
            kms_socket_path: default_kms_socket_path(),
            encryption: EncryptionPolicy::default(),
            retention_cron: default_retention_cron(),
            retention_period_secs: default_retention_period_secs(),
            http_bind_addr: default_http_bind_addr(),
            log_format: LogFormat::default(),
        }
    }
}

impl Config {
    /// Built-in defaults, no file or environment layer applied.
    pub fn defaults() -> Self {
        Self::default()
    }

    /// Parse a TOML file into a complete `Config`; fields absent from the
    /// file fall back to built-in defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    /// Load the layered configuration: defaults, then `path` if given and
    /// present on disk, then `PROGRESSDB_*` environment variables,
    /// validated at the end.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) if path.exists() => Self::from_file(path)?,
            _ => Self::defaults(),
        };
        config.merge_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `PROGRESSDB_*` environment variable overrides in place.
    pub fn merge_env(&mut self) -> Result<()> {
        if let Some(v) = env_var("PROGRESSDB_STORE_DIR") {
            self.store_dir = PathBuf::from(v);
        }
        if let Some(v) = env_var("PROGRESSDB_INDEX_DIR") {
            self.index_dir = PathBuf::from(v);
        }
        if let Some(v) = env_var("PROGRESSDB_QUEUE_CAPACITY") {
            self.queue_capacity = parse_env("PROGRESSDB_QUEUE_CAPACITY", &v)?;
        }
        if let Some(v) = env_var("PROGRESSDB_WORKER_COUNT") {
            self.worker_count = parse_env("PROGRESSDB_WORKER_COUNT", &v)?;
        }
        if let Some(v) = env_var("PROGRESSDB_RESOLVE_TIMEOUT_MS") {
            self.resolve_timeout_ms = parse_env("PROGRESSDB_RESOLVE_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = env_var("PROGRESSDB_KMS_SOCKET_PATH") {
            self.kms_socket_path = PathBuf::from(v);
        }
        if let Some(v) = env_var("PROGRESSDB_ENCRYPTION_MODE") {
            let fields = env_var("PROGRESSDB_ENCRYPTION_FIELDS")
                .map(|raw| raw.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect::<Vec<_>>())
                .unwrap_or_default();
            self.encryption = match v.as_str() {
                "disabled" => EncryptionPolicy::Disabled,
                "whole_body" => EncryptionPolicy::WholeBody,
                "field_policy" => EncryptionPolicy::FieldPolicy { fields },
                other => {
                    return Err(ConfigError::InvalidEnv {
                        name: "PROGRESSDB_ENCRYPTION_MODE".into(),
                        value: other.into(),
                        reason: "expected \"disabled\", \"whole_body\", or \"field_policy\"".into(),
                    })
                }
            };
        }
        if let Some(v) = env_var("PROGRESSDB_RETENTION_CRON") {
            self.retention_cron = v;
        }
        if let Some(v) = env_var("PROGRESSDB_RETENTION_PERIOD_SECS") {
            self.retention_period_secs = parse_env("PROGRESSDB_RETENTION_PERIOD_SECS", &v)?;
        }
        if let Some(v) = env_var("PROGRESSDB_HTTP_BIND_ADDR") {
            self.http_bind_addr = v;
        }
        if let Some(v) = env_var("PROGRESSDB_LOG_FORMAT") {
            self.log_format = v.parse().map_err(|reason| ConfigError::InvalidEnv { name: "PROGRESSDB_LOG_FORMAT".into(), value: v.clone(), reason })?;
        }
        Ok(())
    }

    /// Reject values that parsed syntactically but are not operationally
    /// sane, mirroring the teacher's eager `durability_mode()` validation
    /// in `StrataConfig::from_file`.
    pub fn validate(&self) -> Result<()> {
        if self.worker_count == 0 {
            return Err(ConfigError::Invalid("worker_count must be at least 1".into()));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::Invalid("queue_capacity must be at least 1".into()));
        }
        if self.retention_cron.split_whitespace().count() != 5 {
            return Err(ConfigError::Invalid(format!("retention_cron must have exactly 5 fields, got \"{}\"", self.retention_cron)));
        }
        if self.http_bind_addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::Invalid(format!("http_bind_addr \"{}\" is not a valid socket address", self.http_bind_addr)));
        }
        if let EncryptionPolicy::FieldPolicy { fields } = &self.encryption {
            if fields.is_empty() {
                return Err(ConfigError::Invalid("field_policy encryption requires at least one field path".into()));
            }
        }
        Ok(())
    }

    /// Serialize this config to TOML text, e.g. to write a default file
    /// an operator can then edit in place.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(format!("failed to serialize config: {e}")))
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| ConfigError::InvalidEnv { name: name.into(), value: value.into(), reason: "not a valid number".into() })
}

#[cfg(test)]
mod tests {
    use super::*;

    // `std::env::set_var` mutates process-global state; serialize the
    // tests that touch it so they don't race under the parallel test
    // runner.
    static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

    #[test]
    fn defaults_validate() {
        Config::defaults().validate().unwrap();
    }

    #[test]
    fn from_file_with_partial_fields_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "worker_count = 16\n").unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.worker_count, 16);
        assert_eq!(config.queue_capacity, default_queue_capacity());
    }

    #[test]
    fn rejects_zero_workers() {
        let mut config = Config::defaults();
        config.worker_count = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_malformed_cron() {
        let mut config = Config::defaults();
        config.retention_cron = "not a cron".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_invalid_bind_addr() {
        let mut config = Config::defaults();
        config.http_bind_addr = "not-an-address".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_empty_field_policy() {
        let mut config = Config::defaults();
        config.encryption = EncryptionPolicy::FieldPolicy { fields: vec![] };
        assert!(config.validate().is_err());
    }

    #[test]
    fn env_overrides_file() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("PROGRESSDB_WORKER_COUNT", "9");
        let mut config = Config::defaults();
        config.merge_env().unwrap();
        std::env::remove_var("PROGRESSDB_WORKER_COUNT");
        assert_eq!(config.worker_count, 9);
    }

    #[test]
    fn env_rejects_unparseable_number() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("PROGRESSDB_QUEUE_CAPACITY", "not-a-number");
        let mut config = Config::defaults();
        let result = config.merge_env();
        std::env::remove_var("PROGRESSDB_QUEUE_CAPACITY");
        assert!(result.is_err());
    }

    #[test]
    fn round_trip_toml() {
        let config = Config::defaults();
        let text = config.to_toml().unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.worker_count, config.worker_count);
    }
}
