//! Errors produced while loading or validating configuration.

use std::path::PathBuf;

use thiserror::Error;

/// Failure modes for [`crate::Config::load`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file '{path}': {source}")]
    Read {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The config file's contents could not be parsed as TOML.
    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        /// Path whose contents failed to parse.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },
    /// An environment variable held a value of the wrong type.
    #[error("environment variable '{name}' has an invalid value '{value}': {reason}")]
    InvalidEnv {
        /// Variable name, e.g. `PROGRESSDB_WORKER_COUNT`.
        name: String,
        /// The value that failed to parse.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
    /// A field failed validation after all layers were merged.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ConfigError>;
