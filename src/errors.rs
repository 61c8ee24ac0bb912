//! Typed error hierarchy for the harvest supervisor.
//!
//! Two top-level enums cover the two failure surfaces:
//! - `ConfigError` — configuration problems, fatal at startup
//! - `PublishError` — status artifact write failures, logged and swallowed

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or validating the pipeline configuration.
///
/// All of these are fatal: the supervisor refuses to start with a broken
/// or empty pipeline definition.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    ParseFailed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("No stages configured - refusing to start with an empty pipeline")]
    NoStages,

    #[error("Duplicate stage name '{name}'")]
    DuplicateStage { name: String },

    #[error("interval_secs must be greater than zero")]
    ZeroInterval,
}

/// Errors raised while writing the status artifact.
///
/// These never propagate out of the publisher: losing one status update
/// degrades observability, not the pipeline.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Failed to serialize status document: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write status file at {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to replace status file at {path}: {source}")]
    ReplaceFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
