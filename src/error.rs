//! Configuration errors.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("route id cannot be empty")]
    EmptyId,

    #[error("route path cannot be empty for id: {0}")]
    EmptyPath(String),

    #[error("duplicate route id: {0}")]
    DuplicateId(String),

    #[error("invalid path pattern '{pattern}' for route {id}: {source}")]
    InvalidPattern {
        id: String,
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("deprecation arguments '{args}' have {count} positions, expected at most 3 (date,docUrl,sunset)")]
    TooManyArguments { args: String, count: usize },
}
