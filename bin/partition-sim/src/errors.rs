use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InitError {
    #[error("io: {0}")]
    Io(#[from] io::Error),

    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Invalid(#[from] canon_config::ConfigError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    /// Only tables can be traversed.
    #[error("can't traverse into non-table key: {0}")]
    TraverseNonTableAt(String),

    /// Invalid override string.
    #[error("invalid override: '{0}'")]
    InvalidOverride(String),

    #[error("parse: {0}")]
    Parse(#[from] toml::de::Error),
}
