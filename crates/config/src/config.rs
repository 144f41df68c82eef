use std::{fs, io, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default value for `max_reorg_depth` in [`ConsensusConfig`].
const DEFAULT_MAX_REORG_DEPTH: usize = 1000;

/// Default value for `max_orphan_blocks` in [`ConsensusConfig`].
const DEFAULT_MAX_ORPHAN_BLOCKS: usize = 256;

/// Default value for `msg_queue_size` in [`ConsensusConfig`].
const DEFAULT_MSG_QUEUE_SIZE: usize = 64;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config: {0}")]
    Io(#[from] io::Error),

    #[error("parsing config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Knobs for the chain selection core.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct ConsensusConfig {
    /// Most blocks we're willing to disconnect in a single reorg.
    #[serde(default = "default_max_reorg_depth")]
    pub max_reorg_depth: usize,

    /// Most blocks with unknown parents we hold onto at once.
    #[serde(default = "default_max_orphan_blocks")]
    pub max_orphan_blocks: usize,

    /// Capacity of the queue of blocks waiting for the fork choice worker.
    #[serde(default = "default_msg_queue_size")]
    pub msg_queue_size: usize,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            max_reorg_depth: DEFAULT_MAX_REORG_DEPTH,
            max_orphan_blocks: DEFAULT_MAX_ORPHAN_BLOCKS,
            msg_queue_size: DEFAULT_MSG_QUEUE_SIZE,
        }
    }
}

fn default_max_reorg_depth() -> usize {
    DEFAULT_MAX_REORG_DEPTH
}

fn default_max_orphan_blocks() -> usize {
    DEFAULT_MAX_ORPHAN_BLOCKS
}

fn default_msg_queue_size() -> usize {
    DEFAULT_MSG_QUEUE_SIZE
}

/// Shape of the network split the partition simulator plays out.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Total nodes, split evenly into two groups.
    #[serde(default = "default_node_count")]
    pub node_count: usize,

    /// Blocks the first group stakes while partitioned.
    #[serde(default = "default_short_len")]
    pub short_len: usize,

    /// Intrinsic weight of each block the first group stakes.
    #[serde(default = "default_short_weight")]
    pub short_weight: u64,

    /// Blocks the second group stakes while partitioned.
    #[serde(default = "default_long_len")]
    pub long_len: usize,

    /// Intrinsic weight of each block the second group stakes.
    #[serde(default = "default_long_weight")]
    pub long_weight: u64,

    /// Seconds to wait for the nodes to settle before giving up.
    #[serde(default = "default_settle_timeout_secs")]
    pub settle_timeout_secs: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            node_count: default_node_count(),
            short_len: default_short_len(),
            short_weight: default_short_weight(),
            long_len: default_long_len(),
            long_weight: default_long_weight(),
            settle_timeout_secs: default_settle_timeout_secs(),
        }
    }
}

fn default_node_count() -> usize {
    6
}

fn default_short_len() -> usize {
    2
}

fn default_short_weight() -> u64 {
    1
}

fn default_long_len() -> usize {
    5
}

fn default_long_weight() -> u64 {
    1
}

fn default_settle_timeout_secs() -> u64 {
    10
}

impl SimConfig {
    /// Checks the split makes sense.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node_count < 2 {
            return Err(ConfigError::Invalid(format!(
                "need at least 2 nodes, got {}",
                self.node_count
            )));
        }

        if self.short_weight == 0 || self.long_weight == 0 {
            return Err(ConfigError::Invalid("block weights must be nonzero".into()));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub consensus: ConsensusConfig,

    #[serde(default)]
    pub sim: SimConfig,
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_config_load() {
        let config_string = r#"
            [consensus]
            max_reorg_depth = 12
            msg_queue_size = 8

            [sim]
            node_count = 4
            long_len = 7
            long_weight = 3
        "#;

        let config = Config::from_toml_str(config_string).unwrap();
        assert_eq!(config.consensus.max_reorg_depth, 12);
        assert_eq!(config.consensus.msg_queue_size, 8);
        assert_eq!(
            config.consensus.max_orphan_blocks,
            DEFAULT_MAX_ORPHAN_BLOCKS
        );
        assert_eq!(config.sim.node_count, 4);
        assert_eq!(config.sim.short_len, 2);
        assert_eq!(config.sim.long_len, 7);
        assert_eq!(config.sim.long_weight, 3);
        assert!(config.sim.validate().is_ok());
    }

    #[test]
    fn test_empty_config_is_default() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_invalid_sim() {
        let config = Config::from_toml_str("[sim]\nnode_count = 1\n").unwrap();
        assert!(matches!(
            config.sim.validate(),
            Err(ConfigError::Invalid(_))
        ));

        assert!(matches!(
            Config::from_toml_str("[consensus]\nmax_reorg_depth = \"deep\"\n"),
            Err(ConfigError::Parse(_))
        ));
    }
}
