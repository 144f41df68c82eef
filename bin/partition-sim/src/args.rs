use std::{fs, path::PathBuf};

use argh::FromArgs;
use canon_config::Config;
use toml::value::Table;

use crate::errors::{ConfigError, InitError};

#[derive(Debug, Clone, FromArgs)]
#[argh(description = "Canon network partition simulator")]
pub struct Args {
    // Config non-overriding args
    #[argh(option, short = 'c', description = "path to configuration")]
    pub config: Option<PathBuf>,

    // Config overriding args
    /// Number of nodes, split evenly into two groups.
    #[argh(option, short = 'n', description = "number of nodes")]
    pub nodes: Option<usize>,

    /// Blocks the first group stakes while partitioned.
    #[argh(option, description = "short chain length")]
    pub short_len: Option<usize>,

    /// Blocks the second group stakes while partitioned.
    #[argh(option, description = "long chain length")]
    pub long_len: Option<usize>,

    /// Other generic overrides to the config toml.
    /// Will be used, for example, as `-o consensus.max_reorg_depth=3 -o sim.long_weight=2`
    #[argh(option, short = 'o', description = "generic config overrides")]
    pub overrides: Vec<String>,
}

impl Args {
    /// Get strings of overrides gathered from args.
    pub fn get_overrides(&self) -> Vec<String> {
        let mut overrides = self.overrides.clone();
        overrides.extend_from_slice(&self.get_direct_overrides());
        overrides
    }

    /// Overrides passed directly as args and not as overrides.
    fn get_direct_overrides(&self) -> Vec<String> {
        let mut overrides = Vec::new();
        if let Some(nodes) = self.nodes {
            overrides.push(format!("sim.node_count={nodes}"));
        }
        if let Some(short_len) = self.short_len {
            overrides.push(format!("sim.short_len={short_len}"));
        }
        if let Some(long_len) = self.long_len {
            overrides.push(format!("sim.long_len={long_len}"));
        }
        overrides
    }
}

/// Loads the config file if there is one and applies the overrides on top.
/// Anything left unset takes its default.
pub fn get_config(args: &Args) -> Result<Config, InitError> {
    let mut table = match &args.config {
        Some(path) => {
            let raw = fs::read_to_string(path)?;
            toml::from_str::<Table>(&raw).map_err(ConfigError::from)?
        }
        None => Table::new(),
    };

    for o in args.get_overrides() {
        let (path, val) = parse_override(&o)?;
        apply_override(&path, val, &mut table)?;
    }

    let config: Config = toml::Value::Table(table)
        .try_into()
        .map_err(ConfigError::from)?;
    config.sim.validate()?;
    Ok(config)
}

type Override = (String, toml::Value);

/// Parses an override.  This first splits the string by '=' to get key and
/// value and then splits the key by '.' which is the update path.
pub fn parse_override(override_str: &str) -> Result<Override, ConfigError> {
    let (key, value_str) = override_str
        .split_once("=")
        .ok_or(ConfigError::InvalidOverride(override_str.to_string()))?;
    Ok((key.to_string(), parse_value(value_str)))
}

/// Apply override to config.  Missing sections are created, since every
/// section has defaults.
pub fn apply_override(
    path: &str,
    value: toml::Value,
    table: &mut Table,
) -> Result<(), ConfigError> {
    match path.split_once(".") {
        None => {
            table.insert(path.to_string(), value);
            Ok(())
        }
        Some((key, rest)) => {
            let entry = table
                .entry(key.to_string())
                .or_insert(toml::Value::Table(Table::new()));
            match entry.as_table_mut() {
                Some(t) => apply_override(rest, value, t),
                None => Err(ConfigError::TraverseNonTableAt(key.to_string())),
            }
        }
    }
}

/// Parses a string into a toml value. First tries as `i64`, then as `bool` and then defaults to
/// `String`.
fn parse_value(str_value: &str) -> toml::Value {
    str_value
        .parse::<i64>()
        .map(toml::Value::Integer)
        .or_else(|_| str_value.parse::<bool>().map(toml::Value::Boolean))
        .unwrap_or_else(|_| toml::Value::String(str_value.to_string()))
}

#[cfg(test)]
mod test {
    use super::*;

    fn args_with(overrides: &[&str]) -> Args {
        Args {
            config: None,
            nodes: None,
            short_len: None,
            long_len: Some(9),
            overrides: overrides.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_apply_overrides() {
        let args = args_with(&["consensus.max_reorg_depth=3", "sim.long_weight=2"]);
        let config = get_config(&args).unwrap();

        assert_eq!(config.consensus.max_reorg_depth, 3);
        assert_eq!(config.consensus.msg_queue_size, 64);
        assert_eq!(config.sim.long_weight, 2);
        assert_eq!(config.sim.long_len, 9);
        assert_eq!(config.sim.node_count, 6);
    }

    #[test]
    fn test_bad_overrides() {
        assert!(matches!(
            parse_override("sim.node_count"),
            Err(ConfigError::InvalidOverride(_))
        ));

        let mut table = Table::new();
        table.insert("sim".to_string(), toml::Value::Integer(1));
        assert!(matches!(
            apply_override("sim.node_count", toml::Value::Integer(4), &mut table),
            Err(ConfigError::TraverseNonTableAt(_))
        ));

        let args = args_with(&["sim.node_count=1"]);
        assert!(matches!(get_config(&args), Err(InitError::Invalid(_))));
    }
}
