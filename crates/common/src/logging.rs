use std::env;

use tracing::*;
use tracing_subscriber::{
    filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

/// Envvar carrying a label that gets appended to the node's whoami, so logs
/// from several nodes in one process can be told apart.
pub const SVC_LABEL_ENVVAR: &str = "CANON_SVC_LABEL";

pub struct LoggerConfig {
    whoami: String,
    default_level: LevelFilter,
}

impl LoggerConfig {
    pub fn new(whoami: String) -> Self {
        Self {
            whoami,
            default_level: LevelFilter::INFO,
        }
    }

    pub fn with_base_name(s: &str) -> Self {
        Self::new(get_whoami_string(s))
    }

    /// Level used when `RUST_LOG` is unset.
    pub fn with_default_level(mut self, level: LevelFilter) -> Self {
        self.default_level = level;
        self
    }

    pub fn whoami(&self) -> &str {
        &self.whoami
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self::with_base_name("(canon-node)")
    }
}

/// Installs the global subscriber.  Directives in `RUST_LOG` take precedence
/// over the configured default level.
pub fn init(config: LoggerConfig) {
    let filt = EnvFilter::builder()
        .with_default_directive(config.default_level.into())
        .from_env_lossy();
    let stdout_sub = tracing_subscriber::fmt::layer()
        .compact()
        .with_thread_names(true)
        .with_filter(filt);
    tracing_subscriber::registry().with(stdout_sub).init();

    info!(whoami = %config.whoami, "logging started");
}

pub fn finalize() {
    info!("shutting down logging");
}

/// Base name, suffixed with `%label` if [`SVC_LABEL_ENVVAR`] is set.
pub fn get_whoami_string(base: &str) -> String {
    match env::var(SVC_LABEL_ENVVAR) {
        Ok(label) if !label.is_empty() => format!("{base}%{label}"),
        _ => base.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whoami_without_label() {
        env::remove_var(SVC_LABEL_ENVVAR);
        assert_eq!(get_whoami_string("canon-node"), "canon-node");
        assert_eq!(LoggerConfig::with_base_name("sim").whoami(), "sim");
    }
}
