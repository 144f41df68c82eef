use std::{env, str::FromStr};

use tracing::*;

/// Parses `envvar` as `T`, or returns `fallback` if it's unset.  A value that
/// doesn't parse is logged and ignored.
pub fn parse_env_or<T: FromStr>(envvar: &str, fallback: T) -> T {
    let Ok(raw) = env::var(envvar) else {
        return fallback;
    };

    match raw.parse() {
        Ok(v) => v,
        Err(_) => {
            warn!(%envvar, %raw, "ignoring unparseable env var");
            fallback
        }
    }
}
