//! Debug hook that kills the process at a named point, so tests can check
//! that a node recovers from a crash in the middle of a reorg.

use std::sync::LazyLock;

use tokio::sync::watch;
use tracing::*;

/// Currently armed bail point, if any.
static BAIL_POINT: LazyLock<(
    watch::Sender<Option<String>>,
    watch::Receiver<Option<String>>,
)> = LazyLock::new(|| watch::channel(None));

/// Arms a bail point.  The next time execution reaches it the process exits.
pub fn arm(point: &str) {
    info!(%point, "arming bail point");
    BAIL_POINT.0.send_replace(Some(point.to_owned()));
}

pub fn disarm() {
    BAIL_POINT.0.send_replace(None);
}

pub fn armed() -> Option<String> {
    BAIL_POINT.1.borrow().clone()
}

/// Subscribes to changes of the armed bail point.
pub fn subscribe() -> watch::Receiver<Option<String>> {
    BAIL_POINT.0.subscribe()
}

pub fn check_bail_trigger(point: &str) {
    if BAIL_POINT.1.borrow().as_deref() == Some(point) {
        warn!(%point, "hit bail point, exiting");
        std::process::exit(0);
    }
}
