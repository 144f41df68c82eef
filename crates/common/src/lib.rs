//! Crate includes reusable utils for services that handle common behavior.
//! Such as initializing the tracing framework and whatever else.

pub mod env;
pub mod logging;

#[cfg(feature = "debug-utils")]
pub mod bail_manager;

/// Bail point after the old chain has been undone, before anything is
/// connected.
pub const BAIL_REORG_AFTER_DISCONNECT: &str = "reorg_after_disconnect";

/// Bail point after state switched to the new chain, before the tip pointer
/// is written.
pub const BAIL_REORG_BEFORE_PERSIST: &str = "reorg_before_persist";

/// Checks to see if we should bail out.
#[cfg(feature = "debug-utils")]
pub fn check_bail_trigger(s: &str) {
    bail_manager::check_bail_trigger(s);
}

/// Checks to see if we should bail out.
// Stub for when we don't actually want to do anything.
#[cfg(not(feature = "debug-utils"))]
#[inline(always)]
pub fn check_bail_trigger(_s: &str) {
    // nothing
}
