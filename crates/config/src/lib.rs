//! Configuration for nodes and the tools built around them.

pub mod config;

pub use config::*;
