//! Collection of generic internal data types that are used widely.

pub mod buf;
pub mod hash;
pub mod id;
pub mod macros;
pub mod weight;

pub mod prelude;
