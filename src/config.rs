//! Persisted settings provider.
//!
//! This module exposes the configuration schema the player reads (history
//! capacity, track sorting, key bindings, storage locations) and helpers to
//! load it from disk and the environment.

mod load;
mod schema;

pub use load::{default_config_path, default_data_dir, resolve_config_path};
pub use schema::*;

#[cfg(test)]
mod tests;
