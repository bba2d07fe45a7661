//! Configuration module wiring for the installer.
//!
//! Keeps config types, I/O, and path resolution in separate files.

mod config_io;
mod config_paths;
mod config_types;

pub use config_io::{ConfigError, DEFAULT_CONFIG_NAME};
pub use config_paths::ResolvedPaths;
pub use config_types::*;
