//! Shared types for the resumable SPPMon installer.

pub mod config;
pub mod credentials;
pub mod state;
pub mod step;
pub mod util;

pub use config::*;
pub use credentials::{CredentialError, CredentialStore, CREDENTIAL_FILE_MODE};
pub use state::{StateError, StateFile};
pub use step::{Step, StepParseError};
pub use util::program_in_path;

/// Credential record names shared with the Python config generator.
pub mod keys {
    pub const INFLUX_ADMIN_NAME: &str = "influxAdminName";
    pub const INFLUX_ADMIN_PASSWORD: &str = "influxAdminPassword";
    pub const INFLUX_ADDRESS: &str = "influxAddress";
    pub const INFLUX_PORT: &str = "influxPort";
    pub const SSL_ENABLED: &str = "sslEnabled";
    pub const UNSAFE_SSL: &str = "unsafeSsl";
}
