//! Configuration types and defaults for the SPPMon installer.
//!
//! Keeps schema definitions in one place for easier auditing.

use serde::Deserialize;

/// Top-level configuration loaded from installer.toml.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InstallerConfig {
    pub general: GeneralConfig,
    pub paths: PathsConfig,
    pub packages: PackagesConfig,
    pub runtime: RuntimeConfig,
    pub datastore: DatastoreConfig,
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: Option<String>,
}

/// File locations; relative entries resolve against the install root.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub state_file: String,
    pub credential_file: String,
    pub log_file: String,
    pub server_config_dir: String,
    pub scripts_dir: String,
    pub python_dir: String,
    pub dashboards_dir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            state_file: "scripts/.installer_continue_point".to_string(),
            credential_file: "scripts/delete_me_auth.txt".to_string(),
            log_file: "scripts/logs/installLog.txt".to_string(),
            server_config_dir: "config_files".to_string(),
            scripts_dir: "scripts".to_string(),
            python_dir: "python".to_string(),
            dashboards_dir: "Grafana".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PackagesConfig {
    /// Package manager binary, invoked as `<manager> install -y <packages>`.
    pub manager: String,
    pub runtime: Vec<String>,
    pub datastore: Vec<String>,
    pub dashboard: Vec<String>,
}

impl Default for PackagesConfig {
    fn default() -> Self {
        Self {
            manager: "yum".to_string(),
            runtime: vec!["python3".to_string(), "python3-pip".to_string()],
            datastore: vec!["influxdb".to_string()],
            dashboard: vec!["grafana".to_string()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub python: String,
    /// Requirements file relative to the python directory.
    pub requirements: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            python: "python3".to_string(),
            requirements: "requirements.txt".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    /// Answer used for the TLS toggle when running in auto-confirm mode.
    pub enable_by_default: bool,
    pub cert_file: Option<String>,
    pub key_file: Option<String>,
}

impl TlsConfig {
    /// Both certificate and key are configured.
    pub fn has_material(&self) -> bool {
        self.cert_file.is_some() && self.key_file.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatastoreConfig {
    pub address: String,
    pub port: u16,
    pub service: String,
    pub server_binary: String,
    pub client_binary: String,
    pub config_path: String,
    pub default_admin: String,
    pub max_user_attempts: u32,
    pub tls: TlsConfig,
}

impl Default for DatastoreConfig {
    fn default() -> Self {
        Self {
            address: "localhost".to_string(),
            port: 8086,
            service: "influxdb".to_string(),
            server_binary: "influxd".to_string(),
            client_binary: "influx".to_string(),
            config_path: "/etc/influxdb/influxdb.conf".to_string(),
            default_admin: "influxAdmin".to_string(),
            max_user_attempts: 3,
            tls: TlsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Host name operators use to reach Grafana.
    pub host: String,
    pub port: u16,
    pub service: String,
    pub server_binary: String,
    pub config_path: String,
    pub datasource_name: String,
    pub tls: TlsConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3000,
            service: "grafana-server".to_string(),
            server_binary: "grafana-server".to_string(),
            config_path: "/etc/grafana/grafana.ini".to_string(),
            datasource_name: "InfluxDB".to_string(),
            tls: TlsConfig::default(),
        }
    }
}
