//! Datastore and dashboard setup, including in-place config file edits.
//!
//! Edits are key substitutions scoped to a `[section]`; commented-out
//! defaults (`#key = ...`, `;key = ...`) are replaced in place so the files
//! keep their shipped layout.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use sppmon_core::config::TlsConfig;
use sppmon_core::keys;
use sppmon_core::util::format_flag;

use super::{enable_service, ensure_packages, log_line, open_firewall_port, StepContext, StepEnv};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConfigEdit {
    pub section: &'static str,
    pub key: &'static str,
    pub value: String,
}

impl ConfigEdit {
    pub fn new(section: &'static str, key: &'static str, value: impl Into<String>) -> Self {
        Self {
            section,
            key,
            value: value.into(),
        }
    }
}

pub fn setup_datastore(env: &mut StepEnv, ctx: &mut StepContext) -> Result<()> {
    let config = env.config;
    let datastore = &config.datastore;

    ensure_packages(env, ctx, &datastore.server_binary, &config.packages.datastore)?;

    let https = choose_tls(ctx, "InfluxDB", &datastore.tls)?;
    let mut edits = vec![
        ConfigEdit::new("http", "auth-enabled", "true"),
        ConfigEdit::new("http", "https-enabled", https.to_string()),
    ];
    if let (true, Some(cert), Some(key)) = (
        https,
        datastore.tls.cert_file.as_deref(),
        datastore.tls.key_file.as_deref(),
    ) {
        edits.push(ConfigEdit::new("http", "https-certificate", quoted(cert)));
        edits.push(ConfigEdit::new("http", "https-private-key", quoted(key)));
    }

    let restart = apply_config_edits(ctx, Path::new(&datastore.config_path), &edits)?;
    enable_service(env, ctx, &datastore.service, restart)?;
    open_firewall_port(env, ctx, datastore.port)?;

    let unsafe_ssl = if https {
        ctx.confirm("Is the InfluxDB certificate self-signed?", true)?
    } else {
        false
    };

    ctx.stage(keys::INFLUX_ADDRESS, &datastore.address)?;
    ctx.stage(keys::INFLUX_PORT, &datastore.port.to_string())?;
    ctx.stage(keys::SSL_ENABLED, format_flag(https))?;
    ctx.stage(keys::UNSAFE_SSL, format_flag(unsafe_ssl))?;
    log_line(
        ctx,
        format!(
            "InfluxDB listens on {}:{} (https: {}).",
            datastore.address, datastore.port, https
        ),
    );
    Ok(())
}

pub fn setup_dashboard(env: &mut StepEnv, ctx: &mut StepContext) -> Result<()> {
    let config = env.config;
    let dashboard = &config.dashboard;

    ensure_packages(env, ctx, &dashboard.server_binary, &config.packages.dashboard)?;

    let https = choose_tls(ctx, "Grafana", &dashboard.tls)?;
    let mut edits = vec![
        ConfigEdit::new("server", "http_port", dashboard.port.to_string()),
        ConfigEdit::new("server", "protocol", if https { "https" } else { "http" }),
    ];
    if let (true, Some(cert), Some(key)) = (
        https,
        dashboard.tls.cert_file.as_deref(),
        dashboard.tls.key_file.as_deref(),
    ) {
        edits.push(ConfigEdit::new("server", "cert_file", cert));
        edits.push(ConfigEdit::new("server", "cert_key", key));
    }
    edits.push(ConfigEdit::new("analytics", "reporting_enabled", "false"));
    edits.push(ConfigEdit::new("analytics", "check_for_updates", "false"));

    let restart = apply_config_edits(ctx, Path::new(&dashboard.config_path), &edits)?;
    enable_service(env, ctx, &dashboard.service, restart)?;
    open_firewall_port(env, ctx, dashboard.port)
}

/// Optional HTTPS toggle; declining never aborts the run.
fn choose_tls(ctx: &mut StepContext, label: &str, tls: &TlsConfig) -> Result<bool> {
    let (Some(cert), Some(key)) = (tls.cert_file.as_deref(), tls.key_file.as_deref()) else {
        log_line(
            ctx,
            format!("No certificate configured for {label}; HTTPS stays disabled."),
        );
        return Ok(false);
    };
    if !ctx.confirm(
        &format!("Do you want to enable HTTPS for {label}?"),
        tls.enable_by_default,
    )? {
        return Ok(false);
    }
    for file in [cert, key] {
        if !Path::new(file).is_file() {
            return Err(anyhow!("TLS file {file} for {label} does not exist"));
        }
    }
    Ok(true)
}

/// Apply `edits` to the file at `path`.
///
/// Returns whether the file differs from its untouched original, so a step
/// resumed after a failed restart still restarts the service.
pub fn apply_config_edits(
    ctx: &mut StepContext,
    path: &Path,
    edits: &[ConfigEdit],
) -> Result<bool> {
    let original = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let updated = edits.iter().fold(original.clone(), |contents, edit| {
        set_config_value(&contents, edit.section, edit.key, &edit.value)
    });

    let backup = backup_path(path);
    if updated == original {
        log_line(ctx, format!("{} is already configured.", path.display()));
        return differs_from_backup(&backup, &original);
    }

    if !backup.exists() {
        fs::copy(path, &backup)
            .with_context(|| format!("failed to back up {}", path.display()))?;
        log_line(ctx, format!("Saved original config to {}", backup.display()));
    }
    fs::write(path, updated).with_context(|| format!("failed to write {}", path.display()))?;

    let keys = edits
        .iter()
        .map(|edit| format!("{}.{}", edit.section, edit.key))
        .collect::<Vec<_>>()
        .join(", ");
    log_line(ctx, format!("Updated {} ({})", path.display(), keys));
    Ok(true)
}

fn differs_from_backup(backup: &Path, current: &str) -> Result<bool> {
    match fs::read_to_string(backup) {
        Ok(shipped) => Ok(shipped != current),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err).with_context(|| format!("failed to read {}", backup.display())),
    }
}

/// Set `key = value` inside `[section]`, replacing an active or commented entry.
pub fn set_config_value(contents: &str, section: &str, key: &str, value: &str) -> String {
    let replacement = format!("{key} = {value}");
    let mut out: Vec<String> = Vec::new();
    let mut current: Option<String> = None;
    let mut insert_at: Option<usize> = None;
    let mut done = false;

    for line in contents.lines() {
        let trimmed = line.trim();
        if let Some(name) = section_header(trimmed) {
            current = Some(name.to_string());
            if name == section && insert_at.is_none() {
                insert_at = Some(out.len() + 1);
            }
            out.push(line.to_string());
            continue;
        }

        if current.as_deref() == Some(section) {
            if let Some((entry, active)) = entry_key(trimmed) {
                if entry == key {
                    if !done {
                        out.push(replacement.clone());
                        done = true;
                        continue;
                    }
                    // Later active duplicates would override the replacement.
                    if active {
                        continue;
                    }
                }
            }
            if !trimmed.is_empty() && !done {
                insert_at = Some(out.len() + 1);
            }
        }
        out.push(line.to_string());
    }

    if !done {
        match insert_at {
            Some(index) => out.insert(index, replacement),
            None => {
                if out.last().is_some_and(|line| !line.trim().is_empty()) {
                    out.push(String::new());
                }
                out.push(format!("[{section}]"));
                out.push(replacement);
            }
        }
    }

    let mut rendered = out.join("\n");
    if contents.is_empty() || contents.ends_with('\n') {
        rendered.push('\n');
    }
    rendered
}

/// Active (uncommented) value of `key` inside `[section]`, quotes stripped.
pub fn read_config_value(contents: &str, section: &str, key: &str) -> Option<String> {
    let mut current: Option<&str> = None;
    let mut found = None;
    for line in contents.lines() {
        let trimmed = line.trim();
        if let Some(name) = section_header(trimmed) {
            current = Some(name);
            continue;
        }
        if current != Some(section) {
            continue;
        }
        if let Some((entry, true)) = entry_key(trimmed) {
            if entry == key {
                let (_, value) = trimmed.split_once('=')?;
                found = Some(value.trim().trim_matches('"').to_string());
            }
        }
    }
    found
}

fn section_header(trimmed: &str) -> Option<&str> {
    let inner = trimmed.strip_prefix('[')?.strip_suffix(']')?;
    Some(inner.trim())
}

// Returns the key of an entry line and whether the entry is active.
fn entry_key(trimmed: &str) -> Option<(&str, bool)> {
    let uncommented = trimmed.trim_start_matches(['#', ';']);
    let active = uncommented.len() == trimmed.len();
    let (key, _) = uncommented.trim_start().split_once('=')?;
    let key = key.trim();
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.'));
    valid.then_some((key, active))
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".sppmon.bak");
    PathBuf::from(name)
}

fn quoted(value: &str) -> String {
    format!("\"{value}\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use sppmon_core::{CredentialStore, InstallerConfig, Step};

    use crate::actions::testing::FakeRunner;
    use crate::prompt::LinePrompter;

    const INFLUX_CONF: &str = "\
[meta]
  dir = \"/var/lib/influxdb/meta\"

[http]
  # Determines whether HTTP endpoint is enabled.
  # enabled = true
  # auth-enabled = false
  # https-enabled = false

[logging]
  # level = \"info\"
";

    const GRAFANA_INI: &str = "\
[server]
;protocol = http
;http_port = 3000

[analytics]
;reporting_enabled = true
";

    #[test]
    fn replaces_commented_default_in_section() {
        let updated = set_config_value(INFLUX_CONF, "http", "auth-enabled", "true");
        assert!(updated.contains("auth-enabled = true\n"));
        assert!(!updated.contains("# auth-enabled = false"));
        assert!(updated.contains("# enabled = true"));
        assert!(updated.ends_with('\n'));
    }

    #[test]
    fn substitution_is_idempotent() {
        let once = set_config_value(GRAFANA_INI, "server", "http_port", "3000");
        let twice = set_config_value(&once, "server", "http_port", "3000");
        assert_eq!(once, twice);
        assert_eq!(read_config_value(&once, "server", "http_port").as_deref(), Some("3000"));
    }

    #[test]
    fn missing_key_is_added_after_section_entries() {
        let updated = set_config_value(GRAFANA_INI, "server", "cert_file", "/etc/ssl/grafana.crt");
        let lines = updated.lines().collect::<Vec<_>>();
        let index = lines
            .iter()
            .position(|line| *line == "cert_file = /etc/ssl/grafana.crt")
            .expect("inserted");
        assert_eq!(lines[index - 1], ";http_port = 3000");
    }

    #[test]
    fn missing_section_is_appended() {
        let updated = set_config_value("[server]\nhttp_port = 3000\n", "security", "admin_user", "admin");
        assert!(updated.ends_with("\n\n[security]\nadmin_user = admin\n"));
    }

    #[test]
    fn later_active_duplicates_are_dropped() {
        let contents = "[http]\n# auth-enabled = false\nauth-enabled = false\n";
        let updated = set_config_value(contents, "http", "auth-enabled", "true");
        assert_eq!(updated, "[http]\nauth-enabled = true\n");
    }

    #[test]
    fn keys_in_other_sections_are_untouched() {
        let contents = "[meta]\nenabled = false\n[http]\n";
        let updated = set_config_value(contents, "http", "enabled", "true");
        assert_eq!(updated, "[meta]\nenabled = false\n[http]\nenabled = true\n");
    }

    #[test]
    fn read_ignores_commented_entries() {
        assert_eq!(read_config_value(GRAFANA_INI, "server", "protocol"), None);
        let contents = "[server]\nprotocol = \"https\"\n";
        assert_eq!(
            read_config_value(contents, "server", "protocol").as_deref(),
            Some("https")
        );
    }

    #[test]
    fn datastore_step_edits_config_and_stages_connection() {
        let dir = tempfile::tempdir().expect("tempdir");
        let conf = dir.path().join("influxdb.conf");
        fs::write(&conf, INFLUX_CONF).expect("write");

        let mut config = InstallerConfig::default();
        config.datastore.config_path = conf.display().to_string();
        let paths = config.resolve_paths(dir.path());
        let mut credentials = CredentialStore::open(dir.path().join("auth"));
        let mut runner = FakeRunner::with_programs(&["influxd"]);
        let mut prompter = LinePrompter::new(Cursor::new(Vec::new()), Vec::new(), true);
        {
            let mut ctx = StepContext::new(Step::DatastoreSetup, &mut prompter, &mut credentials);
            let mut env = StepEnv {
                config: &config,
                paths: &paths,
                runner: &mut runner,
            };
            setup_datastore(&mut env, &mut ctx).expect("datastore");
        }

        let written = fs::read_to_string(&conf).expect("read");
        assert_eq!(
            read_config_value(&written, "http", "auth-enabled").as_deref(),
            Some("true")
        );
        assert!(backup_path(&conf).exists());
        assert_eq!(credentials.get(keys::SSL_ENABLED), Some("False"));
        assert_eq!(credentials.get(keys::INFLUX_PORT), Some("8086"));
        assert!(runner
            .runs
            .contains(&"systemctl restart influxdb".to_string()));

        // Nothing left to edit, but the unit still runs with the edited file.
        runner.runs.clear();
        {
            let mut ctx = StepContext::new(Step::DatastoreSetup, &mut prompter, &mut credentials);
            let mut env = StepEnv {
                config: &config,
                paths: &paths,
                runner: &mut runner,
            };
            setup_datastore(&mut env, &mut ctx).expect("datastore again");
        }
        assert!(runner
            .runs
            .contains(&"systemctl restart influxdb".to_string()));
        assert_eq!(fs::read_to_string(&conf).expect("read"), written);
    }

    #[test]
    fn rerun_after_failed_restart_restarts_service() {
        let dir = tempfile::tempdir().expect("tempdir");
        let conf = dir.path().join("influxdb.conf");
        fs::write(&conf, INFLUX_CONF).expect("write");

        let mut config = InstallerConfig::default();
        config.datastore.config_path = conf.display().to_string();
        let paths = config.resolve_paths(dir.path());
        let mut credentials = CredentialStore::open(dir.path().join("auth"));
        let mut runner = FakeRunner::with_programs(&["influxd"]);
        runner.fail.push("systemctl restart influxdb".to_string());
        let mut prompter = LinePrompter::new(Cursor::new(Vec::new()), Vec::new(), true);
        {
            let mut ctx = StepContext::new(Step::DatastoreSetup, &mut prompter, &mut credentials);
            let mut env = StepEnv {
                config: &config,
                paths: &paths,
                runner: &mut runner,
            };
            assert!(setup_datastore(&mut env, &mut ctx).is_err());
        }

        runner.fail.clear();
        runner.runs.clear();
        {
            let mut ctx = StepContext::new(Step::DatastoreSetup, &mut prompter, &mut credentials);
            let mut env = StepEnv {
                config: &config,
                paths: &paths,
                runner: &mut runner,
            };
            setup_datastore(&mut env, &mut ctx).expect("resumed datastore");
        }
        assert_eq!(
            runner.runs,
            vec![
                "systemctl daemon-reload".to_string(),
                "systemctl enable --now influxdb".to_string(),
                "systemctl restart influxdb".to_string(),
            ]
        );
    }

    #[test]
    fn already_configured_file_needs_no_restart() {
        let dir = tempfile::tempdir().expect("tempdir");
        let conf = dir.path().join("influxdb.conf");
        fs::write(&conf, "[http]\nauth-enabled = true\nhttps-enabled = false\n").expect("write");

        let mut credentials = CredentialStore::open(dir.path().join("auth"));
        let mut prompter = LinePrompter::new(Cursor::new(Vec::new()), Vec::new(), true);
        let mut ctx = StepContext::new(Step::DatastoreSetup, &mut prompter, &mut credentials);
        let edits = [
            ConfigEdit::new("http", "auth-enabled", "true"),
            ConfigEdit::new("http", "https-enabled", "false"),
        ];
        assert!(!apply_config_edits(&mut ctx, &conf, &edits).expect("apply"));
        assert!(!backup_path(&conf).exists());
    }

    #[test]
    fn dashboard_step_enables_https_with_configured_material() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ini = dir.path().join("grafana.ini");
        let cert = dir.path().join("grafana.crt");
        let key = dir.path().join("grafana.key");
        fs::write(&ini, GRAFANA_INI).expect("write ini");
        fs::write(&cert, "cert").expect("write cert");
        fs::write(&key, "key").expect("write key");

        let mut config = InstallerConfig::default();
        config.dashboard.config_path = ini.display().to_string();
        config.dashboard.tls.enable_by_default = true;
        config.dashboard.tls.cert_file = Some(cert.display().to_string());
        config.dashboard.tls.key_file = Some(key.display().to_string());
        let paths = config.resolve_paths(dir.path());
        let mut credentials = CredentialStore::open(dir.path().join("auth"));
        let mut runner = FakeRunner::with_programs(&["grafana-server"]);
        let mut prompter = LinePrompter::new(Cursor::new(Vec::new()), Vec::new(), true);
        {
            let mut ctx = StepContext::new(Step::DashboardSetup, &mut prompter, &mut credentials);
            let mut env = StepEnv {
                config: &config,
                paths: &paths,
                runner: &mut runner,
            };
            setup_dashboard(&mut env, &mut ctx).expect("dashboard");
        }

        let written = fs::read_to_string(&ini).expect("read");
        assert_eq!(read_config_value(&written, "server", "protocol").as_deref(), Some("https"));
        assert_eq!(
            read_config_value(&written, "analytics", "reporting_enabled").as_deref(),
            Some("false")
        );
        assert!(written.contains(&format!("cert_key = {}", key.display())));
    }

    #[test]
    fn declined_tls_toggle_keeps_http() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ini = dir.path().join("grafana.ini");
        fs::write(&ini, GRAFANA_INI).expect("write ini");

        let mut config = InstallerConfig::default();
        config.dashboard.config_path = ini.display().to_string();
        config.dashboard.tls.cert_file = Some("/missing.crt".to_string());
        config.dashboard.tls.key_file = Some("/missing.key".to_string());
        let paths = config.resolve_paths(dir.path());
        let mut credentials = CredentialStore::open(dir.path().join("auth"));
        let mut runner = FakeRunner::with_programs(&["grafana-server"]);
        let mut prompter = LinePrompter::new(Cursor::new(b"n\n".to_vec()), Vec::new(), false);
        {
            let mut ctx = StepContext::new(Step::DashboardSetup, &mut prompter, &mut credentials);
            let mut env = StepEnv {
                config: &config,
                paths: &paths,
                runner: &mut runner,
            };
            setup_dashboard(&mut env, &mut ctx).expect("dashboard");
        }
        let written = fs::read_to_string(&ini).expect("read");
        assert_eq!(read_config_value(&written, "server", "protocol").as_deref(), Some("http"));
    }
}
