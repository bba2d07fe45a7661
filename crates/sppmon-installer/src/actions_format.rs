//! Operator-facing text for the welcome banner and the dashboard hand-off.

use anyhow::{Context, Result};
use sppmon_core::{ResolvedPaths, Step};
use url::Url;

pub fn welcome_lines(paths: &ResolvedPaths, auto_confirm: bool) -> Vec<String> {
    let mut lines = vec![
        "Welcome to the SPPMon installer.".to_string(),
        "This installs the Python runtime, InfluxDB and Grafana, then registers".to_string(),
        "your Spectrum Protect Plus servers for monitoring.".to_string(),
        String::new(),
        format!("Install root: {}", paths.root.display()),
        format!("Progress file: {}", paths.state_file.display()),
        format!("Install log: {}", paths.log_file.display()),
        "An interrupted run resumes at the step it stopped in.".to_string(),
        String::new(),
        "Steps:".to_string(),
    ];
    lines.extend(
        Step::ALL
            .iter()
            .enumerate()
            .map(|(index, step)| format!("  {:>2}. {}", index + 1, step.title())),
    );
    if auto_confirm {
        lines.push("Auto-confirm is on: routine questions take their default answer.".to_string());
    }
    lines
}

/// Base URL of a local service.
pub fn service_url(https: bool, host: &str, port: u16) -> Result<Url> {
    let scheme = if https { "https" } else { "http" };
    let raw = format!("{scheme}://{host}:{port}/");
    Url::parse(&raw).with_context(|| format!("invalid service address {raw}"))
}

pub fn dashboard_import_lines(
    grafana: &Url,
    datasource_name: &str,
    datasource_url: &Url,
    dashboards: &[String],
) -> Vec<String> {
    let mut lines = vec![
        format!("Open Grafana at {grafana} and sign in (admin/admin on first login)."),
        format!("Add an InfluxDB data source named \"{datasource_name}\":"),
        format!("  URL: {datasource_url}"),
        "  Database: the one configured for each SPP server".to_string(),
        "  Basic auth: the InfluxDB admin login from the previous steps".to_string(),
    ];
    if dashboards.is_empty() {
        lines.push("No dashboard files were found to import.".to_string());
    } else {
        lines.push("Import these dashboards via Dashboards > Import:".to_string());
        lines.extend(dashboards.iter().map(|name| format!("  {name}")));
    }
    lines
}
