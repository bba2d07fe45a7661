//! Welcome, dashboard hand-off and final cleanup steps.

use std::fs;
use std::path::Path;

use anyhow::Result;
use sppmon_core::keys;
use sppmon_core::util::parse_flag;
use tracing::{info, warn};

use super::{
    dashboard_import_lines, log_line, read_config_value, service_url, welcome_lines, StepContext,
    StepEnv,
};

pub fn welcome(env: &mut StepEnv, ctx: &mut StepContext) -> Result<()> {
    for line in welcome_lines(env.paths, ctx.auto_confirm()) {
        ctx.prompter.say(&line);
    }
    info!(root = %env.paths.root.display(), "installer started");
    Ok(())
}

pub fn import_dashboards(env: &mut StepEnv, ctx: &mut StepContext) -> Result<()> {
    let config = env.config;
    let dashboard = &config.dashboard;
    let datastore = &config.datastore;

    let grafana_https = fs::read_to_string(&dashboard.config_path)
        .ok()
        .and_then(|contents| read_config_value(&contents, "server", "protocol"))
        .is_some_and(|protocol| protocol == "https");
    let grafana = service_url(grafana_https, &dashboard.host, dashboard.port)?;

    let stored = |key: &str| ctx.credentials.get(key).map(str::to_string);
    let influx_https = stored(keys::SSL_ENABLED)
        .and_then(|value| parse_flag(&value))
        .unwrap_or(false);
    let influx_host = stored(keys::INFLUX_ADDRESS).unwrap_or_else(|| datastore.address.clone());
    let influx_port = stored(keys::INFLUX_PORT)
        .and_then(|value| value.parse().ok())
        .unwrap_or(datastore.port);
    let datasource = service_url(influx_https, &influx_host, influx_port)?;

    let dashboards = dashboard_files(&env.paths.dashboards_dir);
    ctx.prompter.say(&format!(
        "Dashboard files: {}",
        env.paths.dashboards_dir.display()
    ));
    for line in dashboard_import_lines(&grafana, &dashboard.datasource_name, &datasource, &dashboards)
    {
        ctx.prompter.say(&line);
    }
    info!(%grafana, count = dashboards.len(), "dashboard import instructions shown");
    Ok(())
}

pub fn finish(env: &mut StepEnv, ctx: &mut StepContext) -> Result<()> {
    log_line(ctx, "SPPMon installation finished.");
    log_line(
        ctx,
        format!("Server configs: {}", env.paths.server_config_dir.display()),
    );
    log_line(ctx, format!("Install log: {}", env.paths.log_file.display()));

    if !ctx.credentials.exists() {
        return Ok(());
    }
    let path = ctx.credentials.path().display().to_string();
    if ctx.confirm(
        &format!("Delete the credential file {path}? It holds plaintext passwords."),
        true,
    )? {
        ctx.credentials.remove_file()?;
        log_line(ctx, format!("Deleted {path}."));
    } else {
        warn!(path = %path, "credential file kept");
        log_line(
            ctx,
            format!("{path} still contains passwords, please delete it manually."),
        );
    }
    Ok(())
}

fn dashboard_files(dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .filter_map(|path| path.file_name().map(|name| name.to_string_lossy().to_string()))
        .collect::<Vec<_>>();
    names.sort();
    names
}
