//! Package installation, service management and the Python runtime step.

use std::process::Command;

use anyhow::{anyhow, Result};
use tracing::warn;

use super::{command, log_line, StepContext, StepEnv};

/// Install `packages` unless `marker` is already on PATH.
pub fn ensure_packages(
    env: &mut StepEnv,
    ctx: &mut StepContext,
    marker: &str,
    packages: &[String],
) -> Result<()> {
    if env.runner.program_available(marker) {
        log_line(
            ctx,
            format!("{marker} is already installed, skipping package installation."),
        );
        return Ok(());
    }
    if packages.is_empty() {
        return Err(anyhow!(
            "{marker} is missing and no packages are configured to provide it"
        ));
    }

    let manager = env.config.packages.manager.as_str();
    let mut install = Command::new(manager);
    install.args(["install", "-y"]).args(packages);
    let label = format!("{manager} install -y {}", packages.join(" "));
    env.runner.run(ctx, &label, install)
}

/// Enable and start a systemd unit, restarting it when its config changed.
pub fn enable_service(
    env: &mut StepEnv,
    ctx: &mut StepContext,
    unit: &str,
    restart: bool,
) -> Result<()> {
    env.runner.run(
        ctx,
        "systemctl daemon-reload",
        command("systemctl", ["daemon-reload"]),
    )?;
    env.runner.run(
        ctx,
        &format!("systemctl enable --now {unit}"),
        command("systemctl", ["enable", "--now", unit]),
    )?;
    if restart {
        env.runner.run(
            ctx,
            &format!("systemctl restart {unit}"),
            command("systemctl", ["restart", unit]),
        )?;
    }
    Ok(())
}

/// Open a TCP port when firewalld is running; otherwise leave it to the operator.
pub fn open_firewall_port(env: &mut StepEnv, ctx: &mut StepContext, port: u16) -> Result<()> {
    if !env.runner.program_available("firewall-cmd")
        || !env.runner.probe(command("firewall-cmd", ["--state"]))
    {
        log_line(
            ctx,
            format!("firewalld is not running; make sure port {port}/tcp is reachable."),
        );
        return Ok(());
    }
    let rule = format!("--add-port={port}/tcp");
    env.runner.run(
        ctx,
        &format!("firewall-cmd --permanent {rule}"),
        command("firewall-cmd", ["--permanent", rule.as_str()]),
    )?;
    env.runner.run(
        ctx,
        "firewall-cmd --reload",
        command("firewall-cmd", ["--reload"]),
    )
}

pub fn setup_runtime(env: &mut StepEnv, ctx: &mut StepContext) -> Result<()> {
    let config = env.config;
    let paths = env.paths;
    let python = config.runtime.python.as_str();

    if env.runner.probe(command(python, ["--version"])) {
        log_line(ctx, format!("{python} is available, skipping installation."));
    } else {
        let manager = config.packages.manager.as_str();
        let packages = &config.packages.runtime;
        if packages.is_empty() {
            return Err(anyhow!("{python} is missing and no runtime packages are configured"));
        }
        let mut install = Command::new(manager);
        install.args(["install", "-y"]).args(packages);
        env.runner.run(
            ctx,
            &format!("{manager} install -y {}", packages.join(" ")),
            install,
        )?;
        if !env.runner.probe(command(python, ["--version"])) {
            return Err(anyhow!("{python} is still unavailable after installation"));
        }
    }

    let requirements = paths.requirements_file(config);
    if !requirements.is_file() {
        warn!(path = %requirements.display(), "requirements file missing");
        log_line(
            ctx,
            format!(
                "No requirements file at {}, skipping Python packages.",
                requirements.display()
            ),
        );
        return Ok(());
    }

    let mut pip = Command::new(python);
    pip.args(["-m", "pip", "install", "--upgrade", "-r"])
        .arg(&requirements);
    env.runner.run(
        ctx,
        &format!("{python} -m pip install --upgrade -r {}", requirements.display()),
        pip,
    )
}
