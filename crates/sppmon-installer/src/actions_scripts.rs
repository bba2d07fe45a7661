//! Steps that hand off to the bundled Python helper scripts.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{anyhow, Context, Result};
use tracing::warn;

use super::{log_line, StepContext, StepEnv};

const CONFIG_SCRIPT: &str = "addConfigFile.py";
const CRONTAB_SCRIPT: &str = "addCrontabConfig.py";

pub fn generate_server_configs(env: &mut StepEnv, ctx: &mut StepContext) -> Result<()> {
    let config = env.config;
    let paths = env.paths;
    let script = require_script(paths.script(CONFIG_SCRIPT))?;
    let config_dir = &paths.server_config_dir;
    fs::create_dir_all(config_dir)
        .with_context(|| format!("failed to create {}", config_dir.display()))?;

    let mut generator = Command::new(&config.runtime.python);
    generator.arg(&script).arg("--configPath").arg(config_dir);
    if ctx.credentials.exists() {
        generator.arg("--authFile").arg(ctx.credentials.path());
    }
    if ctx.auto_confirm() {
        generator.arg("--autoConfirm");
    }
    env.runner
        .run_interactive(ctx, "addConfigFile.py", generator)?;

    list_server_configs(ctx, config_dir)?;
    Ok(())
}

pub fn configure_scheduling(env: &mut StepEnv, ctx: &mut StepContext) -> Result<()> {
    let config = env.config;
    let paths = env.paths;
    let script = require_script(paths.script(CRONTAB_SCRIPT))?;
    let entrypoint = paths.sppmon_entrypoint();
    if !entrypoint.is_file() {
        return Err(anyhow!("sppmon entrypoint {} is missing", entrypoint.display()));
    }
    if list_server_configs(ctx, &paths.server_config_dir)?.is_empty() {
        log_line(ctx, "No monitoring targets to schedule yet.");
    }

    let mut scheduler = Command::new(&config.runtime.python);
    scheduler
        .arg(&script)
        .arg("--configPath")
        .arg(&paths.server_config_dir)
        .arg("--pythonPath")
        .arg(&config.runtime.python)
        .arg("--sppmonPath")
        .arg(&entrypoint);
    if ctx.auto_confirm() {
        scheduler.arg("--autoConfirm");
    }
    env.runner
        .run_interactive(ctx, "addCrontabConfig.py", scheduler)
}

/// Report the `*.conf` files in `dir`, warning about any that are not valid JSON.
pub fn list_server_configs(ctx: &mut StepContext, dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            log_line(ctx, format!("Config directory {} does not exist.", dir.display()));
            return Ok(Vec::new());
        }
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read {}", dir.display()));
        }
    };

    let mut configs = entries
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "conf"))
        .collect::<Vec<_>>();
    configs.sort();

    if configs.is_empty() {
        log_line(
            ctx,
            format!(
                "No server configs in {}; rerun {CONFIG_SCRIPT} to add one.",
                dir.display()
            ),
        );
    }
    for path in &configs {
        let valid = fs::read_to_string(path)
            .ok()
            .and_then(|contents| serde_json::from_str::<serde_json::Value>(&contents).ok())
            .is_some_and(|value| value.is_object());
        if valid {
            log_line(ctx, format!("Server config: {}", path.display()));
        } else {
            warn!(path = %path.display(), "server config is not valid JSON");
            log_line(ctx, format!("Server config {} is not valid JSON.", path.display()));
        }
    }
    Ok(configs)
}

fn require_script(path: PathBuf) -> Result<PathBuf> {
    if path.is_file() {
        Ok(path)
    } else {
        Err(anyhow!("helper script {} is missing", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use sppmon_core::{CredentialStore, InstallerConfig, ResolvedPaths, Step};

    use crate::actions::testing::FakeRunner;
    use crate::prompt::LinePrompter;

    fn install_root() -> (tempfile::TempDir, InstallerConfig, ResolvedPaths) {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = InstallerConfig::default();
        let paths = config.resolve_paths(dir.path());
        fs::create_dir_all(&paths.scripts_dir).expect("scripts");
        fs::create_dir_all(&paths.python_dir).expect("python");
        fs::write(paths.script(CONFIG_SCRIPT), "").expect("config script");
        fs::write(paths.script(CRONTAB_SCRIPT), "").expect("crontab script");
        fs::write(paths.sppmon_entrypoint(), "").expect("entrypoint");
        (dir, config, paths)
    }

    #[test]
    fn config_generation_passes_auth_file_and_auto_confirm() {
        let (dir, config, paths) = install_root();
        let mut credentials = CredentialStore::open(dir.path().join("auth"));
        credentials.save("influxAdminName", "admin").expect("save");
        let mut runner = FakeRunner::default();
        let mut prompter = LinePrompter::new(Cursor::new(Vec::new()), Vec::new(), true);
        {
            let mut ctx = StepContext::new(Step::ConfigGeneration, &mut prompter, &mut credentials);
            let mut env = StepEnv {
                config: &config,
                paths: &paths,
                runner: &mut runner,
            };
            generate_server_configs(&mut env, &mut ctx).expect("generate");
        }
        assert_eq!(runner.interactive.len(), 1);
        let call = &runner.interactive[0];
        assert!(call.starts_with("python3 "));
        assert!(call.contains(&format!("--configPath {}", paths.server_config_dir.display())));
        assert!(call.contains("--authFile "));
        assert!(call.ends_with("--autoConfirm"));
        assert!(paths.server_config_dir.is_dir());
    }

    #[test]
    fn missing_helper_script_fails_the_step() {
        let (dir, config, paths) = install_root();
        fs::remove_file(paths.script(CRONTAB_SCRIPT)).expect("remove");
        let mut credentials = CredentialStore::open(dir.path().join("auth"));
        let mut runner = FakeRunner::default();
        let mut prompter = LinePrompter::new(Cursor::new(Vec::new()), Vec::new(), false);
        let mut ctx = StepContext::new(Step::SchedulingSetup, &mut prompter, &mut credentials);
        let mut env = StepEnv {
            config: &config,
            paths: &paths,
            runner: &mut runner,
        };
        let err = configure_scheduling(&mut env, &mut ctx).expect_err("missing script");
        assert!(err.to_string().contains(CRONTAB_SCRIPT));
        assert!(runner.interactive.is_empty());
    }

    #[test]
    fn scheduling_points_cron_at_the_entrypoint() {
        let (dir, config, paths) = install_root();
        let mut credentials = CredentialStore::open(dir.path().join("auth"));
        let mut runner = FakeRunner::default();
        let mut prompter = LinePrompter::new(Cursor::new(Vec::new()), Vec::new(), false);
        {
            let mut ctx = StepContext::new(Step::SchedulingSetup, &mut prompter, &mut credentials);
            let mut env = StepEnv {
                config: &config,
                paths: &paths,
                runner: &mut runner,
            };
            configure_scheduling(&mut env, &mut ctx).expect("schedule");
        }
        let call = &runner.interactive[0];
        assert!(call.contains("--pythonPath python3"));
        assert!(call.contains(&format!("--sppmonPath {}", paths.sppmon_entrypoint().display())));
        assert!(!call.contains("--autoConfirm"));
    }

    #[test]
    fn lists_configs_and_flags_invalid_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("b.conf"), "{\"influxDB\": {}}").expect("write");
        fs::write(dir.path().join("a.conf"), "not json").expect("write");
        fs::write(dir.path().join("notes.txt"), "ignored").expect("write");

        let mut credentials = CredentialStore::open(dir.path().join("auth"));
        let mut prompter = LinePrompter::new(Cursor::new(Vec::new()), Vec::new(), false);
        let configs = {
            let mut ctx = StepContext::new(Step::ConfigGeneration, &mut prompter, &mut credentials);
            list_server_configs(&mut ctx, dir.path()).expect("list")
        };
        let names = configs
            .iter()
            .filter_map(|path| path.file_name().and_then(|name| name.to_str()))
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["a.conf", "b.conf"]);
        let output = String::from_utf8_lossy(prompter.writer()).to_string();
        assert!(output.contains("a.conf is not valid JSON"));
    }
}
