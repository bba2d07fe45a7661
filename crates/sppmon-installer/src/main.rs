//! SPPMon installer entrypoint.

mod actions;
mod checks;
mod orchestrator;
mod paths;
mod prompt;
#[path = "runtime_config.rs"]
mod runtime_config;
#[path = "shutdown_signal.rs"]
mod shutdown_signal;
mod terminal;

use std::fs;
use std::path::PathBuf;
use std::process;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use sppmon_core::{CredentialStore, InstallerConfig, ResolvedPaths, StateFile};
use tracing::{info, warn};

use crate::actions::{SystemRunner, SystemSteps};
use crate::orchestrator::{abort_report, Abort, AbortReason, CancelToken, Orchestrator};
use crate::paths::find_install_root;
use crate::prompt::LinePrompter;
use crate::runtime_config::{init_tracing, load_config};
use crate::shutdown_signal::shutdown_signal;

const EXIT_ABORTED: i32 = 1;
const EXIT_INTERRUPTED: i32 = 130;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Answer routine confirmations with their default
    #[arg(long, visible_alias = "yes", alias = "autoConfirm")]
    auto_confirm: bool,

    /// Discard saved progress and staged credentials before starting
    #[arg(long)]
    debug: bool,

    /// Path to installer.toml
    #[arg(long)]
    config: Option<PathBuf>,

    /// SPPMon install root (defaults to $SPPMON_ROOT or the enclosing checkout)
    #[arg(long)]
    root: Option<PathBuf>,

    /// Validate configuration and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let root = find_install_root(args.root.as_deref())?;
    let config = load_config(&args, &root).context("load config")?;
    let paths = config.resolve_paths(&root);

    if args.check {
        println!("Configuration OK (install root {}).", root.display());
        return Ok(());
    }

    init_tracing(&config, &paths.log_file)?;
    info!(root = %root.display(), auto_confirm = args.auto_confirm, "installer starting");

    if args.debug {
        reset_progress(&paths)?;
    }
    if let Some(parent) = paths.credential_file.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create credential directory {}", parent.display()))?;
    }

    let cancel = CancelToken::new();
    let worker_cancel = cancel.clone();
    let worker_paths = paths.clone();
    let auto_confirm = args.auto_confirm;
    let mut worker = tokio::task::spawn_blocking(move || {
        run_installer(config, worker_paths, auto_confirm, worker_cancel)
    });

    tokio::select! {
        joined = &mut worker => {
            let outcome = joined.map_err(|err| anyhow!("installer worker failed: {err}"))?;
            if let Err(abort) = outcome {
                warn!(step = ?abort.step, last_saved = ?abort.last_saved, "installer stopped early");
                let code = match abort.reason {
                    AbortReason::Interrupted => EXIT_INTERRUPTED,
                    _ => EXIT_ABORTED,
                };
                eprintln!(
                    "{}",
                    abort_report(abort.last_saved, &abort.reason.to_string(), &paths.credential_file)
                );
                process::exit(code);
            }
            info!("installer finished");
            Ok(())
        }
        signal = shutdown_signal() => {
            cancel.cancel();
            terminal::restore_terminal();
            warn!(signal, "installer interrupted");
            eprintln!();
            eprintln!("{}", interrupted_report(&paths, signal));
            process::exit(EXIT_INTERRUPTED);
        }
    }
}

fn run_installer(
    config: InstallerConfig,
    paths: ResolvedPaths,
    auto_confirm: bool,
    cancel: CancelToken,
) -> Result<(), Abort> {
    let state = StateFile::new(&paths.state_file);
    let mut credentials = CredentialStore::open(&paths.credential_file);
    let mut prompter = LinePrompter::stdio(auto_confirm);
    let mut steps = SystemSteps::new(config, paths, SystemRunner);

    let mut orchestrator =
        Orchestrator::new(&state, &mut credentials, &mut prompter, &mut steps, cancel);
    orchestrator.run()
}

/// Report for a signal; only what is already on disk is known, the worker is abandoned.
fn interrupted_report(paths: &ResolvedPaths, signal: &str) -> String {
    let last_saved = StateFile::new(&paths.state_file).load().ok().flatten();
    abort_report(
        last_saved,
        &format!("interrupted by {signal}"),
        &paths.credential_file,
    )
}

fn reset_progress(paths: &ResolvedPaths) -> Result<()> {
    StateFile::new(&paths.state_file)
        .clear()
        .context("clear saved progress")?;
    CredentialStore::open(&paths.credential_file)
        .remove_file()
        .context("remove staged credentials")?;
    info!("debug mode: saved progress and staged credentials removed");
    println!("Debug mode: starting from the beginning.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_accepts_both_auto_confirm_spellings() {
        let args = Args::try_parse_from(["sppmon-installer", "--yes"]).expect("parse");
        assert!(args.auto_confirm);
        let args = Args::try_parse_from(["sppmon-installer", "--autoConfirm", "--debug"])
            .expect("parse");
        assert!(args.auto_confirm && args.debug);
        let args = Args::try_parse_from(["sppmon-installer"]).expect("parse");
        assert!(!args.auto_confirm && !args.check);
    }

    #[test]
    fn interrupted_report_names_persisted_step() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = InstallerConfig::default().resolve_paths(dir.path());
        let report = interrupted_report(&paths, "SIGHUP");
        assert!(report.contains("interrupted by SIGHUP"));
        assert!(report.contains("No progress has been saved yet."));

        StateFile::new(&paths.state_file)
            .save(sppmon_core::Step::CredentialCollection)
            .expect("save");
        let report = interrupted_report(&paths, "SIGINT");
        assert!(report.contains("continue at CREDENTIAL_COLLECTION"));
        assert!(report.contains(&paths.credential_file.display().to_string()));
    }

    #[test]
    fn debug_reset_removes_progress_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = InstallerConfig::default().resolve_paths(dir.path());
        StateFile::new(&paths.state_file)
            .save(sppmon_core::Step::DatastoreSetup)
            .expect("save");
        CredentialStore::open(&paths.credential_file)
            .save("influxAdminName", "admin")
            .expect("save");

        reset_progress(&paths).expect("reset");
        assert!(!paths.state_file.exists());
        assert!(!paths.credential_file.exists());
    }
}
