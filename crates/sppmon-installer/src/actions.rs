//! Installer step actions and shared exports.

#[path = "actions_checks.rs"]
mod actions_checks;
#[path = "actions_config.rs"]
mod actions_config;
#[path = "actions_credentials.rs"]
mod actions_credentials;
#[path = "actions_format.rs"]
mod actions_format;
#[path = "actions_install.rs"]
mod actions_install;
#[path = "actions_process.rs"]
mod actions_process;
#[path = "actions_scripts.rs"]
mod actions_scripts;
#[path = "actions_state.rs"]
mod actions_state;
#[path = "actions_summary.rs"]
mod actions_summary;

use anyhow::Result;
use sppmon_core::{InstallerConfig, ResolvedPaths, Step};

pub use actions_process::{CommandRunner, SystemRunner};
pub use actions_state::{log_line, StepContext, StepEnv};

pub(super) use actions_checks::system_check;
pub(super) use actions_config::{read_config_value, setup_dashboard, setup_datastore};
pub(super) use actions_credentials::collect_credentials;
pub(super) use actions_format::{dashboard_import_lines, service_url, welcome_lines};
pub(super) use actions_install::{enable_service, ensure_packages, open_firewall_port, setup_runtime};
pub(super) use actions_process::command;
pub(super) use actions_scripts::{configure_scheduling, generate_server_configs};
pub(super) use actions_summary::{finish, import_dashboards, welcome};

#[cfg(test)]
pub(crate) use actions_process::testing;

/// Executes one installation step; implementations must be safe to re-run.
pub trait StepActions {
    fn run(&mut self, step: Step, ctx: &mut StepContext<'_>) -> Result<()>;
}

/// Production step implementations backed by the host system.
pub struct SystemSteps<R> {
    config: InstallerConfig,
    paths: ResolvedPaths,
    runner: R,
}

impl<R: CommandRunner> SystemSteps<R> {
    pub fn new(config: InstallerConfig, paths: ResolvedPaths, runner: R) -> Self {
        Self {
            config,
            paths,
            runner,
        }
    }
}

impl<R: CommandRunner> StepActions for SystemSteps<R> {
    fn run(&mut self, step: Step, ctx: &mut StepContext<'_>) -> Result<()> {
        let mut env = StepEnv {
            config: &self.config,
            paths: &self.paths,
            runner: &mut self.runner,
        };
        match step {
            Step::Welcome => welcome(&mut env, ctx),
            Step::SystemCheck => system_check(&mut env, ctx),
            Step::RuntimeSetup => setup_runtime(&mut env, ctx),
            Step::DatastoreSetup => setup_datastore(&mut env, ctx),
            Step::DashboardSetup => setup_dashboard(&mut env, ctx),
            Step::CredentialCollection => collect_credentials(&mut env, ctx),
            Step::ConfigGeneration => generate_server_configs(&mut env, ctx),
            Step::SchedulingSetup => configure_scheduling(&mut env, ctx),
            Step::DashboardImport => import_dashboards(&mut env, ctx),
            Step::Finished => finish(&mut env, ctx),
        }
    }
}
