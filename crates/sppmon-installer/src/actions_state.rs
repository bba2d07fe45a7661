//! Per-step context handed to every action.
//!
//! Replaces process-wide globals: the prompter, staged credentials and
//! resolved configuration travel explicitly.

use anyhow::Result;
use sppmon_core::{CredentialStore, InstallerConfig, ResolvedPaths, Step};
use tracing::info;

use crate::prompt::{InputRequest, Prompter};

use super::CommandRunner;

pub struct StepContext<'a> {
    pub step: Step,
    pub prompter: &'a mut dyn Prompter,
    pub credentials: &'a mut CredentialStore,
}

/// Host-facing collaborators shared by the production steps.
pub struct StepEnv<'a> {
    pub config: &'a InstallerConfig,
    pub paths: &'a ResolvedPaths,
    pub runner: &'a mut dyn CommandRunner,
}

impl<'a> StepContext<'a> {
    pub fn new(
        step: Step,
        prompter: &'a mut dyn Prompter,
        credentials: &'a mut CredentialStore,
    ) -> Self {
        Self {
            step,
            prompter,
            credentials,
        }
    }

    pub fn auto_confirm(&self) -> bool {
        self.prompter.auto_confirm()
    }

    pub fn confirm(&mut self, message: &str, default: bool) -> Result<bool> {
        Ok(self.prompter.confirm(message, default)?)
    }

    pub fn input(&mut self, request: &InputRequest<'_>) -> Result<String> {
        Ok(self.prompter.input(request)?)
    }

    /// Stage a value that was not typed by the operator.
    pub fn stage(&mut self, key: &str, value: &str) -> Result<()> {
        self.credentials.save(key, value)?;
        Ok(())
    }
}

/// Report progress to the operator and the install log.
pub fn log_line(ctx: &mut StepContext, line: impl Into<String>) {
    let line = line.into();
    info!(step = %ctx.step, "{}", line);
    ctx.prompter.say(&format!("> {line}"));
}
