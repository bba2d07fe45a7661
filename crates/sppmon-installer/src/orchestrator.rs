//! Resumable step orchestration.
//!
//! Drives the fixed step sequence, persists the continue point after every
//! completed step and gates each transition behind an operator checkpoint.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use sppmon_core::{CredentialError, CredentialStore, StateError, StateFile, Step};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::actions::{StepActions, StepContext};
use crate::prompt::{PromptError, Prompter};

const RISK_NOTICE: &str = "Credentials collected during the installation are stored in plaintext \
in a staging file until the installation finishes.";

/// Shared flag set by the signal handler and observed between steps.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Error)]
pub enum AbortReason {
    #[error("plaintext credential storage was not acknowledged")]
    RiskDeclined,
    #[error("declined to continue")]
    Declined,
    #[error("interrupted")]
    Interrupted,
    #[error("step failed: {0:#}")]
    StepFailed(anyhow::Error),
    #[error("{0} (rerun with --debug to start over)")]
    State(#[from] StateError),
    #[error(transparent)]
    Credentials(#[from] CredentialError),
    #[error(transparent)]
    Prompt(PromptError),
}

impl From<PromptError> for AbortReason {
    fn from(err: PromptError) -> Self {
        match err {
            PromptError::Interrupted => AbortReason::Interrupted,
            other => AbortReason::Prompt(other),
        }
    }
}

/// Why and where a run stopped.
#[derive(Debug)]
pub struct Abort {
    /// Step that was running or about to run.
    pub step: Option<Step>,
    /// Continue point on disk when the run stopped.
    pub last_saved: Option<Step>,
    pub reason: AbortReason,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Start {
    Fresh,
    Resumed(Step),
}

impl Start {
    pub fn step(self) -> Step {
        match self {
            Start::Fresh => Step::FIRST,
            Start::Resumed(step) => step,
        }
    }
}

pub struct Orchestrator<'a> {
    state: &'a StateFile,
    credentials: &'a mut CredentialStore,
    prompter: &'a mut dyn Prompter,
    actions: &'a mut dyn StepActions,
    cancel: CancelToken,
    last_saved: Option<Step>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        state: &'a StateFile,
        credentials: &'a mut CredentialStore,
        prompter: &'a mut dyn Prompter,
        actions: &'a mut dyn StepActions,
        cancel: CancelToken,
    ) -> Self {
        Self {
            state,
            credentials,
            prompter,
            actions,
            cancel,
            last_saved: None,
        }
    }

    /// Acknowledge, restore, then run every remaining step.
    pub fn run(&mut self) -> Result<(), Abort> {
        self.acknowledge_risk()?;
        let start = self.restore_or_initialize()?;
        self.run_to_completion(start.step())
    }

    /// The one confirmation auto-confirm mode never answers.
    pub fn acknowledge_risk(&mut self) -> Result<(), Abort> {
        self.prompter.say(RISK_NOTICE);
        self.prompter.say(&format!(
            "Staging file: {}",
            self.credentials.path().display()
        ));
        let accepted = self
            .prompter
            .acknowledge("Do you accept that secrets are stored in plaintext for the duration of the installation?")
            .map_err(|err| self.abort(None, err.into()))?;
        if !accepted {
            return Err(self.abort(None, AbortReason::RiskDeclined));
        }
        info!("plaintext credential storage acknowledged");
        Ok(())
    }

    pub fn restore_or_initialize(&mut self) -> Result<Start, Abort> {
        let stored = self
            .state
            .load()
            .map_err(|err| self.abort(None, err.into()))?;

        let Some(step) = stored else {
            self.persist(Step::FIRST)?;
            info!(step = %Step::FIRST, "fresh installation started");
            return Ok(Start::Fresh);
        };

        self.last_saved = Some(step);
        self.prompter.say(&format!(
            "> Found a previous installation stopped before: {} ({})",
            step,
            step.title()
        ));
        let resume = self
            .prompter
            .confirm(&format!("Do you want to continue at {step}?"), true)
            .map_err(|err| self.abort(Some(step), err.into()))?;

        if resume {
            info!(%step, "resuming installation");
            Ok(Start::Resumed(step))
        } else {
            self.prompter
                .say("> Restarting the installation from the beginning.");
            self.persist(Step::FIRST)?;
            info!(previous = %step, "continue point reset");
            Ok(Start::Fresh)
        }
    }

    pub fn run_to_completion(&mut self, from: Step) -> Result<(), Abort> {
        let mut step = from;
        loop {
            self.check_cancelled(step)?;

            // Steps may depend on secrets staged by an earlier run.
            self.credentials
                .read_all()
                .map_err(|err| self.abort(Some(step), err.into()))?;

            self.prompter.say("");
            self.prompter
                .say(&format!("===== {} ({}) =====", step.title(), step));
            info!(%step, "step started");

            let result = {
                let mut ctx = StepContext::new(step, &mut *self.prompter, &mut *self.credentials);
                self.actions.run(step, &mut ctx)
            };
            if let Err(err) = result {
                error!(%step, error = %format!("{err:#}"), "step failed");
                let reason = match err.downcast::<PromptError>() {
                    Ok(prompt_err) => prompt_err.into(),
                    Err(err) => AbortReason::StepFailed(err),
                };
                return Err(self.abort(Some(step), reason));
            }
            info!(%step, "step completed");

            let Some(next) = step.next() else {
                info!("installation finished");
                return Ok(());
            };

            // Persist before the checkpoint so a resume never repeats `step`.
            self.persist(next)?;
            self.check_cancelled(next)?;

            if let Some(prompt) = next.checkpoint_prompt() {
                let proceed = self
                    .prompter
                    .confirm(prompt, true)
                    .map_err(|err| self.abort(Some(next), err.into()))?;
                if !proceed {
                    return Err(self.abort(Some(next), AbortReason::Declined));
                }
            }
            step = next;
        }
    }

    fn persist(&mut self, step: Step) -> Result<(), Abort> {
        self.state
            .save(step)
            .map_err(|err| self.abort(Some(step), err.into()))?;
        self.last_saved = Some(step);
        Ok(())
    }

    fn check_cancelled(&self, step: Step) -> Result<(), Abort> {
        if self.cancel.is_cancelled() {
            return Err(self.abort(Some(step), AbortReason::Interrupted));
        }
        Ok(())
    }

    fn abort(&self, step: Option<Step>, reason: AbortReason) -> Abort {
        warn!(
            step = step.map(Step::as_str),
            last_saved = self.last_saved.map(Step::as_str),
            %reason,
            "installation aborted"
        );
        Abort {
            step,
            last_saved: self.last_saved,
            reason,
        }
    }
}

/// Operator-facing text printed whenever a run stops early.
pub fn abort_report(last_saved: Option<Step>, reason: &str, credential_file: &Path) -> String {
    let mut lines = vec![format!("Aborted: {reason}")];
    match last_saved {
        Some(step) => lines.push(format!(
            "The installation will continue at {} ({}) on the next start.",
            step,
            step.title()
        )),
        None => lines.push("No progress has been saved yet.".to_string()),
    }
    lines.push(format!(
        "Reminder: {} may contain plaintext credentials. Delete it once it is no longer needed.",
        credential_file.display()
    ));
    lines.join("\n")
}
