//! System check step.

use anyhow::{anyhow, Result};
use tracing::warn;

use crate::checks::{running_as_root, CheckState, Checks};

use super::{StepContext, StepEnv};

pub fn system_check(env: &mut StepEnv, ctx: &mut StepContext) -> Result<()> {
    system_check_as(env, ctx, running_as_root())
}

fn system_check_as(env: &mut StepEnv, ctx: &mut StepContext, is_root: bool) -> Result<()> {
    let checks = Checks::evaluate(env.config, env.paths, &mut *env.runner, is_root);
    for item in &checks.items {
        if item.state != CheckState::Ok {
            warn!(check = item.label, state = ?item.state, "{}", item.detail);
        }
        ctx.prompter.say(&item.to_string());
    }
    checks.ready().map_err(|reason| anyhow!(reason))
}
