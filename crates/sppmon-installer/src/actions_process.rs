//! Subprocess execution and output streaming helpers.

use std::ffi::OsStr;
use std::io::{BufRead, BufReader, Read};
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Sender};
use std::thread;

use anyhow::{anyhow, Context, Result};
use sppmon_core::program_in_path;
use sppmon_core::util::{sanitize_log_line, LOG_LINE_LIMIT};
use tracing::debug;

use super::{log_line, StepContext};

/// Seam between the steps and the host's processes.
pub trait CommandRunner {
    /// Run to completion, streaming output to the operator and the log.
    fn run(&mut self, ctx: &mut StepContext<'_>, label: &str, command: Command) -> Result<()>;

    /// Run with the operator's terminal attached, for interactive tools.
    fn run_interactive(
        &mut self,
        ctx: &mut StepContext<'_>,
        label: &str,
        command: Command,
    ) -> Result<()>;

    /// Whether the command exits successfully; never fails the step.
    fn probe(&mut self, command: Command) -> bool;

    fn program_available(&mut self, program: &str) -> bool {
        program_in_path(program)
    }
}

pub fn command<I, S>(program: &str, args: I) -> Command
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = Command::new(program);
    command.args(args);
    command
}

#[derive(Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&mut self, ctx: &mut StepContext<'_>, label: &str, mut command: Command) -> Result<()> {
        log_line(ctx, format!("Running: {label}"));
        let mut child = command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("command failed to start: {label}"))?;

        let (tx, rx) = mpsc::channel::<String>();
        let readers = [
            child.stdout.take().map(|stream| spawn_reader(stream, tx.clone())),
            child.stderr.take().map(|stream| spawn_reader(stream, tx.clone())),
        ];
        // The loop below ends once both reader threads drop their senders.
        drop(tx);
        for line in rx {
            debug!(command = label, "{}", sanitize_log_line(&line, LOG_LINE_LIMIT));
            ctx.prompter.say(&format!("  {line}"));
        }

        let status = child
            .wait()
            .with_context(|| format!("command failed to run: {label}"))?;
        for handle in readers.into_iter().flatten() {
            let _ = handle.join();
        }

        if status.success() {
            Ok(())
        } else {
            Err(anyhow!("command failed: {label} ({status})"))
        }
    }

    fn run_interactive(
        &mut self,
        ctx: &mut StepContext<'_>,
        label: &str,
        mut command: Command,
    ) -> Result<()> {
        log_line(ctx, format!("Starting: {label}"));
        let status = command
            .status()
            .with_context(|| format!("command failed to start: {label}"))?;
        if status.success() {
            Ok(())
        } else {
            Err(anyhow!("command failed: {label} ({status})"))
        }
    }

    fn probe(&mut self, mut command: Command) -> bool {
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }
}

fn spawn_reader(stream: impl Read + Send + 'static, tx: Sender<String>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let reader = BufReader::new(stream);
        for line in reader.lines().map_while(Result::ok) {
            if tx.send(line.replace('\r', "")).is_err() {
                break;
            }
        }
    })
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use sppmon_core::{CredentialStore, Step};

    use crate::prompt::LinePrompter;

    #[cfg(target_os = "linux")]
    #[test]
    fn streams_output_and_reports_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut credentials = CredentialStore::open(dir.path().join("auth"));
        let mut prompter = LinePrompter::new(Cursor::new(Vec::new()), Vec::new(), true);
        {
            let mut ctx = StepContext::new(Step::RuntimeSetup, &mut prompter, &mut credentials);
            let mut runner = SystemRunner;
            runner
                .run(&mut ctx, "echo", command("sh", ["-c", "echo hello; echo oops >&2"]))
                .expect("success");
            let err = runner
                .run(&mut ctx, "false", command("false", Vec::<&str>::new()))
                .expect_err("failure");
            assert!(err.to_string().contains("command failed: false"));
            assert!(runner.probe(command("true", Vec::<&str>::new())));
            assert!(!runner.probe(command("/nonexistent/binary", Vec::<&str>::new())));
        }
        let text = String::from_utf8_lossy(prompter.writer()).to_string();
        assert!(text.contains("  hello"));
        assert!(text.contains("  oops"));
        assert!(text.contains("> Running: echo"));
    }
}
