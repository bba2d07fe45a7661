//! Host prerequisites evaluated by the system check step.

use std::fmt;

use sppmon_core::{InstallerConfig, ResolvedPaths};

use crate::actions::{command, CommandRunner};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CheckState {
    Ok,
    Warn,
    Fail,
}

#[derive(Debug)]
pub struct CheckItem {
    pub label: &'static str,
    pub state: CheckState,
    pub detail: String,
}

pub struct Checks {
    pub items: Vec<CheckItem>,
}

impl Checks {
    pub fn evaluate(
        config: &InstallerConfig,
        paths: &ResolvedPaths,
        runner: &mut dyn CommandRunner,
        is_root: bool,
    ) -> Self {
        let mut items = Vec::new();

        items.push(if is_root {
            CheckItem::ok("root", "running as root")
        } else {
            CheckItem::fail("root", "the installer must be run as root (sudo)")
        });

        let manager = config.packages.manager.as_str();
        items.push(if runner.program_available(manager) {
            CheckItem::ok("package manager", manager)
        } else {
            CheckItem::fail("package manager", &format!("{manager} not found"))
        });

        items.push(if runner.probe(command("systemctl", ["--version"])) {
            CheckItem::ok("systemd", "systemctl available")
        } else {
            CheckItem::fail("systemd", "systemctl is required to manage services")
        });

        let files = [
            ("sppmon.py", paths.sppmon_entrypoint()),
            ("addConfigFile.py", paths.script("addConfigFile.py")),
            ("addCrontabConfig.py", paths.script("addCrontabConfig.py")),
        ];
        for (label, path) in files {
            items.push(if path.is_file() {
                CheckItem::ok(label, &path.display().to_string())
            } else {
                CheckItem::fail(label, &format!("{} is missing", path.display()))
            });
        }

        items.push(if runner.program_available("firewall-cmd") {
            CheckItem::ok("firewalld", "firewall-cmd available")
        } else {
            CheckItem::warn("firewalld", "not found; open ports manually")
        });

        Self { items }
    }

    pub fn failures(&self) -> impl Iterator<Item = &CheckItem> {
        self.items
            .iter()
            .filter(|item| item.state == CheckState::Fail)
    }

    pub fn ready(&self) -> Result<(), String> {
        let failed = self
            .failures()
            .map(|item| item.label)
            .collect::<Vec<_>>();
        if failed.is_empty() {
            Ok(())
        } else {
            Err(format!("system check failed: {}", failed.join(", ")))
        }
    }
}

impl CheckItem {
    fn ok(label: &'static str, detail: &str) -> Self {
        Self {
            label,
            state: CheckState::Ok,
            detail: detail.to_string(),
        }
    }

    fn warn(label: &'static str, detail: &str) -> Self {
        Self {
            label,
            state: CheckState::Warn,
            detail: detail.to_string(),
        }
    }

    fn fail(label: &'static str, detail: &str) -> Self {
        Self {
            label,
            state: CheckState::Fail,
            detail: detail.to_string(),
        }
    }
}

impl fmt::Display for CheckItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = match self.state {
            CheckState::Ok => "ok",
            CheckState::Warn => "warn",
            CheckState::Fail => "FAIL",
        };
        write!(f, "[{marker:>4}] {}: {}", self.label, self.detail)
    }
}

pub fn running_as_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}
