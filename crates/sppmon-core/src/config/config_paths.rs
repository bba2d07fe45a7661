//! Resolution of configured file locations against the install root.

use std::path::{Path, PathBuf};

use super::InstallerConfig;

#[derive(Debug, Clone)]
pub struct ResolvedPaths {
    pub root: PathBuf,
    pub state_file: PathBuf,
    pub credential_file: PathBuf,
    pub log_file: PathBuf,
    pub server_config_dir: PathBuf,
    pub scripts_dir: PathBuf,
    pub python_dir: PathBuf,
    pub dashboards_dir: PathBuf,
}

impl InstallerConfig {
    /// Resolve configured paths relative to an explicit install root.
    pub fn resolve_paths(&self, root: &Path) -> ResolvedPaths {
        let paths = &self.paths;
        ResolvedPaths {
            root: root.to_path_buf(),
            state_file: resolve_path(root, &paths.state_file),
            credential_file: resolve_path(root, &paths.credential_file),
            log_file: resolve_path(root, &paths.log_file),
            server_config_dir: resolve_path(root, &paths.server_config_dir),
            scripts_dir: resolve_path(root, &paths.scripts_dir),
            python_dir: resolve_path(root, &paths.python_dir),
            dashboards_dir: resolve_path(root, &paths.dashboards_dir),
        }
    }
}

impl ResolvedPaths {
    pub fn requirements_file(&self, config: &InstallerConfig) -> PathBuf {
        self.python_dir.join(&config.runtime.requirements)
    }

    pub fn sppmon_entrypoint(&self) -> PathBuf {
        self.python_dir.join("sppmon.py")
    }

    pub fn script(&self, name: &str) -> PathBuf {
        self.scripts_dir.join(name)
    }
}

fn resolve_path(base: &Path, value: &str) -> PathBuf {
    let path = PathBuf::from(value);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}
