//! Install root discovery.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};

const ROOT_ENV: &str = "SPPMON_ROOT";
const ROOT_MARKERS: [&str; 2] = ["scripts/addConfigFile.py", "python/sppmon.py"];

/// Explicit `--root`, then `$SPPMON_ROOT`, then the closest ancestor of the
/// working directory that looks like an SPPMon checkout.
pub fn find_install_root(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(root) = explicit {
        return validate_root(root.to_path_buf(), "--root");
    }
    if let Ok(root) = env::var(ROOT_ENV) {
        return validate_root(PathBuf::from(root), ROOT_ENV);
    }

    let mut dir = env::current_dir()?;
    loop {
        if is_install_root(&dir) {
            return Ok(dir);
        }
        if !dir.pop() {
            break;
        }
    }

    Err(anyhow!(
        "SPPMon install root not found (pass --root, set {ROOT_ENV} or run inside the SPPMon directory)"
    ))
}

fn validate_root(root: PathBuf, source: &str) -> Result<PathBuf> {
    if root.is_dir() {
        Ok(root)
    } else {
        Err(anyhow!(
            "install root {} from {source} is not a directory",
            root.display()
        ))
    }
}

fn is_install_root(dir: &Path) -> bool {
    ROOT_MARKERS.iter().any(|marker| dir.join(marker).is_file())
}
