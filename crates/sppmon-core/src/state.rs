//! Persisted continue point for resumable installs.
//!
//! The file holds a single line: the identifier of the next step to run.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::step::{Step, StepParseError};

#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to read state file {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to write state file {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("state file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        source: StepParseError,
    },
}

#[derive(Debug, Clone)]
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored step; `None` when no run has been started.
    pub fn load(&self) -> Result<Option<Step>, StateError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StateError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let step = contents
            .trim()
            .parse::<Step>()
            .map_err(|source| StateError::Corrupt {
                path: self.path.clone(),
                source,
            })?;
        Ok(Some(step))
    }

    /// Persist `step` as the continue point.
    ///
    /// Writes a sibling temp file and renames it into place so a reader never
    /// observes a truncated identifier.
    pub fn save(&self, step: Step) -> Result<(), StateError> {
        let write_err = |source| StateError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(write_err)?;
            }
        }
        let tmp_path = self.tmp_path();
        fs::write(&tmp_path, format!("{step}\n")).map_err(write_err)?;
        fs::rename(&tmp_path, &self.path).map_err(write_err)?;
        debug!(%step, path = %self.path.display(), "continue point saved");
        Ok(())
    }

    /// Remove the state file; a missing file is not an error.
    pub fn clear(&self) -> Result<(), StateError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StateError::Write {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
