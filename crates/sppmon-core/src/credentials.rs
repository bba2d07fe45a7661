//! Plaintext credential staging file shared with the config generators.
//!
//! Records are `name="value"` lines, written raw so the file can be sourced
//! by a shell and matched by the config generator's `name="(.*)"` pattern.
//! The file is append-only during a run; later records shadow earlier ones
//! with the same name, and re-saving an unchanged value appends nothing.

use std::collections::HashMap;
use std::fs::{self, OpenOptions, Permissions};
use std::io::{self, Write};
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

/// Owner read/write only.
pub const CREDENTIAL_FILE_MODE: u32 = 0o600;

/// Characters that would need escaping inside POSIX double quotes.
pub const UNSTORABLE_CHARS: [char; 4] = ['\\', '"', '$', '`'];

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("invalid credential name {0:?}")]
    InvalidName(String),
    #[error("credential {0} must not contain a newline, \\, \", $ or `")]
    InvalidValue(String),
    #[error("failed to write credential file {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("failed to read credential file {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
}

#[derive(Debug)]
pub struct CredentialStore {
    path: PathBuf,
    values: HashMap<String, String>,
}

impl CredentialStore {
    /// Bind a store to `path` without touching the filesystem.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            values: HashMap::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Append `name="value"` and make the pair visible to this run.
    pub fn save(&mut self, name: &str, value: &str) -> Result<(), CredentialError> {
        if !is_valid_name(name) {
            return Err(CredentialError::InvalidName(name.to_string()));
        }
        if !is_storable_value(value) {
            return Err(CredentialError::InvalidValue(name.to_string()));
        }
        if self.get(name) == Some(value) {
            return Ok(());
        }

        let write_err = |source| CredentialError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(write_err)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .mode(CREDENTIAL_FILE_MODE)
            .open(&self.path)
            .map_err(write_err)?;
        // `mode` only applies on creation; tighten files that predate this run.
        file.set_permissions(Permissions::from_mode(CREDENTIAL_FILE_MODE))
            .map_err(write_err)?;
        writeln!(file, "{name}=\"{value}\"").map_err(write_err)?;

        debug!(name, path = %self.path.display(), "credential saved");
        self.values.insert(name.to_string(), value.to_string());
        Ok(())
    }

    /// Load every record from disk; no-op when the file does not exist.
    pub fn read_all(&mut self) -> Result<(), CredentialError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(source) => {
                return Err(CredentialError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        for (index, line) in contents.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            match parse_record(trimmed) {
                Some((name, value)) => {
                    self.values.insert(name, value);
                }
                None => warn!(line = index + 1, "skipping malformed credential record"),
            }
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Delete the staging file and forget loaded values.
    pub fn remove_file(&mut self) -> Result<(), CredentialError> {
        self.values.clear();
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(CredentialError::Write {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

/// Whether `value` can be written without quoting or escaping.
pub fn is_storable_value(value: &str) -> bool {
    !value
        .chars()
        .any(|ch| ch == '\n' || ch == '\r' || UNSTORABLE_CHARS.contains(&ch))
}

fn parse_record(line: &str) -> Option<(String, String)> {
    let (name, raw) = line.split_once('=')?;
    let name = name.trim();
    if !is_valid_name(name) {
        return None;
    }
    let value = raw.trim().strip_prefix('"')?.strip_suffix('"')?;
    Some((name.to_string(), value.to_string()))
}
