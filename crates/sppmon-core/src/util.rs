//! Shared helper utilities used by the installer.

use std::env;
use std::path::Path;

/// Longest subprocess output line forwarded to the install log.
pub const LOG_LINE_LIMIT: usize = 512;

/// Check whether a program exists in $PATH (or at an explicit path).
pub fn program_in_path(program: &str) -> bool {
    if program.contains(std::path::MAIN_SEPARATOR) {
        return Path::new(program).is_file();
    }
    env::var_os("PATH")
        .map(|paths| env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
        .unwrap_or(false)
}

/// Strip carriage returns and cap the length of a captured output line.
pub fn sanitize_log_line(value: &str, max_len: usize) -> String {
    let cleaned = value.replace('\r', "");
    if cleaned.chars().count() <= max_len {
        return cleaned;
    }
    let mut capped = cleaned.chars().take(max_len).collect::<String>();
    capped.push_str("...");
    capped
}

/// Render a secret for display without revealing it.
pub fn mask_secret(value: &str) -> String {
    if value.is_empty() {
        String::new()
    } else {
        "*".repeat(value.chars().count().min(8))
    }
}

/// Parse the True/False spelling used by the credential file.
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Some(true),
        "false" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

/// Inverse of [`parse_flag`], matching the Python generator's expectations.
pub fn format_flag(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}
