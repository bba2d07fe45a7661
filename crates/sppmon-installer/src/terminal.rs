//! Raw terminal handling for reading secrets without echo.

use std::io;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};

use crate::prompt::PromptError;

pub struct RawModeGuard {
    active: bool,
}

impl RawModeGuard {
    pub fn new() -> io::Result<Self> {
        // Raw mode disables echo and line buffering until restored.
        enable_raw_mode()?;
        Ok(Self { active: true })
    }

    pub fn restore(&mut self) -> io::Result<()> {
        if self.active {
            self.active = false;
            disable_raw_mode()?;
        }
        Ok(())
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        // Best-effort cleanup, never panic in Drop.
        let _ = self.restore();
    }
}

/// Restore cooked mode when leaving through a path that skips destructors.
pub fn restore_terminal() {
    let _ = disable_raw_mode();
}

/// Read one line from the terminal without echoing it.
pub fn read_hidden_line() -> Result<String, PromptError> {
    let mut guard = RawModeGuard::new()?;
    let mut line = String::new();

    loop {
        let Event::Key(KeyEvent {
            code,
            modifiers,
            kind,
            ..
        }) = event::read()?
        else {
            continue;
        };
        if kind != KeyEventKind::Press {
            continue;
        }
        match code {
            KeyCode::Enter => break,
            // Raw mode swallows SIGINT, so Ctrl+C arrives as a key press.
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                guard.restore()?;
                return Err(PromptError::Interrupted);
            }
            KeyCode::Char('d') if modifiers.contains(KeyModifiers::CONTROL) && line.is_empty() => {
                guard.restore()?;
                return Err(PromptError::Closed);
            }
            KeyCode::Backspace => {
                line.pop();
            }
            KeyCode::Char(ch) => line.push(ch),
            _ => {}
        }
    }

    guard.restore()?;
    Ok(line)
}
