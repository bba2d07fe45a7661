//! Line-oriented operator prompts.
//!
//! Auto-confirm mode answers routine confirmations with their default; the
//! risk acknowledgment is always asked.

use std::io::{self, BufRead, BufReader, IsTerminal, Stdin, Stdout, Write};

use thiserror::Error;
use tracing::{debug, info};

use crate::terminal::read_hidden_line;

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("input closed before an answer was given")]
    Closed,
    #[error("interrupted by user")]
    Interrupted,
    #[error("prompt i/o failed: {0}")]
    Io(#[from] io::Error),
}

pub trait Prompter {
    fn auto_confirm(&self) -> bool;

    /// Print a line for the operator.
    fn say(&mut self, line: &str);

    /// Routine yes/no question; answered with `default` in auto-confirm mode.
    fn confirm(&mut self, message: &str, default: bool) -> Result<bool, PromptError>;

    /// Yes/no question that is never auto-confirmed and defaults to no.
    fn acknowledge(&mut self, message: &str) -> Result<bool, PromptError>;

    /// Free-form input, validated and confirmed by the operator.
    fn input(&mut self, request: &InputRequest<'_>) -> Result<String, PromptError>;
}

pub struct InputRequest<'a> {
    pub message: &'a str,
    pub default: Option<&'a str>,
    pub allow_empty: bool,
    pub secret: bool,
    pub validator: Option<&'a dyn Fn(&str) -> bool>,
}

impl<'a> InputRequest<'a> {
    pub fn new(message: &'a str) -> Self {
        Self {
            message,
            default: None,
            allow_empty: false,
            secret: false,
            validator: None,
        }
    }

    pub fn with_default(mut self, default: &'a str) -> Self {
        self.default = Some(default).filter(|value| !value.is_empty());
        self
    }

    pub fn secret(mut self) -> Self {
        self.secret = true;
        self
    }

    pub fn validate(mut self, validator: &'a dyn Fn(&str) -> bool) -> Self {
        self.validator = Some(validator);
        self
    }
}

pub struct LinePrompter<R, W> {
    reader: R,
    writer: W,
    auto_confirm: bool,
    hide_secrets: bool,
}

impl LinePrompter<BufReader<Stdin>, Stdout> {
    /// Prompter bound to the process terminal.
    pub fn stdio(auto_confirm: bool) -> Self {
        let hide_secrets = io::stdin().is_terminal();
        Self::new(BufReader::new(io::stdin()), io::stdout(), auto_confirm).hide_secrets(hide_secrets)
    }
}

impl<R: BufRead, W: Write> LinePrompter<R, W> {
    pub fn new(reader: R, writer: W, auto_confirm: bool) -> Self {
        Self {
            reader,
            writer,
            auto_confirm,
            hide_secrets: false,
        }
    }

    /// Read secrets with terminal echo disabled.
    pub fn hide_secrets(mut self, hide: bool) -> Self {
        self.hide_secrets = hide;
        self
    }

    #[cfg(test)]
    pub fn writer(&self) -> &W {
        &self.writer
    }

    fn ask(&mut self, prompt: &str) -> Result<String, PromptError> {
        write!(self.writer, "{prompt}")?;
        self.writer.flush()?;
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Err(PromptError::Closed);
        }
        Ok(line.trim().to_string())
    }

    fn ask_secret(&mut self, prompt: &str) -> Result<String, PromptError> {
        if !self.hide_secrets {
            return self.ask(prompt);
        }
        write!(self.writer, "{prompt}")?;
        self.writer.flush()?;
        let line = read_hidden_line()?;
        writeln!(self.writer)?;
        Ok(line.trim().to_string())
    }

    fn ask_yes_no(&mut self, message: &str, default: bool) -> Result<bool, PromptError> {
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        let answer = self.ask(&format!("{message} {hint}: "))?;
        let result = if answer.is_empty() {
            default
        } else {
            matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes")
        };
        debug!(message, result, "confirmation answered");
        Ok(result)
    }
}

impl<R: BufRead, W: Write> Prompter for LinePrompter<R, W> {
    fn auto_confirm(&self) -> bool {
        self.auto_confirm
    }

    fn say(&mut self, line: &str) {
        let _ = writeln!(self.writer, "{line}");
    }

    fn confirm(&mut self, message: &str, default: bool) -> Result<bool, PromptError> {
        if self.auto_confirm {
            info!(message, answer = default, "auto-confirmed");
            self.say(&format!("{message}: autoConfirm -> {}", yes_no(default)));
            return Ok(default);
        }
        self.ask_yes_no(message, default)
    }

    fn acknowledge(&mut self, message: &str) -> Result<bool, PromptError> {
        self.ask_yes_no(message, false)
    }

    fn input(&mut self, request: &InputRequest<'_>) -> Result<String, PromptError> {
        let prompt = match request.default {
            Some(default) if !request.secret => format!("{} [{}]: ", request.message, default),
            Some(_) => format!("{} [keep default]: ", request.message),
            None => format!("{}: ", request.message),
        };

        loop {
            let raw = if request.secret {
                self.ask_secret(&prompt)?
            } else {
                self.ask(&prompt)?
            };
            let value = if raw.is_empty() {
                request.default.unwrap_or_default().to_string()
            } else {
                raw
            };

            if value.is_empty() && !request.allow_empty {
                self.say("> No empty input allowed, please try again");
                continue;
            }
            if let Some(validator) = request.validator {
                if !validator(&value) {
                    self.say("> Failed filter rule, please try again.");
                    continue;
                }
            }

            if request.secret {
                if self.auto_confirm {
                    return Ok(value);
                }
                let repeated = self.ask_secret("Please repeat input for confirmation: ")?;
                let repeated = if repeated.is_empty() {
                    request.default.unwrap_or_default().to_string()
                } else {
                    repeated
                };
                if repeated == value {
                    return Ok(value);
                }
                self.say("> These inputs did not match. Please try again.");
                continue;
            }

            if self.confirm(&format!("Was \"{value}\" the correct input?"), true)? {
                return Ok(value);
            }
        }
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn prompter(input: &str, auto_confirm: bool) -> LinePrompter<Cursor<Vec<u8>>, Vec<u8>> {
        LinePrompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new(), auto_confirm)
    }

    fn output(prompter: &LinePrompter<Cursor<Vec<u8>>, Vec<u8>>) -> String {
        String::from_utf8_lossy(prompter.writer()).to_string()
    }

    #[test]
    fn confirm_uses_default_on_empty_answer() {
        let mut prompter = prompter("\n\n", false);
        assert!(prompter.confirm("Continue?", true).expect("answer"));
        assert!(!prompter.confirm("Continue?", false).expect("answer"));
    }

    #[test]
    fn confirm_accepts_only_yes_spellings() {
        let mut prompter = prompter("Yes\nn\nsure\n", false);
        assert!(prompter.confirm("Continue?", false).expect("answer"));
        assert!(!prompter.confirm("Continue?", true).expect("answer"));
        assert!(!prompter.confirm("Continue?", true).expect("answer"));
    }

    #[test]
    fn auto_confirm_answers_without_reading() {
        let mut prompter = prompter("", true);
        assert!(prompter.confirm("Continue?", true).expect("answer"));
        assert!(!prompter.confirm("Enable HTTPS?", false).expect("answer"));
        assert!(output(&prompter).contains("autoConfirm -> yes"));
    }

    #[test]
    fn acknowledge_is_never_auto_confirmed() {
        let mut prompter = prompter("", true);
        assert!(matches!(
            prompter.acknowledge("Store secrets in plaintext?"),
            Err(PromptError::Closed)
        ));

        let mut prompter = self::prompter("\n", true);
        assert!(!prompter.acknowledge("Store secrets in plaintext?").expect("answer"));

        let mut prompter = self::prompter("y\n", true);
        assert!(prompter.acknowledge("Store secrets in plaintext?").expect("answer"));
    }

    #[test]
    fn input_falls_back_to_default_and_confirms() {
        let mut prompter = prompter("\n\n", false);
        let request = InputRequest::new("Please enter the influxAdmin username")
            .with_default("influxAdmin");
        assert_eq!(prompter.input(&request).expect("input"), "influxAdmin");
        assert!(output(&prompter).contains("[influxAdmin]"));
    }

    #[test]
    fn input_retries_rejected_values() {
        // empty, filtered, declined confirmation, accepted
        let mut prompter = prompter("\nabc\n8086\nn\n8087\ny\n", false);
        let is_port = |value: &str| value.parse::<u16>().is_ok();
        let request = InputRequest::new("Port").validate(&is_port);
        assert_eq!(prompter.input(&request).expect("input"), "8087");
        let text = output(&prompter);
        assert!(text.contains("No empty input allowed"));
        assert!(text.contains("Failed filter rule"));
    }

    #[test]
    fn secret_input_must_match_repeat() {
        let mut prompter = prompter("one\ntwo\nsecret\nsecret\n", false);
        let request = InputRequest::new("Password").secret();
        assert_eq!(prompter.input(&request).expect("input"), "secret");
        let text = output(&prompter);
        assert!(text.contains("did not match"));
        assert!(!text.contains("Was \"secret\""));
    }

    #[test]
    fn secret_repeat_skipped_in_auto_confirm() {
        let mut prompter = prompter("secret\n", true);
        let request = InputRequest::new("Password").secret();
        assert_eq!(prompter.input(&request).expect("input"), "secret");
    }

    #[test]
    fn closed_input_is_reported() {
        let mut prompter = prompter("", false);
        assert!(matches!(
            prompter.input(&InputRequest::new("Address")),
            Err(PromptError::Closed)
        ));
    }
}
