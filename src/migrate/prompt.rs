//! Operator interaction: questions, the hidden password prompt, blog selection.
//!
//! The [`Prompt`] trait keeps console I/O out of the migration logic so the
//! rest of the crate can be driven by scripted answers.

use std::io::{self, BufRead, IsTerminal, Write};

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use secrecy::SecretString;

use super::error::MigrateError;
use crate::blogger::RemoteBlog;
use crate::util::clean_input;

pub trait Prompt {
    /// Ask a question and return the cleaned answer, or `None` at end of input.
    fn ask(&mut self, question: &str) -> Result<Option<String>, MigrateError>;

    /// Ask for a secret without echoing it. `None` when the operator aborts.
    fn ask_secret(&mut self, question: &str) -> Result<Option<SecretString>, MigrateError>;

    /// Show one line to the operator.
    fn say(&mut self, line: &str) -> Result<(), MigrateError>;
}

/// Prompts on the process's stdin/stdout.
#[derive(Debug, Default)]
pub struct ConsolePrompt;

impl ConsolePrompt {
    fn read_line(&mut self) -> Result<Option<String>, MigrateError> {
        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }
}

impl Prompt for ConsolePrompt {
    fn ask(&mut self, question: &str) -> Result<Option<String>, MigrateError> {
        let mut stdout = io::stdout();
        write!(stdout, "{question}")?;
        stdout.flush()?;
        Ok(self.read_line()?.map(|line| clean_input(&line)))
    }

    fn ask_secret(&mut self, question: &str) -> Result<Option<SecretString>, MigrateError> {
        let mut stdout = io::stdout();
        write!(stdout, "{question}")?;
        stdout.flush()?;

        let secret = if io::stdin().is_terminal() {
            let typed = read_hidden()?;
            // Raw mode swallowed the newline
            writeln!(stdout)?;
            typed
        } else {
            self.read_line()?
                .map(|line| line.trim_end_matches(['\r', '\n']).to_string())
        };
        Ok(secret.map(SecretString::from))
    }

    fn say(&mut self, line: &str) -> Result<(), MigrateError> {
        let mut stdout = io::stdout();
        writeln!(stdout, "{line}")?;
        stdout.flush()?;
        Ok(())
    }
}

/// Restores cooked mode when dropped, including on early return.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = disable_raw_mode() {
            tracing::warn!(error = %e, "Failed to restore terminal mode");
        }
    }
}

/// Read keystrokes until Enter without echoing them. Ctrl+C, Esc, or Ctrl+D on
/// an empty line abort.
fn read_hidden() -> io::Result<Option<String>> {
    let _guard = RawModeGuard::enable()?;
    let mut typed = String::new();

    loop {
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match key.code {
            KeyCode::Enter => return Ok(Some(typed)),
            KeyCode::Esc => return Ok(None),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return Ok(None)
            }
            KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                if typed.is_empty() {
                    return Ok(None);
                }
            }
            KeyCode::Backspace => {
                typed.pop();
            }
            KeyCode::Char(c) => typed.push(c),
            _ => {}
        }
    }
}

/// Ask the operator to pick one of `blogs`, re-asking until the answer is a
/// listed number. Returns the chosen blog's id.
///
/// # Errors
///
/// - [`MigrateError::Configuration`] - the account has no blogs
/// - [`MigrateError::Input`] - input ended before a valid choice
pub fn select_blog<P: Prompt + ?Sized>(
    prompt: &mut P,
    blogs: &[RemoteBlog],
) -> Result<String, MigrateError> {
    if blogs.is_empty() {
        return Err(MigrateError::Configuration(
            "No blogs found on this Blogger account".to_string(),
        ));
    }

    loop {
        prompt.say("")?;
        for (index, blog) in blogs.iter().enumerate() {
            prompt.say(&format!("  {}) {} ({})", index + 1, blog.title, blog.id))?;
        }

        let Some(answer) = prompt.ask("\n  Select a blog to import: ")? else {
            return Err(MigrateError::Input("Blog selection aborted".to_string()));
        };

        let chosen = answer
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| blogs.get(i));
        match chosen {
            Some(blog) => {
                tracing::debug!(blog_id = %blog.id, "Blog selected");
                return Ok(blog.id.clone());
            }
            None => prompt.say("Please enter a valid blog number")?,
        }
    }
}
