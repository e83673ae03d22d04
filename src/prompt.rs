//! Interactive prompts.
//!
//! The core only talks to [`Prompter`]; the terminal implementation uses
//! dialoguer. Escaping a prompt is reported as [`PromptError::Cancelled`].

use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, FuzzySelect, Input};

/// Validation callback for free-text input. `Err` carries the message shown
/// to the user.
pub type Validator<'v> = &'v dyn Fn(&str) -> Result<(), String>;

pub trait Prompter {
    fn confirm(&mut self, message: &str, default: bool) -> Result<bool, PromptError>;

    /// Pick one of `items`; returns its index.
    fn select(&mut self, message: &str, items: &[String], default: usize) -> Result<usize, PromptError>;

    fn input(&mut self, message: &str, validate: Validator<'_>) -> Result<String, PromptError>;
}

#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("prompt cancelled")]
    Cancelled,
    #[error("terminal prompt failed: {0}")]
    Terminal(#[source] std::io::Error),
}

impl From<dialoguer::Error> for PromptError {
    fn from(e: dialoguer::Error) -> Self {
        let dialoguer::Error::IO(io) = e;
        if io.kind() == std::io::ErrorKind::Interrupted {
            PromptError::Cancelled
        } else {
            PromptError::Terminal(io)
        }
    }
}

/// Prompts on the controlling terminal.
pub struct TerminalPrompter {
    theme: ColorfulTheme,
}

impl TerminalPrompter {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

impl Default for TerminalPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TerminalPrompter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalPrompter").finish_non_exhaustive()
    }
}

impl Prompter for TerminalPrompter {
    fn confirm(&mut self, message: &str, default: bool) -> Result<bool, PromptError> {
        Confirm::with_theme(&self.theme)
            .with_prompt(message)
            .default(default)
            .interact_opt()?
            .ok_or(PromptError::Cancelled)
    }

    fn select(&mut self, message: &str, items: &[String], default: usize) -> Result<usize, PromptError> {
        FuzzySelect::with_theme(&self.theme)
            .with_prompt(message)
            .items(items)
            .default(default)
            .interact_opt()?
            .ok_or(PromptError::Cancelled)
    }

    fn input(&mut self, message: &str, validate: Validator<'_>) -> Result<String, PromptError> {
        let value = Input::<String>::with_theme(&self.theme)
            .with_prompt(message)
            .allow_empty(true)
            .validate_with(|v: &String| validate(v.as_str()))
            .interact_text()?;
        Ok(value)
    }
}
