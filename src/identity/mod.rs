//! Operator prompts and the pure pieces of the Git/SSH identity flow.
//!
//! Prompts are written straight to the terminal, never through the
//! [`Logger`](crate::logging::Logger), so verbosity can not hide them.
use dialoguer::console::Term;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Password};

use crate::error::IdentityError;
use crate::exec::Executor;
use crate::platform::Platform;

/// Source of operator answers.
#[cfg_attr(test, mockall::automock)]
pub trait Prompter {
    /// Ask for a line of text; an empty `default` means no default.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Prompt`] if no terminal is available.
    fn input(&self, prompt: &str, default: &str) -> Result<String, IdentityError>;

    /// Ask for a secret without echoing it.  An empty answer is allowed.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Prompt`] if no terminal is available.
    fn password(&self, prompt: &str) -> Result<String, IdentityError>;

    /// Show a message to the operator.
    fn message(&self, msg: &str);
}

/// [`Prompter`] backed by `dialoguer` on the controlling terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn input(&self, prompt: &str, default: &str) -> Result<String, IdentityError> {
        let theme = ColorfulTheme::default();
        let mut input = Input::<String>::with_theme(&theme).with_prompt(prompt);
        if !default.is_empty() {
            input = input.default(default.to_string());
        }
        input
            .interact_text()
            .map_err(|e| IdentityError::Prompt(e.to_string()))
    }

    fn password(&self, prompt: &str) -> Result<String, IdentityError> {
        let theme = ColorfulTheme::default();
        Password::with_theme(&theme)
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()
            .map_err(|e| IdentityError::Prompt(e.to_string()))
    }

    fn message(&self, msg: &str) {
        // Nothing sensible to do if the terminal is gone.
        let _ = Term::stderr().write_line(msg);
    }
}

/// Compare the two passphrase entries.
///
/// # Errors
///
/// Returns [`IdentityError::PassphraseMismatch`] when they differ.
pub fn check_passphrase(first: &str, second: &str) -> Result<(), IdentityError> {
    if first == second {
        Ok(())
    } else {
        Err(IdentityError::PassphraseMismatch)
    }
}

/// Ask for a key passphrase twice until both entries match.
///
/// # Errors
///
/// Returns [`IdentityError::Prompt`] if the terminal goes away.
pub fn prompt_passphrase(prompter: &dyn Prompter) -> Result<String, IdentityError> {
    loop {
        let first = prompter.password("SSH key passphrase (empty for none)")?;
        let second = prompter.password("Repeat passphrase")?;
        match check_passphrase(&first, &second) {
            Ok(()) => return Ok(first),
            Err(e) => prompter.message(&format!("{e}, try again")),
        }
    }
}

/// Ask for a non-empty value, reprompting on blank answers.
///
/// # Errors
///
/// Returns [`IdentityError::Prompt`] if the terminal goes away.
pub fn prompt_required(
    prompter: &dyn Prompter,
    prompt: &str,
    default: &str,
) -> Result<String, IdentityError> {
    loop {
        let answer = prompter.input(prompt, default)?;
        let answer = answer.trim();
        if !answer.is_empty() {
            return Ok(answer.to_string());
        }
        prompter.message("A value is required");
    }
}

/// Block until the operator types exactly `token`.
///
/// # Errors
///
/// Returns [`IdentityError::Prompt`] if the terminal goes away.
pub fn wait_for_confirmation(prompter: &dyn Prompter, token: &str) -> Result<(), IdentityError> {
    loop {
        let answer = prompter.input(&format!("Type '{token}' to continue"), "")?;
        if answer.trim() == token {
            return Ok(());
        }
    }
}

/// Extract `NAME=value` assignments from `ssh-agent -s` output.
///
/// ```
/// use devboot::identity::parse_agent_env;
///
/// let out = "SSH_AUTH_SOCK=/tmp/ssh-x/agent.1; export SSH_AUTH_SOCK;\necho Agent pid 1;\n";
/// assert_eq!(
///     parse_agent_env(out),
///     vec![("SSH_AUTH_SOCK".to_string(), "/tmp/ssh-x/agent.1".to_string())]
/// );
/// ```
#[must_use]
pub fn parse_agent_env(output: &str) -> Vec<(String, String)> {
    output
        .lines()
        .filter_map(|line| line.split(';').next())
        .filter_map(|assignment| assignment.trim().split_once('='))
        .filter(|(name, _)| name.starts_with("SSH_"))
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
}

/// First available clipboard writer, as a program and its arguments.
#[must_use]
pub fn clipboard_command(
    platform: &Platform,
    executor: &dyn Executor,
) -> Option<(&'static str, &'static [&'static str])> {
    const CANDIDATES: &[(&str, &[&str])] = &[
        ("wl-copy", &[]),
        ("xclip", &["-selection", "clipboard"]),
        ("pbcopy", &[]),
    ];
    if platform.is_wsl() && executor.which("clip.exe") {
        return Some(("clip.exe", &[]));
    }
    CANDIDATES
        .iter()
        .find(|(program, _)| executor.which(program))
        .copied()
}

/// Judge the output of `ssh -T git@<host>`.
///
/// The service closes the session with a non-zero status even when the key
/// is accepted, so only the greeting text counts.
///
/// # Errors
///
/// Returns [`IdentityError::VerificationFailed`] carrying the output when
/// the greeting is absent.
pub fn classify_verification(output: &str) -> Result<(), IdentityError> {
    if output
        .to_lowercase()
        .contains("successfully authenticated")
    {
        Ok(())
    } else {
        Err(IdentityError::VerificationFailed(output.trim().to_string()))
    }
}
