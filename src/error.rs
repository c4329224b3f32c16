//! Domain-specific error types for the bootstrapper.
//!
//! Internal modules return typed errors while `main` converts them to
//! [`anyhow::Error`] at the CLI boundary.
//!
//! # Error hierarchy
//!
//! ```text
//! StepError
//! └── Fatal          — a fatal step failed; the run halts
//! ConfigError        — reading or parsing the TOML config
//! IdentityError      — interactive identity setup
//! ```
use thiserror::Error;

/// Errors surfaced by provisioning steps to the top-level dispatcher.
#[derive(Error, Debug)]
pub enum StepError {
    /// A step marked fatal could not complete; the whole run must stop.
    #[error("Setup failed during: {step}")]
    Fatal {
        /// Description of the failing step.
        step: String,
        /// Underlying cause.
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl StepError {
    /// Build a fatal error for `step` from any error source.
    pub fn fatal(step: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        let source: anyhow::Error = source.into();
        Self::Fatal {
            step: step.into(),
            source: source.into(),
        }
    }
}

/// Errors that arise while loading the configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("IO error reading config file {path}: {source}")]
    Io {
        /// Path to the file that could not be read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML or has unexpected keys.
    #[error("Invalid TOML in {path}: {message}")]
    InvalidSyntax {
        /// Path to the offending file.
        path: String,
        /// Parser message.
        message: String,
    },

    /// A value parsed but is not acceptable.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue {
        /// Dotted key of the offending value.
        key: String,
        /// Human-readable explanation.
        message: String,
    },
}

/// Errors from the interactive identity setup.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum IdentityError {
    /// The two passphrase entries differ.
    #[error("passphrases do not match")]
    PassphraseMismatch,

    /// The remote service did not acknowledge the key.
    #[error("remote verification failed: {0}")]
    VerificationFailed(String),

    /// No prompt could be shown (no terminal attached).
    #[error("prompt failed: {0}")]
    Prompt(String),
}
