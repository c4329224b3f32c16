//! Typed error variants for resource operations.
//!
//! Resource code returns these variants directly; callers convert to
//! [`anyhow::Error`] via `?`.

use thiserror::Error;

/// Errors that arise from resource checks and apply operations.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// A downloaded archive does not match the configured digest.
    #[error("checksum mismatch for {file}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Archive file name.
        file: String,
        /// Configured SHA-256.
        expected: String,
        /// Computed SHA-256.
        actual: String,
    },

    /// Neither `curl` nor `wget` is available.
    #[error("no downloader available (need curl or wget) to fetch {url}")]
    NoDownloader {
        /// URL that could not be fetched.
        url: String,
    },

    /// An editor extension could not be installed.
    #[error("extension '{id}' failed to install: {stderr}")]
    ExtensionInstall {
        /// Extension identifier.
        id: String,
        /// Captured standard error of the editor CLI.
        stderr: String,
    },

    /// A resource exists but is in an unexpected or inconsistent state.
    #[error("invalid state for '{resource}': {reason}")]
    InvalidState {
        /// Name or description of the resource in the invalid state.
        resource: String,
        /// Human-readable explanation of why the state is invalid.
        reason: String,
    },
}
