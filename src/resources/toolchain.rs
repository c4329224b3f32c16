//! Cross-compilation toolchain archive resource.
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

use super::error::ResourceError;
use super::{Resource, ResourceChange, ResourceState, run_privileged};
use crate::config::ToolchainConfig;
use crate::exec::Executor;
use crate::version::{self, VersionCheck};

/// A toolchain extracted from a versioned archive into a fixed directory.
///
/// Satisfied when `<install_dir>/bin/<compiler>` is an executable file whose
/// `-dumpfullversion` is at least the configured version.
#[derive(Debug)]
pub struct ToolchainResource<'a> {
    config: &'a ToolchainConfig,
    sudo: bool,
    executor: &'a dyn Executor,
}

impl<'a> ToolchainResource<'a> {
    /// Create a new toolchain resource.
    #[must_use]
    pub const fn new(config: &'a ToolchainConfig, sudo: bool, executor: &'a dyn Executor) -> Self {
        Self {
            config,
            sudo,
            executor,
        }
    }

    /// Directory the toolchain is extracted into.
    #[must_use]
    pub fn install_dir(&self) -> &Path {
        &self.config.install_dir
    }

    fn download(&self, url: &str, dest: &Path) -> Result<()> {
        let dest_str = dest.to_string_lossy();
        if self.executor.which("curl") {
            self.executor
                .run("curl", &["-fsSL", "-o", &dest_str, url])?;
        } else if self.executor.which("wget") {
            self.executor.run("wget", &["-q", "-O", &dest_str, url])?;
        } else {
            return Err(ResourceError::NoDownloader {
                url: url.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// File name component of an archive URL.
#[must_use]
pub fn archive_file_name(url: &str) -> &str {
    url.rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("toolchain-archive")
}

/// Whether `path` is a regular file with any execute bit set.
#[must_use]
pub fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path).is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

/// Compute the lowercase hex SHA-256 digest of the file at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn compute_sha256(path: &Path) -> Result<String> {
    use sha2::{Digest, Sha256};
    use std::fmt::Write as _;

    let bytes = fs::read(path).context("reading archive for checksum verification")?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let result = hasher.finalize();
    let mut hex = String::with_capacity(64);
    for b in &result {
        // write! to a String is infallible.
        write!(hex, "{b:02x}").unwrap_or(());
    }
    Ok(hex)
}

/// Check `archive` against `expected`; a mismatched file is deleted.
///
/// # Errors
///
/// Returns [`ResourceError::ChecksumMismatch`] when the digests differ.
pub fn verify_archive(archive: &Path, expected: &str) -> Result<()> {
    let actual = compute_sha256(archive)?;
    if actual.eq_ignore_ascii_case(expected) {
        return Ok(());
    }
    fs::remove_file(archive).ok();
    Err(ResourceError::ChecksumMismatch {
        file: archive
            .file_name()
            .map_or_else(String::new, |n| n.to_string_lossy().to_string()),
        expected: expected.to_string(),
        actual,
    }
    .into())
}

impl Resource for ToolchainResource<'_> {
    fn description(&self) -> String {
        format!(
            "{} {} in {}",
            self.config.compiler,
            self.config.version,
            self.config.install_dir.display()
        )
    }

    fn current_state(&self) -> Result<ResourceState> {
        let compiler = self.config.compiler_path();
        if !is_executable(&compiler) {
            return Ok(if self.config.install_dir.exists() {
                ResourceState::Incorrect {
                    current: format!("no executable {}", compiler.display()),
                }
            } else {
                ResourceState::Missing
            });
        }

        let compiler_str = compiler.to_string_lossy();
        let result = self.executor.run_unchecked(&compiler_str, &["-dumpfullversion"])?;
        let installed = result.stdout.trim();
        if !result.success || installed.is_empty() {
            return Ok(ResourceState::Incorrect {
                current: "unknown version".to_string(),
            });
        }

        match version::compare(installed, &self.config.version) {
            VersionCheck::Equal | VersionCheck::Newer => Ok(ResourceState::Correct),
            VersionCheck::Older | VersionCheck::Unknown => Ok(ResourceState::Incorrect {
                current: installed.to_string(),
            }),
        }
    }

    fn apply(&self) -> Result<ResourceChange> {
        let url = self.config.archive_url();
        let staging = tempfile::tempdir().context("creating download directory")?;
        let archive: PathBuf = staging.path().join(archive_file_name(&url));

        self.download(&url, &archive)
            .with_context(|| format!("downloading {url}"))?;
        if let Some(expected) = &self.config.sha256 {
            verify_archive(&archive, expected)?;
        }

        let dir = self.config.install_dir.to_string_lossy();
        let archive_str = archive.to_string_lossy();
        run_privileged(self.executor, self.sudo, "mkdir", &["-p", &dir])?;
        run_privileged(
            self.executor,
            self.sudo,
            "tar",
            &["-xf", &archive_str, "-C", &dir, "--strip-components=1"],
        )
        .context("extracting toolchain archive")?;

        if archive.exists() {
            fs::remove_file(&archive).context("deleting toolchain archive")?;
        }
        Ok(ResourceChange::Applied)
    }

    fn remove(&self) -> Result<ResourceChange> {
        if !self.config.install_dir.exists() {
            return Ok(ResourceChange::AlreadyCorrect);
        }
        let dir = self.config.install_dir.to_string_lossy();
        run_privileged(self.executor, self.sudo, "rm", &["-rf", &dir])?;
        Ok(ResourceChange::Applied)
    }
}
