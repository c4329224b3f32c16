//! Lenient semantic version parsing for tool version strings.
//!
//! Vendor toolchains rarely publish strict semver (`13.2.Rel1`,
//! `v2.1`, `13.2.1`).  [`ToolVersion::parse`] maps these onto
//! [`semver::Version`] so ordering is numeric, never lexical.
use std::cmp::Ordering;
use std::fmt;

use semver::Version;

/// A parsed tool version.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ToolVersion(Version);

impl ToolVersion {
    /// Parse a version string, returning `None` when it is malformed.
    ///
    /// Strict semver is tried first.  Otherwise the string is split on
    /// `.`, `-`, `_` and whitespace; the first token must be numeric and
    /// up to two more tokens contribute minor and patch after stripping a
    /// leading alphabetic tag (`Rel1` → `1`).
    ///
    /// ```
    /// use devboot::version::ToolVersion;
    ///
    /// let a = ToolVersion::parse("13.2.Rel1").unwrap();
    /// let b = ToolVersion::parse("13.2.1").unwrap();
    /// assert_eq!(a, b);
    /// assert!(ToolVersion::parse("9.10").unwrap() > ToolVersion::parse("9.9").unwrap());
    /// assert!(ToolVersion::parse("unknown").is_none());
    /// ```
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let trimmed = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);
        if let Ok(v) = Version::parse(trimmed) {
            return Some(Self(v));
        }

        let mut tokens = trimmed.split(['.', '-', '_', ' ', '\t']);
        let major: u64 = tokens.next()?.parse().ok()?;
        let mut rest = [0u64; 2];
        for slot in &mut rest {
            let Some(number) = tokens
                .next()
                .map(|t| t.trim_start_matches(|c: char| c.is_ascii_alphabetic()))
                .and_then(|t| t.parse().ok())
            else {
                break;
            };
            *slot = number;
        }
        let [minor, patch] = rest;
        Some(Self(Version::new(major, minor, patch)))
    }
}

impl fmt::Display for ToolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of comparing an installed version against the wanted one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionCheck {
    /// Same version.
    Equal,
    /// Installed version is strictly newer than wanted.
    Newer,
    /// Installed version is older than wanted.
    Older,
    /// One of the strings could not be parsed; treat as reinstall needed.
    Unknown,
}

impl VersionCheck {
    /// Whether the installed version is acceptable without reinstalling.
    #[must_use]
    pub const fn is_satisfied(self) -> bool {
        matches!(self, Self::Equal | Self::Newer)
    }
}

/// Compare an installed version string against the wanted version string.
#[must_use]
pub fn compare(installed: &str, wanted: &str) -> VersionCheck {
    match (ToolVersion::parse(installed), ToolVersion::parse(wanted)) {
        (Some(have), Some(want)) => match have.cmp(&want) {
            Ordering::Equal => VersionCheck::Equal,
            Ordering::Greater => VersionCheck::Newer,
            Ordering::Less => VersionCheck::Older,
        },
        _ => VersionCheck::Unknown,
    }
}
