//! Sanity checks on a loaded configuration.
use crate::error::ConfigError;

use super::{Config, VERSION_PLACEHOLDER};
use crate::version::ToolVersion;

/// Length of a hex-encoded SHA-256 digest.
const SHA256_HEX_LEN: usize = 64;

/// Reject values that would make a step misbehave later in the run.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] for the first unusable value.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    let tc = &config.toolchain;
    if ToolVersion::parse(&tc.version).is_none() {
        return Err(invalid("toolchain.version", format!("'{}' is not a version", tc.version)));
    }
    if !tc.url.contains(VERSION_PLACEHOLDER) {
        return Err(invalid(
            "toolchain.url",
            format!("must contain {VERSION_PLACEHOLDER}"),
        ));
    }
    if tc.compiler.is_empty() || tc.compiler.contains('/') {
        return Err(invalid("toolchain.compiler", "must be a bare file name"));
    }
    if let Some(sum) = &tc.sha256
        && !(sum.len() == SHA256_HEX_LEN && sum.chars().all(|c| c.is_ascii_hexdigit()))
    {
        return Err(invalid("toolchain.sha256", "must be 64 hex characters"));
    }

    check_var_name("toolchain.env_var", &tc.env_var)?;
    check_var_name("sdk.env_var", &config.sdk.env_var)?;
    for name in config.env.extra.keys() {
        check_var_name(&format!("env.extra.{name}"), name)?;
    }

    if let Some(ext) = config.editor.extensions.iter().find(|e| !e.contains('.')) {
        return Err(invalid(
            "editor.extensions",
            format!("'{ext}' is not a publisher.name identifier"),
        ));
    }
    if config.identity.confirm_token.trim().is_empty() {
        return Err(invalid("identity.confirm_token", "must not be empty"));
    }
    Ok(())
}

/// Whether `name` is usable as a shell variable name.
#[must_use]
pub fn is_valid_var_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn check_var_name(key: &str, name: &str) -> Result<(), ConfigError> {
    if is_valid_var_name(name) {
        Ok(())
    } else {
        Err(invalid(key, format!("'{name}' is not a valid variable name")))
    }
}

fn invalid(key: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.into(),
    }
}
